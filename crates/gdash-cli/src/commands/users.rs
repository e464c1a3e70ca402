//! User management commands

use anyhow::Result;
use gdash_core::db::Database;
use gdash_core::models::{NewUser, UserRole};

/// Environment variable read when `gdash users add` gets no --password
pub const NEW_PASSWORD_ENV: &str = "GDASH_NEW_PASSWORD";

pub fn cmd_users_list(db: &Database) -> Result<()> {
    let users = db.list_users()?;

    if users.is_empty() {
        println!("No users. Create one with: gdash users add --name Admin --email you@example.com --admin");
        return Ok(());
    }

    println!();
    println!("  {:>4}  {:24}  {:32}  {:6}  {}", "ID", "Name", "Email", "Role", "Created");
    println!("  {}", "─".repeat(84));
    for user in &users {
        println!(
            "  {:>4}  {:24}  {:32}  {:6}  {}",
            user.id,
            super::truncate(&user.name, 24),
            super::truncate(&user.email, 32),
            user.role,
            user.created_at.format("%Y-%m-%d"),
        );
    }
    println!();

    Ok(())
}

pub fn cmd_users_add(
    db: &Database,
    name: &str,
    email: &str,
    password: &str,
    admin: bool,
) -> Result<()> {
    let role = if admin { UserRole::Admin } else { UserRole::User };
    let user = db.create_user(&NewUser {
        name: name.to_string(),
        email: email.to_string(),
        password: password.to_string(),
        role,
    })?;

    db.log_audit("cli", "create", Some("user"), Some(user.id), Some(&user.email))?;
    println!("✅ Created {} {} (#{})", user.role, user.email, user.id);

    Ok(())
}

pub fn cmd_users_delete(db: &Database, email: &str) -> Result<()> {
    let user = db
        .get_user_by_email(email)?
        .ok_or_else(|| anyhow::anyhow!("User not found: {}", email))?;

    if user.role.is_admin() && db.count_admins()? <= 1 {
        anyhow::bail!("Cannot delete the last admin ({})", user.email);
    }

    db.delete_user(user.id)?;
    db.log_audit("cli", "delete", Some("user"), Some(user.id), Some(&user.email))?;
    println!("🗑️  Deleted user {}", user.email);

    Ok(())
}
