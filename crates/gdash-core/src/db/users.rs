//! User account operations

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rusqlite::{params, Row};
use tracing::info;

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{normalize_email, NewUser, User, UserRole, UserUpdate, MIN_PASSWORD_LEN};

const USER_COLUMNS: &str = "id, name, email, role, created_at";

fn row_to_user(row: &Row) -> rusqlite::Result<User> {
    let role_str: String = row.get(3)?;
    let created_at_str: String = row.get(4)?;

    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        role: role_str.parse().unwrap_or_default(),
        created_at: parse_datetime(&created_at_str),
    })
}

/// Hash a password into an Argon2 PHC string with a random salt
pub(crate) fn hash_password(password: &str) -> Result<String> {
    let salt_bytes: [u8; 16] = rand::random();
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| Error::Auth(format!("Failed to create salt: {}", e)))?;

    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| Error::Auth(format!("Failed to hash password: {}", e)))?;

    Ok(hash.to_string())
}

fn verify_password(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

fn validate_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidData("Name is required".to_string()));
    }
    Ok(name.to_string())
}

fn validate_email(email: &str) -> Result<String> {
    let email = normalize_email(email);
    let valid = email
        .split_once('@')
        .map(|(local, domain)| !local.is_empty() && domain.contains('.'))
        .unwrap_or(false);
    if !valid {
        return Err(Error::InvalidData(format!("Invalid email: {}", email)));
    }
    Ok(email)
}

fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::InvalidData(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

impl Database {
    /// Create a user account
    ///
    /// Fails with [`Error::Conflict`] when the email is already registered.
    pub fn create_user(&self, new_user: &NewUser) -> Result<User> {
        let name = validate_name(&new_user.name)?;
        let email = validate_email(&new_user.email)?;
        validate_password(&new_user.password)?;

        if self.get_user_by_email(&email)?.is_some() {
            return Err(Error::Conflict(format!("User {} already exists", email)));
        }

        let password_hash = hash_password(&new_user.password)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO users (name, email, password_hash, role) VALUES (?, ?, ?, ?)",
            params![name, email, password_hash, new_user.role.as_str()],
        )?;
        let id = conn.last_insert_rowid();
        drop(conn);

        info!(user = %email, role = %new_user.role, "Created user");
        self.get_user(id)?
            .ok_or_else(|| Error::NotFound(format!("User {}", id)))
    }

    /// List all users, ordered by name
    pub fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM users ORDER BY name COLLATE NOCASE, id",
            USER_COLUMNS
        ))?;

        let users = stmt
            .query_map([], row_to_user)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(users)
    }

    /// Get a user by ID
    pub fn get_user(&self, id: i64) -> Result<Option<User>> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                &format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS),
                params![id],
                row_to_user,
            )
            .ok();
        Ok(user)
    }

    /// Get a user by email (case-insensitive)
    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                &format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS),
                params![normalize_email(email)],
                row_to_user,
            )
            .ok();
        Ok(user)
    }

    /// Apply a partial update; returns the updated user or `None` if it does not exist
    pub fn update_user(&self, id: i64, update: &UserUpdate) -> Result<Option<User>> {
        let Some(existing) = self.get_user(id)? else {
            return Ok(None);
        };
        if let Some(password) = &update.password {
            validate_password(password)?;
        }

        let name = match &update.name {
            Some(name) => validate_name(name)?,
            None => existing.name,
        };
        let email = match &update.email {
            Some(email) => {
                let email = validate_email(email)?;
                if email != existing.email && self.get_user_by_email(&email)?.is_some() {
                    return Err(Error::Conflict(format!("User {} already exists", email)));
                }
                email
            }
            None => existing.email,
        };
        let role: UserRole = update.role.unwrap_or(existing.role);

        let conn = self.conn()?;
        conn.execute(
            "UPDATE users SET name = ?, email = ?, role = ? WHERE id = ?",
            params![name, email, role.as_str(), id],
        )?;

        if let Some(password) = &update.password {
            let password_hash = hash_password(password)?;
            conn.execute(
                "UPDATE users SET password_hash = ? WHERE id = ?",
                params![password_hash, id],
            )?;
        }
        drop(conn);

        self.get_user(id)
    }

    /// Delete a user; returns false if it did not exist
    pub fn delete_user(&self, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM users WHERE id = ?", params![id])?;
        Ok(deleted > 0)
    }

    /// Check an email/password pair
    ///
    /// Returns `None` for an unknown email or a wrong password, without saying which.
    pub fn verify_credentials(&self, email: &str, password: &str) -> Result<Option<User>> {
        let conn = self.conn()?;
        let stored: Option<(i64, String)> = conn
            .query_row(
                "SELECT id, password_hash FROM users WHERE email = ?",
                params![normalize_email(email)],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .ok();
        drop(conn);

        match stored {
            Some((id, hash)) if verify_password(password, &hash) => self.get_user(id),
            _ => Ok(None),
        }
    }

    /// Number of registered users
    pub fn count_users(&self) -> Result<i64> {
        let conn = self.conn()?;
        Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?)
    }

    /// Number of admin accounts
    pub fn count_admins(&self) -> Result<i64> {
        let conn = self.conn()?;
        Ok(conn.query_row(
            "SELECT COUNT(*) FROM users WHERE role = 'admin'",
            [],
            |row| row.get(0),
        )?)
    }
}
