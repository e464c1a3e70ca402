//! User management handlers (admin only)

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use tracing::info;

use crate::{AppError, AppState, AuthContext, SuccessResponse};
use gdash_core::models::{NewUser, User, UserRole, UserUpdate};

/// GET /api/users - List all users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<User>>, AppError> {
    auth.require_admin()?;
    let users = state.db.list_users()?;
    Ok(Json(users))
}

/// GET /api/users/:id - Get a single user
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<User>, AppError> {
    auth.require_admin()?;
    let user = state
        .db
        .get_user(id)?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    Ok(Json(user))
}

/// POST /api/users - Create a user
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Json(body): Json<NewUser>,
) -> Result<(StatusCode, Json<User>), AppError> {
    auth.require_admin()?;

    let user = state.db.create_user(&body).map_err(AppError::from_core)?;

    state.db.log_audit(
        &auth.subject,
        "create",
        Some("user"),
        Some(user.id),
        Some(&format!("{} ({})", user.email, user.role)),
    )?;
    info!(user = %auth.subject, created = %user.email, "Created user");

    Ok((StatusCode::CREATED, Json(user)))
}

/// PUT /api/users/:id - Update name, email, password or role
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(body): Json<UserUpdate>,
) -> Result<Json<User>, AppError> {
    auth.require_admin()?;

    let existing = state
        .db
        .get_user(id)?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    if existing.role.is_admin() && body.role == Some(UserRole::User) && is_last_admin(&state)? {
        return Err(AppError::bad_request("Cannot demote the last admin"));
    }

    let user = state
        .db
        .update_user(id, &body)
        .map_err(AppError::from_core)?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    let mut changed = Vec::new();
    if body.name.is_some() {
        changed.push("name");
    }
    if body.email.is_some() {
        changed.push("email");
    }
    if body.password.is_some() {
        changed.push("password");
    }
    if body.role.is_some() {
        changed.push("role");
    }

    state.db.log_audit(
        &auth.subject,
        "update",
        Some("user"),
        Some(id),
        Some(&changed.join(",")),
    )?;

    Ok(Json(user))
}

/// DELETE /api/users/:id - Delete a user
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    auth.require_admin()?;

    if auth.user_id == Some(id) {
        return Err(AppError::bad_request("Cannot delete your own account"));
    }

    let existing = state
        .db
        .get_user(id)?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    if existing.role.is_admin() && is_last_admin(&state)? {
        return Err(AppError::bad_request("Cannot delete the last admin"));
    }

    if !state.db.delete_user(id)? {
        return Err(AppError::not_found("User not found"));
    }

    state.db.log_audit(
        &auth.subject,
        "delete",
        Some("user"),
        Some(id),
        Some(&existing.email),
    )?;
    info!(user = %auth.subject, deleted = %existing.email, "Deleted user");

    Ok(Json(SuccessResponse { success: true }))
}

fn is_last_admin(state: &AppState) -> Result<bool, AppError> {
    Ok(state.db.count_admins()? <= 1)
}
