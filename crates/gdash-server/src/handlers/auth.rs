//! Authentication-related handlers

use std::sync::Arc;

use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{AppError, AppState, AuthContext, AuthMethod};
use gdash_core::models::{User, UserRole};

/// Login request body
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Login response: a session token plus the user it belongs to
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

/// POST /api/users/login - Exchange credentials for a session token
///
/// Unknown email and wrong password give the same 401.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    if body.email.trim().is_empty() || body.password.is_empty() {
        return Err(AppError::bad_request("Email and password are required"));
    }

    let Some(user) = state.db.verify_credentials(&body.email, &body.password)? else {
        warn!(email = %body.email.trim(), "Failed login attempt");
        return Err(AppError::unauthorized("Invalid email or password"));
    };

    let (token, expires_at) = state.config.sessions.issue(&user)?;

    state
        .db
        .log_audit(&user.email, "login", Some("user"), Some(user.id), None)?;
    info!(user = %user.email, "User logged in");

    Ok(Json(LoginResponse {
        token,
        expires_at,
        user,
    }))
}

/// Response for the /api/me endpoint
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    /// The authenticated user's email or identifier
    pub user: String,
    pub user_id: Option<i64>,
    pub role: UserRole,
    /// How the user was authenticated
    pub auth_method: AuthMethod,
}

/// GET /api/me - Describe the current session
pub async fn get_me(Extension(auth): Extension<AuthContext>) -> Json<MeResponse> {
    Json(MeResponse {
        user: auth.subject,
        user_id: auth.user_id,
        role: auth.role,
        auth_method: auth.method,
    })
}
