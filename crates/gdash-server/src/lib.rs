//! GDASH Web Server
//!
//! Axum-based REST API for the GDASH climate log dashboard.
//!
//! Security features:
//! - Session tokens (HS256 JWT) or API keys on every route except login
//!   (secure by default, use --no-auth for local dev)
//! - Admin-only user management and deletions
//! - Restrictive CORS policy
//! - Input validation (pagination limits, body size limits)
//! - Audit logging for writes and admin reads
//! - Sanitized error responses

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::{
    cors::CorsLayer, services::ServeDir, set_header::SetResponseHeaderLayer, trace::TraceLayer,
};
use tracing::{error, info, warn};

use gdash_core::collector::CollectorConfig;
use gdash_core::db::Database;
use gdash_core::insights::InsightsEngine;
use gdash_core::models::{NewUser, UserRole};

mod handlers;
mod scheduler;
pub mod session;

pub use scheduler::start_collector_scheduler;
pub use session::{AuthContext, AuthMethod, SessionKeys};

/// Maximum request body size (5 MB)
pub const MAX_BODY_SIZE: usize = 5 * 1024 * 1024;

/// Maximum pagination limit
pub const MAX_PAGE_LIMIT: i64 = 1000;

/// Default page size for list endpoints
pub const DEFAULT_PAGE_LIMIT: i64 = 100;

/// Default session lifetime in hours
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;

/// Longest session lifetime accepted from the environment (one year)
pub const MAX_TOKEN_TTL_HOURS: i64 = 24 * 366;

pub const ENV_JWT_SECRET: &str = "GDASH_JWT_SECRET";
pub const ENV_TOKEN_TTL_HOURS: &str = "GDASH_TOKEN_TTL_HOURS";
pub const ENV_API_KEYS: &str = "GDASH_API_KEYS";
pub const ENV_ALLOWED_ORIGINS: &str = "GDASH_ALLOWED_ORIGINS";
pub const ENV_ADMIN_EMAIL: &str = "GDASH_ADMIN_EMAIL";
pub const ENV_ADMIN_PASSWORD: &str = "GDASH_ADMIN_PASSWORD";
pub const ENV_ADMIN_NAME: &str = "GDASH_ADMIN_NAME";

/// Server configuration
#[derive(Clone)]
pub struct ServerConfig {
    /// Whether authentication is required (secure by default)
    pub require_auth: bool,
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
    /// Static keys for machine clients, sent as "Bearer <key>"
    pub api_keys: Vec<String>,
    /// Signing keys for session tokens
    pub sessions: SessionKeys,
    /// Background collection, when enabled
    pub collector: Option<CollectorConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            require_auth: true,
            allowed_origins: vec![],
            api_keys: vec![],
            sessions: SessionKeys::new(
                &session::random_secret(),
                chrono::Duration::hours(DEFAULT_TOKEN_TTL_HOURS),
            ),
            collector: None,
        }
    }
}

impl ServerConfig {
    /// Build from `GDASH_*` environment variables
    ///
    /// Without `GDASH_JWT_SECRET` a random secret is used, so sessions do
    /// not survive a restart.
    pub fn from_env() -> Self {
        let ttl = token_ttl(std::env::var(ENV_TOKEN_TTL_HOURS).ok().as_deref());

        let secret = match std::env::var(ENV_JWT_SECRET) {
            Ok(s) if !s.trim().is_empty() => s.into_bytes(),
            _ => {
                warn!(
                    "{} not set; using a random secret (sessions end on restart)",
                    ENV_JWT_SECRET
                );
                session::random_secret()
            }
        };

        Self {
            require_auth: true,
            allowed_origins: std::env::var(ENV_ALLOWED_ORIGINS)
                .map(|s| parse_list(&s))
                .unwrap_or_default(),
            api_keys: std::env::var(ENV_API_KEYS)
                .map(|s| parse_list(&s))
                .unwrap_or_default(),
            sessions: SessionKeys::new(&secret, ttl),
            collector: None,
        }
    }
}

/// Session lifetime from a `GDASH_TOKEN_TTL_HOURS` value
///
/// Blank, unparseable or non-positive values fall back to the default.
/// Larger values are capped at [`MAX_TOKEN_TTL_HOURS`].
pub fn token_ttl(raw: Option<&str>) -> chrono::Duration {
    let hours = raw
        .and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|h| *h > 0)
        .unwrap_or(DEFAULT_TOKEN_TTL_HOURS);

    if hours > MAX_TOKEN_TTL_HOURS {
        warn!(
            "{}={} exceeds the maximum; using {} hours",
            ENV_TOKEN_TTL_HOURS, hours, MAX_TOKEN_TTL_HOURS
        );
    }

    chrono::Duration::hours(hours.min(MAX_TOKEN_TTL_HOURS))
}

/// Split a comma-separated list, dropping blanks
pub fn parse_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Shared application state
pub struct AppState {
    pub db: Database,
    pub config: ServerConfig,
    pub engine: InsightsEngine,
}

/// Authentication middleware - resolves the bearer token into an [`AuthContext`]
///
/// API keys are checked first (constant-time comparison), then session
/// tokens. A valid token for a user that no longer exists is rejected, and
/// the role comes from the database so demotions apply immediately.
async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    if !state.config.require_auth {
        request.extensions_mut().insert(AuthContext::local_dev());
        return next.run(request).await;
    }

    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    let Some(token) = token else {
        warn!(path = %request.uri().path(), "Unauthorized request - no bearer token");
        return AppError::unauthorized("Authentication required").into_response();
    };

    if session::validate_api_key(&token, &state.config.api_keys) {
        info!(user = session::API_KEY_SUBJECT, path = %request.uri().path(), "Authenticated via API key");
        request.extensions_mut().insert(AuthContext::api_key());
        return next.run(request).await;
    }

    let user = match state
        .config
        .sessions
        .verify(&token)
        .and_then(|claims| claims.user_id())
    {
        Some(id) => match state.db.get_user(id) {
            Ok(user) => user,
            Err(e) => return AppError::from(e).into_response(),
        },
        None => None,
    };

    match user {
        Some(user) => {
            tracing::debug!(user = %user.email, path = %request.uri().path(), "Authenticated via session");
            request
                .extensions_mut()
                .insert(AuthContext::from_user(&user));
            next.run(request).await
        }
        None => {
            warn!(path = %request.uri().path(), "Unauthorized request - invalid or expired token");
            AppError::unauthorized("Invalid or expired session").into_response()
        }
    }
}

/// Success response
#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Create the application router
pub fn create_router(db: Database, static_dir: Option<&str>, config: ServerConfig) -> Router {
    let state = Arc::new(AppState {
        db,
        config: config.clone(),
        engine: InsightsEngine::new(),
    });

    let protected_routes = Router::new()
        // Session
        .route("/me", get(handlers::get_me))
        // Weather logs
        .route(
            "/weather",
            get(handlers::list_weather_logs).post(handlers::create_weather_log),
        )
        .route("/weather/sample", post(handlers::create_sample_weather_log))
        .route("/weather/insights", get(handlers::get_weather_insights))
        .route("/weather/export.csv", get(handlers::export_weather_csv))
        .route("/weather/export.json", get(handlers::export_weather_json))
        .route(
            "/weather/:id",
            get(handlers::get_weather_log).delete(handlers::delete_weather_log),
        )
        // Users (admin)
        .route("/users", get(handlers::list_users).post(handlers::create_user))
        .route(
            "/users/:id",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
        // Audit log (admin)
        .route("/audit", get(handlers::list_audit_log))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let public_routes = Router::new().route("/users/login", post(handlers::login));

    let api_routes = public_routes.merge(protected_routes);

    // Build CORS layer
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
    ];
    let cors = if config.allowed_origins.is_empty() {
        // Restrictive default: only allow same-origin
        CorsLayer::new()
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            .expose_headers([header::CONTENT_DISPOSITION])
    };

    // CSP: same-origin scripts, inline styles for the web client
    let csp_value = HeaderValue::from_static(
        "default-src 'self'; script-src 'self'; style-src 'self' 'unsafe-inline'; img-src 'self' data:; connect-src 'self'; frame-ancestors 'none'"
    );

    let mut app = Router::new()
        .nest("/api", api_routes)
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Security headers
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            csp_value,
        ));

    // Serve the web client if a directory is provided
    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app
}

/// Create the first admin from `GDASH_ADMIN_*` when there are no users yet
///
/// Returns true when an account was created.
pub fn bootstrap_admin(db: &Database) -> anyhow::Result<bool> {
    if db.count_users()? > 0 {
        return Ok(false);
    }

    let (Ok(email), Ok(password)) = (
        std::env::var(ENV_ADMIN_EMAIL),
        std::env::var(ENV_ADMIN_PASSWORD),
    ) else {
        warn!(
            "No users exist. Set {} and {} (or run `gdash users add --admin`) to create one",
            ENV_ADMIN_EMAIL, ENV_ADMIN_PASSWORD
        );
        return Ok(false);
    };

    let name = std::env::var(ENV_ADMIN_NAME).unwrap_or_else(|_| "Administrator".to_string());
    let user = db.create_user(&NewUser {
        name,
        email,
        password,
        role: UserRole::Admin,
    })?;

    db.log_audit("bootstrap", "create", Some("user"), Some(user.id), Some("initial admin"))?;
    info!(user = %user.email, "Created initial admin account");
    Ok(true)
}

/// Start the server
pub async fn serve(
    db: Database,
    host: &str,
    port: u16,
    static_dir: Option<&str>,
) -> anyhow::Result<()> {
    serve_with_config(db, host, port, static_dir, ServerConfig::from_env()).await
}

/// Start the server with custom configuration
pub async fn serve_with_config(
    db: Database,
    host: &str,
    port: u16,
    static_dir: Option<&str>,
    config: ServerConfig,
) -> anyhow::Result<()> {
    if !config.require_auth {
        warn!("⚠️  Authentication disabled - do not expose to network!");
    } else if let Err(e) = bootstrap_admin(&db) {
        warn!("Failed to create initial admin: {}", e);
    }

    if let Some(collector) = config.collector.clone() {
        start_collector_scheduler(db.clone(), collector)?;
    }

    let app = create_router(db, static_dir, config);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    fn with_status(status: StatusCode, msg: &str) -> Self {
        Self {
            status,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn bad_request(msg: &str) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, msg)
    }

    pub fn unauthorized(msg: &str) -> Self {
        Self::with_status(StatusCode::UNAUTHORIZED, msg)
    }

    pub fn forbidden(msg: &str) -> Self {
        Self::with_status(StatusCode::FORBIDDEN, msg)
    }

    pub fn not_found(msg: &str) -> Self {
        Self::with_status(StatusCode::NOT_FOUND, msg)
    }

    pub fn conflict(msg: &str) -> Self {
        Self::with_status(StatusCode::CONFLICT, msg)
    }

    pub fn internal(msg: &str) -> Self {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Map core errors that are the caller's fault to 4xx; everything else is a 500
    pub fn from_core(err: gdash_core::Error) -> Self {
        use gdash_core::Error;
        match err {
            Error::InvalidData(msg) | Error::Import(msg) => Self::bad_request(&msg),
            Error::NotFound(msg) => Self::not_found(&msg),
            Error::Conflict(msg) => Self::conflict(&msg),
            Error::Auth(msg) => Self::unauthorized(&msg),
            Error::Csv(e) => Self::bad_request(&format!("Invalid CSV: {}", e)),
            Error::Json(e) => Self::bad_request(&format!("Invalid JSON: {}", e)),
            other => other.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            // Generic message to the client, full error in the log
            message: "An internal error occurred".to_string(),
            internal: Some(err),
        }
    }
}
