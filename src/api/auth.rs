use axum::{
    Extension, Json,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{ApiError, AppState};
use crate::auth::{self, AuthError};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub username: String,
    pub token: String,
}

#[derive(Serialize)]
pub struct MeResponse {
    pub username: String,
}

#[derive(Serialize)]
pub struct UserSummary {
    pub username: String,
    pub id: i32,
}

#[derive(Serialize)]
pub struct DetailResponse {
    pub detail: String,
}

/// Authenticated principal attached to the request by the middleware.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub username: String,
    pub token: String,
}

// ============================================================================
// Middleware
// ============================================================================

/// Token authentication middleware: parses `Authorization: Token <value>`,
/// resolves it through the token store and verifies the user row still
/// exists. On success the principal and the raw token are attached to the
/// request.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = auth::parse_token_header(request.headers())?;

    let username = state
        .tokens()
        .lookup(&token)
        .await
        .ok_or(AuthError::UnknownToken)?;

    let user = state
        .store()
        .get_user_by_username(&username)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to get user: {e}")))?
        .ok_or(AuthError::UnknownUser)?;

    tracing::Span::current().record("user_id", user.username.as_str());

    request.extensions_mut().insert(AuthUser {
        username: user.username,
        token,
    });

    Ok(next.run(request).await)
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/login/
/// Authenticate with username and password, returns a fresh token on success.
/// All previously issued tokens for the user are revoked first.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    if payload.username.is_empty() || payload.password.is_empty() {
        return Err(ApiError::validation("username and password are required"));
    }

    let is_valid = state
        .store()
        .verify_user_password(&payload.username, &payload.password)
        .await
        .map_err(|e| ApiError::internal(format!("Authentication error: {e}")))?;

    if !is_valid {
        return Err(ApiError::Unauthorized(
            "Invalid username or password".to_string(),
        ));
    }

    let user = state
        .store()
        .get_user_by_username(&payload.username)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to get user: {e}")))?
        .ok_or_else(|| ApiError::Unauthorized("Invalid username or password".to_string()))?;

    if !user.enabled {
        return Err(ApiError::Forbidden("User is not active".to_string()));
    }

    // Single active session set per login: clear everything the user held
    // before handing out the new token.
    state.tokens().revoke_all_for(&user.username).await;
    let token = state.tokens().issue(&user.username).await;

    tracing::info!("User logged in: {}", user.username);

    Ok(Json(LoginResponse {
        username: user.username,
        token,
    }))
}

/// POST /auth/logout/
/// Revoke the presented token. The raw token is re-extracted from the
/// header rather than taken from the adapter. Always succeeds, even if the
/// token was already invalid.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
    Extension(user): Extension<AuthUser>,
) -> impl IntoResponse {
    if let Ok(token) = auth::parse_token_header(&headers) {
        state.tokens().revoke(&token).await;
    }

    tracing::info!("User logged out: {}", user.username);

    (
        StatusCode::OK,
        Json(DetailResponse {
            detail: "logged out".to_string(),
        }),
    )
}

/// GET /auth/me/
/// Session introspection: the resolved username.
pub async fn me(Extension(user): Extension<AuthUser>) -> Json<MeResponse> {
    Json(MeResponse {
        username: user.username,
    })
}

/// GET /users/
/// List all user accounts.
pub async fn list_users(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<UserSummary>>, ApiError> {
    let users = state
        .store()
        .list_users()
        .await
        .map_err(|e| ApiError::internal(format!("Failed to list users: {e}")))?;

    Ok(Json(
        users
            .into_iter()
            .map(|u| UserSummary {
                username: u.username,
                id: u.id,
            })
            .collect(),
    ))
}
