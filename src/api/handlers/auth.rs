use axum::{extract::State, http::StatusCode, Extension, Json};

use crate::api::auth::AuthUser;
use crate::api::error::{ApiResult, AppError};
use crate::api::state::AppState;
use crate::api::types::{AuthResponse, LoginRequest, SignupRequest};
use crate::auth::{hash_password, verify_password};
use crate::db::{CreateUser, DbError, User, DEFAULT_ROLE};

const LOGIN_FAILED: &str = "Invalid email or password";

pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let email = req.email.trim();
    let username = req.username.trim();

    if email.is_empty() || username.is_empty() {
        return Err(AppError::validation("Email and username are required"));
    }
    if req.password.is_empty() {
        return Err(AppError::validation("Password is required"));
    }

    let password_hash = hash_password(&req.password)?;
    let user = state.db.create_user(&CreateUser {
        email: email.to_string(),
        username: username.to_string(),
        password_hash,
        role: DEFAULT_ROLE.to_string(),
    })?;

    tracing::info!("New account {} ({})", user.id, user.username);
    let token = state.tokens.issue(user.id)?;
    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let credentials = match state.db.get_user_credentials_by_email(req.email.trim()) {
        Ok(c) => c,
        Err(DbError::NotFound(_)) => return Err(AppError::unauthorized(LOGIN_FAILED)),
        Err(e) => return Err(e.into()),
    };

    if !verify_password(&req.password, &credentials.password_hash) {
        tracing::debug!("Failed login for user {}", credentials.user.id);
        return Err(AppError::unauthorized(LOGIN_FAILED));
    }

    let token = state.tokens.issue(credentials.user.id)?;
    Ok(Json(AuthResponse {
        token,
        user: credentials.user,
    }))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<User>> {
    let user = state.db.get_user(auth.user_id)?;
    Ok(Json(user))
}
