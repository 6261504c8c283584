use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Request},
    middleware::Next,
    response::Response,
};

use super::error::AppError;
use super::state::AppState;
use crate::db::DbError;

/// The authenticated caller, placed in request extensions by
/// [`auth_middleware`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: i64,
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    let Some(token) = token else {
        tracing::warn!(
            "Missing bearer token for {} {}",
            request.method(),
            request.uri().path()
        );
        return Err(AppError::unauthorized("Authorization header required"));
    };

    let claims = state.tokens.verify(token).map_err(|e| {
        tracing::debug!("Rejected token: {}", e);
        tracing::warn!(
            "Invalid token for {} {}",
            request.method(),
            request.uri().path()
        );
        AppError::from(e)
    })?;

    // A valid signature is not enough once the account is gone.
    match state.db.get_user(claims.user_id) {
        Ok(_) => {}
        Err(DbError::NotFound(_)) => {
            return Err(AppError::unauthorized("User no longer exists"));
        }
        Err(e) => return Err(e.into()),
    }

    request.extensions_mut().insert(AuthUser {
        user_id: claims.user_id,
    });
    Ok(next.run(request).await)
}

pub fn generate_token() -> String {
    use rand::Rng;

    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    const TOKEN_LENGTH: usize = 32;

    let mut rng = rand::thread_rng();
    (0..TOKEN_LENGTH)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}
