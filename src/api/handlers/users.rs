use axum::{
    extract::{Path, State},
    Json,
};

use crate::api::error::ApiResult;
use crate::api::state::AppState;
use crate::db::User;

pub async fn list_users(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<User>>> {
    let users = state.db.get_users()?;
    Ok(Json(users))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> ApiResult<Json<User>> {
    let user = state.db.get_user(user_id)?;
    Ok(Json(user))
}
