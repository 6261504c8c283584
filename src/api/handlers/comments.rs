use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};

use crate::api::auth::AuthUser;
use crate::api::error::{ApiResult, AppError};
use crate::api::state::AppState;
use crate::api::types::*;
use crate::db::{Comment, CreateComment};

pub async fn create_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(task_id): Path<i64>,
    Json(req): Json<CreateCommentRequest>,
) -> ApiResult<(StatusCode, Json<Comment>)> {
    if req.content.trim().is_empty() {
        return Err(AppError::validation("Comment content cannot be empty"));
    }

    let comment = state.db.create_comment(&CreateComment {
        task_id,
        attachment_id: req.attachment_id,
        user_id: auth.user_id,
        content: req.content,
    })?;

    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn list_task_comments(
    State(state): State<AppState>,
    Path(task_id): Path<i64>,
) -> ApiResult<Json<Vec<Comment>>> {
    let comments = state.db.get_comments_by_task(task_id)?;
    Ok(Json(comments))
}

pub async fn list_attachment_comments(
    State(state): State<AppState>,
    Path(attachment_id): Path<i64>,
) -> ApiResult<Json<Vec<Comment>>> {
    let comments = state.db.get_comments_by_attachment(attachment_id)?;
    Ok(Json(comments))
}

pub async fn update_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(comment_id): Path<i64>,
    Json(req): Json<UpdateCommentRequest>,
) -> ApiResult<Json<Comment>> {
    if req.content.trim().is_empty() {
        return Err(AppError::validation("Comment content cannot be empty"));
    }

    let comment = state.db.update_comment(comment_id, auth.user_id, &req.content)?;
    Ok(Json(comment))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(comment_id): Path<i64>,
) -> ApiResult<Json<DeleteResponse>> {
    state.db.delete_comment(comment_id, auth.user_id)?;
    Ok(Json(DeleteResponse {
        deleted: true,
        id: comment_id,
    }))
}
