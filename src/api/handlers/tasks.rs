use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};

use crate::api::auth::AuthUser;
use crate::api::error::{ApiResult, AppError};
use crate::api::state::AppState;
use crate::api::types::*;
use crate::db::{Deleted, Task, TaskInput};

fn to_input(req: TaskRequest) -> TaskInput {
    TaskInput {
        task_type: req.task_type,
        task_name: req.task_name,
        description: req.description,
        feature_id: req.feature_id,
        sub_feature_id: req.sub_feature_id,
    }
}

pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<TaskRequest>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    let task = state.db.create_task(&to_input(req), auth.user_id)?;
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn get_task(
    State(state): State<AppState>,
    Path(task_id): Path<i64>,
    Query(query): Query<IncludeDeletedQuery>,
) -> ApiResult<Json<Task>> {
    let task = if query.include_deleted {
        state.db.get_task_including_deleted(task_id)?
    } else {
        state.db.get_task(task_id)?
    };
    Ok(Json(task))
}

pub async fn update_task(
    State(state): State<AppState>,
    Path(task_id): Path<i64>,
    Json(req): Json<TaskRequest>,
) -> ApiResult<Json<Task>> {
    let task = state.db.update_task(task_id, &to_input(req))?;
    Ok(Json(task))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Path(task_id): Path<i64>,
) -> ApiResult<Json<DeleteResponse>> {
    state.db.delete_task(task_id)?;
    Ok(Json(DeleteResponse {
        deleted: true,
        id: task_id,
    }))
}

// ===== Tasks nested under a feature =====

pub async fn list_feature_tasks(
    State(state): State<AppState>,
    Path(feature_id): Path<i64>,
    Query(query): Query<IncludeDeletedQuery>,
) -> ApiResult<Json<Vec<Task>>> {
    state.db.get_feature(feature_id)?;
    let tasks = state
        .db
        .get_tasks_by_feature(feature_id, Deleted::from_flag(query.include_deleted))?;
    Ok(Json(tasks))
}

pub async fn create_feature_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(feature_id): Path<i64>,
    Json(req): Json<TaskRequest>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    let mut input = to_input(req);
    input.feature_id = Some(feature_id);

    let task = state.db.create_task(&input, auth.user_id)?;
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn update_feature_task(
    State(state): State<AppState>,
    Path((feature_id, task_id)): Path<(i64, i64)>,
    Json(req): Json<TaskRequest>,
) -> ApiResult<Json<Task>> {
    ensure_task_in_feature(&state, feature_id, task_id)?;

    let mut input = to_input(req);
    input.feature_id = Some(feature_id);

    let task = state.db.update_task(task_id, &input)?;
    Ok(Json(task))
}

pub async fn delete_feature_task(
    State(state): State<AppState>,
    Path((feature_id, task_id)): Path<(i64, i64)>,
) -> ApiResult<Json<DeleteResponse>> {
    ensure_task_in_feature(&state, feature_id, task_id)?;
    state.db.delete_task(task_id)?;
    Ok(Json(DeleteResponse {
        deleted: true,
        id: task_id,
    }))
}

fn ensure_task_in_feature(state: &AppState, feature_id: i64, task_id: i64) -> ApiResult<()> {
    state.db.get_feature(feature_id)?;
    let task = state.db.get_task(task_id)?;
    if task.feature_id != Some(feature_id) {
        return Err(AppError::not_found(&format!(
            "Task {} in feature {}",
            task_id, feature_id
        )));
    }
    Ok(())
}
