use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::api::error::{ApiResult, AppError};
use crate::api::state::AppState;
use crate::api::types::*;
use crate::db::{Deleted, SubFeature, SubFeatureInput, Task};

fn to_input(req: SubFeatureRequest) -> SubFeatureInput {
    SubFeatureInput {
        feature_id: req.feature_id,
        title: req.title,
        description: req.description,
        status: req.status,
        priority: req.priority,
        assignee_id: req.assignee_id,
    }
}

pub async fn create_sub_feature(
    State(state): State<AppState>,
    Json(req): Json<SubFeatureRequest>,
) -> ApiResult<(StatusCode, Json<SubFeature>)> {
    let sub_feature = state.db.create_sub_feature(&to_input(req))?;
    Ok((StatusCode::CREATED, Json(sub_feature)))
}

pub async fn list_sub_features(
    State(state): State<AppState>,
    Query(query): Query<SubFeatureQuery>,
) -> ApiResult<Json<Vec<SubFeature>>> {
    let feature_id = query
        .feature_id
        .ok_or_else(|| AppError::validation("feature_id query parameter is required"))?;

    state.db.get_feature(feature_id)?;
    let sub_features = state.db.get_sub_features_by_feature(feature_id)?;
    Ok(Json(sub_features))
}

pub async fn update_sub_feature(
    State(state): State<AppState>,
    Path(sub_feature_id): Path<i64>,
    Json(req): Json<SubFeatureRequest>,
) -> ApiResult<Json<SubFeature>> {
    let sub_feature = state.db.update_sub_feature(sub_feature_id, &to_input(req))?;
    Ok(Json(sub_feature))
}

pub async fn list_sub_feature_tasks(
    State(state): State<AppState>,
    Path(sub_feature_id): Path<i64>,
    Query(query): Query<IncludeDeletedQuery>,
) -> ApiResult<Json<Vec<Task>>> {
    state.db.get_sub_feature(sub_feature_id)?;
    let tasks = state
        .db
        .get_tasks_by_sub_feature(sub_feature_id, Deleted::from_flag(query.include_deleted))?;
    Ok(Json(tasks))
}
