use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};

use crate::api::auth::AuthUser;
use crate::api::error::{ApiResult, AppError};
use crate::api::state::AppState;
use crate::api::types::*;
use crate::db::{Deleted, Feature, FeatureTag};

pub async fn list_tags(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<FeatureTag>>> {
    let tags = state.db.get_all_tags()?;
    Ok(Json(tags))
}

pub async fn list_features_by_tag(
    State(state): State<AppState>,
    Path(tag_name): Path<String>,
    Query(query): Query<IncludeDeletedQuery>,
) -> ApiResult<Json<Vec<Feature>>> {
    if tag_name.trim().is_empty() {
        return Err(AppError::bad_request("Tag name is required"));
    }
    let features = state
        .db
        .get_features_by_tag(&tag_name, Deleted::from_flag(query.include_deleted))?;
    Ok(Json(features))
}

pub async fn get_feature_tags(
    State(state): State<AppState>,
    Path(feature_id): Path<i64>,
) -> ApiResult<Json<Vec<FeatureTag>>> {
    let tags = state.db.get_feature_tags(feature_id)?;
    Ok(Json(tags))
}

/// Replaces all tags on a feature. An empty string clears them.
pub async fn replace_feature_tags(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(feature_id): Path<i64>,
    Json(req): Json<TagsRequest>,
) -> ApiResult<Json<Vec<FeatureTag>>> {
    let tags = state.db.replace_feature_tags(feature_id, auth.user_id, &req.tags)?;
    Ok(Json(tags))
}
