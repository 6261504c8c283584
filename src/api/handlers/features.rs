use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};

use crate::api::auth::AuthUser;
use crate::api::error::{ApiResult, AppError};
use crate::api::state::AppState;
use crate::api::types::*;
use crate::db::{CreateFeature, Deleted, Feature, UpdateFeature};
use crate::rules::{parse_priority, parse_status};

const TAGS_NOT_SAVED: &str = "Feature saved but failed to save tags";

pub async fn create_feature(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<CreateFeatureRequest>,
) -> ApiResult<(StatusCode, Json<FeatureResponse>)> {
    if req.title.trim().is_empty() {
        return Err(AppError::validation("Title cannot be empty"));
    }

    let status = req.status.as_deref().map(parse_status).transpose()?.unwrap_or_default();
    let priority = req.priority.as_deref().map(parse_priority).transpose()?.unwrap_or_default();

    let feature = state.db.create_feature(&CreateFeature {
        project_id: req.project_id,
        parent_feature_id: req.parent_feature_id,
        title: req.title,
        description: req.description,
        status,
        priority,
        assignee_id: req.assignee_id,
        category: req.category,
    })?;

    let response = apply_tags(&state, feature, auth.user_id, req.tags.as_deref());
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn list_features(
    State(state): State<AppState>,
    Query(query): Query<FeatureListQuery>,
) -> ApiResult<Json<Vec<Feature>>> {
    let deleted = Deleted::from_flag(query.include_deleted);
    let features = match query.tag.as_deref().filter(|t| !t.trim().is_empty()) {
        Some(tag) => state.db.get_features_by_tag(tag, deleted)?,
        None => state.db.get_all_features(deleted)?,
    };
    Ok(Json(features))
}

pub async fn get_feature(
    State(state): State<AppState>,
    Path(feature_id): Path<i64>,
    Query(query): Query<IncludeDeletedQuery>,
) -> ApiResult<Json<Feature>> {
    let feature = if query.include_deleted {
        state.db.get_feature_including_deleted(feature_id)?
    } else {
        state.db.get_feature(feature_id)?
    };
    Ok(Json(feature))
}

pub async fn update_feature(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(feature_id): Path<i64>,
    Json(req): Json<UpdateFeatureRequest>,
) -> ApiResult<Json<FeatureResponse>> {
    if req.title.trim().is_empty() {
        return Err(AppError::validation("Title cannot be empty"));
    }

    let feature = state.db.update_feature(
        feature_id,
        &UpdateFeature {
            title: req.title,
            description: req.description,
            status: parse_status(&req.status)?,
            priority: parse_priority(&req.priority)?,
            assignee_id: req.assignee_id,
            category: req.category,
            parent_feature_id: req.parent_feature_id,
        },
    )?;

    Ok(Json(apply_tags(&state, feature, auth.user_id, req.tags.as_deref())))
}

pub async fn delete_feature(
    State(state): State<AppState>,
    Path(feature_id): Path<i64>,
) -> ApiResult<Json<DeleteResponse>> {
    state.db.delete_feature(feature_id)?;
    Ok(Json(DeleteResponse {
        deleted: true,
        id: feature_id,
    }))
}

/// Direct children of a feature.
pub async fn list_child_features(
    State(state): State<AppState>,
    Path(feature_id): Path<i64>,
    Query(query): Query<IncludeDeletedQuery>,
) -> ApiResult<Json<Vec<Feature>>> {
    state.db.get_feature(feature_id)?;
    let children = state
        .db
        .get_child_features(feature_id, Deleted::from_flag(query.include_deleted))?;
    Ok(Json(children))
}

/// Writes tags after the feature itself has been saved. A failure here does
/// not undo the feature write; it is reported through `warning`.
fn apply_tags(state: &AppState, mut feature: Feature, user_id: i64, raw: Option<&str>) -> FeatureResponse {
    let Some(raw) = raw else {
        return FeatureResponse {
            feature,
            warning: None,
        };
    };

    match state.db.replace_feature_tags(feature.id, user_id, raw) {
        Ok(tags) => {
            feature.tags = tags;
            FeatureResponse {
                feature,
                warning: None,
            }
        }
        Err(e) => {
            tracing::warn!("Tags for feature {} not saved: {}", feature.id, e);
            FeatureResponse {
                feature,
                warning: Some(TAGS_NOT_SAVED.to_string()),
            }
        }
    }
}
