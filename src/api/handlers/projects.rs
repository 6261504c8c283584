use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};

use crate::api::auth::AuthUser;
use crate::api::error::{ApiResult, AppError};
use crate::api::state::AppState;
use crate::api::types::*;
use crate::db::{CreateProject, Deleted, Feature, Project, UpdateProject};

pub async fn create_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<CreateProjectRequest>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    if req.name.trim().is_empty() {
        return Err(AppError::validation("Project name cannot be empty"));
    }

    let project = state.db.create_project(&CreateProject {
        name: req.name,
        description: req.description,
        owner_id: auth.user_id,
        config: req.config,
    })?;

    Ok((StatusCode::CREATED, Json(project)))
}

/// Projects owned by the caller.
pub async fn list_projects(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<Vec<Project>>> {
    let projects = state.db.get_projects_by_owner(auth.user_id)?;
    Ok(Json(projects))
}

pub async fn list_projects_by_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> ApiResult<Json<Vec<Project>>> {
    state.db.get_user(user_id)?;
    let projects = state.db.get_projects_by_owner(user_id)?;
    Ok(Json(projects))
}

pub async fn get_project(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
) -> ApiResult<Json<Project>> {
    let project = state.db.get_project(project_id)?;
    Ok(Json(project))
}

pub async fn update_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(project_id): Path<i64>,
    Json(req): Json<UpdateProjectRequest>,
) -> ApiResult<Json<Project>> {
    if let Some(ref name) = req.name {
        if name.trim().is_empty() {
            return Err(AppError::validation("Project name cannot be empty"));
        }
    }

    let project = state.db.update_project(
        project_id,
        auth.user_id,
        &UpdateProject {
            name: req.name,
            description: req.description,
            config: req.config,
        },
    )?;
    Ok(Json(project))
}

pub async fn delete_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(project_id): Path<i64>,
) -> ApiResult<Json<DeleteResponse>> {
    state.db.delete_project(project_id, auth.user_id)?;
    Ok(Json(DeleteResponse {
        deleted: true,
        id: project_id,
    }))
}

pub async fn list_project_features(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
    Query(query): Query<ProjectFeaturesQuery>,
) -> ApiResult<Json<Vec<Feature>>> {
    state.db.get_project(project_id)?;

    let deleted = Deleted::from_flag(query.include_deleted);
    let features = if query.root_only {
        state.db.get_root_features(project_id, deleted)?
    } else {
        state.db.get_features_by_project(project_id, deleted)?
    };
    Ok(Json(features))
}
