use serde::{Deserialize, Serialize};
use crate::db::{Feature, ProjectConfig, User};

// ===== Auth Types =====

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

// ===== Project Types =====

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub config: Option<ProjectConfig>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProjectRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub config: Option<ProjectConfig>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProjectFeaturesQuery {
    #[serde(default)]
    pub root_only: bool,
    #[serde(default)]
    pub include_deleted: bool,
}

// ===== Feature Types =====

#[derive(Debug, Deserialize)]
pub struct CreateFeatureRequest {
    pub project_id: i64,
    pub parent_feature_id: Option<i64>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: Option<String>,
    pub priority: Option<String>,
    #[serde(default)]
    pub assignee_id: i64,
    #[serde(default)]
    pub category: String,
    /// Free-text tags, separated by commas, spaces or semicolons.
    #[serde(alias = "tags_input")]
    pub tags: Option<String>,
}

/// Full replacement of a feature. `parent_feature_id` and `tags` are left
/// untouched when absent.
#[derive(Debug, Deserialize)]
pub struct UpdateFeatureRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub priority: String,
    #[serde(default)]
    pub assignee_id: i64,
    #[serde(default)]
    pub category: String,
    pub parent_feature_id: Option<i64>,
    #[serde(alias = "tags_input")]
    pub tags: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FeatureResponse {
    #[serde(flatten)]
    pub feature: Feature,
    /// Present when the feature was written but its tags were not.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FeatureListQuery {
    pub tag: Option<String>,
    #[serde(default)]
    pub include_deleted: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct IncludeDeletedQuery {
    #[serde(default)]
    pub include_deleted: bool,
}

#[derive(Debug, Deserialize)]
pub struct TagsRequest {
    #[serde(default)]
    pub tags: String,
}

// ===== Sub-feature Types =====

#[derive(Debug, Deserialize)]
pub struct SubFeatureRequest {
    pub feature_id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub priority: String,
    #[serde(default)]
    pub assignee_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct SubFeatureQuery {
    pub feature_id: Option<i64>,
}

// ===== Task Types =====

#[derive(Debug, Deserialize)]
pub struct TaskRequest {
    pub task_type: String,
    pub task_name: String,
    #[serde(default)]
    pub description: String,
    pub feature_id: Option<i64>,
    pub sub_feature_id: Option<i64>,
}

// ===== Comment Types =====

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub content: String,
    pub attachment_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCommentRequest {
    pub content: String,
}

// ===== Common Types =====

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
    pub id: i64,
}
