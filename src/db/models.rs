use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ===== Users =====

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A user row together with its stored password hash. Never serialized.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct CreateUser {
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub role: String,
}

pub const DEFAULT_ROLE: &str = "member";

// ===== Projects =====

/// Per-project allow-lists. A `None` list means the project was configured
/// without that key, which is an operator error when a value has to be checked.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_types: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_category: Option<Vec<String>>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            task_types: Some(
                ["UI", "Dev", "Db", "Backend"].map(String::from).to_vec(),
            ),
            feature_category: Some(
                ["Auth", "Payment", "Tags", "Tasks", "Features"]
                    .map(String::from)
                    .to_vec(),
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub owner_id: i64,
    pub config: ProjectConfig,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub owner: Option<User>,
}

#[derive(Debug, Clone)]
pub struct CreateProject {
    pub name: String,
    pub description: String,
    pub owner_id: i64,
    pub config: Option<ProjectConfig>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateProject {
    pub name: Option<String>,
    pub description: Option<String>,
    pub config: Option<ProjectConfig>,
}

// ===== Features =====

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FeatureStatus {
    #[default]
    Todo,
    InProgress,
    Done,
}

impl FeatureStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureStatus::Todo => "todo",
            FeatureStatus::InProgress => "in_progress",
            FeatureStatus::Done => "done",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "todo" => Some(FeatureStatus::Todo),
            "in_progress" => Some(FeatureStatus::InProgress),
            "done" => Some(FeatureStatus::Done),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FeaturePriority {
    Low,
    #[default]
    Medium,
    High,
}

impl FeaturePriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeaturePriority::Low => "low",
            FeaturePriority::Medium => "medium",
            FeaturePriority::High => "high",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(FeaturePriority::Low),
            "medium" => Some(FeaturePriority::Medium),
            "high" => Some(FeaturePriority::High),
            _ => None,
        }
    }
}

/// Assignee id meaning "nobody".
pub const UNASSIGNED: i64 = 0;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureTag {
    pub tag_name: String,
    pub feature_id: i64,
    pub created_by_user: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feature {
    pub id: i64,
    pub project_id: i64,
    pub parent_feature_id: Option<i64>,
    pub title: String,
    pub description: String,
    pub status: FeatureStatus,
    pub priority: FeaturePriority,
    pub assignee_id: i64,
    pub category: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    pub parent_feature: Option<FeatureSummary>,
    pub assignee: Option<User>,
    pub tags: Vec<FeatureTag>,
}

/// The parent as embedded in a feature response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureSummary {
    pub id: i64,
    pub title: String,
    pub status: FeatureStatus,
}

#[derive(Debug, Clone)]
pub struct CreateFeature {
    pub project_id: i64,
    pub parent_feature_id: Option<i64>,
    pub title: String,
    pub description: String,
    pub status: FeatureStatus,
    pub priority: FeaturePriority,
    pub assignee_id: i64,
    pub category: String,
}

/// Full replacement of a feature's editable fields. `parent_feature_id` is
/// only applied when present.
#[derive(Debug, Clone)]
pub struct UpdateFeature {
    pub title: String,
    pub description: String,
    pub status: FeatureStatus,
    pub priority: FeaturePriority,
    pub assignee_id: i64,
    pub category: String,
    pub parent_feature_id: Option<i64>,
}

// ===== Sub-features =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubFeature {
    pub id: i64,
    pub feature_id: i64,
    pub title: String,
    pub description: String,
    pub status: String,
    pub priority: String,
    pub assignee_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct SubFeatureInput {
    pub feature_id: i64,
    pub title: String,
    pub description: String,
    pub status: String,
    pub priority: String,
    pub assignee_id: i64,
}

// ===== Tasks =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub task_type: String,
    pub task_name: String,
    pub description: String,
    pub feature_id: Option<i64>,
    pub sub_feature_id: Option<i64>,
    pub created_by_user: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    pub attachments: Vec<TaskAttachment>,
}

#[derive(Debug, Clone)]
pub struct TaskInput {
    pub task_type: String,
    pub task_name: String,
    pub description: String,
    pub feature_id: Option<i64>,
    pub sub_feature_id: Option<i64>,
}

// ===== Attachments =====

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskAttachment {
    pub id: i64,
    pub task_id: i64,
    pub file_name: String,
    pub file_size: i64,
    pub mime_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateAttachment {
    pub task_id: i64,
    pub file_name: String,
    pub file_size: i64,
    pub mime_type: String,
}

/// Name under which an uploaded file is stored.
pub fn attachment_file_name(task_id: i64, original_name: &str) -> String {
    format!("task_{}_{}", task_id, original_name)
}

// ===== Comments =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub task_id: i64,
    pub attachment_id: Option<i64>,
    pub user_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user: Option<User>,
    pub attachment: Option<TaskAttachment>,
}

#[derive(Debug, Clone)]
pub struct CreateComment {
    pub task_id: i64,
    pub attachment_id: Option<i64>,
    pub user_id: i64,
    pub content: String,
}
