use super::RuleViolation;
use crate::db::models::{FeaturePriority, FeatureStatus, ProjectConfig};

pub fn validate_status(status: &str) -> bool {
    FeatureStatus::parse(status).is_some()
}

pub fn validate_priority(priority: &str) -> bool {
    FeaturePriority::parse(priority).is_some()
}

pub fn parse_status(status: &str) -> Result<FeatureStatus, RuleViolation> {
    FeatureStatus::parse(status).ok_or_else(|| RuleViolation::InvalidStatus(status.to_string()))
}

pub fn parse_priority(priority: &str) -> Result<FeaturePriority, RuleViolation> {
    FeaturePriority::parse(priority)
        .ok_or_else(|| RuleViolation::InvalidPriority(priority.to_string()))
}

/// Checks a feature category against the project's `feature_category` list.
pub fn validate_category(
    project_id: i64,
    config: &ProjectConfig,
    category: &str,
) -> Result<(), RuleViolation> {
    let allowed = config
        .feature_category
        .as_deref()
        .ok_or(RuleViolation::MissingAllowList {
            project_id,
            key: "feature_category",
        })?;

    if allowed.iter().any(|c| c == category) {
        Ok(())
    } else {
        Err(RuleViolation::CategoryNotAllowed(category.to_string()))
    }
}

/// Checks a task type against the project's `task_types` list.
pub fn validate_task_type(
    project_id: i64,
    config: &ProjectConfig,
    task_type: &str,
) -> Result<(), RuleViolation> {
    let allowed = config
        .task_types
        .as_deref()
        .ok_or(RuleViolation::MissingAllowList {
            project_id,
            key: "task_types",
        })?;

    if allowed.iter().any(|t| t == task_type) {
        Ok(())
    } else {
        Err(RuleViolation::TaskTypeNotAllowed(task_type.to_string()))
    }
}
