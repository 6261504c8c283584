//! Business rules for the feature/task model.
//!
//! Everything here is a pure function over already-loaded data so it can run
//! ahead of any write and be called from handlers or repositories alike.

pub mod hierarchy;
pub mod ownership;
pub mod tags;
pub mod validation;

pub use hierarchy::*;
pub use ownership::*;
pub use tags::*;
pub use validation::*;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleViolation {
    #[error("invalid status: {0}")]
    InvalidStatus(String),

    #[error("invalid priority: {0}")]
    InvalidPriority(String),

    #[error("category '{0}' is not allowed in this project")]
    CategoryNotAllowed(String),

    #[error("task type '{0}' is not allowed in this project")]
    TaskTypeNotAllowed(String),

    /// The project config lacks the allow-list needed for a check.
    #[error("project {project_id} has no '{key}' list configured")]
    MissingAllowList { project_id: i64, key: &'static str },

    #[error("feature {feature_id} cannot have {parent_id} as parent: {reason}")]
    InvalidParent {
        feature_id: i64,
        parent_id: i64,
        reason: &'static str,
    },

    #[error("user {actor_id} does not own {resource}")]
    NotOwner { actor_id: i64, resource: String },
}
