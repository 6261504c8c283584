pub mod schema;
pub mod models;
mod users;
mod projects;
mod features;
mod tags;
mod sub_features;
mod tasks;
mod attachments;
mod comments;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use rusqlite::Connection;
use thiserror::Error;

use crate::rules::RuleViolation;

pub use models::*;
use schema::{CREATE_TABLES, SCHEMA_VERSION};

#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Lock error: {0}")]
    Lock(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Data that only an operator can fix, such as a project config missing
    /// an allow-list.
    #[error("Misconfigured: {0}")]
    Misconfigured(String),
}

impl From<RuleViolation> for DbError {
    fn from(violation: RuleViolation) -> Self {
        match violation {
            RuleViolation::MissingAllowList { .. } => DbError::Misconfigured(violation.to_string()),
            RuleViolation::NotOwner { .. } => DbError::Forbidden(violation.to_string()),
            _ => DbError::Validation(violation.to_string()),
        }
    }
}

/// Whether reads of soft-deletable records (features, tasks) should include
/// rows that carry a `deleted_at` marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Deleted {
    #[default]
    Exclude,
    Include,
}

impl Deleted {
    pub fn from_flag(include_deleted: bool) -> Self {
        if include_deleted {
            Deleted::Include
        } else {
            Deleted::Exclude
        }
    }

    /// SQL predicate to AND into a WHERE clause for the given table alias.
    pub(crate) fn filter(self, alias: &str) -> String {
        match self {
            Deleted::Exclude => format!("{}.deleted_at IS NULL", alias),
            Deleted::Include => "1 = 1".to_string(),
        }
    }
}

#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(db_path: PathBuf) -> Result<Self, DbError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|_e| DbError::Validation(format!("Failed to create directory: {:?}", parent)))?;
        }

        let conn = Connection::open(&db_path)?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        let _: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.migrate()?;

        tracing::info!("Database opened at {:?}", db_path);
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), DbError> {
        let conn = self.conn.lock()
            .map_err(|e| DbError::Lock(e.to_string()))?;

        let current_version: i32 = conn
            .query_row(
                "SELECT version FROM schema_version ORDER BY version DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);

        if current_version < SCHEMA_VERSION {
            tracing::info!(
                "Migrating database from version {} to {}",
                current_version,
                SCHEMA_VERSION
            );

            conn.execute_batch(CREATE_TABLES)?;

            conn.execute(
                "INSERT OR REPLACE INTO schema_version (version) VALUES (?)",
                [SCHEMA_VERSION],
            )?;

            tracing::info!("Database migration complete");
        }

        Ok(())
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T, DbError>
    where
        F: FnOnce(&Connection) -> Result<T, DbError>,
    {
        let conn = self.conn.lock()
            .map_err(|e| DbError::Lock(e.to_string()))?;
        f(&conn)
    }

    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T, DbError>
    where
        F: FnOnce(&mut Connection) -> Result<T, DbError>,
    {
        let mut conn = self.conn.lock()
            .map_err(|e| DbError::Lock(e.to_string()))?;
        f(&mut conn)
    }
}

pub(crate) fn parse_datetime(s: String) -> chrono::DateTime<chrono::Utc> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .unwrap_or_else(|_| chrono::Utc::now())
}

pub(crate) fn parse_optional_datetime(s: Option<String>) -> Option<chrono::DateTime<chrono::Utc>> {
    s.map(parse_datetime)
}

/// Maps "no rows" onto `DbError::NotFound` with the given description.
pub(crate) fn not_found_as(what: impl Into<String>) -> impl FnOnce(rusqlite::Error) -> DbError {
    let what = what.into();
    move |e| match e {
        rusqlite::Error::QueryReturnedNoRows => DbError::NotFound(what),
        other => DbError::Sqlite(other),
    }
}

/// Maps unique-constraint failures onto `DbError::Conflict`.
pub(crate) fn conflict_as(what: impl Into<String>) -> impl FnOnce(rusqlite::Error) -> DbError {
    let what = what.into();
    move |e| match e {
        rusqlite::Error::SqliteFailure(ref err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            DbError::Conflict(what)
        }
        other => DbError::Sqlite(other),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn create_test_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    pub fn setup_user(db: &Database, name: &str) -> User {
        db.create_user(&CreateUser {
            email: format!("{}@example.com", name),
            username: name.to_string(),
            password_hash: "not-a-real-hash".to_string(),
            role: DEFAULT_ROLE.to_string(),
        })
        .unwrap()
    }

    pub fn setup_project(db: &Database, owner_id: i64) -> Project {
        db.create_project(&CreateProject {
            name: "Project".to_string(),
            description: String::new(),
            owner_id,
            config: None,
        })
        .unwrap()
    }

    pub fn feature_input(project_id: i64, title: &str) -> CreateFeature {
        CreateFeature {
            project_id,
            parent_feature_id: None,
            title: title.to_string(),
            description: String::new(),
            status: FeatureStatus::Todo,
            priority: FeaturePriority::Medium,
            assignee_id: UNASSIGNED,
            category: String::new(),
        }
    }

    pub fn setup_feature(db: &Database, project_id: i64, title: &str) -> Feature {
        db.create_feature(&feature_input(project_id, title)).unwrap()
    }

    pub fn task_input(feature_id: Option<i64>, task_type: &str) -> TaskInput {
        TaskInput {
            task_type: task_type.to_string(),
            task_name: "Task".to_string(),
            description: String::new(),
            feature_id,
            sub_feature_id: None,
        }
    }
}
