//! Task database operations

use rusqlite::Connection;

use crate::db::{Database, DbError, Deleted, parse_datetime, parse_optional_datetime, not_found_as};
use crate::db::attachments::load_task_attachments;
use crate::db::features::load_feature;
use crate::db::models::{Task, TaskInput};
use crate::db::projects::load_project;
use crate::db::sub_features::load_sub_feature;
use crate::rules::validate_task_type;

const TASK_COLUMNS: &str = "t.id, t.task_type, t.task_name, t.description, t.feature_id, \
     t.sub_feature_id, t.created_by_user, t.created_at, t.updated_at, t.deleted_at";

impl Database {
    /// Create a task on behalf of `created_by`.
    pub fn create_task(&self, input: &TaskInput, created_by: i64) -> Result<Task, DbError> {
        check_required(input)?;

        self.with_conn(|conn| {
            check_links(conn, input)?;

            let now = chrono::Utc::now().to_rfc3339();
            conn.execute(
                r#"INSERT INTO tasks
                   (task_type, task_name, description, feature_id, sub_feature_id,
                    created_by_user, created_at, updated_at)
                   VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
                rusqlite::params![
                    input.task_type,
                    input.task_name,
                    input.description,
                    input.feature_id,
                    input.sub_feature_id,
                    created_by,
                    now,
                    now,
                ],
            )?;

            let task_id = conn.last_insert_rowid();
            tracing::debug!("Created task {} ({})", task_id, input.task_type);
            load_task(conn, task_id, Deleted::Exclude)
        })
    }

    pub fn get_task(&self, task_id: i64) -> Result<Task, DbError> {
        self.with_conn(|conn| load_task(conn, task_id, Deleted::Exclude))
    }

    pub fn get_task_including_deleted(&self, task_id: i64) -> Result<Task, DbError> {
        self.with_conn(|conn| load_task(conn, task_id, Deleted::Include))
    }

    pub fn get_tasks_by_feature(&self, feature_id: i64, deleted: Deleted) -> Result<Vec<Task>, DbError> {
        self.with_conn(|conn| {
            query_tasks(
                conn,
                &format!(
                    "SELECT {} FROM tasks t WHERE t.feature_id = ? AND {} ORDER BY t.id",
                    TASK_COLUMNS,
                    deleted.filter("t")
                ),
                [feature_id],
            )
        })
    }

    pub fn get_tasks_by_sub_feature(
        &self,
        sub_feature_id: i64,
        deleted: Deleted,
    ) -> Result<Vec<Task>, DbError> {
        self.with_conn(|conn| {
            query_tasks(
                conn,
                &format!(
                    "SELECT {} FROM tasks t WHERE t.sub_feature_id = ? AND {} ORDER BY t.id",
                    TASK_COLUMNS,
                    deleted.filter("t")
                ),
                [sub_feature_id],
            )
        })
    }

    /// Full replacement of a live task's fields. The creator never changes.
    pub fn update_task(&self, task_id: i64, input: &TaskInput) -> Result<Task, DbError> {
        check_required(input)?;

        self.with_conn(|conn| {
            load_task(conn, task_id, Deleted::Exclude)?;
            check_links(conn, input)?;

            conn.execute(
                r#"UPDATE tasks
                   SET task_type = ?, task_name = ?, description = ?, feature_id = ?,
                       sub_feature_id = ?, updated_at = ?
                   WHERE id = ?"#,
                rusqlite::params![
                    input.task_type,
                    input.task_name,
                    input.description,
                    input.feature_id,
                    input.sub_feature_id,
                    chrono::Utc::now().to_rfc3339(),
                    task_id,
                ],
            )?;

            load_task(conn, task_id, Deleted::Exclude)
        })
    }

    /// Soft delete. Attachments and comments stay attached to the hidden task.
    pub fn delete_task(&self, task_id: i64) -> Result<(), DbError> {
        self.with_conn(|conn| {
            let affected = conn.execute(
                "UPDATE tasks SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL",
                rusqlite::params![chrono::Utc::now().to_rfc3339(), task_id],
            )?;
            if affected == 0 {
                return Err(DbError::NotFound(format!("Task {}", task_id)));
            }
            tracing::info!("Soft-deleted task {}", task_id);
            Ok(())
        })
    }
}

fn check_required(input: &TaskInput) -> Result<(), DbError> {
    if input.task_type.trim().is_empty() {
        return Err(DbError::Validation("task_type is required".to_string()));
    }
    if input.task_name.trim().is_empty() {
        return Err(DbError::Validation("task_name is required".to_string()));
    }
    Ok(())
}

/// Resolves the linked feature and sub-feature, then checks the task type
/// against the owning project. The project comes from the feature, or from
/// the sub-feature's feature when only a sub-feature is linked.
fn check_links(conn: &Connection, input: &TaskInput) -> Result<(), DbError> {
    let sub_feature = input
        .sub_feature_id
        .map(|id| load_sub_feature(conn, id))
        .transpose()?;

    let feature_id = input
        .feature_id
        .or_else(|| sub_feature.as_ref().map(|s| s.feature_id));

    let Some(feature_id) = feature_id else {
        return Ok(());
    };

    let feature = load_feature(conn, feature_id, Deleted::Exclude)?;
    let project = load_project(conn, feature.project_id)?;
    validate_task_type(project.id, &project.config, &input.task_type)?;
    Ok(())
}

fn map_task_row(row: &rusqlite::Row) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        task_type: row.get(1)?,
        task_name: row.get(2)?,
        description: row.get(3)?,
        feature_id: row.get(4)?,
        sub_feature_id: row.get(5)?,
        created_by_user: row.get(6)?,
        created_at: parse_datetime(row.get(7)?),
        updated_at: parse_datetime(row.get(8)?),
        deleted_at: parse_optional_datetime(row.get(9)?),
        attachments: Vec::new(),
    })
}

fn query_tasks<P: rusqlite::Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<Task>, DbError> {
    let mut stmt = conn.prepare(sql)?;
    let mut tasks = stmt
        .query_map(params, map_task_row)?
        .collect::<Result<Vec<_>, _>>()?;

    for task in &mut tasks {
        task.attachments = load_task_attachments(conn, task.id)?;
    }
    Ok(tasks)
}

pub(crate) fn load_task(conn: &Connection, task_id: i64, deleted: Deleted) -> Result<Task, DbError> {
    let mut task = conn
        .query_row(
            &format!(
                "SELECT {} FROM tasks t WHERE t.id = ? AND {}",
                TASK_COLUMNS,
                deleted.filter("t")
            ),
            [task_id],
            map_task_row,
        )
        .map_err(not_found_as(format!("Task {}", task_id)))?;
    task.attachments = load_task_attachments(conn, task_id)?;
    Ok(task)
}
