use rusqlite::{Connection, OptionalExtension};

use crate::db::{Database, DbError, Deleted, parse_datetime, conflict_as, not_found_as};
use crate::db::models::{TaskAttachment, CreateAttachment};
use crate::db::tasks::load_task;

const ATTACHMENT_COLUMNS: &str =
    "id, task_id, file_name, file_size, mime_type, created_at, updated_at";

impl Database {
    pub fn create_attachment(&self, input: &CreateAttachment) -> Result<TaskAttachment, DbError> {
        self.with_conn(|conn| {
            load_task(conn, input.task_id, Deleted::Exclude)?;
            let conflict = format!("File {} is already attached", input.file_name);
            if find_attachment_by_file_name(conn, &input.file_name)?.is_some() {
                return Err(DbError::Conflict(conflict));
            }

            let now = chrono::Utc::now();
            conn.execute(
                r#"INSERT INTO task_attachments
                   (task_id, file_name, file_size, mime_type, created_at, updated_at)
                   VALUES (?, ?, ?, ?, ?, ?)"#,
                rusqlite::params![
                    input.task_id,
                    input.file_name,
                    input.file_size,
                    input.mime_type,
                    now.to_rfc3339(),
                    now.to_rfc3339(),
                ],
            )
            .map_err(conflict_as(conflict))?;

            Ok(TaskAttachment {
                id: conn.last_insert_rowid(),
                task_id: input.task_id,
                file_name: input.file_name.clone(),
                file_size: input.file_size,
                mime_type: input.mime_type.clone(),
                created_at: now,
                updated_at: now,
            })
        })
    }

    pub fn get_attachment(&self, attachment_id: i64) -> Result<TaskAttachment, DbError> {
        self.with_conn(|conn| load_attachment(conn, attachment_id))
    }

    pub fn get_attachment_by_file_name(&self, file_name: &str) -> Result<Option<TaskAttachment>, DbError> {
        self.with_conn(|conn| find_attachment_by_file_name(conn, file_name))
    }

    pub fn get_attachments_by_task(&self, task_id: i64) -> Result<Vec<TaskAttachment>, DbError> {
        self.with_conn(|conn| {
            load_task(conn, task_id, Deleted::Exclude)?;
            load_task_attachments(conn, task_id)
        })
    }

    /// Removes the record and returns it so the caller can drop the bytes.
    pub fn delete_attachment(&self, attachment_id: i64) -> Result<TaskAttachment, DbError> {
        self.with_conn(|conn| {
            let attachment = load_attachment(conn, attachment_id)?;
            conn.execute("DELETE FROM task_attachments WHERE id = ?", [attachment_id])?;
            Ok(attachment)
        })
    }
}

fn map_attachment_row(row: &rusqlite::Row) -> rusqlite::Result<TaskAttachment> {
    Ok(TaskAttachment {
        id: row.get(0)?,
        task_id: row.get(1)?,
        file_name: row.get(2)?,
        file_size: row.get(3)?,
        mime_type: row.get(4)?,
        created_at: parse_datetime(row.get(5)?),
        updated_at: parse_datetime(row.get(6)?),
    })
}

pub(crate) fn load_attachment(conn: &Connection, attachment_id: i64) -> Result<TaskAttachment, DbError> {
    conn.query_row(
        &format!("SELECT {} FROM task_attachments WHERE id = ?", ATTACHMENT_COLUMNS),
        [attachment_id],
        map_attachment_row,
    )
    .map_err(not_found_as(format!("Attachment {}", attachment_id)))
}

fn find_attachment_by_file_name(conn: &Connection, file_name: &str) -> Result<Option<TaskAttachment>, DbError> {
    let attachment = conn
        .query_row(
            &format!("SELECT {} FROM task_attachments WHERE file_name = ?", ATTACHMENT_COLUMNS),
            [file_name],
            map_attachment_row,
        )
        .optional()?;
    Ok(attachment)
}

pub(crate) fn load_task_attachments(conn: &Connection, task_id: i64) -> Result<Vec<TaskAttachment>, DbError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM task_attachments WHERE task_id = ? ORDER BY id",
        ATTACHMENT_COLUMNS
    ))?;
    let attachments = stmt
        .query_map([task_id], map_attachment_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(attachments)
}
