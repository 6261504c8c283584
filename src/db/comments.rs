use rusqlite::Connection;

use crate::db::{Database, DbError, Deleted, parse_datetime, not_found_as};
use crate::db::attachments::load_attachment;
use crate::db::models::{Comment, CreateComment};
use crate::db::tasks::load_task;
use crate::db::users::find_user;
use crate::rules::ensure_owner;

const COMMENT_COLUMNS: &str =
    "id, task_id, attachment_id, user_id, content, created_at, updated_at";

impl Database {
    pub fn create_comment(&self, comment: &CreateComment) -> Result<Comment, DbError> {
        self.with_conn(|conn| {
            load_task(conn, comment.task_id, Deleted::Exclude)?;

            if let Some(attachment_id) = comment.attachment_id {
                let attachment = load_attachment(conn, attachment_id)?;
                if attachment.task_id != comment.task_id {
                    return Err(DbError::Validation(format!(
                        "Attachment {} does not belong to task {}",
                        attachment_id, comment.task_id
                    )));
                }
            }

            let now = chrono::Utc::now().to_rfc3339();
            conn.execute(
                r#"INSERT INTO comments
                   (task_id, attachment_id, user_id, content, created_at, updated_at)
                   VALUES (?, ?, ?, ?, ?, ?)"#,
                rusqlite::params![
                    comment.task_id,
                    comment.attachment_id,
                    comment.user_id,
                    comment.content,
                    now,
                    now,
                ],
            )?;

            load_comment(conn, conn.last_insert_rowid())
        })
    }

    pub fn get_comment(&self, comment_id: i64) -> Result<Comment, DbError> {
        self.with_conn(|conn| load_comment(conn, comment_id))
    }

    /// Comments on a task, newest first.
    pub fn get_comments_by_task(&self, task_id: i64) -> Result<Vec<Comment>, DbError> {
        self.with_conn(|conn| {
            load_task(conn, task_id, Deleted::Exclude)?;
            query_comments(
                conn,
                &format!(
                    "SELECT {} FROM comments WHERE task_id = ? ORDER BY created_at DESC, id DESC",
                    COMMENT_COLUMNS
                ),
                task_id,
            )
        })
    }

    pub fn get_comments_by_attachment(&self, attachment_id: i64) -> Result<Vec<Comment>, DbError> {
        self.with_conn(|conn| {
            load_attachment(conn, attachment_id)?;
            query_comments(
                conn,
                &format!(
                    "SELECT {} FROM comments WHERE attachment_id = ? ORDER BY created_at DESC, id DESC",
                    COMMENT_COLUMNS
                ),
                attachment_id,
            )
        })
    }

    /// Replaces the content of a comment. Only its author may do so.
    pub fn update_comment(&self, comment_id: i64, actor_id: i64, content: &str) -> Result<Comment, DbError> {
        self.with_conn(|conn| {
            let existing = load_comment(conn, comment_id)?;
            ensure_owner(actor_id, existing.user_id, &format!("comment {}", comment_id))?;

            conn.execute(
                "UPDATE comments SET content = ?, updated_at = ? WHERE id = ?",
                rusqlite::params![content, chrono::Utc::now().to_rfc3339(), comment_id],
            )?;
            load_comment(conn, comment_id)
        })
    }

    pub fn delete_comment(&self, comment_id: i64, actor_id: i64) -> Result<(), DbError> {
        self.with_conn(|conn| {
            let existing = load_comment(conn, comment_id)?;
            ensure_owner(actor_id, existing.user_id, &format!("comment {}", comment_id))?;

            conn.execute("DELETE FROM comments WHERE id = ?", [comment_id])?;
            Ok(())
        })
    }
}

fn map_comment_row(row: &rusqlite::Row) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        task_id: row.get(1)?,
        attachment_id: row.get(2)?,
        user_id: row.get(3)?,
        content: row.get(4)?,
        created_at: parse_datetime(row.get(5)?),
        updated_at: parse_datetime(row.get(6)?),
        user: None,
        attachment: None,
    })
}

fn hydrate_comment(conn: &Connection, comment: &mut Comment) -> Result<(), DbError> {
    comment.user = find_user(conn, comment.user_id)?;
    comment.attachment = match comment.attachment_id {
        Some(id) => Some(load_attachment(conn, id)?),
        None => None,
    };
    Ok(())
}

fn query_comments(conn: &Connection, sql: &str, key: i64) -> Result<Vec<Comment>, DbError> {
    let mut stmt = conn.prepare(sql)?;
    let mut comments = stmt
        .query_map([key], map_comment_row)?
        .collect::<Result<Vec<_>, _>>()?;

    for comment in &mut comments {
        hydrate_comment(conn, comment)?;
    }
    Ok(comments)
}

fn load_comment(conn: &Connection, comment_id: i64) -> Result<Comment, DbError> {
    let mut comment = conn
        .query_row(
            &format!("SELECT {} FROM comments WHERE id = ?", COMMENT_COLUMNS),
            [comment_id],
            map_comment_row,
        )
        .map_err(not_found_as(format!("Comment {}", comment_id)))?;
    hydrate_comment(conn, &mut comment)?;
    Ok(comment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::CreateAttachment;
    use crate::db::test_support::*;

    fn comment(task_id: i64, user_id: i64, content: &str) -> CreateComment {
        CreateComment {
            task_id,
            attachment_id: None,
            user_id,
            content: content.to_string(),
        }
    }

    fn attach(db: &Database, task_id: i64) -> i64 {
        db.create_attachment(&CreateAttachment {
            task_id,
            file_name: format!("task_{}_f.txt", task_id),
            file_size: 1,
            mime_type: "text/plain".to_string(),
        })
        .unwrap()
        .id
    }

    #[test]
    fn create_and_list_newest_first() {
        let db = create_test_db();
        let user = setup_user(&db, "author");
        let task = db.create_task(&task_input(None, "Dev"), user.id).unwrap();

        let first = db.create_comment(&comment(task.id, user.id, "first")).unwrap();
        let second = db.create_comment(&comment(task.id, user.id, "second")).unwrap();

        assert_eq!(first.user.as_ref().map(|u| u.id), Some(user.id));
        let listed = db.get_comments_by_task(task.id).unwrap();
        assert_eq!(
            listed.iter().map(|c| c.id).collect::<Vec<_>>(),
            vec![second.id, first.id]
        );
    }

    #[test]
    fn attachment_must_belong_to_task() {
        let db = create_test_db();
        let user = setup_user(&db, "author");
        let task = db.create_task(&task_input(None, "Dev"), user.id).unwrap();
        let other = db.create_task(&task_input(None, "Dev"), user.id).unwrap();
        let foreign = attach(&db, other.id);
        let own = attach(&db, task.id);

        let mut input = comment(task.id, user.id, "look");
        input.attachment_id = Some(foreign);
        assert!(matches!(db.create_comment(&input), Err(DbError::Validation(_))));

        input.attachment_id = Some(own);
        let created = db.create_comment(&input).unwrap();
        assert_eq!(created.attachment.map(|a| a.id), Some(own));
        assert_eq!(db.get_comments_by_attachment(own).unwrap().len(), 1);
        assert!(db.get_comments_by_attachment(foreign).unwrap().is_empty());
    }

    #[test]
    fn comment_on_missing_task_not_found() {
        let db = create_test_db();
        let user = setup_user(&db, "author");
        assert!(matches!(
            db.create_comment(&comment(9, user.id, "x")),
            Err(DbError::NotFound(_))
        ));
    }

    #[test]
    fn only_author_can_edit_or_delete() {
        let db = create_test_db();
        let author = setup_user(&db, "author");
        let intruder = setup_user(&db, "intruder");
        let task = db.create_task(&task_input(None, "Dev"), author.id).unwrap();
        let created = db.create_comment(&comment(task.id, author.id, "mine")).unwrap();

        assert!(matches!(
            db.delete_comment(created.id, intruder.id),
            Err(DbError::Forbidden(_))
        ));
        assert!(matches!(
            db.update_comment(created.id, intruder.id, "hacked"),
            Err(DbError::Forbidden(_))
        ));
        assert_eq!(db.get_comment(created.id).unwrap().content, "mine");

        assert!(matches!(
            db.delete_comment(created.id + 100, intruder.id),
            Err(DbError::NotFound(_))
        ));

        let edited = db.update_comment(created.id, author.id, "edited").unwrap();
        assert_eq!(edited.content, "edited");
        db.delete_comment(created.id, author.id).unwrap();
        assert!(matches!(db.get_comment(created.id), Err(DbError::NotFound(_))));
    }
}
