use rusqlite::{Connection, OptionalExtension};

use crate::db::{Database, DbError, parse_datetime, conflict_as, not_found_as};
use crate::db::models::{User, UserCredentials, CreateUser};

const USER_COLUMNS: &str = "id, email, username, role, created_at, updated_at";

impl Database {
    pub fn create_user(&self, input: &CreateUser) -> Result<User, DbError> {
        self.with_conn(|conn| {
            let now = chrono::Utc::now();

            conn.execute(
                r#"INSERT INTO users (email, username, password_hash, role, created_at, updated_at)
                   VALUES (?, ?, ?, ?, ?, ?)"#,
                rusqlite::params![
                    input.email,
                    input.username,
                    input.password_hash,
                    input.role,
                    now.to_rfc3339(),
                    now.to_rfc3339(),
                ],
            )
            .map_err(conflict_as("A user with this email or username already exists"))?;

            Ok(User {
                id: conn.last_insert_rowid(),
                email: input.email.clone(),
                username: input.username.clone(),
                role: input.role.clone(),
                created_at: now,
                updated_at: now,
            })
        })
    }

    pub fn get_user(&self, user_id: i64) -> Result<User, DbError> {
        self.with_conn(|conn| {
            find_user(conn, user_id)?.ok_or_else(|| DbError::NotFound(format!("User {}", user_id)))
        })
    }

    pub fn get_users(&self) -> Result<Vec<User>, DbError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM users ORDER BY id",
                USER_COLUMNS
            ))?;
            let users = stmt
                .query_map([], map_user_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(users)
        })
    }

    /// Looks up a user and their password hash for login.
    pub fn get_user_credentials_by_email(&self, email: &str) -> Result<UserCredentials, DbError> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!(
                    "SELECT {}, password_hash FROM users WHERE email = ?",
                    USER_COLUMNS
                ),
                [email],
                |row| {
                    Ok(UserCredentials {
                        user: map_user_row(row)?,
                        password_hash: row.get(6)?,
                    })
                },
            )
            .map_err(not_found_as(format!("User with email {}", email)))
        })
    }
}

pub(crate) fn map_user_row(row: &rusqlite::Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        username: row.get(2)?,
        role: row.get(3)?,
        created_at: parse_datetime(row.get(4)?),
        updated_at: parse_datetime(row.get(5)?),
    })
}

/// Resolves a user reference; `None` for ids that match no row (including
/// the unassigned id 0).
pub(crate) fn find_user(conn: &Connection, user_id: i64) -> Result<Option<User>, DbError> {
    let user = conn
        .query_row(
            &format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS),
            [user_id],
            map_user_row,
        )
        .optional()?;
    Ok(user)
}
