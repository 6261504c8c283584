use rusqlite::Connection;

use crate::db::{Database, DbError, Deleted, parse_datetime, not_found_as};
use crate::db::features::load_feature;
use crate::db::models::{SubFeature, SubFeatureInput};

const SUB_FEATURE_COLUMNS: &str =
    "id, feature_id, title, description, status, priority, assignee_id, created_at, updated_at";

impl Database {
    pub fn create_sub_feature(&self, input: &SubFeatureInput) -> Result<SubFeature, DbError> {
        if input.title.trim().is_empty() {
            return Err(DbError::Validation("Sub-feature title is required".to_string()));
        }

        self.with_conn(|conn| {
            load_feature(conn, input.feature_id, Deleted::Exclude)?;

            let now = chrono::Utc::now().to_rfc3339();
            conn.execute(
                r#"INSERT INTO sub_features
                   (feature_id, title, description, status, priority, assignee_id, created_at, updated_at)
                   VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
                rusqlite::params![
                    input.feature_id,
                    input.title,
                    input.description,
                    input.status,
                    input.priority,
                    input.assignee_id,
                    now,
                    now,
                ],
            )?;

            load_sub_feature(conn, conn.last_insert_rowid())
        })
    }

    pub fn get_sub_feature(&self, sub_feature_id: i64) -> Result<SubFeature, DbError> {
        self.with_conn(|conn| load_sub_feature(conn, sub_feature_id))
    }

    pub fn get_sub_features_by_feature(&self, feature_id: i64) -> Result<Vec<SubFeature>, DbError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM sub_features WHERE feature_id = ? ORDER BY id",
                SUB_FEATURE_COLUMNS
            ))?;
            let rows = stmt
                .query_map([feature_id], map_sub_feature_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Replaces every field of an existing sub-feature, including the feature
    /// it belongs to.
    pub fn update_sub_feature(
        &self,
        sub_feature_id: i64,
        input: &SubFeatureInput,
    ) -> Result<SubFeature, DbError> {
        if input.title.trim().is_empty() {
            return Err(DbError::Validation("Sub-feature title is required".to_string()));
        }

        self.with_conn(|conn| {
            load_sub_feature(conn, sub_feature_id)?;
            load_feature(conn, input.feature_id, Deleted::Exclude)?;

            conn.execute(
                r#"UPDATE sub_features
                   SET feature_id = ?, title = ?, description = ?, status = ?, priority = ?,
                       assignee_id = ?, updated_at = ?
                   WHERE id = ?"#,
                rusqlite::params![
                    input.feature_id,
                    input.title,
                    input.description,
                    input.status,
                    input.priority,
                    input.assignee_id,
                    chrono::Utc::now().to_rfc3339(),
                    sub_feature_id,
                ],
            )?;

            load_sub_feature(conn, sub_feature_id)
        })
    }
}

fn map_sub_feature_row(row: &rusqlite::Row) -> rusqlite::Result<SubFeature> {
    Ok(SubFeature {
        id: row.get(0)?,
        feature_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        status: row.get(4)?,
        priority: row.get(5)?,
        assignee_id: row.get(6)?,
        created_at: parse_datetime(row.get(7)?),
        updated_at: parse_datetime(row.get(8)?),
    })
}

pub(crate) fn load_sub_feature(conn: &Connection, sub_feature_id: i64) -> Result<SubFeature, DbError> {
    conn.query_row(
        &format!("SELECT {} FROM sub_features WHERE id = ?", SUB_FEATURE_COLUMNS),
        [sub_feature_id],
        map_sub_feature_row,
    )
    .map_err(not_found_as(format!("Sub-feature {}", sub_feature_id)))
}
