use crate::db::{Database, DbError, Deleted};
use crate::db::features::{FEATURE_COLUMNS, load_feature, load_feature_tags, query_features};
use crate::db::models::{Feature, FeatureTag};
use crate::rules::normalize_tags;

impl Database {
    /// Replaces every tag on a live feature with the tags parsed from `raw`.
    /// An empty or separator-only input clears the tags.
    pub fn replace_feature_tags(
        &self,
        feature_id: i64,
        user_id: i64,
        raw: &str,
    ) -> Result<Vec<FeatureTag>, DbError> {
        let tags = normalize_tags(raw);

        self.with_conn_mut(|conn| {
            load_feature(conn, feature_id, Deleted::Exclude)?;

            let tx = conn.transaction()?;
            tx.execute("DELETE FROM feature_tags WHERE feature_id = ?", [feature_id])?;
            {
                let mut stmt = tx.prepare(
                    "INSERT OR IGNORE INTO feature_tags (tag_name, feature_id, created_by_user)
                     VALUES (?, ?, ?)",
                )?;
                for tag in &tags {
                    stmt.execute(rusqlite::params![tag, feature_id, user_id])?;
                }
            }
            tx.commit()?;

            tracing::debug!("Feature {} now has {} tag(s)", feature_id, tags.len());
            load_feature_tags(conn, feature_id)
        })
    }

    pub fn get_feature_tags(&self, feature_id: i64) -> Result<Vec<FeatureTag>, DbError> {
        self.with_conn(|conn| {
            load_feature(conn, feature_id, Deleted::Exclude)?;
            load_feature_tags(conn, feature_id)
        })
    }

    /// Every tag row on a live feature, grouped by tag name.
    pub fn get_all_tags(&self) -> Result<Vec<FeatureTag>, DbError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                r#"SELECT t.tag_name, t.feature_id, t.created_by_user FROM feature_tags t
                   JOIN features f ON f.id = t.feature_id
                   WHERE f.deleted_at IS NULL
                   ORDER BY t.tag_name, t.feature_id"#,
            )?;
            let tags = stmt
                .query_map([], |row| {
                    Ok(FeatureTag {
                        tag_name: row.get(0)?,
                        feature_id: row.get(1)?,
                        created_by_user: row.get(2)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(tags)
        })
    }

    /// Features carrying `tag`. A leading `#` on the query is ignored.
    pub fn get_features_by_tag(&self, tag: &str, deleted: Deleted) -> Result<Vec<Feature>, DbError> {
        let tag = tag.trim();
        let tag = tag.strip_prefix('#').unwrap_or(tag);

        self.with_conn(|conn| {
            query_features(
                conn,
                &format!(
                    "SELECT {} FROM features f
                     JOIN feature_tags t ON t.feature_id = f.id
                     WHERE t.tag_name = ? AND {}
                     ORDER BY f.id",
                    FEATURE_COLUMNS,
                    deleted.filter("f")
                ),
                [tag],
            )
        })
    }
}
