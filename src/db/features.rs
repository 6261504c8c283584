//! Feature persistence and the one-level-at-a-time tree queries.

use std::collections::HashSet;

use rusqlite::{Connection, OptionalExtension};

use crate::db::{Database, DbError, Deleted, parse_datetime, parse_optional_datetime, not_found_as};
use crate::db::models::{
    Feature, FeatureSummary, FeatureTag, CreateFeature, UpdateFeature, FeatureStatus,
    FeaturePriority,
};
use crate::db::projects::load_project;
use crate::db::users::find_user;
use crate::rules::{ensure_no_cycle, validate_category};

pub(crate) const FEATURE_COLUMNS: &str = "f.id, f.project_id, f.parent_feature_id, f.title, \
     f.description, f.status, f.priority, f.assignee_id, f.category, f.created_at, \
     f.updated_at, f.deleted_at";

impl Database {
    pub fn create_feature(&self, input: &CreateFeature) -> Result<Feature, DbError> {
        self.with_conn(|conn| {
            let project = load_project(conn, input.project_id)?;
            if !input.category.is_empty() {
                validate_category(project.id, &project.config, &input.category)?;
            }
            if let Some(parent_id) = input.parent_feature_id {
                check_parent_in_project(conn, parent_id, input.project_id)?;
            }

            let now = chrono::Utc::now();
            conn.execute(
                r#"INSERT INTO features
                   (project_id, parent_feature_id, title, description, status, priority,
                    assignee_id, category, created_at, updated_at)
                   VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
                rusqlite::params![
                    input.project_id,
                    input.parent_feature_id,
                    input.title,
                    input.description,
                    input.status.as_str(),
                    input.priority.as_str(),
                    input.assignee_id,
                    input.category,
                    now.to_rfc3339(),
                    now.to_rfc3339(),
                ],
            )?;

            let feature_id = conn.last_insert_rowid();
            tracing::debug!("Created feature {} in project {}", feature_id, input.project_id);
            load_feature(conn, feature_id, Deleted::Exclude)
        })
    }

    pub fn get_feature(&self, feature_id: i64) -> Result<Feature, DbError> {
        self.with_conn(|conn| load_feature(conn, feature_id, Deleted::Exclude))
    }

    pub fn get_feature_including_deleted(&self, feature_id: i64) -> Result<Feature, DbError> {
        self.with_conn(|conn| load_feature(conn, feature_id, Deleted::Include))
    }

    pub fn get_all_features(&self, deleted: Deleted) -> Result<Vec<Feature>, DbError> {
        self.with_conn(|conn| {
            query_features(
                conn,
                &format!(
                    "SELECT {} FROM features f WHERE {} ORDER BY f.id",
                    FEATURE_COLUMNS,
                    deleted.filter("f")
                ),
                rusqlite::params![],
            )
        })
    }

    pub fn get_features_by_project(
        &self,
        project_id: i64,
        deleted: Deleted,
    ) -> Result<Vec<Feature>, DbError> {
        self.with_conn(|conn| {
            query_features(
                conn,
                &format!(
                    "SELECT {} FROM features f WHERE f.project_id = ? AND {} ORDER BY f.id",
                    FEATURE_COLUMNS,
                    deleted.filter("f")
                ),
                [project_id],
            )
        })
    }

    /// Features of a project that have no parent.
    pub fn get_root_features(&self, project_id: i64, deleted: Deleted) -> Result<Vec<Feature>, DbError> {
        self.with_conn(|conn| {
            query_features(
                conn,
                &format!(
                    "SELECT {} FROM features f
                     WHERE f.project_id = ? AND f.parent_feature_id IS NULL AND {}
                     ORDER BY f.id",
                    FEATURE_COLUMNS,
                    deleted.filter("f")
                ),
                [project_id],
            )
        })
    }

    /// Direct children of a feature. Grandchildren are not included.
    pub fn get_child_features(&self, parent_id: i64, deleted: Deleted) -> Result<Vec<Feature>, DbError> {
        self.with_conn(|conn| {
            query_features(
                conn,
                &format!(
                    "SELECT {} FROM features f WHERE f.parent_feature_id = ? AND {} ORDER BY f.id",
                    FEATURE_COLUMNS,
                    deleted.filter("f")
                ),
                [parent_id],
            )
        })
    }

    /// Replaces the editable fields of a live feature.
    pub fn update_feature(&self, feature_id: i64, input: &UpdateFeature) -> Result<Feature, DbError> {
        self.with_conn(|conn| {
            let existing = load_feature(conn, feature_id, Deleted::Exclude)?;
            let project = load_project(conn, existing.project_id)?;

            if !input.category.is_empty() {
                validate_category(project.id, &project.config, &input.category)?;
            }

            let parent_id = match input.parent_feature_id {
                Some(parent_id) => {
                    check_parent_in_project(conn, parent_id, existing.project_id)?;
                    let ancestors = ancestor_chain(conn, parent_id)?;
                    ensure_no_cycle(feature_id, parent_id, &ancestors)?;
                    Some(parent_id)
                }
                None => existing.parent_feature_id,
            };

            conn.execute(
                r#"UPDATE features
                   SET title = ?, description = ?, status = ?, priority = ?, assignee_id = ?,
                       category = ?, parent_feature_id = ?, updated_at = ?
                   WHERE id = ?"#,
                rusqlite::params![
                    input.title,
                    input.description,
                    input.status.as_str(),
                    input.priority.as_str(),
                    input.assignee_id,
                    input.category,
                    parent_id,
                    chrono::Utc::now().to_rfc3339(),
                    feature_id,
                ],
            )?;

            load_feature(conn, feature_id, Deleted::Exclude)
        })
    }

    /// Soft-deletes a feature and drops its tags. Live children move up to
    /// the deleted feature's parent, or become roots.
    pub fn delete_feature(&self, feature_id: i64) -> Result<(), DbError> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let now = chrono::Utc::now().to_rfc3339();

            let parent_id: Option<i64> = tx
                .query_row(
                    "SELECT parent_feature_id FROM features WHERE id = ? AND deleted_at IS NULL",
                    [feature_id],
                    |row| row.get::<_, Option<i64>>(0),
                )
                .map_err(not_found_as(format!("Feature {}", feature_id)))?;

            tx.execute(
                "UPDATE features SET deleted_at = ? WHERE id = ?",
                rusqlite::params![now, feature_id],
            )?;
            tx.execute("DELETE FROM feature_tags WHERE feature_id = ?", [feature_id])?;
            let moved = tx.execute(
                r#"UPDATE features SET parent_feature_id = ?, updated_at = ?
                   WHERE parent_feature_id = ? AND deleted_at IS NULL"#,
                rusqlite::params![parent_id, now, feature_id],
            )?;

            tx.commit()?;
            tracing::info!(
                "Soft-deleted feature {}, moved {} child feature(s) to {:?}",
                feature_id,
                moved,
                parent_id
            );
            Ok(())
        })
    }
}

pub(crate) fn map_feature_row(row: &rusqlite::Row) -> rusqlite::Result<Feature> {
    let status: String = row.get(5)?;
    let priority: String = row.get(6)?;

    Ok(Feature {
        id: row.get(0)?,
        project_id: row.get(1)?,
        parent_feature_id: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        status: FeatureStatus::parse(&status).unwrap_or_default(),
        priority: FeaturePriority::parse(&priority).unwrap_or_default(),
        assignee_id: row.get(7)?,
        category: row.get(8)?,
        created_at: parse_datetime(row.get(9)?),
        updated_at: parse_datetime(row.get(10)?),
        deleted_at: parse_optional_datetime(row.get(11)?),
        parent_feature: None,
        assignee: None,
        tags: Vec::new(),
    })
}

/// Fills in the parent summary, assignee and tags of a loaded feature.
pub(crate) fn hydrate_feature(conn: &Connection, feature: &mut Feature) -> Result<(), DbError> {
    feature.parent_feature = match feature.parent_feature_id {
        Some(parent_id) => load_parent_summary(conn, parent_id)?,
        None => None,
    };
    feature.assignee = find_user(conn, feature.assignee_id)?;
    feature.tags = load_feature_tags(conn, feature.id)?;
    Ok(())
}

fn load_parent_summary(conn: &Connection, parent_id: i64) -> Result<Option<FeatureSummary>, DbError> {
    let summary = conn
        .query_row(
            "SELECT id, title, status FROM features WHERE id = ?",
            [parent_id],
            |row| {
                let status: String = row.get(2)?;
                Ok(FeatureSummary {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    status: FeatureStatus::parse(&status).unwrap_or_default(),
                })
            },
        )
        .optional()?;
    Ok(summary)
}

pub(crate) fn load_feature_tags(conn: &Connection, feature_id: i64) -> Result<Vec<FeatureTag>, DbError> {
    let mut stmt = conn.prepare(
        "SELECT tag_name, feature_id, created_by_user FROM feature_tags
         WHERE feature_id = ? ORDER BY rowid",
    )?;
    let tags = stmt
        .query_map([feature_id], |row| {
            Ok(FeatureTag {
                tag_name: row.get(0)?,
                feature_id: row.get(1)?,
                created_by_user: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tags)
}

pub(crate) fn query_features<P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> Result<Vec<Feature>, DbError> {
    let mut stmt = conn.prepare(sql)?;
    let mut features = stmt
        .query_map(params, map_feature_row)?
        .collect::<Result<Vec<_>, _>>()?;

    for feature in &mut features {
        hydrate_feature(conn, feature)?;
    }
    Ok(features)
}

pub(crate) fn load_feature(conn: &Connection, feature_id: i64, deleted: Deleted) -> Result<Feature, DbError> {
    let mut feature = conn
        .query_row(
            &format!(
                "SELECT {} FROM features f WHERE f.id = ? AND {}",
                FEATURE_COLUMNS,
                deleted.filter("f")
            ),
            [feature_id],
            map_feature_row,
        )
        .map_err(not_found_as(format!("Feature {}", feature_id)))?;
    hydrate_feature(conn, &mut feature)?;
    Ok(feature)
}

/// A parent must be a live feature of the same project.
fn check_parent_in_project(conn: &Connection, parent_id: i64, project_id: i64) -> Result<(), DbError> {
    let parent_project: Option<i64> = conn
        .query_row(
            "SELECT project_id FROM features WHERE id = ? AND deleted_at IS NULL",
            [parent_id],
            |row| row.get(0),
        )
        .optional()?;

    match parent_project {
        None => Err(DbError::NotFound(format!("Parent feature {}", parent_id))),
        Some(p) if p != project_id => Err(DbError::Validation(format!(
            "Parent feature {} belongs to another project",
            parent_id
        ))),
        Some(_) => Ok(()),
    }
}

/// Walks upward from `feature_id`, returning its parent, grandparent and so
/// on. Stops early if stored data already loops.
fn ancestor_chain(conn: &Connection, feature_id: i64) -> Result<Vec<i64>, DbError> {
    let mut chain = Vec::new();
    let mut seen = HashSet::from([feature_id]);
    let mut current = feature_id;

    loop {
        let parent: Option<i64> = conn
            .query_row(
                "SELECT parent_feature_id FROM features WHERE id = ?",
                [current],
                |row| row.get::<_, Option<i64>>(0),
            )
            .optional()?
            .flatten();

        match parent {
            Some(p) if seen.insert(p) => {
                chain.push(p);
                current = p;
            }
            Some(p) => {
                tracing::warn!("Feature tree already loops at feature {}", p);
                chain.push(p);
                break;
            }
            None => break,
        }
    }

    Ok(chain)
}
