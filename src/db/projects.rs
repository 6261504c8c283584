use rusqlite::Connection;

use crate::db::{Database, DbError, parse_datetime, not_found_as};
use crate::db::models::{Project, ProjectConfig, CreateProject, UpdateProject};
use crate::db::users::find_user;
use crate::rules::ensure_owner;

const PROJECT_COLUMNS: &str =
    "id, name, description, owner_id, config_json, created_at, updated_at";

impl Database {
    /// Creates a project. A missing config gets the default allow-lists.
    pub fn create_project(&self, input: &CreateProject) -> Result<Project, DbError> {
        self.with_conn(|conn| {
            let owner = find_user(conn, input.owner_id)?
                .ok_or_else(|| DbError::NotFound(format!("User {}", input.owner_id)))?;

            let now = chrono::Utc::now();
            let config = input.config.clone().unwrap_or_default();
            let config_json = serde_json::to_string(&config)?;

            conn.execute(
                r#"INSERT INTO projects
                   (name, description, owner_id, config_json, created_at, updated_at)
                   VALUES (?, ?, ?, ?, ?, ?)"#,
                rusqlite::params![
                    input.name,
                    input.description,
                    input.owner_id,
                    config_json,
                    now.to_rfc3339(),
                    now.to_rfc3339(),
                ],
            )?;

            Ok(Project {
                id: conn.last_insert_rowid(),
                name: input.name.clone(),
                description: input.description.clone(),
                owner_id: input.owner_id,
                config,
                created_at: now,
                updated_at: now,
                owner: Some(owner),
            })
        })
    }

    pub fn get_project(&self, project_id: i64) -> Result<Project, DbError> {
        self.with_conn(|conn| load_project(conn, project_id))
    }

    pub fn get_projects_by_owner(&self, owner_id: i64) -> Result<Vec<Project>, DbError> {
        self.with_conn(|conn| {
            query_projects(
                conn,
                &format!(
                    "SELECT {} FROM projects WHERE owner_id = ? ORDER BY id",
                    PROJECT_COLUMNS
                ),
                [owner_id],
            )
        })
    }

    /// Applies the provided fields. Only the owner may update a project.
    pub fn update_project(
        &self,
        project_id: i64,
        actor_id: i64,
        input: &UpdateProject,
    ) -> Result<Project, DbError> {
        self.with_conn(|conn| {
            let existing = load_project(conn, project_id)?;
            ensure_owner(actor_id, existing.owner_id, &format!("project {}", project_id))?;

            let now = chrono::Utc::now().to_rfc3339();

            if let Some(ref name) = input.name {
                conn.execute(
                    "UPDATE projects SET name = ?, updated_at = ? WHERE id = ?",
                    rusqlite::params![name, now, project_id],
                )?;
            }

            if let Some(ref description) = input.description {
                conn.execute(
                    "UPDATE projects SET description = ?, updated_at = ? WHERE id = ?",
                    rusqlite::params![description, now, project_id],
                )?;
            }

            if let Some(ref config) = input.config {
                conn.execute(
                    "UPDATE projects SET config_json = ?, updated_at = ? WHERE id = ?",
                    rusqlite::params![serde_json::to_string(config)?, now, project_id],
                )?;
            }

            load_project(conn, project_id)
        })
    }

    /// Deletes a project and, through cascades, its features. Owner only.
    pub fn delete_project(&self, project_id: i64, actor_id: i64) -> Result<(), DbError> {
        self.with_conn(|conn| {
            let existing = load_project(conn, project_id)?;
            ensure_owner(actor_id, existing.owner_id, &format!("project {}", project_id))?;

            conn.execute("DELETE FROM projects WHERE id = ?", [project_id])?;
            tracing::info!("Deleted project {}", project_id);
            Ok(())
        })
    }
}

fn map_project_row(row: &rusqlite::Row) -> rusqlite::Result<Project> {
    let config_json: String = row.get(4)?;
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        owner_id: row.get(3)?,
        // Unreadable config behaves like one with no allow-lists set.
        config: serde_json::from_str(&config_json).unwrap_or(ProjectConfig {
            task_types: None,
            feature_category: None,
        }),
        created_at: parse_datetime(row.get(5)?),
        updated_at: parse_datetime(row.get(6)?),
        owner: None,
    })
}

fn query_projects<P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> Result<Vec<Project>, DbError> {
    let mut stmt = conn.prepare(sql)?;
    let mut projects = stmt
        .query_map(params, map_project_row)?
        .collect::<Result<Vec<_>, _>>()?;

    for project in &mut projects {
        project.owner = find_user(conn, project.owner_id)?;
    }
    Ok(projects)
}

pub(crate) fn load_project(conn: &Connection, project_id: i64) -> Result<Project, DbError> {
    let mut project = conn
        .query_row(
            &format!("SELECT {} FROM projects WHERE id = ?", PROJECT_COLUMNS),
            [project_id],
            map_project_row,
        )
        .map_err(not_found_as(format!("Project {}", project_id)))?;
    project.owner = find_user(conn, project.owner_id)?;
    Ok(project)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::*;

    #[test]
    fn create_project_fills_default_config() {
        let db = create_test_db();
        let owner = setup_user(&db, "owner");
        let project = setup_project(&db, owner.id);

        let fetched = db.get_project(project.id).unwrap();
        assert_eq!(fetched.config, ProjectConfig::default());
        assert_eq!(fetched.owner.map(|o| o.id), Some(owner.id));
    }

    #[test]
    fn create_project_keeps_explicit_config() {
        let db = create_test_db();
        let owner = setup_user(&db, "owner");
        let config = ProjectConfig {
            task_types: Some(vec!["QA".to_string()]),
            feature_category: None,
        };

        let project = db
            .create_project(&CreateProject {
                name: "Custom".to_string(),
                description: String::new(),
                owner_id: owner.id,
                config: Some(config.clone()),
            })
            .unwrap();

        assert_eq!(db.get_project(project.id).unwrap().config, config);
    }

    #[test]
    fn create_project_requires_existing_owner() {
        let db = create_test_db();
        let result = db.create_project(&CreateProject {
            name: "Orphan".to_string(),
            description: String::new(),
            owner_id: 99,
            config: None,
        });
        assert!(matches!(result, Err(DbError::NotFound(_))));
    }

    #[test]
    fn projects_listed_by_owner() {
        let db = create_test_db();
        let alice = setup_user(&db, "alice");
        let bob = setup_user(&db, "bob");
        setup_project(&db, alice.id);
        setup_project(&db, alice.id);
        setup_project(&db, bob.id);

        assert_eq!(db.get_projects_by_owner(bob.id).unwrap().len(), 1);
        let mine = db.get_projects_by_owner(alice.id).unwrap();
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|p| p.owner_id == alice.id));
    }

    #[test]
    fn update_project_by_non_owner_is_forbidden() {
        let db = create_test_db();
        let alice = setup_user(&db, "alice");
        let bob = setup_user(&db, "bob");
        let project = setup_project(&db, alice.id);

        let result = db.update_project(
            project.id,
            bob.id,
            &UpdateProject {
                name: Some("Hijacked".to_string()),
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(DbError::Forbidden(_))));
        assert_eq!(db.get_project(project.id).unwrap().name, "Project");

        let updated = db
            .update_project(
                project.id,
                alice.id,
                &UpdateProject {
                    name: Some("Renamed".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.name, "Renamed");
    }

    #[test]
    fn delete_missing_project_is_not_found_before_forbidden() {
        let db = create_test_db();
        let alice = setup_user(&db, "alice");
        assert!(matches!(
            db.delete_project(123, alice.id),
            Err(DbError::NotFound(_))
        ));
    }
}
