use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::auth::auth_middleware;
use super::handlers::*;
use super::state::AppState;

/// Largest accepted attachment upload.
pub const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

pub fn create_router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/auth/me", get(me))

        // Users
        .route("/users", get(list_users))
        .route("/users/:user_id", get(get_user))

        // Projects
        .route("/projects", post(create_project).get(list_projects))
        .route("/projects/user/:user_id", get(list_projects_by_user))
        .route(
            "/projects/:project_id",
            get(get_project).put(update_project).delete(delete_project),
        )
        .route("/projects/:project_id/features", get(list_project_features))

        // Features
        .route("/features", post(create_feature).get(list_features))
        .route(
            "/features/:feature_id",
            get(get_feature).put(update_feature).delete(delete_feature),
        )
        .route("/features/:feature_id/subfeatures", get(list_child_features))
        .route(
            "/features/:feature_id/tags",
            get(get_feature_tags).put(replace_feature_tags),
        )
        .route(
            "/features/:feature_id/tasks",
            get(list_feature_tasks).post(create_feature_task),
        )
        .route(
            "/features/:feature_id/tasks/:task_id",
            put(update_feature_task).delete(delete_feature_task),
        )

        // Tags
        .route("/tags", get(list_tags))
        .route("/tags/:tag_name/features", get(list_features_by_tag))

        // Sub-features
        .route("/sub-features", post(create_sub_feature).get(list_sub_features))
        .route("/sub-features/:sub_feature_id", put(update_sub_feature))
        .route("/sub-features/:sub_feature_id/tasks", get(list_sub_feature_tasks))

        // Tasks
        .route("/tasks", post(create_task))
        .route(
            "/tasks/:task_id",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route(
            "/tasks/:task_id/attachments",
            post(upload_attachment)
                .get(list_attachments)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route(
            "/tasks/:task_id/comments",
            post(create_comment).get(list_task_comments),
        )

        // Attachments
        .route("/attachments/download/:filename", get(download_attachment))
        .route("/attachments/:attachment_id", delete(delete_attachment))
        .route(
            "/attachments/:attachment_id/comments",
            get(list_attachment_comments),
        )

        // Comments
        .route(
            "/comments/:comment_id",
            put(update_comment).delete(delete_comment),
        )

        // Apply auth middleware
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let api = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::api::ApiConfig;
    use crate::db::Database;

    fn test_app() -> Router {
        test_app_with_db().0
    }

    fn test_app_with_db() -> (Router, Arc<Database>) {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let config = ApiConfig {
            jwt_secret: "route-test-secret".to_string(),
            ..ApiConfig::default()
        };
        (create_router(AppState::new(db.clone(), &config)), db)
    }

    async fn upload(app: &Router, token: &str, task_id: i64, name: &str, content: &str) -> (StatusCode, Value) {
        let boundary = "XBOUNDARYX";
        let multipart = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{name}\"\r\n\
             Content-Type: text/plain\r\n\r\n{content}\r\n--{b}--\r\n",
            b = boundary,
            name = name,
            content = content
        );
        let request = Request::post(format!("/api/tasks/{}/attachments", task_id))
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", boundary),
            )
            .body(Body::from(multipart))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    async fn download(app: &Router, token: &str, file_name: &str) -> (StatusCode, Vec<u8>) {
        let request = Request::get(format!("/api/attachments/download/{}", file_name))
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    fn tag_names(feature: &Value) -> Vec<String> {
        feature["tags"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["tag_name"].as_str().unwrap().to_string())
            .collect()
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn signup(app: &Router, name: &str) -> (String, i64) {
        let (status, body) = send(
            app,
            "POST",
            "/api/auth/signup",
            None,
            Some(json!({
                "email": format!("{}@example.com", name),
                "username": name,
                "password": "hunter22"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        (
            body["token"].as_str().unwrap().to_string(),
            body["user"]["id"].as_i64().unwrap(),
        )
    }

    async fn create_project(app: &Router, token: &str) -> i64 {
        let (status, body) = send(
            app,
            "POST",
            "/api/projects",
            Some(token),
            Some(json!({ "name": "Shop" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["id"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = test_app();
        let (status, body) = send(&app, "GET", "/api/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn protected_routes_need_a_token() {
        let app = test_app();

        let (status, body) = send(&app, "GET", "/api/projects", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "UNAUTHORIZED");

        let (status, _) = send(&app, "GET", "/api/projects", Some("garbage"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn signup_login_and_me() {
        let app = test_app();
        let (_, user_id) = signup(&app, "alice").await;

        let (status, body) = send(
            &app,
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "alice@example.com", "password": "wrong" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid email or password");

        let (status, body) = send(
            &app,
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "alice@example.com", "password": "hunter22" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let token = body["token"].as_str().unwrap().to_string();
        assert!(body["user"].get("password_hash").is_none());

        let (status, body) = send(&app, "GET", "/api/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], user_id);
    }

    #[tokio::test]
    async fn duplicate_signup_conflicts() {
        let app = test_app();
        signup(&app, "bob").await;

        let (status, body) = send(
            &app,
            "POST",
            "/api/auth/signup",
            None,
            Some(json!({ "email": "bob@example.com", "username": "bob2", "password": "x" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "CONFLICT");

        let (status, _) = send(
            &app,
            "POST",
            "/api/auth/signup",
            None,
            Some(json!({ "email": "c@example.com", "username": "c", "password": "" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn feature_with_tags_and_bad_category() {
        let app = test_app();
        let (token, _) = signup(&app, "carol").await;
        let project_id = create_project(&app, &token).await;

        let (status, body) = send(
            &app,
            "POST",
            "/api/features",
            Some(&token),
            Some(json!({
                "project_id": project_id,
                "title": "Checkout",
                "category": "Payment",
                "tags": "#cart, money;money"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        assert_eq!(body["status"], "todo");
        assert_eq!(body["priority"], "medium");
        assert!(body.get("warning").is_none());
        let tags: Vec<&str> = body["tags"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["tag_name"].as_str().unwrap())
            .collect();
        assert_eq!(tags, vec!["cart", "money"]);

        let (status, body) = send(
            &app,
            "POST",
            "/api/features",
            Some(&token),
            Some(json!({ "project_id": project_id, "title": "Odd", "category": "Bogus" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");

        let (status, _) = send(
            &app,
            "POST",
            "/api/features",
            Some(&token),
            Some(json!({ "project_id": project_id, "title": "Odd", "status": "Done" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, body) = send(
            &app,
            "GET",
            &format!("/api/projects/{}/features", project_id),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(body.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn subfeatures_route_returns_direct_children() {
        let app = test_app();
        let (token, _) = signup(&app, "dave").await;
        let project_id = create_project(&app, &token).await;

        let mut parent = None;
        let mut ids = Vec::new();
        for title in ["Root", "Child", "Grandchild"] {
            let (_, body) = send(
                &app,
                "POST",
                "/api/features",
                Some(&token),
                Some(json!({
                    "project_id": project_id,
                    "title": title,
                    "parent_feature_id": parent
                })),
            )
            .await;
            let id = body["id"].as_i64().unwrap();
            ids.push(id);
            parent = Some(id);
        }

        let (status, body) = send(
            &app,
            "GET",
            &format!("/api/features/{}/subfeatures", ids[0]),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let children = body.as_array().unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0]["id"], ids[1]);

        let (_, roots) = send(
            &app,
            "GET",
            &format!("/api/projects/{}/features?root_only=true", project_id),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(roots.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn deleted_feature_needs_include_deleted() {
        let app = test_app();
        let (token, _) = signup(&app, "erin").await;
        let project_id = create_project(&app, &token).await;

        let (_, body) = send(
            &app,
            "POST",
            "/api/features",
            Some(&token),
            Some(json!({ "project_id": project_id, "title": "Gone soon" })),
        )
        .await;
        let id = body["id"].as_i64().unwrap();

        let (status, _) = send(&app, "DELETE", &format!("/api/features/{}", id), Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(&app, "GET", &format!("/api/features/{}", id), Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(
            &app,
            "GET",
            &format!("/api/features/{}?include_deleted=true", id),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["deleted_at"].is_string());
    }

    #[tokio::test]
    async fn comment_ownership_enforced() {
        let app = test_app();
        let (author, _) = signup(&app, "frank").await;
        let (intruder, _) = signup(&app, "grace").await;

        let (status, task) = send(
            &app,
            "POST",
            "/api/tasks",
            Some(&author),
            Some(json!({ "task_type": "Dev", "task_name": "Write it" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{}", task);
        let task_id = task["id"].as_i64().unwrap();

        let (status, comment) = send(
            &app,
            "POST",
            &format!("/api/tasks/{}/comments", task_id),
            Some(&author),
            Some(json!({ "content": "first!" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let comment_id = comment["id"].as_i64().unwrap();

        let (status, body) = send(
            &app,
            "DELETE",
            &format!("/api/comments/{}", comment_id),
            Some(&intruder),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "FORBIDDEN");

        let (status, _) = send(&app, "DELETE", "/api/comments/9999", Some(&intruder), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(
            &app,
            "DELETE",
            &format!("/api/comments/{}", comment_id),
            Some(&author),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn attachment_upload_and_download() {
        let app = test_app();
        let (token, _) = signup(&app, "heidi").await;
        let (_, task) = send(
            &app,
            "POST",
            "/api/tasks",
            Some(&token),
            Some(json!({ "task_type": "Dev", "task_name": "Docs" })),
        )
        .await;
        let task_id = task["id"].as_i64().unwrap();

        let (status, attachment) = upload(&app, &token, task_id, "notes.txt", "hello world").await;
        assert_eq!(status, StatusCode::CREATED);
        let file_name = format!("task_{}_notes.txt", task_id);
        assert_eq!(attachment["file_name"], file_name);
        assert_eq!(attachment["file_size"], 11);
        assert_eq!(attachment["mime_type"], "text/plain");

        let (status, bytes) = download(&app, &token, &file_name).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(&bytes[..], b"hello world");

        let (status, _) = send(
            &app,
            "DELETE",
            &format!("/api/attachments/{}", attachment["id"]),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = download(&app, &token, &file_name).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn reuploading_same_name_keeps_first_file() {
        let app = test_app();
        let (token, _) = signup(&app, "nina").await;
        let (_, task) = send(
            &app,
            "POST",
            "/api/tasks",
            Some(&token),
            Some(json!({ "task_type": "Dev", "task_name": "Docs" })),
        )
        .await;
        let task_id = task["id"].as_i64().unwrap();

        let (status, first) = upload(&app, &token, task_id, "n.txt", "one").await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, body) = upload(&app, &token, task_id, "n.txt", "two").await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "CONFLICT");

        let file_name = format!("task_{}_n.txt", task_id);
        let (status, bytes) = download(&app, &token, &file_name).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(&bytes[..], b"one");

        let (_, listed) = send(
            &app,
            "GET",
            &format!("/api/tasks/{}/attachments", task_id),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(listed.as_array().unwrap().len(), 1);

        let (status, _) = send(
            &app,
            "DELETE",
            &format!("/api/attachments/{}", first["id"]),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = upload(&app, &token, task_id, "n.txt", "three").await;
        assert_eq!(status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn tags_input_key_is_accepted() {
        let app = test_app();
        let (token, _) = signup(&app, "olga").await;
        let project_id = create_project(&app, &token).await;

        let (status, body) = send(
            &app,
            "POST",
            "/api/features",
            Some(&token),
            Some(json!({ "project_id": project_id, "title": "Legacy", "tags_input": "#ui, api" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        assert_eq!(tag_names(&body), vec!["ui", "api"]);
        let id = body["id"].as_i64().unwrap();

        let (status, body) = send(
            &app,
            "PUT",
            &format!("/api/features/{}", id),
            Some(&token),
            Some(json!({
                "title": "Legacy",
                "status": "todo",
                "priority": "low",
                "tags_input": "db"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        assert_eq!(tag_names(&body), vec!["db"]);
    }

    #[tokio::test]
    async fn failed_tag_write_returns_feature_with_warning() {
        let (app, db) = test_app_with_db();
        let (token, _) = signup(&app, "pete").await;
        let project_id = create_project(&app, &token).await;

        db.with_conn(|conn| {
            conn.execute_batch(
                "CREATE TRIGGER reject_tags BEFORE INSERT ON feature_tags
                 BEGIN SELECT RAISE(ABORT, 'tag writes disabled'); END;",
            )?;
            Ok(())
        })
        .unwrap();

        let (status, body) = send(
            &app,
            "POST",
            "/api/features",
            Some(&token),
            Some(json!({ "project_id": project_id, "title": "Half saved", "tags": "a b" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        assert_eq!(body["warning"], "Feature saved but failed to save tags");
        assert!(body["tags"].as_array().unwrap().is_empty());
        let id = body["id"].as_i64().unwrap();

        let (status, fetched) = send(&app, "GET", &format!("/api/features/{}", id), Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["title"], "Half saved");

        let (status, body) = send(
            &app,
            "PUT",
            &format!("/api/features/{}", id),
            Some(&token),
            Some(json!({
                "title": "Renamed",
                "status": "done",
                "priority": "high",
                "tags": "c"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        assert_eq!(body["title"], "Renamed");
        assert_eq!(body["warning"], "Feature saved but failed to save tags");
    }

    #[tokio::test]
    async fn deleting_parent_keeps_children_reachable() {
        let app = test_app();
        let (token, _) = signup(&app, "quinn").await;
        let project_id = create_project(&app, &token).await;

        let (_, root) = send(
            &app,
            "POST",
            "/api/features",
            Some(&token),
            Some(json!({ "project_id": project_id, "title": "Root" })),
        )
        .await;
        let (_, child) = send(
            &app,
            "POST",
            "/api/features",
            Some(&token),
            Some(json!({ "project_id": project_id, "title": "Child", "parent_feature_id": root["id"] })),
        )
        .await;
        assert_eq!(child["parent_feature"]["id"], root["id"]);

        let (status, _) = send(&app, "DELETE", &format!("/api/features/{}", root["id"]), Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);

        let (_, roots) = send(
            &app,
            "GET",
            &format!("/api/projects/{}/features?root_only=true", project_id),
            Some(&token),
            None,
        )
        .await;
        let roots = roots.as_array().unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0]["id"], child["id"]);
        assert!(roots[0]["parent_feature"].is_null());
    }

    #[tokio::test]
    async fn project_update_is_owner_only() {
        let app = test_app();
        let (owner, _) = signup(&app, "ivan").await;
        let (other, _) = signup(&app, "judy").await;
        let project_id = create_project(&app, &owner).await;

        let (status, _) = send(
            &app,
            "PUT",
            &format!("/api/projects/{}", project_id),
            Some(&other),
            Some(json!({ "name": "Mine now" })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (_, listed) = send(&app, "GET", "/api/projects", Some(&other), None).await;
        assert!(listed.as_array().unwrap().is_empty());
    }
}
