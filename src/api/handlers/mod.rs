mod attachments;
mod auth;
mod comments;
mod features;
mod projects;
mod sub_features;
mod tags;
mod tasks;
mod users;

pub use attachments::*;
pub use auth::*;
pub use comments::*;
pub use features::*;
pub use projects::*;
pub use sub_features::*;
pub use tags::*;
pub use tasks::*;
pub use users::*;

use axum::Json;

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
