use std::sync::Arc;

use chrono::Duration;

use crate::auth::TokenSigner;
use crate::db::Database;
use crate::storage::{ContentStore, SqliteContentStore};

use super::ApiConfig;

/// Shared application state for the API server
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub tokens: Arc<TokenSigner>,
    pub files: Arc<dyn ContentStore>,
}

impl AppState {
    /// State backed by `db` for records and attachment bytes alike.
    pub fn new(db: Arc<Database>, config: &ApiConfig) -> Self {
        let files = Arc::new(SqliteContentStore::new(db.clone()));
        Self::with_store(db, config, files)
    }

    pub fn with_store(db: Arc<Database>, config: &ApiConfig, files: Arc<dyn ContentStore>) -> Self {
        let tokens = TokenSigner::new(
            config.jwt_secret.as_bytes(),
            Duration::hours(config.token_ttl_hours),
        );
        Self {
            db,
            tokens: Arc::new(tokens),
            files,
        }
    }
}
