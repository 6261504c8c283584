pub mod auth;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod types;

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use crate::auth::token::DEFAULT_TOKEN_TTL_HOURS;
use crate::db::Database;

pub use auth::{generate_token, AuthUser};
pub use state::AppState;
pub use error::{ApiError, AppError, ApiResult, ErrorCode};

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub port: u16,
    pub host: [u8; 4],
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: [127, 0, 0, 1],
            jwt_secret: generate_token(),
            token_ttl_hours: DEFAULT_TOKEN_TTL_HOURS,
        }
    }
}

/// Server handle for managing the running server
pub struct ServerHandle {
    pub addr: SocketAddr,
    pub shutdown_tx: oneshot::Sender<()>,
}

impl ServerHandle {
    pub fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
    }
}

/// Start the API server
pub async fn start_server(
    db: Arc<Database>,
    config: ApiConfig,
) -> Result<ServerHandle, Box<dyn std::error::Error + Send + Sync>> {
    let state = AppState::new(db, &config);
    start_server_with_state(config, state).await
}

/// Start the API server with a pre-configured AppState
pub async fn start_server_with_state(
    config: ApiConfig,
    state: AppState,
) -> Result<ServerHandle, Box<dyn std::error::Error + Send + Sync>> {
    let router = routes::create_router(state);

    let addr = SocketAddr::from((config.host, config.port));
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    tracing::info!("API server listening on http://{}", actual_addr);

    tokio::spawn(async move {
        let served = axum::serve(listener, router)
            .with_graceful_shutdown(async {
                shutdown_rx.await.ok();
                tracing::info!("API server shutting down");
            })
            .await;
        if let Err(e) = served {
            tracing::error!("API server error: {}", e);
        }
    });

    Ok(ServerHandle {
        addr: actual_addr,
        shutdown_tx,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn server_binds_and_shuts_down() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let config = ApiConfig {
            port: 0,
            ..ApiConfig::default()
        };

        let handle = start_server(db, config).await.unwrap();
        assert_ne!(handle.addr.port(), 0);

        let stream = tokio::net::TcpStream::connect(handle.addr).await;
        assert!(stream.is_ok());
        handle.shutdown();
    }
}
