use std::sync::Arc;

use anyhow::Context;

use featureplus::{api, config::Config, db, logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    let _log_guard = match logging::init_logging(&config.log_dir) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            None
        }
    };

    if config.jwt_secret_generated {
        tracing::warn!(
            "FEATUREPLUS_JWT_SECRET is not set; using a random secret, sessions end on restart"
        );
    }

    let database = db::Database::open(config.db_path.clone())
        .with_context(|| format!("Failed to open database at {:?}", config.db_path))?;

    let handle = api::start_server(Arc::new(database), config.api.clone())
        .await
        .map_err(|e| anyhow::anyhow!("Failed to start API server: {}", e))?;

    tracing::info!("Listening on http://{}", handle.addr);

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    tracing::info!("Shutdown requested");
    handle.shutdown();
    Ok(())
}
