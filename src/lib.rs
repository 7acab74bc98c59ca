pub mod api;
pub mod client;
pub mod config;
pub mod core_state; // Transport-agnostic state
pub mod db;
pub mod intake; // Free-text patient intake
pub mod models;
pub mod pharmacy; // Token issue/revoke/redeem

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::core_state::{CoreError, CoreState};

/// Start the handoff server and block until Ctrl-C.
pub async fn run() -> Result<(), CoreError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = config::HandoffConfig::from_env()?;
    if config.uses_default_credential() {
        tracing::warn!(
            "RX_HANDOFF_DOCTOR_TOKEN is unset; the shipped demo credential is accepted for issue/revoke"
        );
    }

    let bind_addr = config.bind_addr;
    let core = Arc::new(CoreState::open(config)?);
    let mut server = api::start_server_on(core, bind_addr).await?;
    tracing::info!(addr = %server.addr(), "Listening");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Cannot listen for shutdown signal: {e}");
    }
    server.shutdown();
    // Let in-flight requests drain.
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    Ok(())
}
