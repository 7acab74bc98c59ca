//! Handoff API server lifecycle: bind, serve, sweep, shut down.
//!
//! bind → spawn background tasks → return handle with shutdown channel.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::api::router::handoff_router;
use crate::core_state::{CoreError, CoreState};

/// Handle to a running handoff server.
pub struct HandoffServer {
    addr: SocketAddr,
    started_at: String,
    shutdown_tx: Option<watch::Sender<bool>>,
}

impl HandoffServer {
    /// Address actually bound (resolves port 0).
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn started_at(&self) -> &str {
        &self.started_at
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Shut down the server and the sweep task gracefully.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(true);
            tracing::info!("Handoff server shutdown signal sent");
        }
    }
}

impl Drop for HandoffServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Start the handoff API server on `addr`.
///
/// Serves with peer connect info so the rate limiter can key on client IP.
/// A background task purges stale snapshots and old audit events every
/// `sweep_interval_secs`.
pub async fn start_server_on(
    core: Arc<CoreState>,
    addr: SocketAddr,
) -> Result<HandoffServer, CoreError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| CoreError::Server(format!("Failed to bind {addr}: {e}")))?;

    let addr = listener
        .local_addr()
        .map_err(|e| CoreError::Server(format!("Failed to get server address: {e}")))?;

    let app = handoff_router(core.clone());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut server_rx = shutdown_rx.clone();
    tokio::spawn(async move {
        let shutdown_signal = async move {
            let _ = server_rx.wait_for(|stop| *stop).await;
            tracing::info!("Handoff server received shutdown signal");
        };

        tracing::info!(%addr, "Handoff server started");

        if let Err(e) = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal)
        .await
        {
            tracing::error!("Handoff server error: {e}");
        }

        tracing::info!("Handoff server stopped");
    });

    let interval = Duration::from_secs(core.config.sweep_interval_secs.max(1));
    tokio::spawn(sweep_loop(core, interval, shutdown_rx));

    Ok(HandoffServer {
        addr,
        started_at: chrono::Utc::now().to_rfc3339(),
        shutdown_tx: Some(shutdown_tx),
    })
}

async fn sweep_loop(core: Arc<CoreState>, interval: Duration, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(interval);
    // First tick completes immediately; skip it so startup isn't a sweep.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let core = core.clone();
                match tokio::task::spawn_blocking(move || core.sweep()).await {
                    Ok(Ok(_)) => {}
                    Ok(Err(e)) => tracing::warn!(error = %e, "Token sweep failed"),
                    Err(e) => tracing::warn!(error = %e, "Token sweep task panicked"),
                }
            }
            // Only `true` is ever sent; a dropped sender also stops the loop.
            _ = shutdown.changed() => break,
        }
    }

    tracing::debug!("Sweep task stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HandoffConfig, DEFAULT_DOCTOR_TOKEN};

    fn test_core() -> Arc<CoreState> {
        Arc::new(CoreState::in_memory(HandoffConfig::default()).unwrap())
    }

    fn loopback() -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 0))
    }

    #[tokio::test]
    async fn start_and_stop_server() {
        let mut server = start_server_on(test_core(), loopback())
            .await
            .expect("server should start");

        assert!(server.addr().port() > 0);
        assert!(!server.started_at().is_empty());

        let resp = reqwest::get(format!("{}/api/health", server.base_url()))
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);

        server.shutdown();
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn server_serves_api_routes() {
        let mut server = start_server_on(test_core(), loopback())
            .await
            .expect("server should start");
        let base = server.base_url();

        let resp = reqwest::get(format!("{base}/nonexistent")).await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);

        let resp = reqwest::get(format!("{base}/api/pharmacy/prescription/DEMO-002"))
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);

        let client = reqwest::Client::new();
        let resp = client
            .post(format!("{base}/api/pharmacy/revoke-token"))
            .json(&serde_json::json!({ "token": "MS-RX-ABC234" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);

        let resp = client
            .post(format!("{base}/api/pharmacy/revoke-token"))
            .bearer_auth(DEFAULT_DOCTOR_TOKEN)
            .json(&serde_json::json!({ "token": "MS-RX-ABC234" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);

        server.shutdown();
    }

    #[tokio::test]
    async fn bind_conflict_is_server_error() {
        let mut first = start_server_on(test_core(), loopback()).await.unwrap();
        let result = start_server_on(test_core(), first.addr()).await;
        assert!(matches!(result, Err(CoreError::Server(_))));
        first.shutdown();
    }

    #[tokio::test]
    async fn sweep_task_runs_and_stops() {
        use crate::models::PrescriptionDetails;
        use crate::pharmacy::TokenError;

        let core = Arc::new(
            CoreState::in_memory(HandoffConfig {
                sweep_interval_secs: 1,
                retention_days: 1,
                ..HandoffConfig::default()
            })
            .unwrap(),
        );
        let details = PrescriptionDetails {
            patient_name: Some("Grace Okoro".into()),
            prescription_text: Some("Amoxicillin 500mg TDS for 7 days".into()),
            ..Default::default()
        };
        let issued_at = chrono::Utc::now() - chrono::Duration::hours(72);
        let record = core
            .store()
            .issue_at("42", &details, issued_at, &mut rand::thread_rng())
            .unwrap();

        let mut server = start_server_on(core.clone(), loopback()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(2500)).await;

        // Already purged by the background task
        assert_eq!(core.sweep().unwrap().snapshots_purged, 0);
        assert!(matches!(core.redeem(&record.token), Err(TokenError::Expired)));

        server.shutdown();
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn shutdown_is_idempotent() {
        let mut server = start_server_on(test_core(), loopback()).await.unwrap();
        server.shutdown();
        server.shutdown();
    }
}
