use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

use taskfund_backend::api::{build_router, AppState};
use taskfund_backend::config::AppConfig;
use taskfund_backend::database::init_store;
use taskfund_backend::logging::{init_tracing, mask_value};
use taskfund_backend::payments::{PaymentGateway, UpayGateway};

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    init_tracing(&config.logging);
    config.validate()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        storage = ?config.storage.backend,
        "Starting TaskFund backend"
    );
    info!(
        app_id = %mask_value(&config.upay.app_id),
        base_url = %config.upay.base_url,
        notify_url = %config.upay.notify_url(),
        timeout_secs = config.upay.timeout_secs,
        "UPay configuration loaded"
    );
    if config.admin.admin_user_ids.is_empty() {
        warn!("ADMIN_USER_IDS is empty; admin routes will refuse every caller");
    }

    let store = init_store(&config.storage).await.map_err(|e| {
        error!(error = %e, "Failed to initialize store");
        e
    })?;
    info!(backend = store.backend_name(), "Store ready");

    let gateway: Arc<dyn PaymentGateway> = Arc::new(UpayGateway::new(config.upay.clone())?);

    let state = AppState::new(
        store,
        gateway,
        config.admin.clone(),
        config.upay.fiat_currency.clone(),
    );
    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        error!("Failed to bind to address {}: {}", addr, e);
        e
    })?;

    info!(address = %addr, "Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");

    Ok(())
}
