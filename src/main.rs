use anyhow::Context;
use coinleague_settlement::{
    api, Config, LedgerSource, PriceOracle, RpcLedger, RpcPriceOracle, SettlementService,
};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    let config = Config::from_env().context("Configuration error")?;
    let port = config.port;

    let ledger: Arc<dyn LedgerSource> =
        Arc::new(RpcLedger::new(config.ledger_rpc_url.clone()));
    let oracle: Arc<dyn PriceOracle> = Arc::new(RpcPriceOracle::new(config.oracle_rpc_url.clone()));
    let service = Arc::new(SettlementService::new(ledger, oracle, config.clone()));

    let state = api::AppState::new(service, config);
    let shutdown = state.shutdown.clone();
    let app = api::create_router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            tracing::info!("Shutting down");
            shutdown.cancel();
        })
        .await
        .context("Server error")?;

    Ok(())
}
