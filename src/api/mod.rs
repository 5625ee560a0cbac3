pub mod games;
pub mod health;

use crate::config::Config;
use crate::orchestration::SettlementService;
use axum::{routing::get, Router};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<SettlementService>,
    pub config: Config,
    /// Cancelled on shutdown; each request works under a child token.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(service: Arc<SettlementService>, config: Config) -> Self {
        Self {
            service,
            config,
            shutdown: CancellationToken::new(),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/games/:id/settlement", get(games::get_settlement))
        .route("/v1/games/:id/phase", get(games::get_phase))
        .route("/v1/games/:id/winner", get(games::get_winner))
        .layer(cors)
        .with_state(state)
}
