use axum::extract::State;
use axum::Json;

use super::AppState;

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Reports the configured endpoints; does not probe them.
pub async fn ready(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ready",
        "ledgerRpcUrl": state.config.ledger_rpc_url,
        "oracleRpcUrl": state.config.oracle_rpc_url,
    }))
}
