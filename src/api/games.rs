use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::{Address, GameId, Timestamp, WinnerRecord};
use crate::engine::{ClaimEligibility, LifecycleReport, Settlement};
use crate::error::AppError;
use super::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseQuery {
    /// Evaluation time in unix seconds; defaults to now.
    pub at: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WinnerQuery {
    pub account: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseResponse {
    pub game_id: GameId,
    pub evaluated_at: Timestamp,
    #[serde(flatten)]
    pub report: LifecycleReport,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WinnerResponse {
    pub game_id: GameId,
    pub account: Address,
    /// Absent until the ledger has recorded a winner for this account.
    pub winner: Option<WinnerRecord>,
    pub eligibility: ClaimEligibility,
}

pub async fn get_settlement(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Settlement>, AppError> {
    let game_id = parse_game_id(&id)?;
    let cancel = state.shutdown.child_token();
    let settlement = state
        .service
        .aggregate_settlement_with_retry(game_id, &cancel)
        .await?;
    Ok(Json(settlement))
}

pub async fn get_phase(
    Path(id): Path<String>,
    Query(params): Query<PhaseQuery>,
    State(state): State<AppState>,
) -> Result<Json<PhaseResponse>, AppError> {
    let game_id = parse_game_id(&id)?;
    let now = params.at.map(Timestamp::new).unwrap_or_else(Timestamp::now);
    let cancel = state.shutdown.child_token();
    let report = state.service.lifecycle(game_id, now, &cancel).await?;
    Ok(Json(PhaseResponse {
        game_id,
        evaluated_at: now,
        report,
    }))
}

pub async fn get_winner(
    Path(id): Path<String>,
    Query(params): Query<WinnerQuery>,
    State(state): State<AppState>,
) -> Result<Json<WinnerResponse>, AppError> {
    let game_id = parse_game_id(&id)?;
    let account = parse_account(&params.account)?;
    let cancel = state.shutdown.child_token();
    let (winner, eligibility) = state
        .service
        .claim_status(game_id, &account, &cancel)
        .await?;
    Ok(Json(WinnerResponse {
        game_id,
        account,
        winner,
        eligibility,
    }))
}

fn parse_game_id(raw: &str) -> Result<GameId, AppError> {
    raw.parse::<u64>()
        .map(GameId::new)
        .map_err(|_| AppError::BadRequest("Invalid game id".to_string()))
}

fn parse_account(raw: &str) -> Result<Address, AppError> {
    Address::from_str(raw).map_err(|e| AppError::BadRequest(format!("Invalid account: {}", e)))
}
