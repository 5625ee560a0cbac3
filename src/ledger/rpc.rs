//! JSON-RPC 2.0 client for the ledger gateway and the price oracle.
//!
//! Each logical query type is sent as one batch request, so reading N players costs one
//! round trip rather than N.

use super::{
    LedgerError, LedgerSource, OracleError, PriceOracle, RawCoinFeed, RawGame, RawPlayer,
    RawWinner,
};
use crate::domain::{Address, Decimal, GameId};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

/// Thin JSON-RPC transport. Does not retry.
#[derive(Debug, Clone)]
pub struct JsonRpcClient {
    client: Client,
    url: String,
}

impl JsonRpcClient {
    pub fn new(url: String) -> Self {
        Self {
            client: Client::new(),
            url,
        }
    }

    /// Send all calls as a single batch and return the results in call order.
    pub async fn call_batch(&self, calls: &[(&str, Value)]) -> Result<Vec<Value>, LedgerError> {
        if calls.is_empty() {
            return Ok(Vec::new());
        }

        let payload = build_batch(calls);
        debug!(url = %self.url, calls = calls.len(), "Sending JSON-RPC batch");

        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| LedgerError::Network(e.to_string()))?;

        let status = response.status();
        if status == 429 {
            return Err(LedgerError::Http {
                status: status.as_u16(),
                message: "Rate limited".to_string(),
            });
        }
        if status.is_server_error() {
            return Err(LedgerError::Http {
                status: status.as_u16(),
                message: "Server error".to_string(),
            });
        }
        if !status.is_success() {
            return Err(LedgerError::Http {
                status: status.as_u16(),
                message: "Client error".to_string(),
            });
        }

        let body = response
            .json::<Value>()
            .await
            .map_err(|e| LedgerError::Parse(e.to_string()))?;

        decode_batch_response(body, calls.len())
    }

    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, LedgerError> {
        let mut results = self.call_batch(&[(method, params)]).await?;
        let value = results
            .pop()
            .ok_or_else(|| LedgerError::Parse("Empty batch response".to_string()))?;
        decode_result(value)
    }
}

fn build_batch(calls: &[(&str, Value)]) -> Value {
    Value::Array(
        calls
            .iter()
            .enumerate()
            .map(|(id, (method, params))| {
                serde_json::json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "method": method,
                    "params": params,
                })
            })
            .collect(),
    )
}

/// Match batch responses to requests by id; servers may answer out of order.
fn decode_batch_response(body: Value, expected: usize) -> Result<Vec<Value>, LedgerError> {
    let entries = body
        .as_array()
        .ok_or_else(|| LedgerError::Parse("Expected array response".to_string()))?;

    let mut results: Vec<Option<Value>> = vec![None; expected];
    for entry in entries {
        let id = entry
            .get("id")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| LedgerError::Parse("Missing id field".to_string()))? as usize;

        if id >= expected {
            return Err(LedgerError::Parse(format!("Unexpected response id {}", id)));
        }

        if let Some(error) = entry.get("error") {
            return Err(LedgerError::Rpc {
                code: error.get("code").and_then(|v| v.as_i64()).unwrap_or(0),
                message: error
                    .get("message")
                    .and_then(|v| v.as_str())
                    .unwrap_or("unknown error")
                    .to_string(),
            });
        }

        let result = entry
            .get("result")
            .cloned()
            .ok_or_else(|| LedgerError::Parse(format!("Missing result for id {}", id)))?;
        results[id] = Some(result);
    }

    results
        .into_iter()
        .enumerate()
        .map(|(id, r)| r.ok_or_else(|| LedgerError::Parse(format!("No response for id {}", id))))
        .collect()
}

fn decode_result<T: DeserializeOwned>(value: Value) -> Result<T, LedgerError> {
    serde_json::from_value(value).map_err(|e| LedgerError::Parse(e.to_string()))
}

/// Ledger gateway speaking the `coinleague_*` JSON-RPC methods.
#[derive(Debug, Clone)]
pub struct RpcLedger {
    rpc: JsonRpcClient,
}

impl RpcLedger {
    pub fn new(url: String) -> Self {
        Self {
            rpc: JsonRpcClient::new(url),
        }
    }
}

#[async_trait]
impl LedgerSource for RpcLedger {
    async fn fetch_game(&self, game_id: GameId) -> Result<Option<RawGame>, LedgerError> {
        debug!(game_id = %game_id, "Fetching game record");
        self.rpc
            .call("coinleague_getGame", serde_json::json!([game_id.as_u64().to_string()]))
            .await
    }

    async fn fetch_players(&self, game_id: GameId) -> Result<Vec<RawPlayer>, LedgerError> {
        debug!(game_id = %game_id, "Fetching players");
        self.rpc
            .call("coinleague_getPlayers", serde_json::json!([game_id.as_u64().to_string()]))
            .await
    }

    async fn fetch_player_coin_feeds(
        &self,
        game_id: GameId,
        player_indexes: &[usize],
    ) -> Result<Vec<Vec<String>>, LedgerError> {
        debug!(game_id = %game_id, players = player_indexes.len(), "Fetching player coin feeds");
        let calls: Vec<(&str, Value)> = player_indexes
            .iter()
            .map(|index| {
                (
                    "coinleague_getPlayerCoinFeeds",
                    serde_json::json!([index.to_string(), game_id.as_u64().to_string()]),
                )
            })
            .collect();

        self.rpc
            .call_batch(&calls)
            .await?
            .into_iter()
            .map(decode_result)
            .collect()
    }

    async fn fetch_coin_feeds(
        &self,
        game_id: GameId,
        feeds: &[Address],
    ) -> Result<Vec<RawCoinFeed>, LedgerError> {
        debug!(game_id = %game_id, feeds = feeds.len(), "Fetching coin feed details");
        let calls: Vec<(&str, Value)> = feeds
            .iter()
            .map(|feed| {
                (
                    "coinleague_getCoinFeed",
                    serde_json::json!([feed.as_str(), game_id.as_u64().to_string()]),
                )
            })
            .collect();

        self.rpc
            .call_batch(&calls)
            .await?
            .into_iter()
            .map(decode_result)
            .collect()
    }

    async fn fetch_winner(
        &self,
        game_id: GameId,
        account: &Address,
    ) -> Result<RawWinner, LedgerError> {
        debug!(game_id = %game_id, account = %account, "Fetching winner record");
        self.rpc
            .call(
                "coinleague_getWinner",
                serde_json::json!([game_id.as_u64().to_string(), account.as_str()]),
            )
            .await
    }
}

/// Price oracle reached over the same JSON-RPC transport.
#[derive(Debug, Clone)]
pub struct RpcPriceOracle {
    rpc: JsonRpcClient,
}

impl RpcPriceOracle {
    pub fn new(url: String) -> Self {
        Self {
            rpc: JsonRpcClient::new(url),
        }
    }
}

#[async_trait]
impl PriceOracle for RpcPriceOracle {
    async fn current_price(&self, feed: &Address) -> Result<Decimal, OracleError> {
        debug!(feed = %feed, "Fetching current price");
        let raw: String = self
            .rpc
            .call("oracle_latestPrice", serde_json::json!([feed.as_str()]))
            .await?;
        Decimal::from_ledger_int(&raw).map_err(|e| OracleError::InvalidPrice(e.to_string()))
    }
}
