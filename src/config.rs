use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub ledger_rpc_url: String,
    pub oracle_rpc_url: String,
    pub price_fetch_concurrency: usize,
    pub ledger_retry_max_elapsed_ms: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let ledger_rpc_url = env_map
            .get("LEDGER_RPC_URL")
            .cloned()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnv("LEDGER_RPC_URL".to_string()))?;

        let oracle_rpc_url = env_map
            .get("ORACLE_RPC_URL")
            .cloned()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| ledger_rpc_url.clone());

        let price_fetch_concurrency = env_map
            .get("PRICE_FETCH_CONCURRENCY")
            .map(|s| s.as_str())
            .unwrap_or("8")
            .parse::<usize>()
            .ok()
            .filter(|n| *n >= 1)
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "PRICE_FETCH_CONCURRENCY".to_string(),
                    "must be an integer >= 1".to_string(),
                )
            })?;

        let ledger_retry_max_elapsed_ms = env_map
            .get("LEDGER_RETRY_MAX_ELAPSED_MS")
            .map(|s| s.as_str())
            .unwrap_or("30000")
            .parse::<u64>()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "LEDGER_RETRY_MAX_ELAPSED_MS".to_string(),
                    "must be a valid u64".to_string(),
                )
            })?;

        Ok(Config {
            port,
            ledger_rpc_url,
            oracle_rpc_url,
            price_fetch_concurrency,
            ledger_retry_max_elapsed_ms,
        })
    }

    pub fn ledger_retry_max_elapsed(&self) -> Duration {
        Duration::from_millis(self.ledger_retry_max_elapsed_ms)
    }
}
