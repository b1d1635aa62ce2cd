//! Process-wide configuration, read once at startup from environment
//! variables.

use tracing::warn;

use crate::errors::InitError;
use crate::submission::BackoffConfig;

const DEFAULT_RPC_URL: &str = "http://localhost:8545";
const DEFAULT_CONTRACT_ADDRESS: &str = "0x0000000000000000000000000000000000000000";
const DEFAULT_MAX_BATCH: usize = 50;

/// Configuration assembled from environment variables at process startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub rpc_url: String,
    pub contract_address: String,
    pub private_key: Option<String>,
    pub backoff: BackoffConfig,
    pub bls_keys: Vec<String>,
    pub max_batch: usize,
}

impl Config {
    /// Load from the environment. Missing `PRIVATE_KEY` is not fatal here
    /// — the decision of whether a missing key is acceptable (e.g. a dev
    /// run against a mock chain client) belongs to the binary, which calls
    /// [`Self::require_private_key`] once it knows its run mode.
    pub fn load() -> Self {
        let rpc_url = std::env::var("RPC_URL").unwrap_or_else(|_| DEFAULT_RPC_URL.to_string());

        let contract_address = std::env::var("CONTRACT_ADDRESS")
            .or_else(|_| std::env::var("SETTLEMENT_CONTRACT_ADDRESS"))
            .unwrap_or_else(|_| {
                warn!(
                    default = DEFAULT_CONTRACT_ADDRESS,
                    "CONTRACT_ADDRESS not set, using dev default"
                );
                DEFAULT_CONTRACT_ADDRESS.to_string()
            });

        let private_key = std::env::var("PRIVATE_KEY").ok();

        let max_retries = std::env::var("MAX_RETRIES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5);
        let backoff_ms = std::env::var("BACKOFF_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(200);
        let backoff = BackoffConfig::clamped(backoff_ms, max_retries);

        let bls_keys = std::env::var("BLS_KEYS")
            .ok()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let max_batch = std::env::var("MAX_BATCH")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_BATCH);

        Self {
            rpc_url,
            contract_address,
            private_key,
            backoff,
            bls_keys,
            max_batch,
        }
    }

    /// Fatal if no signing key is present; callers in production mode must
    /// invoke this before bringing up a chain client.
    pub fn require_private_key(&self) -> Result<&str, InitError> {
        self.private_key
            .as_deref()
            .ok_or(InitError::MissingConfig("PRIVATE_KEY"))
    }

    pub fn parse_contract_address(&self) -> Result<ethers::types::Address, InitError> {
        self.contract_address
            .parse()
            .map_err(|_| InitError::InvalidContractAddress(self.contract_address.clone()))
    }
}
