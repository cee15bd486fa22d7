use std::{env, path::PathBuf};

use anyhow::{Result, anyhow};
use ethers::types::Address;
use serde::{Deserialize, Serialize};

use crate::{
    amount::amount_math::MAX_DECIMALS,
    models::model::{Chain, NativeCurrency},
    registry::chain_registry::ChainRegistry,
};

pub const DEFAULT_POLLING_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_PENDING_TX_TIMEOUT_SECS: u64 = 30 * 60;
pub const DEFAULT_GAS_LIMIT_BUFFER_PERCENT: u64 = 20;

/// Environment the core runs against: the two chains and the indexer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Env {
    pub bridge_api_url: String,
    pub l1: Chain,
    pub l2: Chain,
    #[serde(default = "default_polling_interval")]
    pub polling_interval_secs: u64,
    #[serde(default = "default_pending_tx_timeout")]
    pub pending_tx_timeout_secs: u64,
    #[serde(default = "default_gas_limit_buffer")]
    pub gas_limit_buffer_percent: u64,
    #[serde(default)]
    pub pending_store_path: Option<PathBuf>,
    #[serde(default)]
    pub price_feed_url: Option<String>,
}

fn default_polling_interval() -> u64 {
    DEFAULT_POLLING_INTERVAL_SECS
}

fn default_pending_tx_timeout() -> u64 {
    DEFAULT_PENDING_TX_TIMEOUT_SECS
}

fn default_gas_limit_buffer() -> u64 {
    DEFAULT_GAS_LIMIT_BUFFER_PERCENT
}

impl Env {
    pub fn from_file(path: PathBuf) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read config file: {}", e))?;

        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(contents).map_err(|e| anyhow!("Failed to parse config: {}", e))?;
        config.validate()?;

        Ok(config)
    }

    pub fn from_env() -> Result<Self> {
        let config = Env {
            bridge_api_url: env::var("BRIDGE_API_URL")
                .map_err(|_| anyhow!("BRIDGE_API_URL must be set"))?,
            l1: chain_from_env("L1", "ethereum", "Ethereum", 0)?,
            l2: chain_from_env("L2", "polygon-zkevm", "Polygon zkEVM", 1)?,
            polling_interval_secs: env::var("POLLING_INTERVAL_SECS")
                .unwrap_or_else(|_| DEFAULT_POLLING_INTERVAL_SECS.to_string())
                .parse()
                .map_err(|e| anyhow!("Invalid POLLING_INTERVAL_SECS: {}", e))?,
            pending_tx_timeout_secs: env::var("PENDING_TX_TIMEOUT_SECS")
                .unwrap_or_else(|_| DEFAULT_PENDING_TX_TIMEOUT_SECS.to_string())
                .parse()
                .map_err(|e| anyhow!("Invalid PENDING_TX_TIMEOUT_SECS: {}", e))?,
            gas_limit_buffer_percent: env::var("GAS_LIMIT_BUFFER_PERCENT")
                .unwrap_or_else(|_| DEFAULT_GAS_LIMIT_BUFFER_PERCENT.to_string())
                .parse()
                .map_err(|e| anyhow!("Invalid GAS_LIMIT_BUFFER_PERCENT: {}", e))?,
            pending_store_path: env::var("PENDING_STORE_PATH").ok().map(PathBuf::from),
            price_feed_url: env::var("PRICE_FEED_URL").ok(),
        };
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.bridge_api_url.starts_with("http") {
            return Err(anyhow!("Invalid bridge API URL format"));
        }

        for chain in [&self.l1, &self.l2] {
            if !chain.rpc_url.starts_with("http") {
                return Err(anyhow!("Invalid RPC URL format for {}", chain.key));
            }
            if chain.bridge_contract == Address::zero() {
                return Err(anyhow!("Missing bridge contract for {}", chain.key));
            }
            if chain.native_currency.decimals > MAX_DECIMALS {
                return Err(anyhow!(
                    "Native currency of {} has more than {} decimals",
                    chain.key,
                    MAX_DECIMALS
                ));
            }
        }

        if self.l1.network_id == self.l2.network_id {
            return Err(anyhow!(
                "L1 and L2 must have distinct network ids, both are {}",
                self.l1.network_id
            ));
        }

        if self.l1.chain_id == self.l2.chain_id {
            return Err(anyhow!("L1 and L2 must have distinct chain ids"));
        }

        if self.polling_interval_secs == 0 {
            return Err(anyhow!("POLLING_INTERVAL_SECS must be greater than zero"));
        }

        Ok(())
    }

    pub fn chain_registry(&self) -> ChainRegistry {
        ChainRegistry::new(self.l1.clone(), self.l2.clone())
    }

    pub fn indexer_url(&self) -> &str {
        self.bridge_api_url.trim_end_matches('/')
    }
}

fn chain_from_env(
    prefix: &str,
    default_key: &str,
    default_name: &str,
    default_network_id: u32,
) -> Result<Chain> {
    let var = |name: &str| format!("{}_{}", prefix, name);
    let required = |name: &str| {
        env::var(var(name)).map_err(|_| anyhow!("{} must be set", var(name)))
    };

    let bridge_contract = required("BRIDGE_CONTRACT")?;
    if !bridge_contract.starts_with("0x") || bridge_contract.len() != 42 {
        return Err(anyhow!("Invalid {}", var("BRIDGE_CONTRACT")));
    }

    Ok(Chain {
        key: env::var(var("KEY")).unwrap_or_else(|_| default_key.to_string()),
        name: env::var(var("NAME")).unwrap_or_else(|_| default_name.to_string()),
        chain_id: required("CHAIN_ID")?
            .parse()
            .map_err(|e| anyhow!("Invalid {}: {}", var("CHAIN_ID"), e))?,
        network_id: env::var(var("NETWORK_ID"))
            .unwrap_or_else(|_| default_network_id.to_string())
            .parse()
            .map_err(|e| anyhow!("Invalid {}: {}", var("NETWORK_ID"), e))?,
        bridge_contract: bridge_contract
            .parse()
            .map_err(|e| anyhow!("Invalid {}: {}", var("BRIDGE_CONTRACT"), e))?,
        rpc_url: required("RPC_URL")?,
        explorer_url: env::var(var("EXPLORER_URL")).unwrap_or_default(),
        native_currency: NativeCurrency {
            name: "Ether".to_string(),
            symbol: env::var(var("NATIVE_SYMBOL")).unwrap_or_else(|_| "ETH".to_string()),
            decimals: 18,
        },
    })
}
