use std::{collections::HashMap, sync::Arc};

use chrono::Utc;
use ethers::types::U256;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::{
    sync::RwLock,
    task::JoinHandle,
    time::{self, Duration},
};
use tracing::{debug, info, warn};

use crate::{
    amount::amount_math::{FixedAmount, multiply_amounts},
    error::{BridgeError, BridgeResult},
    models::model::Token,
};

pub const DEFAULT_PRICE_FEED_URL: &str = "https://api.coingecko.com/api/v3";

/// Fiat amounts are expressed in USD with this many decimals.
pub const FIAT_DECIMALS: u8 = 2;
const RATE_DECIMALS: u8 = 8;
const MAX_PRICE_AGE_SECS: i64 = 10 * 60;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PriceData {
    pub price: f64,
    pub timestamp: i64,
}

/// USD prices per token symbol, refreshed in the background.
pub struct PriceFeedManager {
    base_url: String,
    cache: Arc<RwLock<HashMap<String, PriceData>>>,
    client: Client,
}

impl PriceFeedManager {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            cache: Arc::new(RwLock::new(HashMap::new())),
            client: Client::new(),
        }
    }

    fn coingecko_id(symbol: &str) -> Option<&'static str> {
        match symbol.to_uppercase().as_str() {
            "ETH" | "WETH" => Some("ethereum"),
            "USDC" => Some("usd-coin"),
            "USDT" => Some("tether"),
            "DAI" => Some("dai"),
            "WBTC" => Some("wrapped-bitcoin"),
            "MATIC" | "POL" => Some("matic-network"),
            _ => None,
        }
    }

    /// Fetches every symbol once, then keeps refreshing every `period`.
    pub async fn start(self: Arc<Self>, symbols: Vec<String>, period: Duration) -> JoinHandle<()> {
        info!("🔄 Initializing price feeds for {} tokens", symbols.len());
        self.update_all(&symbols).await;

        let manager = self.clone();
        let handle = tokio::spawn(async move {
            let mut interval = time::interval(period);
            interval.tick().await;

            loop {
                interval.tick().await;
                manager.update_all(&symbols).await;
            }
        });

        info!(
            "✅ Background price feed updates started ({}s interval)",
            period.as_secs()
        );
        handle
    }

    async fn update_all(&self, symbols: &[String]) {
        for symbol in symbols {
            match self.fetch_usd_price(symbol).await {
                Ok(price) => self.set_price(symbol, price).await,
                Err(e) => warn!("Failed to update {}-USD: {}", symbol, e),
            }
        }
    }

    async fn fetch_usd_price(&self, symbol: &str) -> BridgeResult<f64> {
        let id = Self::coingecko_id(symbol)
            .ok_or_else(|| BridgeError::NotFound(format!("no price source for {}", symbol)))?;
        let url = format!("{}/simple/price?ids={}&vs_currencies=usd", self.base_url, id);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(BridgeError::Indexer(format!(
                "price API error: {}",
                response.status()
            )));
        }

        let data: serde_json::Value = response.json().await?;
        data[id]["usd"]
            .as_f64()
            .ok_or_else(|| BridgeError::Schema("Invalid price format".to_string()))
    }

    pub async fn set_price(&self, symbol: &str, price: f64) {
        debug!("💵 {}-USD = {:.4}", symbol, price);
        self.cache.write().await.insert(
            symbol.to_uppercase(),
            PriceData {
                price,
                timestamp: Utc::now().timestamp(),
            },
        );
    }

    /// Latest known USD price, ignoring entries that went stale.
    pub async fn get_price(&self, symbol: &str) -> Option<f64> {
        let cache = self.cache.read().await;
        let data = cache.get(&symbol.to_uppercase())?;

        if Utc::now().timestamp() - data.timestamp > MAX_PRICE_AGE_SECS {
            return None;
        }
        Some(data.price)
    }

    /// USD value of `amount` of `token`, scaled by [`FIAT_DECIMALS`].
    pub async fn fiat_amount(&self, token: &Token, amount: U256) -> Option<U256> {
        let price = self.get_price(&token.symbol).await?;
        let rate = FixedAmount::from_f64(price, RATE_DECIMALS).ok()?;

        multiply_amounts(FixedAmount::new(amount, token.decimals), rate, FIAT_DECIMALS)
    }
}
