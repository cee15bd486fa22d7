use std::time::Duration;

use ethers::types::Address;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::{
    error::{BridgeError, BridgeResult},
    indexer::model::{
        ClaimStatusResponse, ClaimsResponse, DepositsResponse, MerkleProofResponse,
    },
    models::{
        model::{Claim, DepositPage, MerkleProof},
        traits::BridgeIndexer,
    },
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for the bridge indexer REST API.
#[derive(Debug, Clone)]
pub struct HttpIndexerClient {
    base_url: String,
    client: Client,
}

impl HttpIndexerClient {
    pub fn new(base_url: &str) -> BridgeResult<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| BridgeError::Indexer(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> BridgeResult<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!("🔎 GET {} {:?}", url, query);

        let response = self
            .client
            .get(&url)
            .query(query)
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(BridgeError::Indexer(format!(
                "GET {} returned {}",
                path,
                response.status()
            )));
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

impl BridgeIndexer for HttpIndexerClient {
    async fn get_deposits(
        &self,
        address: Address,
        window: Option<(u64, u64)>,
    ) -> BridgeResult<DepositPage> {
        let query = match window {
            Some((limit, offset)) => vec![
                ("limit", limit.to_string()),
                ("offset", offset.to_string()),
            ],
            None => Vec::new(),
        };
        let response: DepositsResponse = self
            .get_json(&format!("/bridges/{:?}", address), &query)
            .await?;

        DepositPage::try_from(response)
    }

    async fn get_claims(&self, address: Address) -> BridgeResult<Vec<Claim>> {
        let response: ClaimsResponse = self.get_json(&format!("/claims/{:?}", address), &[]).await?;

        response
            .claims
            .unwrap_or_default()
            .into_iter()
            .map(Claim::try_from)
            .collect()
    }

    async fn get_claim_status(&self, network_id: u32, deposit_count: u64) -> BridgeResult<bool> {
        let response: ClaimStatusResponse = self
            .get_json(
                "/claim-status",
                &[
                    ("net_id", network_id.to_string()),
                    ("deposit_cnt", deposit_count.to_string()),
                ],
            )
            .await?;

        Ok(response.ready)
    }

    async fn get_merkle_proof(
        &self,
        network_id: u32,
        deposit_count: u64,
    ) -> BridgeResult<MerkleProof> {
        let response: MerkleProofResponse = self
            .get_json(
                "/merkle-proofs",
                &[
                    ("net_id", network_id.to_string()),
                    ("deposit_cnt", deposit_count.to_string()),
                ],
            )
            .await?;

        MerkleProof::try_from(response.proof)
    }
}
