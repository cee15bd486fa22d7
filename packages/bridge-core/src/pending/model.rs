use chrono::{DateTime, TimeZone, Utc};
use ethers::types::Address;
use serde::{Deserialize, Serialize};

use crate::{
    amount::amount_math::{format_token_amount, parse_token_amount},
    error::{BridgeError, BridgeResult},
    models::model::{PendingTx, PendingTxKind, Token, normalize_hash},
    registry::chain_registry::ChainRegistry,
};

pub const SCHEMA_VERSION: u32 = 1;

/// Persisted document for one account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredPendingTxs {
    pub version: u32,
    /// Kept as raw values so one bad record does not poison the rest.
    pub txs: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StoredPendingTxType {
    PendingDeposit,
    PendingClaim,
}

/// Serialized pending tx: chains by network id, amount as a decimal string
/// scaled by the token's decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredPendingTx {
    #[serde(rename = "type")]
    pub tx_type: StoredPendingTxType,
    pub deposit_tx_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claim_tx_hash: Option<String>,
    pub from: u32,
    pub to: u32,
    pub token: Token,
    pub amount: String,
    pub destination_address: Address,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl TryFrom<&PendingTx> for StoredPendingTx {
    type Error = BridgeError;

    fn try_from(tx: &PendingTx) -> BridgeResult<Self> {
        let (tx_type, claim_tx_hash) = match &tx.kind {
            PendingTxKind::Deposit => (StoredPendingTxType::PendingDeposit, None),
            PendingTxKind::Claim { claim_tx_hash } => {
                (StoredPendingTxType::PendingClaim, Some(claim_tx_hash.clone()))
            }
        };

        Ok(Self {
            tx_type,
            deposit_tx_hash: tx.deposit_tx_hash.clone(),
            claim_tx_hash,
            from: tx.from.network_id,
            to: tx.to.network_id,
            token: tx.token.clone(),
            amount: format_token_amount(tx.amount, tx.token.decimals)?,
            destination_address: tx.destination_address,
            timestamp: tx.timestamp.timestamp_millis(),
        })
    }
}

impl StoredPendingTx {
    /// Re-resolves network ids against the live registry; fails closed.
    pub fn resolve(self, chains: &ChainRegistry) -> BridgeResult<PendingTx> {
        let kind = match (self.tx_type, self.claim_tx_hash) {
            (StoredPendingTxType::PendingDeposit, _) => PendingTxKind::Deposit,
            (StoredPendingTxType::PendingClaim, Some(hash)) => PendingTxKind::Claim {
                claim_tx_hash: normalize_hash(&hash),
            },
            (StoredPendingTxType::PendingClaim, None) => {
                return Err(BridgeError::Storage(
                    "pending claim without claim tx hash".to_string(),
                ));
            }
        };
        let timestamp: DateTime<Utc> = Utc
            .timestamp_millis_opt(self.timestamp)
            .single()
            .ok_or_else(|| BridgeError::Storage(format!("invalid timestamp {}", self.timestamp)))?;

        Ok(PendingTx {
            kind,
            deposit_tx_hash: normalize_hash(&self.deposit_tx_hash),
            from: chains.by_network_id(self.from)?.clone(),
            to: chains.by_network_id(self.to)?.clone(),
            amount: parse_token_amount(&self.amount, self.token.decimals)?,
            token: self.token,
            destination_address: self.destination_address,
            timestamp,
        })
    }
}
