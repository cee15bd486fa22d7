use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use ethers::types::{Address, H256, U256};
use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

// ============================================================================
// CHAINS & TOKENS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chain {
    pub key: String,
    pub name: String,
    pub chain_id: u64,
    pub network_id: u32,
    pub bridge_contract: Address,
    pub rpc_url: String,
    pub explorer_url: String,
    pub native_currency: NativeCurrency,
}

impl Chain {
    pub fn explorer_tx_url(&self, tx_hash: &str) -> String {
        format!("{}/tx/{}", self.explorer_url.trim_end_matches('/'), tx_hash)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WrappedToken {
    pub address: Address,
    pub chain_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub address: Address,
    pub chain_id: u64,
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
    #[serde(default)]
    pub logo_uri: String,
    #[serde(default)]
    pub wrapped_token: Option<WrappedToken>,
}

impl Token {
    /// The native gas asset is represented by the zero address.
    pub fn is_native(&self) -> bool {
        self.address == Address::zero()
    }
}

// ============================================================================
// INDEXER ENTITIES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deposit {
    pub token_address: Address,
    pub token_network_id: u32,
    pub network_id: u32,
    pub destination_network_id: u32,
    pub destination_address: Address,
    pub amount: U256,
    pub deposit_count: u64,
    pub block_number: u64,
    pub tx_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claim {
    pub index: u64,
    pub network_id: u32,
    pub tx_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MerkleProof {
    pub merkle_proof: Vec<H256>,
    pub exit_root_num: u64,
    pub l2_exit_root_num: u64,
    pub main_exit_root: H256,
    pub rollup_exit_root: H256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositPage {
    pub deposits: Vec<Deposit>,
    pub total: u64,
}

// ============================================================================
// BRIDGE (RECONCILED VIEW)
// ============================================================================

/// Composite bridge id: `{deposit_count}-{destination_network_id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BridgeId {
    pub deposit_count: u64,
    pub network_id: u32,
}

impl BridgeId {
    pub fn new(deposit_count: u64, network_id: u32) -> Self {
        Self {
            deposit_count,
            network_id,
        }
    }
}

impl fmt::Display for BridgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.deposit_count, self.network_id)
    }
}

impl FromStr for BridgeId {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || BridgeError::InvalidBridgeId(s.to_string());

        let (count, network) = s.split_once('-').ok_or_else(invalid)?;
        let is_integer = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
        if !is_integer(count) || !is_integer(network) {
            return Err(invalid());
        }

        Ok(Self {
            deposit_count: count.parse().map_err(|_| invalid())?,
            network_id: network.parse().map_err(|_| invalid())?,
        })
    }
}

impl Serialize for BridgeId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum BridgeStatus {
    Pending { claim_tx_hash: Option<String> },
    Initiated,
    OnHold { merkle_proof: MerkleProof },
    Completed { claim_tx_hash: String },
}

impl BridgeStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending { .. } => "pending",
            Self::Initiated => "initiated",
            Self::OnHold { .. } => "on-hold",
            Self::Completed { .. } => "completed",
        }
    }

    /// Lifecycle rank used to reason about forward-only transitions.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Pending { .. } => 0,
            Self::Initiated => 1,
            Self::OnHold { .. } => 2,
            Self::Completed { .. } => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bridge {
    /// Absent only for local pending entries the indexer has not numbered yet.
    pub id: Option<BridgeId>,
    pub from: Chain,
    pub to: Chain,
    pub token: Token,
    pub amount: U256,
    pub destination_address: Address,
    pub deposit_tx_hash: String,
    pub fiat_amount: Option<U256>,
    #[serde(flatten)]
    pub status: BridgeStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BridgePage {
    pub bridges: Vec<Bridge>,
    pub total: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchRequest {
    Page { limit: u64, offset: u64 },
    Reload { quantity: u64 },
}

impl FetchRequest {
    /// The `(limit, offset)` window sent to the indexer.
    pub fn window(&self) -> (u64, u64) {
        match *self {
            Self::Page { limit, offset } => (limit, offset),
            Self::Reload { quantity } => (quantity, 0),
        }
    }
}

/// Result of a cancellable fetch. Cancellation is an outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome<T> {
    Fetched(T),
    Cancelled,
}

impl<T> FetchOutcome<T> {
    pub fn fetched(self) -> Option<T> {
        match self {
            Self::Fetched(value) => Some(value),
            Self::Cancelled => None,
        }
    }
}

// ============================================================================
// PENDING TRANSACTIONS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingTxKind {
    Deposit,
    Claim { claim_tx_hash: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTx {
    pub kind: PendingTxKind,
    pub deposit_tx_hash: String,
    pub from: Chain,
    pub to: Chain,
    pub token: Token,
    pub amount: U256,
    pub destination_address: Address,
    pub timestamp: DateTime<Utc>,
}

impl PendingTx {
    pub fn claim_tx_hash(&self) -> Option<&str> {
        match &self.kind {
            PendingTxKind::Deposit => None,
            PendingTxKind::Claim { claim_tx_hash } => Some(claim_tx_hash),
        }
    }
}

// ============================================================================
// GAS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Gas {
    Eip1559 {
        gas_limit: U256,
        max_fee_per_gas: U256,
    },
    Legacy {
        gas_limit: U256,
        gas_price: U256,
    },
}

/// Fee-market data reported by the connected chain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeeData {
    pub gas_price: Option<U256>,
    pub max_fee_per_gas: Option<U256>,
    pub max_priority_fee_per_gas: Option<U256>,
}

/// Tx hashes are compared case-insensitively across indexer and wallet.
pub fn normalize_hash(hash: &str) -> String {
    hash.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bridge_id_round_trip() {
        for (count, network) in [(0u64, 0u32), (3, 1), (u64::MAX, u32::MAX), (12_345, 7)] {
            let id = BridgeId::new(count, network);
            let parsed: BridgeId = id.to_string().parse().unwrap();
            assert_eq!(parsed, id);
        }
    }

    #[test]
    fn test_bridge_id_format() {
        assert_eq!(BridgeId::new(3, 1).to_string(), "3-1");
    }

    #[test]
    fn test_bridge_id_rejects_invalid() {
        for input in ["", "3", "3-", "-1", "a-1", "3-b", "+3-1", "3--1", "3-1-2", " 3-1", "3.0-1"] {
            assert!(
                input.parse::<BridgeId>().is_err(),
                "expected {:?} to be rejected",
                input
            );
        }
    }

    #[test]
    fn test_bridge_id_rejects_overflow() {
        assert!("3-4294967296".parse::<BridgeId>().is_err());
        assert!("18446744073709551616-1".parse::<BridgeId>().is_err());
    }

    #[test]
    fn test_status_rank_is_forward_only() {
        let proof = MerkleProof {
            merkle_proof: vec![],
            exit_root_num: 0,
            l2_exit_root_num: 0,
            main_exit_root: H256::zero(),
            rollup_exit_root: H256::zero(),
        };
        let ordered = [
            BridgeStatus::Pending {
                claim_tx_hash: None,
            },
            BridgeStatus::Initiated,
            BridgeStatus::OnHold {
                merkle_proof: proof,
            },
            BridgeStatus::Completed {
                claim_tx_hash: "0xabc".to_string(),
            },
        ];
        for pair in ordered.windows(2) {
            assert!(pair[0].rank() < pair[1].rank());
        }
    }

    #[test]
    fn test_fetch_request_window() {
        assert_eq!(FetchRequest::Reload { quantity: 25 }.window(), (25, 0));
        assert_eq!(
            FetchRequest::Page {
                limit: 10,
                offset: 20
            }
            .window(),
            (10, 20)
        );
    }
}
