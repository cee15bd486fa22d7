use thiserror::Error;

/// Typed outcomes of the reconciler and orchestrator.
///
/// Wrong-network and user-rejection are kept apart from the generic failure
/// kinds so callers can prompt a network switch or silently restore the
/// pre-action state instead of showing an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    #[error("indexer request failed: {0}")]
    Indexer(String),

    #[error("malformed indexer response: {0}")]
    Schema(String),

    #[error("registry mismatch: {0}")]
    RegistryMismatch(String),

    #[error("wrong network: expected chain {expected}, connected to {actual}")]
    WrongNetwork { expected: u64, actual: u64 },

    #[error("user rejected the request")]
    UserRejected,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid bridge id: {0}")]
    InvalidBridgeId(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("wallet error: {0}")]
    Wallet(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl BridgeError {
    pub fn is_wrong_network(&self) -> bool {
        matches!(self, Self::WrongNetwork { .. })
    }

    pub fn is_user_rejected(&self) -> bool {
        matches!(self, Self::UserRejected)
    }
}

impl From<reqwest::Error> for BridgeError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Schema(e.to_string())
        } else {
            Self::Indexer(e.to_string())
        }
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(e: serde_json::Error) -> Self {
        Self::Schema(e.to_string())
    }
}

pub type BridgeResult<T> = std::result::Result<T, BridgeError>;
