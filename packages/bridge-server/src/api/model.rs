use std::fmt;

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use bridge_core::{
    error::BridgeError,
    fees::fee_calculator::MaxTransferable,
    models::model::{BridgePage, FetchRequest},
};
use chrono::{DateTime, Utc};
use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};
use serde_json::json;

pub const DEFAULT_PAGE_LIMIT: u64 = 25;

// ============================================================================
// REQUESTS
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl PageQuery {
    pub fn request(&self) -> FetchRequest {
        FetchRequest::Page {
            limit: self.limit.unwrap_or(DEFAULT_PAGE_LIMIT),
            offset: self.offset.unwrap_or(0),
        }
    }
}

/// Amounts are decimal strings in base units. Without `balance` the
/// configured signer's balance on `chain_id` is used.
#[derive(Debug, Deserialize)]
pub struct MaxAmountQuery {
    pub balance: Option<String>,
    pub amount: String,
    pub fee: String,
    pub token: Option<String>,
    pub chain_id: Option<u64>,
}

pub fn parse_amount(field: &str, value: &str) -> Result<U256, ApiError> {
    U256::from_dec_str(value)
        .map_err(|e| ApiError::BadRequest(format!("invalid {} {:?}: {}", field, value, e)))
}

pub fn parse_address(value: &str) -> Result<Address, ApiError> {
    value
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid address {:?}", value)))
}

// ============================================================================
// RESPONSES
// ============================================================================

#[derive(Debug, Serialize)]
pub struct WatchResponse {
    pub account: Address,
    pub page: Option<BridgePage>,
    pub last_error: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct ClaimResponse {
    pub bridge_id: String,
    pub claim_tx_hash: String,
    pub explorer_url: String,
}

#[derive(Debug, Serialize)]
pub struct MaxAmountResponse {
    pub amount: Option<String>,
    pub fee_insufficient: bool,
    pub message: Option<&'static str>,
    pub result: MaxTransferable,
}

impl From<MaxTransferable> for MaxAmountResponse {
    fn from(result: MaxTransferable) -> Self {
        Self {
            amount: result.amount().map(|amount| amount.to_string()),
            fee_insufficient: result.is_fee_insufficient(),
            message: result.message(),
            result,
        }
    }
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    Bridge(BridgeError),
    BadRequest(String),
    Unavailable(String),
}

impl ApiError {
    fn code(&self) -> &'static str {
        match self {
            Self::Bridge(BridgeError::Indexer(_)) => "indexer-error",
            Self::Bridge(BridgeError::Schema(_)) => "indexer-schema",
            Self::Bridge(BridgeError::RegistryMismatch(_)) => "registry-mismatch",
            Self::Bridge(BridgeError::WrongNetwork { .. }) => "wrong-network",
            Self::Bridge(BridgeError::UserRejected) => "user-rejected",
            Self::Bridge(BridgeError::NotFound(_)) => "not-found",
            Self::Bridge(BridgeError::InvalidBridgeId(_)) => "invalid-bridge-id",
            Self::Bridge(BridgeError::InvalidState(_)) => "invalid-state",
            Self::Bridge(BridgeError::Wallet(_)) => "wallet-error",
            Self::Bridge(BridgeError::Storage(_)) => "storage-error",
            Self::BadRequest(_) => "bad-request",
            Self::Unavailable(_) => "unavailable",
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bridge(e) => write!(f, "{}", e),
            Self::BadRequest(message) | Self::Unavailable(message) => write!(f, "{}", message),
        }
    }
}

impl From<BridgeError> for ApiError {
    fn from(e: BridgeError) -> Self {
        Self::Bridge(e)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Bridge(BridgeError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Bridge(BridgeError::WrongNetwork { .. } | BridgeError::InvalidState(_)) => {
                StatusCode::CONFLICT
            }
            Self::Bridge(BridgeError::UserRejected | BridgeError::InvalidBridgeId(_)) => {
                StatusCode::BAD_REQUEST
            }
            Self::Bridge(BridgeError::Indexer(_) | BridgeError::Schema(_)) => {
                StatusCode::BAD_GATEWAY
            }
            Self::Bridge(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "error": self.to_string(),
            "code": self.code(),
        }))
    }
}
