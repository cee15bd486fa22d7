pub mod amount;
pub mod config;
pub mod error;
pub mod fees;
pub mod indexer;
pub mod models;
pub mod orchestrator;
pub mod pending;
pub mod pricefeed;
pub mod reconciler;
pub mod registry;

#[cfg(test)]
pub(crate) mod test_utils;

pub use error::{BridgeError, BridgeResult};
