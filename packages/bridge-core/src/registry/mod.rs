pub mod chain_registry;
pub mod token_registry;
