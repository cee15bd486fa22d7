use ethers::types::Address;
use tracing::{debug, warn};

use crate::{
    amount::amount_math::MAX_DECIMALS,
    error::{BridgeError, BridgeResult},
    models::{
        model::{Chain, Token},
        traits::KeyValueStore,
    },
};

const CUSTOM_TOKENS_KEY: &str = "custom-tokens";

/// Static token list plus user-imported tokens. The native gas asset of L1
/// is always present under the zero address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRegistry {
    tokens: Vec<Token>,
}

impl TokenRegistry {
    pub fn new(l1: &Chain, tokens: Vec<Token>) -> Self {
        let native = Token {
            address: Address::zero(),
            chain_id: l1.chain_id,
            symbol: l1.native_currency.symbol.clone(),
            name: l1.native_currency.name.clone(),
            decimals: l1.native_currency.decimals,
            logo_uri: String::new(),
            wrapped_token: None,
        };

        let mut registry = Self {
            tokens: vec![native],
        };
        for token in tokens {
            registry.insert(token);
        }
        registry
    }

    pub fn from_json(l1: &Chain, json: &str) -> BridgeResult<Self> {
        let tokens: Vec<Token> = serde_json::from_str(json)
            .map_err(|e| BridgeError::Storage(format!("invalid token list: {}", e)))?;
        if let Some(token) = tokens.iter().find(|t| t.decimals > MAX_DECIMALS) {
            return Err(BridgeError::Storage(format!(
                "token {} declares {} decimals, at most {} are supported",
                token.symbol, token.decimals, MAX_DECIMALS
            )));
        }
        Ok(Self::new(l1, tokens))
    }

    /// Adds the custom tokens persisted in `store`. Unparseable data is ignored.
    pub fn with_custom_tokens(mut self, store: &dyn KeyValueStore) -> Self {
        match load_custom_tokens(store) {
            Ok(custom) => {
                debug!("🪙 Loaded {} custom tokens", custom.len());
                for token in custom {
                    self.insert(token);
                }
            }
            Err(e) => warn!("⚠️ Ignoring custom token list: {}", e),
        }
        self
    }

    pub fn find(&self, address: Address, chain_id: u64) -> Option<&Token> {
        self.tokens
            .iter()
            .find(|token| token.address == address && token.chain_id == chain_id)
    }

    pub fn native(&self) -> &Token {
        &self.tokens[0]
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    fn insert(&mut self, token: Token) {
        if token.decimals > MAX_DECIMALS {
            warn!(
                "⚠️ Skipping token {} with {} decimals",
                token.symbol, token.decimals
            );
            return;
        }
        match self
            .tokens
            .iter_mut()
            .find(|t| t.address == token.address && t.chain_id == token.chain_id)
        {
            Some(existing) if !existing.is_native() => *existing = token,
            Some(_) => {}
            None => self.tokens.push(token),
        }
    }
}

fn load_custom_tokens(store: &dyn KeyValueStore) -> BridgeResult<Vec<Token>> {
    match store.get(CUSTOM_TOKENS_KEY)? {
        Some(raw) => serde_json::from_str(&raw)
            .map_err(|e| BridgeError::Storage(format!("invalid custom tokens: {}", e))),
        None => Ok(Vec::new()),
    }
}
