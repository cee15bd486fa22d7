use std::future::Future;

use ethers::types::{Address, H256, U256};

use crate::{
    error::BridgeResult,
    models::model::{Chain, Claim, DepositPage, FeeData, Gas, MerkleProof},
};

/// Read-only view of the bridge indexer.
pub trait BridgeIndexer: Send + Sync {
    /// `window` is `(limit, offset)`; `None` requests the unpaginated list.
    fn get_deposits(
        &self,
        address: Address,
        window: Option<(u64, u64)>,
    ) -> impl Future<Output = BridgeResult<DepositPage>> + Send;
    fn get_claims(&self, address: Address) -> impl Future<Output = BridgeResult<Vec<Claim>>> + Send;
    fn get_claim_status(
        &self,
        network_id: u32,
        deposit_count: u64,
    ) -> impl Future<Output = BridgeResult<bool>> + Send;
    fn get_merkle_proof(
        &self,
        network_id: u32,
        deposit_count: u64,
    ) -> impl Future<Output = BridgeResult<MerkleProof>> + Send;
}

/// Arguments of the bridge contract's deposit call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeCall {
    pub chain: Chain,
    pub token_address: Address,
    pub amount: U256,
    pub destination_network: u32,
    pub destination_address: Address,
    /// Native value attached to the call; equals `amount` for the gas token.
    pub value: U256,
}

/// Arguments of the bridge contract's claim call, taken literally from the
/// indexer's merkle proof.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimCall {
    pub chain: Chain,
    pub origin_token_address: Address,
    pub amount: U256,
    pub origin_network: u32,
    pub destination_network: u32,
    pub destination_address: Address,
    pub smt_proof: Vec<H256>,
    pub index: u32,
    pub global_exit_root_num: U256,
    pub main_exit_root: H256,
    pub rollup_exit_root: H256,
}

/// Wallet/provider collaborator. Implementations map a declined signature
/// prompt to `BridgeError::UserRejected`.
pub trait WalletHandle: Send + Sync {
    fn account(&self) -> impl Future<Output = BridgeResult<Address>> + Send;
    fn chain_id(&self) -> impl Future<Output = BridgeResult<u64>> + Send;
    fn switch_network(&self, chain: &Chain) -> impl Future<Output = BridgeResult<()>> + Send;
    fn native_balance(
        &self,
        chain: &Chain,
        owner: Address,
    ) -> impl Future<Output = BridgeResult<U256>> + Send;
    fn erc20_balance(
        &self,
        chain: &Chain,
        token: Address,
        owner: Address,
    ) -> impl Future<Output = BridgeResult<U256>> + Send;
    fn erc20_allowance(
        &self,
        chain: &Chain,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> impl Future<Output = BridgeResult<U256>> + Send;
    fn fee_data(&self, chain: &Chain) -> impl Future<Output = BridgeResult<FeeData>> + Send;
    fn estimate_bridge_gas(
        &self,
        call: &BridgeCall,
    ) -> impl Future<Output = BridgeResult<U256>> + Send;
    fn send_approve(
        &self,
        chain: &Chain,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> impl Future<Output = BridgeResult<String>> + Send;
    fn send_bridge(
        &self,
        call: &BridgeCall,
        gas: &Gas,
    ) -> impl Future<Output = BridgeResult<String>> + Send;
    fn send_claim(&self, call: &ClaimCall) -> impl Future<Output = BridgeResult<String>> + Send;
}

/// Synchronous string key-value port backing local persistence.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> BridgeResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> BridgeResult<()>;
    fn remove(&self, key: &str) -> BridgeResult<()>;
}
