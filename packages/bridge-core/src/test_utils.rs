use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
    time::Duration,
};

use chrono::{DateTime, TimeZone, Utc};
use ethers::types::{Address, H256, U256};

use crate::{
    error::{BridgeError, BridgeResult},
    models::{
        model::{
            Bridge, BridgeId, BridgeStatus, Chain, Claim, Deposit, DepositPage, FeeData, Gas,
            MerkleProof, NativeCurrency, PendingTx, PendingTxKind, Token,
        },
        traits::{BridgeCall, BridgeIndexer, ClaimCall, WalletHandle},
    },
    registry::chain_registry::ChainRegistry,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn ether() -> NativeCurrency {
    NativeCurrency {
        name: "Ether".to_string(),
        symbol: "ETH".to_string(),
        decimals: 18,
    }
}

pub fn l1_chain() -> Chain {
    Chain {
        key: "ethereum".to_string(),
        name: "Goerli".to_string(),
        chain_id: 5,
        network_id: 0,
        bridge_contract: Address::repeat_byte(0xb1),
        rpc_url: "http://localhost:8545".to_string(),
        explorer_url: "https://goerli.etherscan.io".to_string(),
        native_currency: ether(),
    }
}

pub fn l2_chain() -> Chain {
    Chain {
        key: "polygon-zkevm".to_string(),
        name: "Polygon zkEVM Testnet".to_string(),
        chain_id: 1442,
        network_id: 1,
        bridge_contract: Address::repeat_byte(0xb2),
        rpc_url: "http://localhost:8123".to_string(),
        explorer_url: "https://testnet-zkevm.polygonscan.com".to_string(),
        native_currency: ether(),
    }
}

pub fn registry() -> ChainRegistry {
    ChainRegistry::new(l1_chain(), l2_chain())
}

pub fn account() -> Address {
    Address::repeat_byte(0xaa)
}

pub fn eth_token() -> Token {
    Token {
        address: Address::zero(),
        chain_id: 5,
        symbol: "ETH".to_string(),
        name: "Ether".to_string(),
        decimals: 18,
        logo_uri: String::new(),
        wrapped_token: None,
    }
}

pub fn usdc() -> Token {
    Token {
        address: Address::repeat_byte(0x0c),
        chain_id: 5,
        symbol: "USDC".to_string(),
        name: "USD Coin".to_string(),
        decimals: 6,
        logo_uri: String::new(),
        wrapped_token: None,
    }
}

pub fn fixture_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

pub fn pending_deposit(deposit_tx_hash: &str) -> PendingTx {
    PendingTx {
        kind: PendingTxKind::Deposit,
        deposit_tx_hash: deposit_tx_hash.to_string(),
        from: l1_chain(),
        to: l2_chain(),
        token: eth_token(),
        amount: U256::exp10(18),
        destination_address: account(),
        timestamp: fixture_time(),
    }
}

pub fn pending_claim(deposit_tx_hash: &str, claim_tx_hash: &str) -> PendingTx {
    PendingTx {
        kind: PendingTxKind::Claim {
            claim_tx_hash: claim_tx_hash.to_string(),
        },
        ..pending_deposit(deposit_tx_hash)
    }
}

pub fn merkle_proof() -> MerkleProof {
    MerkleProof {
        merkle_proof: vec![H256::repeat_byte(0x01), H256::repeat_byte(0x02)],
        exit_root_num: 7,
        l2_exit_root_num: 9,
        main_exit_root: H256::repeat_byte(0x0e),
        rollup_exit_root: H256::repeat_byte(0x0f),
    }
}

/// An indexed L1 → L2 ETH bridge with id `{deposit_count}-1`.
pub fn api_bridge(deposit_count: u64, deposit_tx_hash: &str, status: BridgeStatus) -> Bridge {
    Bridge {
        id: Some(BridgeId::new(deposit_count, 1)),
        from: l1_chain(),
        to: l2_chain(),
        token: eth_token(),
        amount: U256::exp10(18),
        destination_address: account(),
        deposit_tx_hash: deposit_tx_hash.to_string(),
        fiat_amount: None,
        status,
    }
}

/// A 1 ETH deposit from L1 to `account()` on L2.
pub fn deposit(deposit_count: u64, tx_hash: &str) -> Deposit {
    Deposit {
        token_address: Address::zero(),
        token_network_id: 0,
        network_id: 0,
        destination_network_id: 1,
        destination_address: account(),
        amount: U256::exp10(18),
        deposit_count,
        block_number: 100 + deposit_count,
        tx_hash: tx_hash.to_string(),
    }
}

// ============================================================================
// FAKE INDEXER
// ============================================================================

#[derive(Default)]
struct IndexerState {
    deposits: Vec<Deposit>,
    claims: Vec<Claim>,
    ready: HashMap<(u32, u64), MerkleProof>,
    fail_merkle_proofs: bool,
}

/// In-memory indexer; every call optionally waits `delay` first.
#[derive(Default)]
pub struct FakeIndexer {
    state: Mutex<IndexerState>,
    delay: Option<Duration>,
}

impl FakeIndexer {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Default::default()
        }
    }

    pub fn push_deposit(&self, deposit: Deposit) {
        lock(&self.state).deposits.push(deposit);
    }

    pub fn push_claim(&self, index: u64, network_id: u32, tx_hash: &str) {
        lock(&self.state).claims.push(Claim {
            index,
            network_id,
            tx_hash: tx_hash.to_string(),
        });
    }

    pub fn set_ready(&self, network_id: u32, deposit_count: u64, proof: MerkleProof) {
        lock(&self.state)
            .ready
            .insert((network_id, deposit_count), proof);
    }

    pub fn fail_merkle_proofs(&self) {
        lock(&self.state).fail_merkle_proofs = true;
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

impl BridgeIndexer for FakeIndexer {
    async fn get_deposits(
        &self,
        _address: Address,
        window: Option<(u64, u64)>,
    ) -> BridgeResult<DepositPage> {
        self.pause().await;
        let state = lock(&self.state);
        let total = state.deposits.len() as u64;
        let deposits = match window {
            Some((limit, offset)) => state
                .deposits
                .iter()
                .skip(offset as usize)
                .take(limit as usize)
                .cloned()
                .collect(),
            None => state.deposits.clone(),
        };
        Ok(DepositPage { deposits, total })
    }

    async fn get_claims(&self, _address: Address) -> BridgeResult<Vec<Claim>> {
        self.pause().await;
        Ok(lock(&self.state).claims.clone())
    }

    async fn get_claim_status(&self, network_id: u32, deposit_count: u64) -> BridgeResult<bool> {
        self.pause().await;
        Ok(lock(&self.state)
            .ready
            .contains_key(&(network_id, deposit_count)))
    }

    async fn get_merkle_proof(
        &self,
        network_id: u32,
        deposit_count: u64,
    ) -> BridgeResult<MerkleProof> {
        self.pause().await;
        let state = lock(&self.state);
        if state.fail_merkle_proofs {
            return Err(BridgeError::Indexer("merkle proof unavailable".to_string()));
        }
        state
            .ready
            .get(&(network_id, deposit_count))
            .cloned()
            .ok_or_else(|| BridgeError::NotFound(format!("proof {}-{}", network_id, deposit_count)))
    }
}

// ============================================================================
// FAKE WALLET
// ============================================================================

#[derive(Default)]
pub struct WalletState {
    pub chain_id: u64,
    pub native_balance: U256,
    pub erc20_balances: HashMap<Address, U256>,
    pub allowances: HashMap<Address, U256>,
    pub reject_next: bool,
    /// Records switch requests without changing network.
    pub refuse_switch: bool,
    pub switches: Vec<u64>,
    pub approvals: Vec<(Address, Address, U256)>,
    pub bridges: Vec<(BridgeCall, Gas)>,
    pub claims: Vec<ClaimCall>,
    pub fee_data: FeeData,
    pub gas_estimate: U256,
    pub sent: u64,
}

/// Wallet that records every call; approvals take effect immediately.
pub struct FakeWallet {
    account: Address,
    pub state: Mutex<WalletState>,
}

impl FakeWallet {
    pub fn connected_to(chain: &Chain) -> Self {
        Self {
            account: account(),
            state: Mutex::new(WalletState {
                chain_id: chain.chain_id,
                fee_data: FeeData {
                    gas_price: Some(U256::from(10)),
                    ..Default::default()
                },
                gas_estimate: U256::from(100_000),
                ..Default::default()
            }),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, WalletState> {
        lock(&self.state)
    }

    /// Makes the next signing request fail as if the user declined it.
    pub fn reject_next(&self) {
        self.state().reject_next = true;
    }

    fn sign(&self) -> BridgeResult<String> {
        let mut state = self.state();
        if std::mem::take(&mut state.reject_next) {
            return Err(BridgeError::UserRejected);
        }
        state.sent += 1;
        Ok(format!("0x{:064x}", state.sent))
    }
}

impl WalletHandle for FakeWallet {
    async fn account(&self) -> BridgeResult<Address> {
        Ok(self.account)
    }

    async fn chain_id(&self) -> BridgeResult<u64> {
        Ok(self.state().chain_id)
    }

    async fn switch_network(&self, chain: &Chain) -> BridgeResult<()> {
        let mut state = self.state();
        state.switches.push(chain.chain_id);
        if !state.refuse_switch {
            state.chain_id = chain.chain_id;
        }
        Ok(())
    }

    async fn native_balance(&self, _chain: &Chain, _owner: Address) -> BridgeResult<U256> {
        Ok(self.state().native_balance)
    }

    async fn erc20_balance(
        &self,
        _chain: &Chain,
        token: Address,
        _owner: Address,
    ) -> BridgeResult<U256> {
        Ok(self
            .state()
            .erc20_balances
            .get(&token)
            .copied()
            .unwrap_or_default())
    }

    async fn erc20_allowance(
        &self,
        _chain: &Chain,
        token: Address,
        _owner: Address,
        _spender: Address,
    ) -> BridgeResult<U256> {
        Ok(self
            .state()
            .allowances
            .get(&token)
            .copied()
            .unwrap_or_default())
    }

    async fn fee_data(&self, _chain: &Chain) -> BridgeResult<FeeData> {
        Ok(self.state().fee_data)
    }

    async fn estimate_bridge_gas(&self, _call: &BridgeCall) -> BridgeResult<U256> {
        Ok(self.state().gas_estimate)
    }

    async fn send_approve(
        &self,
        _chain: &Chain,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> BridgeResult<String> {
        let hash = self.sign()?;
        let mut state = self.state();
        state.approvals.push((token, spender, amount));
        state.allowances.insert(token, amount);
        Ok(hash)
    }

    async fn send_bridge(&self, call: &BridgeCall, gas: &Gas) -> BridgeResult<String> {
        let hash = self.sign()?;
        self.state().bridges.push((call.clone(), *gas));
        Ok(hash)
    }

    async fn send_claim(&self, call: &ClaimCall) -> BridgeResult<String> {
        let hash = self.sign()?;
        self.state().claims.push(call.clone());
        Ok(hash)
    }
}
