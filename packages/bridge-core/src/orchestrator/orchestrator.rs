use std::sync::Arc;

use chrono::Utc;
use ethers::types::{Address, U256};
use tokio::time::Duration;
use tracing::{debug, error, info, warn};

use crate::{
    error::{BridgeError, BridgeResult},
    fees::fee_calculator::{
        MaxTransferable, gas_from_fee_data, max_transferable_amount, with_gas_buffer,
    },
    models::{
        model::{
            Bridge, BridgeStatus, Chain, FetchOutcome, Gas, PendingTx, PendingTxKind, Token,
            normalize_hash,
        },
        traits::{BridgeCall, ClaimCall, WalletHandle},
    },
    pending::pending_store::PendingTxStore,
    reconciler::polling::PollingTask,
    registry::chain_registry::ChainRegistry,
};

/// Drives approvals, deposits and claims through the connected wallet and
/// records what was submitted in the pending store.
pub struct ClaimOrchestrator<W> {
    chains: Arc<ChainRegistry>,
    wallet: Arc<W>,
    pending: Arc<PendingTxStore>,
    gas_buffer_percent: u64,
}

impl<W: WalletHandle> ClaimOrchestrator<W> {
    pub fn new(
        chains: Arc<ChainRegistry>,
        wallet: Arc<W>,
        pending: Arc<PendingTxStore>,
        gas_buffer_percent: u64,
    ) -> Self {
        Self {
            chains,
            wallet,
            pending,
            gas_buffer_percent,
        }
    }

    pub fn wallet(&self) -> &Arc<W> {
        &self.wallet
    }

    /// Address of `token` on `chain`: its own address on its home chain,
    /// its wrapped counterpart elsewhere.
    fn token_address_on(token: &Token, chain: &Chain) -> BridgeResult<Address> {
        if token.is_native() || token.chain_id == chain.chain_id {
            return Ok(token.address);
        }
        match token.wrapped_token {
            Some(wrapped) if wrapped.chain_id == chain.chain_id => Ok(wrapped.address),
            _ => Err(BridgeError::RegistryMismatch(format!(
                "{} has no address on chain {}",
                token.symbol, chain.chain_id
            ))),
        }
    }

    /// Fails with `WrongNetwork` after asking the wallet to switch when it is
    /// not connected to `chain`.
    async fn ensure_network(&self, chain: &Chain) -> BridgeResult<()> {
        let actual = self.wallet.chain_id().await?;
        if actual == chain.chain_id {
            return Ok(());
        }

        info!(
            "🔀 Wallet on chain {}, requesting switch to {} ({})",
            actual, chain.name, chain.chain_id
        );
        if let Err(e) = self.wallet.switch_network(chain).await {
            warn!("⚠️ Network switch to {} failed: {}", chain.name, e);
        }
        Err(BridgeError::WrongNetwork {
            expected: chain.chain_id,
            actual,
        })
    }

    fn log_failure(action: &str, e: &BridgeError) {
        if e.is_user_rejected() || e.is_wrong_network() {
            info!("🙅 {} not submitted: {}", action, e);
        } else {
            error!("❌ {} failed: {}", action, e);
        }
    }

    pub async fn requires_approval(
        &self,
        from: &Chain,
        token: &Token,
        owner: Address,
        spender: Address,
        amount: U256,
    ) -> BridgeResult<bool> {
        if token.is_native() {
            return Ok(false);
        }

        let address = Self::token_address_on(token, from)?;
        let allowance = self
            .wallet
            .erc20_allowance(from, address, owner, spender)
            .await?;
        debug!(
            "🔍 Allowance of {} for {:?}: {} (needed {})",
            token.symbol, spender, allowance, amount
        );
        Ok(allowance < amount)
    }

    pub async fn approve(
        &self,
        from: &Chain,
        token: &Token,
        owner: Address,
        spender: Address,
        amount: U256,
    ) -> BridgeResult<String> {
        let result = self.submit_approve(from, token, owner, spender, amount).await;
        if let Err(e) = &result {
            Self::log_failure("Approval", e);
        }
        result
    }

    async fn submit_approve(
        &self,
        from: &Chain,
        token: &Token,
        owner: Address,
        spender: Address,
        amount: U256,
    ) -> BridgeResult<String> {
        if token.is_native() {
            return Err(BridgeError::InvalidState(
                "the native token needs no approval".to_string(),
            ));
        }
        self.ensure_network(from).await?;

        let connected = self.wallet.account().await?;
        if connected != owner {
            return Err(BridgeError::InvalidState(format!(
                "connected account {:?} is not the owner {:?}",
                connected, owner
            )));
        }

        let address = Self::token_address_on(token, from)?;
        info!("🔓 Approving {} {} for {:?}", amount, token.symbol, spender);
        let tx_hash = self
            .wallet
            .send_approve(from, address, spender, amount)
            .await?;
        info!("✅ Approval submitted: {}", tx_hash);
        Ok(normalize_hash(&tx_hash))
    }

    fn bridge_call(
        from: &Chain,
        to: &Chain,
        token: &Token,
        amount: U256,
        destination: Address,
    ) -> BridgeResult<BridgeCall> {
        Ok(BridgeCall {
            chain: from.clone(),
            token_address: Self::token_address_on(token, from)?,
            amount,
            destination_network: to.network_id,
            destination_address: destination,
            value: if token.is_native() { amount } else { U256::zero() },
        })
    }

    /// Current gas for a deposit: the contract's estimate padded by the
    /// configured buffer, priced with whatever fee market `from` reports.
    pub async fn estimate_bridge_gas(
        &self,
        from: &Chain,
        to: &Chain,
        token: &Token,
        amount: U256,
        destination: Address,
    ) -> BridgeResult<Gas> {
        let call = Self::bridge_call(from, to, token, amount, destination)?;
        let (estimate, fee_data) = tokio::try_join!(
            self.wallet.estimate_bridge_gas(&call),
            self.wallet.fee_data(from)
        )?;

        let gas_limit = with_gas_buffer(estimate, self.gas_buffer_percent);
        gas_from_fee_data(gas_limit, &fee_data).ok_or_else(|| {
            BridgeError::Wallet(format!("{} reported no gas price", from.name))
        })
    }

    pub async fn bridge(
        &self,
        from: &Chain,
        to: &Chain,
        token: &Token,
        amount: U256,
        destination: Address,
        gas: &Gas,
    ) -> BridgeResult<String> {
        let result = self
            .submit_bridge(from, to, token, amount, destination, gas)
            .await;
        if let Err(e) = &result {
            Self::log_failure("Deposit", e);
        }
        result
    }

    async fn submit_bridge(
        &self,
        from: &Chain,
        to: &Chain,
        token: &Token,
        amount: U256,
        destination: Address,
        gas: &Gas,
    ) -> BridgeResult<String> {
        self.ensure_network(from).await?;
        let call = Self::bridge_call(from, to, token, amount, destination)?;

        info!(
            "🌉 Bridging {} {} from {} to {} for {:?}",
            amount, token.symbol, from.name, to.name, destination
        );
        let tx_hash = normalize_hash(&self.wallet.send_bridge(&call, gas).await?);
        info!("✅ Deposit submitted: {}", from.explorer_tx_url(&tx_hash));

        self.pending.add(
            destination,
            PendingTx {
                kind: PendingTxKind::Deposit,
                deposit_tx_hash: tx_hash.clone(),
                from: from.clone(),
                to: to.clone(),
                token: token.clone(),
                amount,
                destination_address: destination,
                timestamp: Utc::now(),
            },
        )?;
        Ok(tx_hash)
    }

    pub async fn claim(&self, bridge: &Bridge) -> BridgeResult<String> {
        let result = self.submit_claim(bridge).await;
        if let Err(e) = &result {
            Self::log_failure("Claim", e);
        }
        result
    }

    /// `claim` for callers without a user to re-submit: when the first attempt
    /// only switched the wallet to the destination chain, it is retried once.
    pub async fn claim_switching_network(&self, bridge: &Bridge) -> BridgeResult<String> {
        match self.claim(bridge).await {
            Err(BridgeError::WrongNetwork { expected, .. })
                if self.wallet.chain_id().await? == expected =>
            {
                info!("🔁 Retrying claim on {} after network switch", bridge.to.name);
                self.claim(bridge).await
            }
            result => result,
        }
    }

    async fn submit_claim(&self, bridge: &Bridge) -> BridgeResult<String> {
        let proof = match &bridge.status {
            BridgeStatus::OnHold { merkle_proof } => merkle_proof,
            other => {
                return Err(BridgeError::InvalidState(format!(
                    "cannot claim a bridge that is {}",
                    other.label()
                )));
            }
        };
        let id = bridge.id.ok_or_else(|| {
            BridgeError::InvalidState("bridge has not been indexed yet".to_string())
        })?;
        self.ensure_network(&bridge.to).await?;

        let origin = self.chains.by_chain_id(bridge.token.chain_id)?;
        let index = u32::try_from(id.deposit_count).map_err(|_| {
            BridgeError::InvalidState(format!("deposit count {} out of range", id.deposit_count))
        })?;
        let global_exit_root_num = if self.chains.is_l1(&bridge.to) {
            proof.exit_root_num
        } else {
            proof.l2_exit_root_num
        };

        let call = ClaimCall {
            chain: bridge.to.clone(),
            origin_token_address: bridge.token.address,
            amount: bridge.amount,
            origin_network: origin.network_id,
            destination_network: bridge.to.network_id,
            destination_address: bridge.destination_address,
            smt_proof: proof.merkle_proof.clone(),
            index,
            global_exit_root_num: U256::from(global_exit_root_num),
            main_exit_root: proof.main_exit_root,
            rollup_exit_root: proof.rollup_exit_root,
        };

        info!("📥 Claiming bridge {} on {}", id, bridge.to.name);
        let claim_tx_hash = normalize_hash(&self.wallet.send_claim(&call).await?);
        info!("✅ Claim submitted: {}", bridge.to.explorer_tx_url(&claim_tx_hash));

        self.pending.add(
            bridge.destination_address,
            PendingTx {
                kind: PendingTxKind::Claim {
                    claim_tx_hash: claim_tx_hash.clone(),
                },
                deposit_tx_hash: bridge.deposit_tx_hash.clone(),
                from: bridge.from.clone(),
                to: bridge.to.clone(),
                token: bridge.token.clone(),
                amount: bridge.amount,
                destination_address: bridge.destination_address,
                timestamp: Utc::now(),
            },
        )?;
        Ok(claim_tx_hash)
    }

    /// Fee-aware amount the connected account can actually deposit.
    pub async fn max_transferable(
        &self,
        from: &Chain,
        token: &Token,
        amount: U256,
        fee: U256,
    ) -> BridgeResult<MaxTransferable> {
        let owner = self.wallet.account().await?;
        let balance = if token.is_native() {
            self.wallet.native_balance(from, owner).await?
        } else {
            let address = Self::token_address_on(token, from)?;
            self.wallet.erc20_balance(from, address, owner).await?
        };
        Ok(max_transferable_amount(token, balance, amount, fee))
    }
}

impl<W: WalletHandle + 'static> ClaimOrchestrator<W> {
    /// Re-estimates deposit gas every `period`, publishing only changes.
    pub fn watch_bridge_gas(
        self: Arc<Self>,
        from: Chain,
        to: Chain,
        token: Token,
        amount: U256,
        destination: Address,
        period: Duration,
    ) -> PollingTask<Gas> {
        let name = format!("gas:{}->{}", from.key, to.key);
        PollingTask::spawn(name, period, move |cancel| {
            let orchestrator = self.clone();
            let (from, to, token) = (from.clone(), to.clone(), token.clone());
            async move {
                let estimate =
                    orchestrator.estimate_bridge_gas(&from, &to, &token, amount, destination);
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Ok(FetchOutcome::Cancelled),
                    gas = estimate => gas.map(FetchOutcome::Fetched),
                }
            }
        })
    }
}
