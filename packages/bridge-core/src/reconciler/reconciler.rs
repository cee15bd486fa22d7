use std::sync::Arc;

use ethers::types::Address;
use futures::future::try_join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{
    error::{BridgeError, BridgeResult},
    models::{
        model::{
            Bridge, BridgeId, BridgePage, BridgeStatus, Chain, Claim, Deposit, DepositPage,
            FetchOutcome, FetchRequest, Token,
        },
        traits::BridgeIndexer,
    },
    pending::pending_store::PendingTxStore,
    pricefeed::pricefeed::PriceFeedManager,
    reconciler::merge::merge_with_pending,
    registry::{chain_registry::ChainRegistry, token_registry::TokenRegistry},
};

/// A deposit whose networks and token resolved against the registries.
struct ResolvedDeposit {
    deposit: Deposit,
    from: Chain,
    to: Chain,
    token: Token,
}

/// Builds the account's bridge list out of indexer deposits, claims, claim
/// readiness and merkle proofs, then folds in locally-pending txs.
pub struct BridgeReconciler<I> {
    indexer: Arc<I>,
    chains: Arc<ChainRegistry>,
    tokens: Arc<TokenRegistry>,
    pending: Arc<PendingTxStore>,
    price_feed: Option<Arc<PriceFeedManager>>,
}

impl<I: BridgeIndexer> BridgeReconciler<I> {
    pub fn new(
        indexer: Arc<I>,
        chains: Arc<ChainRegistry>,
        tokens: Arc<TokenRegistry>,
        pending: Arc<PendingTxStore>,
    ) -> Self {
        Self {
            indexer,
            chains,
            tokens,
            pending,
            price_feed: None,
        }
    }

    pub fn with_price_feed(mut self, price_feed: Arc<PriceFeedManager>) -> Self {
        self.price_feed = Some(price_feed);
        self
    }

    pub fn pending(&self) -> &Arc<PendingTxStore> {
        &self.pending
    }

    pub fn chains(&self) -> &Arc<ChainRegistry> {
        &self.chains
    }

    /// Fetches one page of indexer-backed bridges. Cancelling `cancel` drops
    /// every in-flight request and yields `FetchOutcome::Cancelled`.
    pub async fn fetch_bridges(
        &self,
        account: Address,
        request: FetchRequest,
        cancel: &CancellationToken,
    ) -> BridgeResult<FetchOutcome<BridgePage>> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("⏹️ Bridge fetch for {:?} cancelled", account);
                Ok(FetchOutcome::Cancelled)
            }
            page = self.fetch_page(account, Some(request.window())) => {
                page.map(FetchOutcome::Fetched)
            }
        }
    }

    /// `fetch_bridges` followed by pruning and merging the local pending txs.
    pub async fn refresh(
        &self,
        account: Address,
        request: FetchRequest,
        cancel: &CancellationToken,
    ) -> BridgeResult<FetchOutcome<BridgePage>> {
        let page = match self.fetch_bridges(account, request, cancel).await? {
            FetchOutcome::Fetched(page) => page,
            FetchOutcome::Cancelled => return Ok(FetchOutcome::Cancelled),
        };
        if cancel.is_cancelled() {
            return Ok(FetchOutcome::Cancelled);
        }

        self.pending.prune_settled(account, &page.bridges)?;
        let mut pending = self.pending.get(account)?;

        // Local-only entries belong to the head of the list, not to later pages.
        let (_, offset) = request.window();
        if offset > 0 {
            pending.retain(|tx| {
                page.bridges
                    .iter()
                    .any(|bridge| bridge.deposit_tx_hash == tx.deposit_tx_hash)
            });
        }

        Ok(FetchOutcome::Fetched(BridgePage {
            bridges: merge_with_pending(&page.bridges, &pending),
            total: page.total,
        }))
    }

    /// Resolves a single bridge addressed to `account`.
    pub async fn get_bridge(
        &self,
        account: Address,
        deposit_count: u64,
        network_id: u32,
    ) -> BridgeResult<Bridge> {
        let id = BridgeId::new(deposit_count, network_id);
        let (page, claims) = tokio::try_join!(
            self.indexer.get_deposits(account, None),
            self.indexer.get_claims(account)
        )?;

        let deposit = page
            .deposits
            .into_iter()
            .find(|d| d.deposit_count == deposit_count && d.destination_network_id == network_id)
            .filter(|d| d.destination_address == account)
            .ok_or_else(|| BridgeError::NotFound(format!("bridge {} for {:?}", id, account)))?;

        let bridge = self.build_bridge(self.resolve(deposit)?, &claims).await?;
        let pending: Vec<_> = self
            .pending
            .get(account)?
            .into_iter()
            .filter(|tx| tx.deposit_tx_hash == bridge.deposit_tx_hash)
            .collect();

        Ok(merge_with_pending(std::slice::from_ref(&bridge), &pending)
            .pop()
            .unwrap_or(bridge))
    }

    pub async fn get_bridge_by_id(&self, account: Address, id: &str) -> BridgeResult<Bridge> {
        let id: BridgeId = id.parse()?;
        self.get_bridge(account, id.deposit_count, id.network_id).await
    }

    async fn fetch_page(
        &self,
        account: Address,
        window: Option<(u64, u64)>,
    ) -> BridgeResult<BridgePage> {
        let (page, claims) = tokio::try_join!(
            self.indexer.get_deposits(account, window),
            self.indexer.get_claims(account)
        )?;
        let DepositPage { deposits, total } = page;

        let resolved = deposits
            .into_iter()
            .map(|deposit| self.resolve(deposit))
            .collect::<BridgeResult<Vec<_>>>()?;

        let bridges = try_join_all(
            resolved
                .into_iter()
                .map(|deposit| self.build_bridge(deposit, &claims)),
        )
        .await?;

        info!(
            "📦 Fetched {} of {} bridges for {:?}",
            bridges.len(),
            total,
            account
        );
        Ok(BridgePage { bridges, total })
    }

    fn resolve(&self, deposit: Deposit) -> BridgeResult<ResolvedDeposit> {
        let from = self.chains.by_network_id(deposit.network_id)?.clone();
        let to = self.chains.by_network_id(deposit.destination_network_id)?.clone();
        let token_chain = self.chains.by_network_id(deposit.token_network_id)?;

        let token = self
            .tokens
            .find(deposit.token_address, token_chain.chain_id)
            .cloned()
            .ok_or_else(|| {
                BridgeError::RegistryMismatch(format!(
                    "deposit {} references unknown token {:?} on chain {}",
                    deposit.deposit_count, deposit.token_address, token_chain.chain_id
                ))
            })?;

        Ok(ResolvedDeposit {
            deposit,
            from,
            to,
            token,
        })
    }

    async fn build_bridge(
        &self,
        resolved: ResolvedDeposit,
        claims: &[Claim],
    ) -> BridgeResult<Bridge> {
        let ResolvedDeposit {
            deposit,
            from,
            to,
            token,
        } = resolved;

        let claim = claims.iter().find(|claim| {
            claim.index == deposit.deposit_count
                && claim.network_id == deposit.destination_network_id
        });

        let status = match claim {
            Some(claim) => BridgeStatus::Completed {
                claim_tx_hash: claim.tx_hash.clone(),
            },
            None => {
                let ready = self
                    .indexer
                    .get_claim_status(deposit.network_id, deposit.deposit_count)
                    .await?;
                if ready {
                    BridgeStatus::OnHold {
                        merkle_proof: self
                            .indexer
                            .get_merkle_proof(deposit.network_id, deposit.deposit_count)
                            .await?,
                    }
                } else {
                    BridgeStatus::Initiated
                }
            }
        };

        let fiat_amount = match &self.price_feed {
            Some(feed) => feed.fiat_amount(&token, deposit.amount).await,
            None => None,
        };

        Ok(Bridge {
            id: Some(BridgeId::new(
                deposit.deposit_count,
                deposit.destination_network_id,
            )),
            from,
            to,
            token,
            amount: deposit.amount,
            destination_address: deposit.destination_address,
            deposit_tx_hash: deposit.tx_hash,
            fiat_amount,
            status,
        })
    }
}
