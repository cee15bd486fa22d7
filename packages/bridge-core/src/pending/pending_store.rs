use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use ethers::types::Address;
use tracing::{debug, info, warn};

use crate::{
    error::{BridgeError, BridgeResult},
    models::{
        model::{Bridge, BridgeStatus, PendingTx, PendingTxKind, normalize_hash},
        traits::KeyValueStore,
    },
    pending::model::{SCHEMA_VERSION, StoredPendingTx, StoredPendingTxs},
    registry::chain_registry::ChainRegistry,
};

/// Local record of transactions submitted by the user that the indexer has
/// not observed yet, keyed by account.
pub struct PendingTxStore {
    kv: Arc<dyn KeyValueStore>,
    chains: Arc<ChainRegistry>,
    timeout: Duration,
    write_lock: Mutex<()>,
}

impl PendingTxStore {
    pub fn new(kv: Arc<dyn KeyValueStore>, chains: Arc<ChainRegistry>, timeout_secs: u64) -> Self {
        Self {
            kv,
            chains,
            timeout: Duration::seconds(timeout_secs as i64),
            write_lock: Mutex::new(()),
        }
    }

    fn key(account: Address) -> String {
        format!("pending-txs:{:?}", account)
    }

    pub fn get(&self, account: Address) -> BridgeResult<Vec<PendingTx>> {
        self.get_as_of(account, Utc::now())
    }

    /// Reads the account's pending txs, silently pruning any older than the
    /// timeout.
    pub fn get_as_of(&self, account: Address, now: DateTime<Utc>) -> BridgeResult<Vec<PendingTx>> {
        let _guard = self.lock();
        let txs = self.read(account)?;
        let (fresh, stale): (Vec<_>, Vec<_>) = txs
            .into_iter()
            .partition(|tx| now.signed_duration_since(tx.timestamp) < self.timeout);

        if !stale.is_empty() {
            debug!(
                "🧹 Pruning {} stale pending txs for {:?}",
                stale.len(),
                account
            );
            self.write(account, &fresh)?;
        }

        Ok(fresh)
    }

    /// Adds `tx`, replacing any record with the same deposit tx hash.
    pub fn add(&self, account: Address, tx: PendingTx) -> BridgeResult<()> {
        let _guard = self.lock();
        let mut txs = self.read(account)?;
        txs.retain(|existing| existing.deposit_tx_hash != tx.deposit_tx_hash);

        info!(
            "📝 Recording pending {} {} for {:?}",
            match tx.kind {
                PendingTxKind::Deposit => "deposit",
                PendingTxKind::Claim { .. } => "claim",
            },
            tx.deposit_tx_hash,
            account
        );
        txs.push(tx);
        self.write(account, &txs)
    }

    pub fn remove(&self, account: Address, deposit_tx_hash: &str) -> BridgeResult<()> {
        let _guard = self.lock();
        let hash = normalize_hash(deposit_tx_hash);
        let mut txs = self.read(account)?;
        let before = txs.len();
        txs.retain(|tx| tx.deposit_tx_hash != hash);

        if txs.len() != before {
            self.write(account, &txs)?;
        }
        Ok(())
    }

    /// Drops pending records the indexer now corroborates: a deposit that is
    /// visible at all, or a claim whose bridge is completed. Returns how many
    /// records were removed.
    pub fn prune_settled(&self, account: Address, api_bridges: &[Bridge]) -> BridgeResult<usize> {
        let _guard = self.lock();
        let txs = self.read(account)?;
        let before = txs.len();

        let remaining: Vec<PendingTx> = txs
            .into_iter()
            .filter(|tx| {
                let indexed = api_bridges.iter().find(|bridge| {
                    bridge.id.is_some() && bridge.deposit_tx_hash == tx.deposit_tx_hash
                });
                match (&tx.kind, indexed) {
                    (_, None) => true,
                    (PendingTxKind::Deposit, Some(_)) => false,
                    (PendingTxKind::Claim { .. }, Some(bridge)) => {
                        !matches!(bridge.status, BridgeStatus::Completed { .. })
                    }
                }
            })
            .collect();

        let removed = before - remaining.len();
        if removed > 0 {
            debug!("🧹 {} pending txs corroborated by the indexer", removed);
            self.write(account, &remaining)?;
        }
        Ok(removed)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        self.write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn read(&self, account: Address) -> BridgeResult<Vec<PendingTx>> {
        let raw = match self.kv.get(&Self::key(account))? {
            Some(raw) => raw,
            None => return Ok(Vec::new()),
        };

        let stored: StoredPendingTxs = match serde_json::from_str(&raw) {
            Ok(stored) => stored,
            Err(e) => {
                warn!("⚠️ Discarding unparseable pending txs for {:?}: {}", account, e);
                return Ok(Vec::new());
            }
        };

        if stored.version != SCHEMA_VERSION {
            warn!(
                "⚠️ Discarding pending txs with schema version {} (expected {})",
                stored.version, SCHEMA_VERSION
            );
            return Ok(Vec::new());
        }

        Ok(stored
            .txs
            .into_iter()
            .filter_map(|value| {
                let record = serde_json::from_value::<StoredPendingTx>(value)
                    .map_err(BridgeError::from)
                    .and_then(|record| record.resolve(&self.chains));
                match record {
                    Ok(tx) => Some(tx),
                    Err(e) => {
                        warn!("⚠️ Dropping pending tx record: {}", e);
                        None
                    }
                }
            })
            .collect())
    }

    fn write(&self, account: Address, txs: &[PendingTx]) -> BridgeResult<()> {
        let key = Self::key(account);
        if txs.is_empty() {
            return self.kv.remove(&key);
        }

        let stored = StoredPendingTxs {
            version: SCHEMA_VERSION,
            txs: txs
                .iter()
                .map(|tx| -> BridgeResult<serde_json::Value> {
                    Ok(serde_json::to_value(StoredPendingTx::try_from(tx)?)?)
                })
                .collect::<BridgeResult<_>>()?,
        };
        let raw = serde_json::to_string(&stored)?;
        self.kv.set(&key, &raw)
    }
}
