use std::{
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use chrono::{DateTime, Utc};
use ethers::types::Address;
use tokio::{
    sync::{Notify, watch},
    task::JoinHandle,
    time::{self, Duration, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    error::BridgeResult,
    models::{
        model::{BridgePage, FetchOutcome, FetchRequest},
        traits::BridgeIndexer,
    },
    reconciler::reconciler::BridgeReconciler,
};

/// Last value published by a [`PollingTask`].
#[derive(Debug, Clone, PartialEq)]
pub struct PollState<T> {
    pub value: Option<T>,
    pub last_error: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl<T> Default for PollState<T> {
    fn default() -> Self {
        Self {
            value: None,
            last_error: None,
            updated_at: None,
        }
    }
}

/// Repeating job with cancel-and-restart semantics.
///
/// Every tick (or [`reload`](Self::reload)) cancels the run in flight and
/// starts a fresh one. A run's result is applied only while it is still the
/// latest run and its token has not been cancelled; after [`stop`](Self::stop)
/// returns nothing is applied any more.
pub struct PollingTask<T> {
    name: String,
    state: Arc<watch::Sender<PollState<T>>>,
    reload: Arc<Notify>,
    shutdown: CancellationToken,
    handle: JoinHandle<()>,
}

impl<T> PollingTask<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    pub fn spawn<F, Fut>(name: impl Into<String>, period: Duration, job: F) -> Self
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = BridgeResult<FetchOutcome<T>>> + Send + 'static,
    {
        let name = name.into();
        let (state, _) = watch::channel(PollState::default());
        let state = Arc::new(state);
        let reload = Arc::new(Notify::new());
        let shutdown = CancellationToken::new();

        let handle = tokio::spawn(run_loop(
            name.clone(),
            period,
            job,
            state.clone(),
            reload.clone(),
            shutdown.clone(),
        ));
        info!("🔁 Polling task {} started ({}ms)", name, period.as_millis());

        Self {
            name,
            state,
            reload,
            shutdown,
            handle,
        }
    }

    /// Cancels the current run and starts a new one right away.
    pub fn reload(&self) {
        self.reload.notify_one();
    }

    pub fn subscribe(&self) -> watch::Receiver<PollState<T>> {
        self.state.subscribe()
    }

    pub fn latest(&self) -> PollState<T> {
        self.state.borrow().clone()
    }

    pub fn stop(&self) {
        if self.shutdown.is_cancelled() {
            return;
        }
        self.shutdown.cancel();
        self.handle.abort();
        // Waits out any run that is applying its result right now.
        self.state.send_if_modified(|_| false);
        info!("🛑 Polling task {} stopped", self.name);
    }
}

impl<T> Drop for PollingTask<T> {
    fn drop(&mut self) {
        self.shutdown.cancel();
        self.handle.abort();
    }
}

async fn run_loop<T, F, Fut>(
    name: String,
    period: Duration,
    job: F,
    state: Arc<watch::Sender<PollState<T>>>,
    reload: Arc<Notify>,
    shutdown: CancellationToken,
) where
    T: PartialEq + Send + Sync + 'static,
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = BridgeResult<FetchOutcome<T>>> + Send + 'static,
{
    let generation = Arc::new(AtomicU64::new(0));
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut current: Option<(CancellationToken, JoinHandle<()>)> = None;

    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            _ = reload.notified() => {
                debug!("🔄 {} reload requested", name);
                interval.reset();
            }
            _ = interval.tick() => {}
        }

        if let Some((token, run)) = current.take() {
            token.cancel();
            run.abort();
        }

        let token = shutdown.child_token();
        let run_id = generation.fetch_add(1, Ordering::SeqCst) + 1;
        let run = job(token.clone());

        let run_token = token.clone();
        let run_state = state.clone();
        let run_generation = generation.clone();
        let run_name = name.clone();
        let handle = tokio::spawn(async move {
            let result = run.await;
            run_state.send_if_modified(|state| {
                if run_token.is_cancelled() || run_generation.load(Ordering::SeqCst) != run_id {
                    return false;
                }
                apply(&run_name, state, result)
            });
        });
        current = Some((token, handle));
    }

    if let Some((token, run)) = current {
        token.cancel();
        run.abort();
    }
}

/// Folds one run's result into the published state; `true` when it changed.
fn apply<T: PartialEq>(
    name: &str,
    state: &mut PollState<T>,
    result: BridgeResult<FetchOutcome<T>>,
) -> bool {
    match result {
        Ok(FetchOutcome::Cancelled) => false,
        Ok(FetchOutcome::Fetched(value)) => {
            if state.value.as_ref() == Some(&value) && state.last_error.is_none() {
                return false;
            }
            state.value = Some(value);
            state.last_error = None;
            state.updated_at = Some(Utc::now());
            true
        }
        Err(e) => {
            warn!("⚠️ {} failed: {}", name, e);
            let message = e.to_string();
            if state.last_error.as_deref() == Some(message.as_str()) {
                return false;
            }
            state.last_error = Some(message);
            true
        }
    }
}

/// Live view of an account's bridges, refreshed by a [`PollingTask`].
pub type BridgeWatcher = PollingTask<BridgePage>;

/// Polls `refresh` for the first `quantity` bridges of `account`.
pub fn watch_bridges<I>(
    reconciler: Arc<BridgeReconciler<I>>,
    account: Address,
    quantity: u64,
    period: Duration,
) -> BridgeWatcher
where
    I: BridgeIndexer + 'static,
{
    PollingTask::spawn(format!("bridges:{:?}", account), period, move |cancel| {
        let reconciler = reconciler.clone();
        async move {
            reconciler
                .refresh(account, FetchRequest::Reload { quantity }, &cancel)
                .await
        }
    })
}
