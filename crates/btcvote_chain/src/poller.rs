//! Interval-driven read pollers.
//!
//! A poller owns a tokio task that runs one read at a fixed interval and
//! publishes a [`ReadState`] over a `watch` channel. Dropping the
//! [`PollHandle`] aborts the task. Write flows invalidate pollers through a
//! [`RefetchHub`] so panels see fresh data right after a confirmed
//! transaction.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{Notify, broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::reads::ReadError;

// ---------------------------------------------------------------------------
// ReadState
// ---------------------------------------------------------------------------

/// Latest outcome of a polled read.
///
/// `data: None` means nothing has been read yet, which is distinct from a
/// confirmed zero. A failed poll keeps the previous `data` and sets `error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadState<T> {
    pub data: Option<T>,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl<T> ReadState<T> {
    /// Initial state of a poller that has not completed a read.
    pub fn loading() -> Self {
        Self {
            data: None,
            is_loading: true,
            error: None,
        }
    }

    pub fn ready(data: T) -> Self {
        Self {
            data: Some(data),
            is_loading: false,
            error: None,
        }
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// The data if present and the last poll succeeded.
    pub fn fresh(&self) -> Option<&T> {
        if self.error.is_some() {
            None
        } else {
            self.data.as_ref()
        }
    }

    fn apply(&mut self, result: Result<T, ReadError>) {
        self.is_loading = false;
        match result {
            Ok(data) => {
                self.data = Some(data);
                self.error = None;
            }
            Err(e) => self.error = Some(e.to_string()),
        }
    }
}

impl<T> Default for ReadState<T> {
    fn default() -> Self {
        Self {
            data: None,
            is_loading: false,
            error: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Invalidation
// ---------------------------------------------------------------------------

/// Groups of reads a confirmed write can make stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RefreshTopic {
    Balances,
    Staking,
    Voting,
    All,
}

impl RefreshTopic {
    fn covers(self, other: RefreshTopic) -> bool {
        self == RefreshTopic::All || other == RefreshTopic::All || self == other
    }
}

/// Broadcasts invalidations from write flows to every subscribed poller.
#[derive(Debug, Clone)]
pub struct RefetchHub {
    tx: broadcast::Sender<RefreshTopic>,
}

impl RefetchHub {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(32);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RefreshTopic> {
        self.tx.subscribe()
    }

    pub fn invalidate(&self, topic: RefreshTopic) {
        // No subscribers simply means nothing is polling right now.
        let receivers = self.tx.send(topic).unwrap_or(0);
        debug!(?topic, receivers, "invalidated reads");
    }
}

impl Default for RefetchHub {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Poller
// ---------------------------------------------------------------------------

/// Handle to a running poller. The task stops when the handle is dropped.
pub struct PollHandle<T> {
    rx: watch::Receiver<ReadState<T>>,
    refetch: Arc<Notify>,
    task: JoinHandle<()>,
}

impl<T: Clone> PollHandle<T> {
    pub fn state(&self) -> ReadState<T> {
        self.rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ReadState<T>> {
        self.rx.clone()
    }

    /// Run the read now instead of waiting for the next tick.
    pub fn refetch(&self) {
        self.refetch.notify_one();
    }

    /// Wait for the next published state.
    pub async fn changed(&mut self) -> Option<ReadState<T>> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl<T> Drop for PollHandle<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Configures and starts a poller.
pub struct Poller {
    name: &'static str,
    interval: Duration,
    invalidation: Option<(broadcast::Receiver<RefreshTopic>, RefreshTopic)>,
}

impl Poller {
    pub fn new(name: &'static str, interval: Duration) -> Self {
        Self {
            name,
            interval,
            invalidation: None,
        }
    }

    /// Refetch whenever `hub` invalidates `topic`.
    pub fn invalidated_by(mut self, hub: &RefetchHub, topic: RefreshTopic) -> Self {
        self.invalidation = Some((hub.subscribe(), topic));
        self
    }

    pub fn spawn<T, F, Fut>(self, fetch: F) -> PollHandle<T>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ReadError>> + Send + 'static,
    {
        let (tx, rx) = watch::channel(ReadState::loading());
        let refetch = Arc::new(Notify::new());
        let task = tokio::spawn(run_poll(self, fetch, tx, refetch.clone()));
        PollHandle { rx, refetch, task }
    }
}

async fn run_poll<T, F, Fut>(
    poller: Poller,
    fetch: F,
    tx: watch::Sender<ReadState<T>>,
    refetch: Arc<Notify>,
) where
    T: Clone + Send + Sync + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ReadError>> + Send + 'static,
{
    let Poller {
        name,
        interval,
        mut invalidation,
    } = poller;
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = refetch.notified() => {
                debug!(poller = name, "manual refetch");
            }
            topic = recv_invalidation(&mut invalidation) => {
                debug!(poller = name, ?topic, "refetch after invalidation");
            }
        }

        // Only the first load counts as loading; later polls refresh silently.
        tx.send_if_modified(|state| {
            let loading = state.data.is_none();
            let changed = state.is_loading != loading;
            state.is_loading = loading;
            changed
        });
        let result = fetch().await;
        if let Err(e) = &result {
            warn!(poller = name, error = %e, "read failed, keeping previous data");
        }
        tx.send_modify(|state| state.apply(result));

        if tx.is_closed() {
            debug!(poller = name, "no receivers left, stopping");
            return;
        }
    }
}

/// Resolves on an invalidation matching the poller's topic; pending forever
/// when the poller has no hub.
async fn recv_invalidation(
    invalidation: &mut Option<(broadcast::Receiver<RefreshTopic>, RefreshTopic)>,
) -> RefreshTopic {
    loop {
        let Some((rx, wanted)) = invalidation.as_mut() else {
            return std::future::pending().await;
        };
        match rx.recv().await {
            Ok(topic) if topic.covers(*wanted) => return topic,
            Ok(_) => continue,
            // Missed messages may have included ours.
            Err(broadcast::error::RecvError::Lagged(_)) => return *wanted,
            Err(broadcast::error::RecvError::Closed) => *invalidation = None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::RpcError;
    use std::sync::atomic::{AtomicU32, Ordering};

    async fn next_settled<T: Clone>(handle: &mut PollHandle<T>) -> ReadState<T> {
        loop {
            let state = tokio::time::timeout(Duration::from_secs(2), handle.changed())
                .await
                .expect("poller published nothing")
                .expect("poller stopped");
            if !state.is_loading {
                return state;
            }
        }
    }

    #[tokio::test]
    async fn first_poll_publishes_data() {
        let mut handle = Poller::new("test", Duration::from_secs(60))
            .spawn(|| async { Ok::<_, ReadError>(7u64) });
        let state = next_settled(&mut handle).await;
        assert_eq!(state.data, Some(7));
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn errors_keep_stale_data() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let mut handle = Poller::new("test", Duration::from_secs(60)).spawn(move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Ok(5u64)
                } else {
                    Err(ReadError::Rpc(RpcError::Transport("down".into())))
                }
            }
        });
        assert_eq!(next_settled(&mut handle).await.data, Some(5));

        handle.refetch();
        let state = next_settled(&mut handle).await;
        assert_eq!(state.data, Some(5));
        assert!(state.has_error());
        assert!(state.fresh().is_none());
    }

    #[tokio::test]
    async fn hub_invalidation_triggers_refetch() {
        let hub = RefetchHub::new();
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let mut handle = Poller::new("test", Duration::from_secs(60))
            .invalidated_by(&hub, RefreshTopic::Staking)
            .spawn(move || {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move { Ok::<_, ReadError>(n) }
            });
        assert_eq!(next_settled(&mut handle).await.data, Some(0));

        hub.invalidate(RefreshTopic::All);
        assert_eq!(next_settled(&mut handle).await.data, Some(1));
    }

    #[tokio::test]
    async fn dropping_handle_stops_polling() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let handle = Poller::new("test", Duration::from_millis(5)).spawn(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, ReadError>(()) }
        });
        tokio::time::sleep(Duration::from_millis(30)).await;
        drop(handle);
        tokio::time::sleep(Duration::from_millis(10)).await;
        let after_drop = calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(calls.load(Ordering::SeqCst), after_drop);
    }

    #[test]
    fn topics_cover_themselves_and_all() {
        assert!(RefreshTopic::All.covers(RefreshTopic::Voting));
        assert!(RefreshTopic::Voting.covers(RefreshTopic::Voting));
        assert!(!RefreshTopic::Balances.covers(RefreshTopic::Staking));
    }
}
