// src/feed.rs
//! The polling feed consumers bind to. Owns the refresh interval, the
//! retry backoff timer, and the last-known-good state; guarantees at most
//! one in-flight fetch, with a manual retry superseding the in-flight
//! cycle (last caller wins).
//!
//! Consumers must treat `data` as possibly stale: a new in-flight fetch
//! never clears previously obtained data, and a retry-exhausted error
//! augments the state rather than replacing the payload.

use std::future::pending;
use std::ops::ControlFlow;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep_until, Instant, MissedTickBehavior};

use crate::fetch::CommunityFetcher;
use crate::types::{CommunityData, DataSource, FetchError, FetchResult};

const MAX_BACKOFF_MS: u64 = 30_000;

pub type SuccessCallback = Arc<dyn Fn(&CommunityData) + Send + Sync>;
pub type ErrorCallback = Arc<dyn Fn(&FetchError) + Send + Sync>;

/// Consumer knobs. Defaults: enabled, 5-minute refresh, 2 extra attempts.
#[derive(Clone)]
pub struct FeedOptions {
    pub enabled: bool,
    pub refetch_interval: Duration,
    pub retry_count: u32,
    pub on_success: Option<SuccessCallback>,
    pub on_error: Option<ErrorCallback>,
}

impl Default for FeedOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            refetch_interval: Duration::from_secs(300),
            retry_count: 2,
            on_success: None,
            on_error: None,
        }
    }
}

/// Snapshot of what the UI renders.
#[derive(Debug, Clone, Default)]
pub struct FeedState {
    pub data: Option<CommunityData>,
    /// Populated only once a cycle's retries are exhausted.
    pub error: Option<FetchError>,
    /// True while a fetch is in flight or a retry is scheduled.
    pub is_loading: bool,
    pub data_source: Option<DataSource>,
    /// Unix epoch millis of the last successful or recovered payload.
    pub last_updated: Option<u64>,
}

#[derive(Debug)]
enum Command {
    Retry,
    Refetch,
    ClearCache,
    Stop,
}

/// Handle to a running feed. `stop` is idempotent and required on
/// disposal; dropping the handle aborts the loop outright.
pub struct FeedHandle {
    cmd: mpsc::UnboundedSender<Command>,
    state_rx: watch::Receiver<FeedState>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl FeedHandle {
    pub fn state(&self) -> FeedState {
        self.state_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FeedState> {
        self.state_rx.clone()
    }

    /// Cancel any pending backoff and re-issue a fetch with a fresh
    /// attempt budget.
    pub fn retry(&self) {
        let _ = self.cmd.send(Command::Retry);
    }

    /// Re-issue a fetch without resetting retry bookkeeping.
    pub fn refetch(&self) {
        let _ = self.cmd.send(Command::Refetch);
    }

    pub fn clear_cache(&self) {
        let _ = self.cmd.send(Command::ClearCache);
    }

    pub fn stop(&self) {
        let _ = self.cmd.send(Command::Stop);
    }
}

impl Drop for FeedHandle {
    fn drop(&mut self) {
        let _ = self.cmd.send(Command::Stop);
        if let Some(task) = self.task.lock().expect("feed task mutex poisoned").take() {
            task.abort();
        }
    }
}

/// Exponential backoff: `min(1000 * 2^attempt, 30000)` milliseconds.
pub fn backoff_delay(attempt: u32) -> Duration {
    let ms = 1000u64.saturating_mul(1u64 << attempt.min(15));
    Duration::from_millis(ms.min(MAX_BACKOFF_MS))
}

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("feed_retry_total", "Scheduled retry attempts after failures.");
        describe_counter!("feed_cycles_total", "Fetch cycles started by the feed.");
    });
}

/// Spawn the feed loop. `network` is the runtime's online/offline signal;
/// flipping it to `true` triggers an immediate refetch, flipping it to
/// `false` optimistically marks the payload as cached.
pub fn spawn_feed(
    fetcher: Arc<dyn CommunityFetcher>,
    opts: FeedOptions,
    network: watch::Receiver<bool>,
) -> FeedHandle {
    ensure_metrics_described();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (state_tx, state_rx) = watch::channel(FeedState::default());

    let runner = FeedRunner {
        fetcher,
        opts,
        state_tx,
        cmd_rx,
        network,
        attempt: 0,
        retry_deadline: None,
    };
    let task = tokio::spawn(runner.run());

    FeedHandle {
        cmd: cmd_tx,
        state_rx,
        task: Mutex::new(Some(task)),
    }
}

struct FeedRunner {
    fetcher: Arc<dyn CommunityFetcher>,
    opts: FeedOptions,
    state_tx: watch::Sender<FeedState>,
    cmd_rx: mpsc::UnboundedReceiver<Command>,
    network: watch::Receiver<bool>,
    attempt: u32,
    retry_deadline: Option<Instant>,
}

impl FeedRunner {
    async fn run(mut self) {
        let mut ticker = interval(self.opts.refetch_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker.tick().await; // the immediate first tick is the initial fetch below

        if self.opts.enabled && self.run_cycle(true).await.is_break() {
            return;
        }

        let mut network_alive = true;
        loop {
            let deadline = self.retry_deadline;
            let retry_timer = async move {
                match deadline {
                    Some(at) => sleep_until(at).await,
                    None => pending().await,
                }
            };
            tokio::pin!(retry_timer);

            let flow = tokio::select! {
                cmd = self.cmd_rx.recv() => match cmd {
                    None | Some(Command::Stop) => ControlFlow::Break(()),
                    Some(Command::Retry) => self.run_cycle(true).await,
                    Some(Command::Refetch) => self.run_cycle(false).await,
                    Some(Command::ClearCache) => {
                        self.handle_clear_cache().await;
                        ControlFlow::Continue(())
                    }
                },
                // The refresh interval yields to an active retry chain so
                // the two timers never compound.
                _ = ticker.tick(), if self.opts.enabled && self.retry_deadline.is_none() => {
                    self.run_cycle(true).await
                },
                _ = &mut retry_timer, if self.retry_deadline.is_some() => {
                    self.retry_deadline = None;
                    self.run_cycle(false).await
                },
                changed = self.network.changed(), if network_alive => match changed {
                    Err(_) => {
                        network_alive = false;
                        ControlFlow::Continue(())
                    }
                    Ok(()) => {
                        let online = *self.network.borrow_and_update();
                        self.handle_network_change(online).await
                    }
                },
            };
            if flow.is_break() {
                break;
            }
        }
        tracing::debug!("community feed stopped");
    }

    /// One fetch attempt. Commands arriving mid-flight supersede the
    /// in-flight request instead of queueing a second one.
    async fn run_cycle(&mut self, reset: bool) -> ControlFlow<()> {
        if reset {
            self.attempt = 0;
        }
        self.retry_deadline = None;

        'cycle: loop {
            counter!("feed_cycles_total").increment(1);
            self.state_tx.send_modify(|s| s.is_loading = true);

            let fetcher = Arc::clone(&self.fetcher);
            let fetch_fut = async move { fetcher.fetch().await };
            tokio::pin!(fetch_fut);

            let result = loop {
                tokio::select! {
                    result = &mut fetch_fut => break result,
                    cmd = self.cmd_rx.recv() => match cmd {
                        None | Some(Command::Stop) => return ControlFlow::Break(()),
                        Some(Command::Retry) => {
                            self.attempt = 0;
                            continue 'cycle;
                        }
                        Some(Command::Refetch) => continue 'cycle,
                        Some(Command::ClearCache) => self.handle_clear_cache().await,
                    },
                }
            };

            self.apply_result(result);
            return ControlFlow::Continue(());
        }
    }

    fn apply_result(&mut self, result: FetchResult<CommunityData>) {
        let FetchResult {
            data,
            error,
            metadata,
        } = result;

        if let Some(payload) = data {
            if error.is_none() {
                if let Some(cb) = &self.opts.on_success {
                    cb(&payload);
                }
            }
            self.state_tx.send_modify(|s| {
                s.data = Some(payload);
                s.data_source = Some(metadata.source);
                s.last_updated = Some(metadata.timestamp);
            });
        }

        let Some(err) = error else {
            self.attempt = 0;
            self.state_tx.send_modify(|s| {
                s.error = None;
                s.is_loading = false;
            });
            return;
        };

        if err.retryable && self.attempt < self.opts.retry_count {
            let delay = backoff_delay(self.attempt);
            self.attempt += 1;
            self.retry_deadline = Some(Instant::now() + delay);
            counter!("feed_retry_total").increment(1);
            tracing::debug!(
                attempt = self.attempt,
                delay_ms = delay.as_millis() as u64,
                code = %err.code,
                "fetch failed, retry scheduled"
            );
            // Error is withheld until the chain settles; loading stays on.
            self.state_tx.send_modify(|s| s.is_loading = true);
        } else {
            tracing::warn!(code = %err.code, "fetch failed, retries exhausted");
            if let Some(cb) = &self.opts.on_error {
                cb(&err);
            }
            self.state_tx.send_modify(|s| {
                s.error = Some(err);
                s.is_loading = false;
            });
        }
    }

    async fn handle_clear_cache(&mut self) {
        self.fetcher.clear_cache().await;
        self.state_tx.send_modify(|s| *s = FeedState::default());
        tracing::info!("community cache cleared");
    }

    async fn handle_network_change(&mut self, online: bool) -> ControlFlow<()> {
        if online {
            tracing::info!("network online, refetching community data");
            self.run_cycle(false).await
        } else {
            tracing::info!("network offline, marking payload as cached");
            self.state_tx
                .send_modify(|s| s.data_source = Some(DataSource::Cached));
            ControlFlow::Continue(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_then_caps() {
        assert_eq!(backoff_delay(0), Duration::from_millis(1000));
        assert_eq!(backoff_delay(1), Duration::from_millis(2000));
        assert_eq!(backoff_delay(2), Duration::from_millis(4000));
        assert_eq!(backoff_delay(4), Duration::from_millis(16000));
        assert_eq!(backoff_delay(5), Duration::from_millis(30000));
        assert_eq!(backoff_delay(60), Duration::from_millis(30000));
    }

    #[test]
    fn default_options_match_contract() {
        let opts = FeedOptions::default();
        assert!(opts.enabled);
        assert_eq!(opts.refetch_interval, Duration::from_secs(300));
        assert_eq!(opts.retry_count, 2);
    }
}
