use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use ngxscope_types::{LogChannel, SourceMode};

use super::{AcquisitionStrategy, FetchError, LogUpdate, UpdateSink};

/// Default interval between fetch rounds
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default number of trailing lines requested per channel
pub const DEFAULT_TAIL_LINES: usize = 100;

/// Endpoint returning the last N lines of a channel, oldest first
///
/// Implementations are expected to bound each request with their own timeout.
#[async_trait]
pub trait LogSource: Send + Sync {
    async fn fetch_tail(&self, channel: LogChannel, lines: usize)
    -> Result<Vec<String>, FetchError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub lines: usize,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            lines: DEFAULT_TAIL_LINES,
        }
    }
}

/// Replaces each channel's buffer with a periodically fetched snapshot
pub struct PollFetcher<S> {
    source: Arc<S>,
    config: PollConfig,

    /// Cancellation token for stopping the timer loop
    cancel: CancellationToken,

    /// Timer loop task handle
    task: Option<JoinHandle<()>>,

    /// Wakes the timer loop for a manual refresh
    refresh: Arc<Notify>,
}

impl<S: LogSource + 'static> PollFetcher<S> {
    pub fn new(source: Arc<S>, config: PollConfig) -> Self {
        Self {
            source,
            config,
            cancel: CancellationToken::new(),
            task: None,
            refresh: Arc::new(Notify::new()),
        }
    }
}

/// Fetch both channels concurrently; each outcome is reported on its own
async fn fetch_round<S: LogSource>(source: Arc<S>, lines: usize, seq: u64, sink: UpdateSink) {
    let fetches = LogChannel::ALL.map(|channel| {
        let source = Arc::clone(&source);
        let sink = sink.clone();
        async move {
            let update = match source.fetch_tail(channel, lines).await {
                Ok(lines) => {
                    debug!(%channel, seq, count = lines.len(), "fetched log snapshot");
                    LogUpdate::Snapshot {
                        channel,
                        seq,
                        lines,
                    }
                }
                Err(error) => {
                    warn!(%channel, seq, %error, "log fetch failed");
                    LogUpdate::FetchFailed {
                        channel,
                        seq,
                        error,
                    }
                }
            };
            let _ = sink.send(update);
        }
    });

    futures::future::join_all(fetches).await;
}

#[async_trait]
impl<S: LogSource + 'static> AcquisitionStrategy for PollFetcher<S> {
    fn mode(&self) -> SourceMode {
        SourceMode::Poll
    }

    async fn activate(&mut self, sink: UpdateSink) {
        self.deactivate();

        let source = Arc::clone(&self.source);
        let refresh = Arc::clone(&self.refresh);
        let cancel = self.cancel.clone();
        let PollConfig { interval, lines } = self.config;

        self.task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            // Rounds run as separate tasks so a slow fetch never holds up the timer
            let mut rounds = JoinSet::new();
            let mut seq: u64 = 0;

            loop {
                tokio::select! {
                    biased;

                    _ = cancel.cancelled() => break,

                    _ = ticker.tick() => {
                        seq += 1;
                        rounds.spawn(fetch_round(Arc::clone(&source), lines, seq, sink.clone()));
                    }

                    _ = refresh.notified() => {
                        seq += 1;
                        rounds.spawn(fetch_round(Arc::clone(&source), lines, seq, sink.clone()));
                        ticker.reset();
                    }

                    Some(_) = rounds.join_next(), if !rounds.is_empty() => {}
                }
            }

            rounds.abort_all();
        }));

        info!(?interval, lines, "poll fetcher active");
    }

    fn refresh(&self) {
        self.refresh.notify_one();
    }

    fn deactivate(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
        // Create a fresh cancellation token for the next activation
        self.cancel = CancellationToken::new();
    }
}

impl<S> Drop for PollFetcher<S> {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
