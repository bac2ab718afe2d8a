use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use ngxscope_types::{LogChannel, LogEvent, SourceMode};

use super::{AcquisitionStrategy, LogUpdate, SubscribeError, UpdateSink};

/// Raw payloads delivered on one named event channel
pub type EventStream = BoxStream<'static, serde_json::Value>;

/// Backend that emits named events carrying untyped payloads
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn subscribe(&self, event_name: &str) -> Result<EventStream, SubscribeError>;
}

/// Appends each pushed line to its channel's buffer
pub struct PushListener<S> {
    source: Arc<S>,

    /// Cancellation token for stopping listeners
    cancel: CancellationToken,

    /// One listener task per subscribed channel
    tasks: Vec<JoinHandle<()>>,
}

impl<S: EventSource + 'static> PushListener<S> {
    pub fn new(source: Arc<S>) -> Self {
        Self {
            source,
            cancel: CancellationToken::new(),
            tasks: Vec::new(),
        }
    }

    fn spawn_listener(
        &self,
        channel: LogChannel,
        mut stream: EventStream,
        sink: UpdateSink,
    ) -> JoinHandle<()> {
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            let event_name = channel.event_name();
            loop {
                tokio::select! {
                    biased;

                    _ = cancel.cancelled() => break,

                    payload = stream.next() => {
                        let Some(payload) = payload else {
                            debug!(%channel, "event stream ended");
                            break;
                        };

                        match LogEvent::from_payload(event_name, payload) {
                            Ok(event) => {
                                if sink.send(LogUpdate::Line(event)).is_err() {
                                    // View is gone
                                    break;
                                }
                            }
                            Err(e) => warn!(%channel, error = %e, "dropping malformed event"),
                        }
                    }
                }
            }
        })
    }
}

#[async_trait]
impl<S: EventSource + 'static> AcquisitionStrategy for PushListener<S> {
    fn mode(&self) -> SourceMode {
        SourceMode::Push
    }

    async fn activate(&mut self, sink: UpdateSink) {
        self.deactivate();

        for channel in LogChannel::ALL {
            match self.source.subscribe(channel.event_name()).await {
                Ok(stream) => {
                    let task = self.spawn_listener(channel, stream, sink.clone());
                    self.tasks.push(task);
                }
                Err(e) => {
                    // The channel stays empty; the view still renders
                    warn!(%channel, error = %e, "event subscription failed");
                }
            }
        }

        info!(listeners = self.tasks.len(), "push listener active");
    }

    fn deactivate(&mut self) {
        self.cancel.cancel();
        for task in self.tasks.drain(..) {
            task.abort();
        }
        // Create a fresh cancellation token for future subscriptions
        self.cancel = CancellationToken::new();
    }
}

impl<S> Drop for PushListener<S> {
    fn drop(&mut self) {
        self.cancel.cancel();
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}
