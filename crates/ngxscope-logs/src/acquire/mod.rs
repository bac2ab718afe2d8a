//! Acquisition strategies feeding the log view
//!
//! A strategy never touches the view directly. It sends [`LogUpdate`]s over an
//! unbounded channel and the single owner of the view applies them one at a
//! time, so no two mutations of a buffer ever overlap.

mod poll;
mod push;

use async_trait::async_trait;
use tokio::sync::mpsc;

use ngxscope_types::{LogChannel, LogEvent, SourceMode};

pub use poll::{DEFAULT_POLL_INTERVAL, DEFAULT_TAIL_LINES, LogSource, PollConfig, PollFetcher};
pub use push::{EventSource, EventStream, PushListener};

/// A change to apply to the log view
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogUpdate {
    /// Push mode: one new line to append
    Line(LogEvent),
    /// Poll mode: the latest lines of a channel, replacing its buffer
    Snapshot {
        channel: LogChannel,
        seq: u64,
        lines: Vec<String>,
    },
    /// Poll mode: the fetch for a channel failed
    FetchFailed {
        channel: LogChannel,
        seq: u64,
        error: FetchError,
    },
}

pub type UpdateSink = mpsc::UnboundedSender<LogUpdate>;

/// Failure fetching a channel's lines from the poll endpoint
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// Structured error reported by the backend
    #[error("{0}")]
    Backend(String),
    /// Transport failure or an unstructured error response
    #[error("Failed to fetch logs from the server")]
    Unavailable,
    #[error("Timed out fetching logs from the server")]
    Timeout,
}

/// Failure establishing an event subscription
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubscribeError {
    #[error("event source is closed")]
    Closed,
    #[error("cannot subscribe to `{event}`: {reason}")]
    Rejected { event: String, reason: String },
}

/// Source of log updates for one view, selected once at construction
#[async_trait]
pub trait AcquisitionStrategy: Send {
    fn mode(&self) -> SourceMode;

    /// Start delivering updates to `sink`
    async fn activate(&mut self, sink: UpdateSink);

    /// Request an immediate refresh; a no-op where unsupported
    fn refresh(&self) {}

    /// Stop delivering updates; completes before returning
    fn deactivate(&mut self);
}
