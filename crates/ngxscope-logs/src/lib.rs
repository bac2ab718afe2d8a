//! Log pipeline for ngxscope
//!
//! This crate provides bounded per-channel buffering, line parsing, live
//! filtering, row projection, and the push/poll acquisition strategies that
//! feed them.

pub mod acquire;
mod buffer;
mod filter;
mod parser;
mod pipeline;
mod projector;
mod view;

pub use acquire::{
    AcquisitionStrategy, DEFAULT_POLL_INTERVAL, DEFAULT_TAIL_LINES, EventSource, EventStream,
    FetchError, LogSource, LogUpdate, PollConfig, PollFetcher, PushListener, SubscribeError,
    UpdateSink,
};
pub use buffer::{LogBuffer, MAX_LOG_LINES};
pub use filter::{FilterCache, SearchQuery, filter_lines};
pub use parser::LogParser;
pub use pipeline::LogPipeline;
pub use projector::{Placeholder, Projection, Row, project};
pub use view::LogView;

// Re-export types used in our public API
pub use ngxscope_types::{
    AccessRecord, DisplayMode, FreeTextRecord, LineFormat, LogChannel, LogEvent, ParsedLogEntry,
    Severity, SourceMode,
};
