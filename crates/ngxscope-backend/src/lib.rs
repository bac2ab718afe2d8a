//! Concrete log sources: the HTTP tail endpoint for poll mode, and an
//! in-process event bus fed by file tailers for push mode.

mod bus;
mod http;
mod tail;

pub use bus::EventBus;
pub use http::{DEFAULT_BASE_URL, DEFAULT_REQUEST_TIMEOUT, HttpLogSource, HttpSourceConfig};
pub use tail::{DEFAULT_TAIL_POLL, FileTailer};
