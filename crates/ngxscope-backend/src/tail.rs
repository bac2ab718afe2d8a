use std::io::SeekFrom;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use ngxscope_types::LogChannel;

use crate::bus::EventBus;

/// How often a followed file is checked for new data
pub const DEFAULT_TAIL_POLL: Duration = Duration::from_millis(500);

/// Most bytes read from the file per poll; the rest waits for the next poll
const MAX_READ_PER_POLL: u64 = 256 * 1024;

/// An unterminated line longer than this is emitted as it stands
const MAX_LINE_BYTES: usize = 16 * 1024;

/// Follows a log file like `tail -f` and emits each new line onto a bus
pub struct FileTailer {
    path: PathBuf,
    channel: LogChannel,
    bus: Arc<EventBus>,
    poll_interval: Duration,

    /// Read offset into the file
    position: u64,

    /// Bytes after the last newline, waiting for the rest of the line
    partial: Vec<u8>,

    max_read: u64,
    max_line: usize,

    /// The last poll failed; cleared by the next successful one
    failing: bool,
}

impl FileTailer {
    pub fn new(path: impl Into<PathBuf>, channel: LogChannel, bus: Arc<EventBus>) -> Self {
        Self {
            path: path.into(),
            channel,
            bus,
            poll_interval: DEFAULT_TAIL_POLL,
            position: 0,
            partial: Vec::new(),
            max_read: MAX_READ_PER_POLL,
            max_line: MAX_LINE_BYTES,
            failing: false,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Start following from the current end of the file
    ///
    /// A file that does not exist yet is read from its start once it appears.
    pub async fn spawn(mut self, cancel: CancellationToken) -> JoinHandle<()> {
        self.position = match tokio::fs::metadata(&self.path).await {
            Ok(meta) => meta.len(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "log file not readable yet");
                self.failing = true;
                0
            }
        };
        info!(
            channel = %self.channel,
            path = %self.path.display(),
            offset = self.position,
            "tailing log file"
        );

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;

                    _ = cancel.cancelled() => break,

                    _ = tokio::time::sleep(self.poll_interval) => self.tick().await,
                }
            }
            debug!(path = %self.path.display(), "tailer stopped");
        })
    }

    /// One poll, logging only when the file changes between readable and not
    async fn tick(&mut self) {
        match self.poll_once().await {
            Ok(()) if self.failing => {
                info!(path = %self.path.display(), "log file readable again");
                self.failing = false;
            }
            Ok(()) => {}
            Err(e) if self.failing => {
                debug!(path = %self.path.display(), error = %e, "tail read still failing");
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "tail read failed");
                self.failing = true;
            }
        }
    }

    /// Read what was appended since the last call, up to `max_read` bytes,
    /// and emit complete lines
    async fn poll_once(&mut self) -> std::io::Result<()> {
        let len = tokio::fs::metadata(&self.path).await?.len();

        if len < self.position {
            info!(path = %self.path.display(), "log file truncated, reading from start");
            self.position = 0;
            self.partial.clear();
        }
        if len == self.position {
            return Ok(());
        }

        let mut file = tokio::fs::File::open(&self.path).await?;
        file.seek(SeekFrom::Start(self.position)).await?;
        let mut chunk = Vec::new();
        let read = file.take(self.max_read).read_to_end(&mut chunk).await?;
        self.position += read as u64;

        self.partial.extend_from_slice(&chunk);
        for line in drain_lines(&mut self.partial) {
            self.emit(line);
        }

        if self.partial.len() >= self.max_line {
            debug!(path = %self.path.display(), bytes = self.partial.len(), "flushing overlong line");
            let line = String::from_utf8_lossy(&self.partial).into_owned();
            self.partial.clear();
            self.emit(line);
        }
        Ok(())
    }

    fn emit(&self, line: String) {
        self.bus.emit(self.channel.event_name(), Value::String(line));
    }
}

/// Split off every newline-terminated line, leaving the unfinished tail
fn drain_lines(buf: &mut Vec<u8>) -> Vec<String> {
    let Some(last) = buf.iter().rposition(|b| *b == b'\n') else {
        return Vec::new();
    };

    let complete: Vec<u8> = buf.drain(..=last).collect();
    complete
        .split(|b| *b == b'\n')
        .filter(|line| !line.is_empty())
        .map(|line| {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            String::from_utf8_lossy(line).into_owned()
        })
        .filter(|line| !line.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use ngxscope_logs::EventSource;

    use super::*;

    fn tailer(path: PathBuf, bus: Arc<EventBus>) -> FileTailer {
        FileTailer::new(path, LogChannel::Access, bus)
    }

    #[tokio::test]
    async fn test_poll_reads_at_most_max_read_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("access.log");
        let content: String = (0..100).map(|i| format!("line {i:03}\n")).collect();
        std::fs::write(&path, &content).unwrap();

        let mut tailer = tailer(path, Arc::new(EventBus::new()));
        tailer.max_read = 100;

        tailer.poll_once().await.unwrap();
        assert_eq!(tailer.position, 100);
        // 100 bytes is eleven 9-byte lines plus one byte of the twelfth
        assert_eq!(tailer.partial, b"l");

        tailer.poll_once().await.unwrap();
        assert_eq!(tailer.position, 200);

        while tailer.position < content.len() as u64 {
            tailer.poll_once().await.unwrap();
        }
        assert!(tailer.partial.is_empty());
    }

    #[tokio::test]
    async fn test_overlong_unterminated_line_is_flushed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("error.log");
        std::fs::write(&path, "x".repeat(40)).unwrap();

        let bus = Arc::new(EventBus::new());
        let mut stream = bus
            .subscribe(LogChannel::Access.event_name())
            .await
            .unwrap();
        let mut tailer = tailer(path, Arc::clone(&bus));
        tailer.max_line = 16;

        tailer.poll_once().await.unwrap();
        assert!(tailer.partial.is_empty());
        assert_eq!(stream.next().await, Some(Value::String("x".repeat(40))));
    }

    #[tokio::test]
    async fn test_tick_tracks_failing_and_recovery() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.log");
        let mut tailer = tailer(path.clone(), Arc::new(EventBus::new()));

        tailer.tick().await;
        assert!(tailer.failing);
        tailer.tick().await;
        assert!(tailer.failing);

        std::fs::write(&path, "up\n").unwrap();
        tailer.tick().await;
        assert!(!tailer.failing);
        assert_eq!(tailer.position, 3);
    }

    #[test]
    fn test_drain_lines_keeps_partial_tail() {
        let mut buf = b"one\ntwo\r\nthr".to_vec();
        assert_eq!(drain_lines(&mut buf), vec!["one", "two"]);
        assert_eq!(buf, b"thr");

        buf.extend_from_slice(b"ee\n");
        assert_eq!(drain_lines(&mut buf), vec!["three"]);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_drain_lines_skips_blank_lines() {
        let mut buf = b"\n\na\n\n".to_vec();
        assert_eq!(drain_lines(&mut buf), vec!["a"]);
    }

    #[test]
    fn test_drain_lines_without_newline() {
        let mut buf = b"no newline yet".to_vec();
        assert!(drain_lines(&mut buf).is_empty());
        assert_eq!(buf, b"no newline yet");
    }
}
