//! Startup configuration
//!
//! Values come from three layers: command-line flags, then an optional TOML
//! file, then built-in defaults.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use serde::Deserialize;

use ngxscope_backend::{DEFAULT_BASE_URL, DEFAULT_REQUEST_TIMEOUT};
use ngxscope_logs::{DEFAULT_POLL_INTERVAL, DEFAULT_TAIL_LINES, MAX_LOG_LINES, SourceMode};

pub const DEFAULT_ACCESS_LOG: &str = "/var/log/nginx/access.log";
pub const DEFAULT_ERROR_LOG: &str = "/var/log/nginx/error.log";

/// ngxscope - follow nginx access and error logs in the terminal
#[derive(Parser, Debug, Default)]
#[command(name = "ngxscope")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Acquisition mode: stream new lines (push) or fetch periodically (poll)
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Base URL of the dashboard API (poll mode)
    #[arg(long, value_name = "URL")]
    pub url: Option<String>,

    /// Access log to follow (push mode)
    #[arg(long, value_name = "PATH")]
    pub access_log: Option<PathBuf>,

    /// Error log to follow (push mode)
    #[arg(long, value_name = "PATH")]
    pub error_log: Option<PathBuf>,

    /// Trailing lines requested per fetch (poll mode)
    #[arg(long)]
    pub lines: Option<usize>,

    /// Seconds between fetches (poll mode)
    #[arg(long, value_name = "SECS")]
    pub interval: Option<u64>,

    /// Config file (default: ~/.config/ngxscope/config.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Write diagnostics here instead of stderr
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Push,
    Poll,
}

impl From<ModeArg> for SourceMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Push => SourceMode::Push,
            ModeArg::Poll => SourceMode::Poll,
        }
    }
}

/// Contents of the TOML config file; every key is optional
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub mode: Option<SourceMode>,
    pub url: Option<String>,
    pub access_log: Option<PathBuf>,
    pub error_log: Option<PathBuf>,
    pub lines: Option<usize>,
    pub interval_secs: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub capacity: Option<usize>,
    pub session_cookie: Option<String>,
    pub log_file: Option<PathBuf>,
}

impl FileConfig {
    /// Read `path`; a missing file at the default location is not an error
    pub fn load(path: &Path, explicit: bool) -> Result<Self> {
        if !explicit && !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }
}

/// Fully resolved settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub mode: SourceMode,
    pub url: String,
    pub access_log: PathBuf,
    pub error_log: PathBuf,
    pub lines: usize,
    pub interval: Duration,
    pub timeout: Duration,
    pub capacity: usize,
    pub session_cookie: Option<String>,
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: SourceMode::default(),
            url: DEFAULT_BASE_URL.to_string(),
            access_log: PathBuf::from(DEFAULT_ACCESS_LOG),
            error_log: PathBuf::from(DEFAULT_ERROR_LOG),
            lines: DEFAULT_TAIL_LINES,
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_REQUEST_TIMEOUT,
            capacity: MAX_LOG_LINES,
            session_cookie: None,
            log_file: None,
        }
    }
}

impl Config {
    /// Resolve settings from the command line and the config file it points at
    pub fn load(args: Args) -> Result<Self> {
        let (path, explicit) = match &args.config {
            Some(path) => (path.clone(), true),
            None => match default_config_path() {
                Some(path) => (path, false),
                None => return Self::merge(args, FileConfig::default()),
            },
        };

        let file = FileConfig::load(&path, explicit)?;
        Self::merge(args, file)
    }

    /// Overlay `file` on the defaults, then `args` on top
    pub fn merge(args: Args, file: FileConfig) -> Result<Self> {
        let defaults = Self::default();

        let config = Self {
            mode: args
                .mode
                .map(SourceMode::from)
                .or(file.mode)
                .unwrap_or(defaults.mode),
            url: args.url.or(file.url).unwrap_or(defaults.url),
            access_log: args
                .access_log
                .or(file.access_log)
                .unwrap_or(defaults.access_log),
            error_log: args
                .error_log
                .or(file.error_log)
                .unwrap_or(defaults.error_log),
            lines: args.lines.or(file.lines).unwrap_or(defaults.lines),
            interval: args
                .interval
                .or(file.interval_secs)
                .map(Duration::from_secs)
                .unwrap_or(defaults.interval),
            timeout: file
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            capacity: file.capacity.unwrap_or(defaults.capacity),
            session_cookie: file.session_cookie,
            log_file: args.log_file.or(file.log_file),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.lines == 0 {
            bail!("lines must be at least 1");
        }
        if self.interval.is_zero() {
            bail!("interval must be at least 1 second");
        }
        if self.timeout.is_zero() {
            bail!("timeout_secs must be at least 1");
        }
        if self.capacity == 0 {
            bail!("capacity must be at least 1");
        }
        Ok(())
    }

    /// Where lines come from, for the header
    pub fn source_label(&self) -> String {
        match self.mode {
            SourceMode::Poll => self.url.clone(),
            SourceMode::Push => format!(
                "{} + {}",
                self.access_log.display(),
                self.error_log.display()
            ),
        }
    }
}

fn default_config_path() -> Option<PathBuf> {
    Some(dirs::config_dir()?.join("ngxscope").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn file(toml: &str) -> FileConfig {
        toml::from_str(toml).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = Config::merge(Args::default(), FileConfig::default()).unwrap();
        assert_eq!(config.mode, SourceMode::Poll);
        assert_eq!(config.url, "http://localhost:8081/api");
        assert_eq!(config.access_log, PathBuf::from("/var/log/nginx/access.log"));
        assert_eq!(config.error_log, PathBuf::from("/var/log/nginx/error.log"));
        assert_eq!(config.lines, 100);
        assert_eq!(config.interval, Duration::from_secs(5));
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.capacity, 1000);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let config = Config::merge(
            Args::default(),
            file(
                r#"
                mode = "push"
                lines = 250
                interval_secs = 30
                timeout_secs = 3
                session_cookie = "session=abc"
                "#,
            ),
        )
        .unwrap();

        assert_eq!(config.mode, SourceMode::Push);
        assert_eq!(config.lines, 250);
        assert_eq!(config.interval, Duration::from_secs(30));
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.session_cookie.as_deref(), Some("session=abc"));
        assert_eq!(config.url, "http://localhost:8081/api");
    }

    #[test]
    fn test_cli_overrides_file() {
        let args = Args::parse_from([
            "ngxscope",
            "--mode",
            "poll",
            "--url",
            "http://nginx-box:9000/api",
            "--interval",
            "2",
        ]);
        let config = Config::merge(
            args,
            file(
                r#"
                mode = "push"
                url = "http://ignored/api"
                interval_secs = 60
                lines = 50
                "#,
            ),
        )
        .unwrap();

        assert_eq!(config.mode, SourceMode::Poll);
        assert_eq!(config.url, "http://nginx-box:9000/api");
        assert_eq!(config.interval, Duration::from_secs(2));
        assert_eq!(config.lines, 50);
    }

    #[test]
    fn test_rejects_zero_values() {
        let args = Args::parse_from(["ngxscope", "--lines", "0"]);
        assert!(Config::merge(args, FileConfig::default()).is_err());

        let err = Config::merge(Args::default(), file("interval_secs = 0")).unwrap_err();
        assert!(err.to_string().contains("interval"));
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(toml::from_str::<FileConfig>("colour = \"red\"").is_err());
    }

    #[test]
    fn test_invalid_file_names_path() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp, "lines = \"many\"").unwrap();

        let err = FileConfig::load(tmp.path(), true).unwrap_err();
        assert!(format!("{err:#}").contains(&tmp.path().display().to_string()));
    }

    #[test]
    fn test_missing_default_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        assert!(FileConfig::load(&path, false).is_ok());
        assert!(FileConfig::load(&path, true).is_err());
    }

    #[test]
    fn test_source_label() {
        let mut config = Config::default();
        assert_eq!(config.source_label(), "http://localhost:8081/api");

        config.mode = SourceMode::Push;
        assert_eq!(
            config.source_label(),
            "/var/log/nginx/access.log + /var/log/nginx/error.log"
        );
    }
}
