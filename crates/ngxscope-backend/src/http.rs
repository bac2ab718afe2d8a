use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::COOKIE;
use serde::Deserialize;
use tracing::{debug, warn};

use ngxscope_logs::{FetchError, LogSource};
use ngxscope_types::LogChannel;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8081/api";

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpSourceConfig {
    /// API root, e.g. `http://localhost:8081/api`
    pub base_url: String,
    pub timeout: Duration,
    /// Raw cookie header value sent with every request
    pub session_cookie: Option<String>,
}

impl Default for HttpSourceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
            session_cookie: None,
        }
    }
}

/// Body of `GET /nginx/logs`; a failure carries `error` instead of `logs`
#[derive(Debug, Deserialize)]
struct TailResponse {
    #[serde(default)]
    logs: Option<Vec<String>>,
    #[serde(default)]
    error: Option<String>,
}

/// Fetches the last N lines of a channel from the dashboard backend
pub struct HttpLogSource {
    config: HttpSourceConfig,
    http_client: reqwest::Client,
}

impl HttpLogSource {
    pub fn new(config: HttpSourceConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/nginx/logs", self.config.base_url.trim_end_matches('/'))
    }
}

fn transport_error(channel: LogChannel, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        warn!(%channel, "log request timed out");
        FetchError::Timeout
    } else {
        warn!(%channel, error = %e, "log request failed");
        FetchError::Unavailable
    }
}

#[async_trait]
impl LogSource for HttpLogSource {
    async fn fetch_tail(
        &self,
        channel: LogChannel,
        lines: usize,
    ) -> Result<Vec<String>, FetchError> {
        let lines = lines.to_string();
        let mut request = self
            .http_client
            .get(self.endpoint())
            .query(&[("type", channel.as_str()), ("lines", lines.as_str())])
            .timeout(self.config.timeout);
        if let Some(cookie) = &self.config.session_cookie {
            request = request.header(COOKIE, cookie);
        }

        let response = request
            .send()
            .await
            .map_err(|e| transport_error(channel, e))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(channel, e))?;

        match serde_json::from_slice::<TailResponse>(&body) {
            Ok(TailResponse {
                error: Some(message),
                ..
            }) => {
                warn!(%channel, %status, %message, "backend reported an error");
                Err(FetchError::Backend(message))
            }
            Ok(TailResponse {
                logs: Some(logs), ..
            }) if status.is_success() => {
                debug!(%channel, count = logs.len(), "received log tail");
                Ok(logs)
            }
            Ok(_) => {
                warn!(%channel, %status, "unexpected log response");
                Err(FetchError::Unavailable)
            }
            Err(e) => {
                warn!(%channel, %status, error = %e, "undecodable log response");
                Err(FetchError::Unavailable)
            }
        }
    }
}
