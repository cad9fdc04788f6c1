//! Connection configuration.

use std::env;
use std::time::Duration;

use url::Url;

use crate::errors::SearchError;

/// Default search engine URL.
pub const DEFAULT_URL: &str = "http://localhost:9200";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default scroll keep-alive.
pub const DEFAULT_SCROLL_KEEP_ALIVE: Duration = Duration::from_secs(5 * 60);

/// Default number of documents per scroll page and per bulk chunk.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Configuration for a client connection.
///
/// A config is fixed once a client is built from it. Changing it means
/// disconnecting and connecting a new client.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionConfig {
    /// The search engine URL (e.g., "http://localhost:9200").
    pub url: String,
    /// Timeout applied to each individual request.
    pub timeout: Duration,
    /// Default routing tag attached to written documents and scroll searches.
    pub doc_type: Option<String>,
    /// How long the server keeps a scroll context alive between fetches.
    pub scroll_keep_alive: Duration,
    /// Number of documents per scroll page and per bulk chunk.
    pub batch_size: usize,
    /// Maximum number of retry attempts for transient failures.
    pub max_retries: u32,
    /// Initial retry delay in milliseconds.
    pub initial_retry_delay_ms: u64,
    /// Maximum retry delay in milliseconds.
    pub max_retry_delay_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            doc_type: None,
            scroll_keep_alive: DEFAULT_SCROLL_KEEP_ALIVE,
            batch_size: DEFAULT_BATCH_SIZE,
            max_retries: 3,
            initial_retry_delay_ms: 100,
            max_retry_delay_ms: 5000,
        }
    }
}

impl ConnectionConfig {
    /// Create a config for the given URL with default settings.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the default routing tag.
    pub fn with_doc_type(mut self, doc_type: impl Into<String>) -> Self {
        self.doc_type = Some(doc_type.into());
        self
    }

    /// Set the scroll keep-alive.
    pub fn with_scroll_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.scroll_keep_alive = keep_alive;
        self
    }

    /// Set the scroll page and bulk chunk size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the retry limit.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the initial and maximum retry delays in milliseconds.
    pub fn with_retry_delays(mut self, initial_ms: u64, max_ms: u64) -> Self {
        self.initial_retry_delay_ms = initial_ms;
        self.max_retry_delay_ms = max_ms;
        self
    }

    /// Check that the config can be used to build a client.
    pub fn validate(&self) -> Result<(), SearchError> {
        Url::parse(&self.url)
            .map_err(|e| SearchError::configuration(format!("Invalid url '{}': {}", self.url, e)))?;
        if self.batch_size == 0 {
            return Err(SearchError::configuration("batch_size must be at least 1"));
        }
        if self.timeout.is_zero() {
            return Err(SearchError::configuration("timeout must be non-zero"));
        }
        if self.scroll_keep_alive < Duration::from_millis(1) {
            return Err(SearchError::configuration(
                "scroll_keep_alive must be at least 1ms",
            ));
        }
        Ok(())
    }

    /// Build a config from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `ELASTICES_URL`: search engine URL (default: http://localhost:9200)
    /// - `ELASTICES_TIMEOUT_SECS`: per-request timeout (default: 30)
    /// - `ELASTICES_DOC_TYPE`: default routing tag (default: none)
    /// - `ELASTICES_SCROLL_KEEP_ALIVE_SECS`: scroll keep-alive (default: 300)
    /// - `ELASTICES_BATCH_SIZE`: scroll page and bulk chunk size (default: 1000)
    /// - `ELASTICES_MAX_RETRIES`: retry limit for transient failures (default: 3)
    pub fn from_env() -> Result<Self, SearchError> {
        let defaults = Self::default();

        let config = Self {
            url: env::var("ELASTICES_URL").unwrap_or(defaults.url),
            timeout: env_parse::<u64>("ELASTICES_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            doc_type: env::var("ELASTICES_DOC_TYPE").ok().filter(|s| !s.is_empty()),
            scroll_keep_alive: env_parse::<u64>("ELASTICES_SCROLL_KEEP_ALIVE_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.scroll_keep_alive),
            batch_size: env_parse("ELASTICES_BATCH_SIZE")?.unwrap_or(defaults.batch_size),
            max_retries: env_parse("ELASTICES_MAX_RETRIES")?.unwrap_or(defaults.max_retries),
            initial_retry_delay_ms: defaults.initial_retry_delay_ms,
            max_retry_delay_ms: defaults.max_retry_delay_ms,
        };

        config.validate()?;
        Ok(config)
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>, SearchError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| SearchError::configuration(format!("{} has invalid value '{}'", name, raw))),
        Err(_) => Ok(None),
    }
}

/// Render a duration in the engine's time-unit syntax.
///
/// The engine has no unit below a millisecond, so shorter durations render as `1ms`.
pub fn format_keep_alive(keep_alive: Duration) -> String {
    let millis = keep_alive.as_millis().max(1);
    if millis % 60_000 == 0 && millis > 0 {
        format!("{}m", millis / 60_000)
    } else if millis % 1000 == 0 && millis > 0 {
        format!("{}s", millis / 1000)
    } else {
        format!("{}ms", millis)
    }
}

/// Parse a duration written in the engine's time-unit syntax (`500ms`, `30s`, `5m`, `1h`, `1d`).
pub fn parse_keep_alive(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    let split = raw.find(|c: char| !c.is_ascii_digit())?;
    let (digits, unit) = raw.split_at(split);
    let amount: u64 = digits.parse().ok()?;
    let seconds = match unit {
        "ms" => return Some(Duration::from_millis(amount)),
        "s" => amount,
        "m" => amount.checked_mul(60)?,
        "h" => amount.checked_mul(3600)?,
        "d" => amount.checked_mul(86_400)?,
        _ => return None,
    };
    Some(Duration::from_secs(seconds))
}
