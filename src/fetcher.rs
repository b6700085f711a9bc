//! HTTP fetcher for downloading RIR statistics files.
//!
//! A body is downloaded completely before it is parsed, so a connection
//! reset mid-transfer costs one retry instead of a half-parsed source.
//! Transport failures are retried with linear backoff; a body that fails to
//! parse is not downloaded again.

use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONNECTION};
use reqwest::Client;
use std::error::Error as StdError;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::parser::parse_bytes;
use crate::record::RangeRecord;
use crate::sources::Source;
use crate::utils::{format_bytes, format_count};

#[cfg(test)]
use mockall::automock;

/// User-Agent sent with every request.
pub const USER_AGENT: &str = concat!(
    "deflect-geoip/",
    env!("CARGO_PKG_VERSION"),
    " (+https://github.com/equalitie/deflect-geoip)"
);

/// How often and how patiently to retry a download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Wait after failed attempt N is `N * backoff_step`.
    pub backoff_step: Duration,
    /// Per-attempt request timeout.
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_step: Duration::from_secs(10),
            timeout: Duration::from_secs(300),
        }
    }
}

impl RetryPolicy {
    /// Delay before the attempt following failed attempt `attempt` (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff_step * attempt
    }
}

/// A single failed download attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("connect failed: {0}")]
    Connect(String),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("download failed: {0}")]
    Body(String),
}

/// One GET of a whole resource body.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> std::result::Result<Vec<u8>, TransportError>;
}

/// reqwest-backed transport.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a client identifying itself with [`USER_AGENT`].
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> std::result::Result<Vec<u8>, TransportError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| TransportError::Connect(error_chain(&e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Body(error_chain(&e)))?;
        Ok(body.to_vec())
    }
}

/// reqwest's top-level message hides the cause (DNS, TLS, reset...).
fn error_chain(err: &dyn StdError) -> String {
    let mut msg = err.to_string();
    let mut cause = err.source();
    while let Some(c) = cause {
        msg.push_str(": ");
        msg.push_str(&c.to_string());
        cause = c.source();
    }
    msg
}

/// Result of fetching and parsing one source
#[derive(Debug)]
pub struct FetchResult {
    pub name: String,
    pub ranges: Vec<RangeRecord>,
    /// Size of the downloaded body
    pub bytes: usize,
}

/// Downloads sources through a [`Transport`] with retries.
pub struct Fetcher<T> {
    transport: T,
    policy: RetryPolicy,
}

impl Fetcher<HttpTransport> {
    /// Create a fetcher using a real HTTP client.
    pub fn new(policy: RetryPolicy) -> anyhow::Result<Self> {
        Ok(Self::with_transport(HttpTransport::new(policy.timeout)?, policy))
    }
}

impl<T: Transport> Fetcher<T> {
    pub fn with_transport(transport: T, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Download and parse one source.
    pub async fn fetch_source(&self, source: &Source) -> Result<FetchResult> {
        info!("Fetching {}...", source.name);

        let body = self.download(source).await?;
        let ranges = parse_bytes(&body).map_err(|e| Error::StreamRead {
            source_name: source.name.clone(),
            offset: e.offset,
            source: e.source,
        })?;

        info!(
            "Fetched {} - {}, {} ranges",
            source.name,
            format_bytes(body.len() as u64),
            format_count(ranges.len())
        );

        Ok(FetchResult {
            name: source.name.clone(),
            ranges,
            bytes: body.len(),
        })
    }

    /// Download a source body, retrying transport failures.
    pub async fn download(&self, source: &Source) -> Result<Vec<u8>> {
        let max_attempts = self.policy.max_attempts;
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            match self.transport.get(&source.url).await {
                Ok(body) => {
                    debug!(
                        "Attempt {} for {} downloaded {} bytes",
                        attempt,
                        source.name,
                        body.len()
                    );
                    return Ok(body);
                }
                Err(e) => {
                    warn!(
                        "Attempt {}/{} for {} failed: {}",
                        attempt, max_attempts, source.name, e
                    );
                    last_error = Some(e);
                    if attempt < max_attempts {
                        let delay = self.policy.backoff_for(attempt);
                        debug!("Retrying {} in {:?}", source.name, delay);
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Err(Error::FetchExhausted {
            source_name: source.name.clone(),
            attempts: max_attempts,
            last_error: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no attempt was made".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::MAX_LINE_LEN;

    const BODY: &str = "arin|US|ipv4|3.0.0.0|256|20100101|assigned\n\
                        arin|CA|ipv6|2001:db8::|32|20100101|allocated\n";

    fn source() -> Source {
        Source::new("arin", "https://stats.example.org/delegated-arin-extended-latest")
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            backoff_step: Duration::ZERO,
            timeout: Duration::from_secs(1),
        }
    }

    #[test]
    fn test_backoff_is_linear() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_for(1), Duration::from_secs(10));
        assert_eq!(policy.backoff_for(2), Duration::from_secs(20));
        assert_eq!(policy.backoff_for(4), Duration::from_secs(40));
    }

    #[test]
    fn test_user_agent_identifies_project() {
        assert!(USER_AGENT.starts_with("deflect-geoip/"));
        assert!(USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn test_http_transport_builds() {
        assert!(HttpTransport::new(Duration::from_secs(5)).is_ok());
    }

    #[tokio::test]
    async fn test_success_first_attempt() {
        let mut mock = MockTransport::new();
        mock.expect_get()
            .withf(|url| url.ends_with("delegated-arin-extended-latest"))
            .times(1)
            .returning(|_| Ok(BODY.as_bytes().to_vec()));

        let fetcher = Fetcher::with_transport(mock, fast_policy(5));
        let result = fetcher.fetch_source(&source()).await.unwrap();
        assert_eq!(result.name, "arin");
        assert_eq!(result.ranges.len(), 2);
        assert_eq!(result.bytes, BODY.len());
    }

    #[tokio::test]
    async fn test_recovers_after_two_failures() {
        let mut mock = MockTransport::new();
        let mut calls = 0;
        mock.expect_get().times(3).returning(move |_| {
            calls += 1;
            match calls {
                1 => Err(TransportError::Connect("connection refused".to_string())),
                2 => Err(TransportError::Body("connection reset by peer".to_string())),
                _ => Ok(BODY.as_bytes().to_vec()),
            }
        });

        let fetcher = Fetcher::with_transport(mock, fast_policy(5));
        let result = fetcher.fetch_source(&source()).await.unwrap();
        assert_eq!(result.ranges.len(), 2);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let mut mock = MockTransport::new();
        mock.expect_get()
            .times(5)
            .returning(|_| Err(TransportError::Connect("timed out".to_string())));

        let fetcher = Fetcher::with_transport(mock, fast_policy(5));
        let err = fetcher.fetch_source(&source()).await.unwrap_err();
        match err {
            Error::FetchExhausted {
                source_name,
                attempts,
                last_error,
            } => {
                assert_eq!(source_name, "arin");
                assert_eq!(attempts, 5);
                assert!(last_error.contains("timed out"));
            }
            other => panic!("expected FetchExhausted, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_http_error_status_is_retried() {
        let mut mock = MockTransport::new();
        let mut calls = 0;
        mock.expect_get().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Err(TransportError::Status(503))
            } else {
                Ok(BODY.as_bytes().to_vec())
            }
        });

        let fetcher = Fetcher::with_transport(mock, fast_policy(5));
        assert!(fetcher.fetch_source(&source()).await.is_ok());
    }

    #[tokio::test]
    async fn test_parse_failure_not_retried() {
        let mut mock = MockTransport::new();
        mock.expect_get().times(1).returning(|_| {
            let mut body = b"arin|US|ipv4|3.0.0.0|256|2010|assigned\n".to_vec();
            body.resize(body.len() + MAX_LINE_LEN + 1, b'x');
            Ok(body)
        });

        let fetcher = Fetcher::with_transport(mock, fast_policy(5));
        let err = fetcher.fetch_source(&source()).await.unwrap_err();
        match err {
            Error::StreamRead {
                source_name, offset, ..
            } => {
                assert_eq!(source_name, "arin");
                assert_eq!(offset, 39);
            }
            other => panic!("expected StreamRead, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_bytes_do_not_fail_source() {
        let mut mock = MockTransport::new();
        mock.expect_get().times(1).returning(|_| {
            Ok(b"lacnic|BR|ipv4|200.0.0.0|256|1996|allocated|Telec\xf3m\n\
                 lacnic|\xc3|ipv4|201.0.0.0|256|1996|allocated\n"
                .to_vec())
        });

        let fetcher = Fetcher::with_transport(mock, fast_policy(5));
        let result = fetcher.fetch_source(&source()).await.unwrap();
        assert_eq!(result.ranges.len(), 1);
        assert_eq!(result.ranges[0].start, "200.0.0.0");
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_waits_between_attempts() {
        let mut mock = MockTransport::new();
        let mut calls = 0;
        mock.expect_get().times(3).returning(move |_| {
            calls += 1;
            if calls < 3 {
                Err(TransportError::Status(502))
            } else {
                Ok(BODY.as_bytes().to_vec())
            }
        });

        let fetcher = Fetcher::with_transport(mock, RetryPolicy::default());
        let start = tokio::time::Instant::now();
        fetcher.download(&source()).await.unwrap();
        // 10s after attempt 1, 20s after attempt 2
        assert_eq!(start.elapsed(), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_wait_after_last_attempt() {
        let mut mock = MockTransport::new();
        mock.expect_get()
            .times(5)
            .returning(|_| Err(TransportError::Connect("refused".to_string())));

        let fetcher = Fetcher::with_transport(mock, RetryPolicy::default());
        let start = tokio::time::Instant::now();
        assert!(fetcher.download(&source()).await.is_err());
        // 10 + 20 + 30 + 40
        assert_eq!(start.elapsed(), Duration::from_secs(100));
    }

    #[tokio::test]
    async fn test_single_attempt_policy() {
        let mut mock = MockTransport::new();
        mock.expect_get()
            .times(1)
            .returning(|_| Err(TransportError::Status(404)));

        let fetcher = Fetcher::with_transport(mock, fast_policy(1));
        let err = fetcher.download(&source()).await.unwrap_err();
        assert!(err.to_string().contains("after 1 attempts"));
        assert!(err.to_string().contains("HTTP 404"));
    }
}
