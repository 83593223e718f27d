//! Single-page retrieval with timeout, retry, and response-size bounds.
//!
//! Transient failures (timeouts, connection errors) are retried with
//! exponential backoff; HTTP error statuses are terminal for that URL only.
//! Bodies are read as a stream and abandoned the moment they cross the
//! configured byte ceiling, so a hostile page cannot exhaust memory.

use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

use sitebrief_shared::config::CompileConfig;
use sitebrief_shared::error::{FetchError, Result, SiteBriefError};

/// User-Agent string for crawl requests.
const USER_AGENT: &str = concat!("sitebrief/", env!("CARGO_PKG_VERSION"));

/// Maximum redirects followed per request.
const MAX_REDIRECTS: usize = 5;

// ---------------------------------------------------------------------------
// FetchedPage
// ---------------------------------------------------------------------------

/// Raw result of one successful fetch, before extraction.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects. Scope checks apply to this, not the
    /// URL originally requested.
    pub url: Url,
    /// HTTP status code.
    pub status: u16,
    /// Decoded response body.
    pub body: String,
    /// When the fetch completed.
    pub fetched_at: DateTime<Utc>,
    /// Raw body size in bytes.
    pub raw_size: usize,
}

// ---------------------------------------------------------------------------
// Fetcher
// ---------------------------------------------------------------------------

/// HTTP page fetcher with bounded retries and body size.
pub struct Fetcher {
    client: Client,
    retries: u32,
    retry_base: Duration,
    max_body_bytes: usize,
}

impl Fetcher {
    /// Build a fetcher from the run configuration.
    pub fn new(config: &CompileConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .build()
            .map_err(|e| SiteBriefError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            retries: config.fetch_retries,
            retry_base: Duration::from_millis(config.retry_base_ms),
            max_body_bytes: config.max_body_bytes,
        })
    }

    /// Fetch one page, retrying transient failures with exponential backoff.
    ///
    /// HTTP 4xx/5xx responses and oversized bodies are never retried.
    pub async fn fetch(&self, url: &Url) -> std::result::Result<FetchedPage, FetchError> {
        let mut attempt = 0u32;
        loop {
            match self.fetch_once(url).await {
                Ok(page) => return Ok(page),
                Err(e) if e.is_retryable() && attempt < self.retries => {
                    let backoff = self.retry_base * 2u32.saturating_pow(attempt);
                    warn!(%url, error = %e, attempt, backoff_ms = backoff.as_millis() as u64,
                        "transient fetch failure, retrying");
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch_once(&self, url: &Url) -> std::result::Result<FetchedPage, FetchError> {
        debug!(%url, "fetching page");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http(status.as_u16()));
        }

        // The resolved URL is recorded before the body is read; redirects
        // may have moved us, and scope checks downstream need to know.
        let final_url = response.url().clone();

        if let Some(len) = response.content_length() {
            if len as usize > self.max_body_bytes {
                return Err(FetchError::TooLarge {
                    limit: self.max_body_bytes,
                });
            }
        }

        let mut bytes: Vec<u8> = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            if bytes.len() + chunk.len() > self.max_body_bytes {
                return Err(FetchError::TooLarge {
                    limit: self.max_body_bytes,
                });
            }
            bytes.extend_from_slice(&chunk);
        }

        let raw_size = bytes.len();
        let body = String::from_utf8_lossy(&bytes).into_owned();

        Ok(FetchedPage {
            url: final_url,
            status: status.as_u16(),
            body,
            fetched_at: Utc::now(),
            raw_size,
        })
    }
}

fn map_reqwest_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Network(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitebrief_shared::config::AppConfig;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config() -> CompileConfig {
        let mut config = CompileConfig::from(&AppConfig::default());
        config.fetch_timeout_secs = 2;
        config.fetch_retries = 2;
        config.retry_base_ms = 10;
        config
    }

    #[tokio::test]
    async fn fetch_success_records_body_and_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>hi</body></html>"))
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(&test_config()).unwrap();
        let url = Url::parse(&server.uri()).unwrap();
        let page = fetcher.fetch(&url).await.expect("fetch ok");

        assert_eq!(page.status, 200);
        assert!(page.body.contains("hi"));
        assert_eq!(page.raw_size, page.body.len());
    }

    #[tokio::test]
    async fn http_error_is_terminal_and_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/broken"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(&test_config()).unwrap();
        let url = Url::parse(&format!("{}/broken", server.uri())).unwrap();
        match fetcher.fetch(&url).await {
            Err(FetchError::Http(500)) => {}
            other => panic!("expected Http(500), got {other:?}"),
        }
    }

    #[tokio::test]
    async fn not_found_maps_to_http_404() {
        let server = MockServer::start().await;
        // No mock mounted for this path; wiremock answers 404
        let fetcher = Fetcher::new(&test_config()).unwrap();
        let url = Url::parse(&format!("{}/missing", server.uri())).unwrap();
        match fetcher.fetch(&url).await {
            Err(FetchError::Http(404)) => {}
            other => panic!("expected Http(404), got {other:?}"),
        }
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let server = MockServer::start().await;
        let big = "x".repeat(64 * 1024);
        Mock::given(method("GET"))
            .and(path("/big"))
            .respond_with(ResponseTemplate::new(200).set_body_string(big))
            .mount(&server)
            .await;

        let mut config = test_config();
        config.max_body_bytes = 1024;
        let fetcher = Fetcher::new(&config).unwrap();
        let url = Url::parse(&format!("{}/big", server.uri())).unwrap();
        match fetcher.fetch(&url).await {
            Err(FetchError::TooLarge { limit }) => assert_eq!(limit, 1024),
            other => panic!("expected TooLarge, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn redirects_record_final_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/old"))
            .respond_with(
                ResponseTemplate::new(301).insert_header("Location", "/new"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/new"))
            .respond_with(ResponseTemplate::new(200).set_body_string("moved"))
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(&test_config()).unwrap();
        let url = Url::parse(&format!("{}/old", server.uri())).unwrap();
        let page = fetcher.fetch(&url).await.expect("fetch ok");

        assert_eq!(page.url.path(), "/new");
        assert_eq!(page.body, "moved");
    }

    #[tokio::test]
    async fn timeout_is_retried_then_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("late")
                    .set_delay(Duration::from_secs(5)),
            )
            .expect(2)
            .mount(&server)
            .await;

        let mut config = test_config();
        config.fetch_timeout_secs = 1;
        config.fetch_retries = 1;
        let fetcher = Fetcher::new(&config).unwrap();
        let url = Url::parse(&format!("{}/slow", server.uri())).unwrap();
        match fetcher.fetch(&url).await {
            Err(FetchError::Timeout) => {}
            other => panic!("expected Timeout, got {other:?}"),
        }
    }
}
