//! [`LineSource`] over HTTP(S) and local files.
//!
//! Pages are fetched with reqwest, retried with exponential backoff on
//! transient failures, and rendered to text lines with scraper. A page whose
//! certificate can't be verified is fetched once more without verification
//! (when allowed), and the result carries a warning instead of an error.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use deadliner_core::{FetchedPage, LineSource};
use thiserror::Error;

pub mod html;

pub use html::html_to_lines;

pub const DEFAULT_USER_AGENT: &str = "ConferenceCalendarBot/0.2";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Reported alongside the lines of a page fetched without TLS verification.
pub const INSECURE_FETCH_WARNING: &str = "ssl-verify-failed; fetched without TLS verification";

const MAX_BACKOFF: Duration = Duration::from_secs(8);

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("{0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP {0}")]
    Status(reqwest::StatusCode),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl FetchError {
    /// Timeouts, connection failures and server errors are worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Http(e) => (e.is_timeout() || e.is_connect()) && !is_tls_error(e),
            FetchError::Status(status) => status.is_server_error(),
            FetchError::Io(_) | FetchError::Join(_) => false,
        }
    }
}

/// Whether a request failed on certificate or TLS handshake verification.
pub fn is_tls_error(err: &reqwest::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = source {
        let msg = e.to_string().to_lowercase();
        if msg.contains("certificate") || msg.contains("tls") || msg.contains("ssl") {
            return true;
        }
        source = e.source();
    }
    false
}

/// HTTP behaviour of an [`HttpLineSource`].
#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub user_agent: String,
    pub timeout: Duration,
    /// Retries after the first attempt for transient failures.
    pub max_retries: u32,
    /// First backoff delay; doubled on every further retry.
    pub retry_base: Duration,
    /// Refetch without certificate verification when TLS verification fails.
    pub allow_insecure_fallback: bool,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base: Duration::from_millis(500),
            allow_insecure_fallback: true,
        }
    }
}

/// Delay before retry number `attempt` (0-based): exponential with up to 25%
/// random jitter, capped.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let exp = base.saturating_mul(2u32.saturating_pow(attempt)).min(MAX_BACKOFF);
    let jitter_ms = (exp.as_millis() as u64) / 4;
    let jitter = if jitter_ms > 0 {
        Duration::from_millis(fastrand::u64(0..=jitter_ms))
    } else {
        Duration::ZERO
    };
    exp + jitter
}

/// Fetches pages over HTTP(S), or from disk for `file://` URLs.
pub struct HttpLineSource {
    client: reqwest::Client,
    insecure: Option<reqwest::Client>,
    settings: FetchSettings,
}

impl HttpLineSource {
    pub fn new(settings: FetchSettings) -> Result<Self, FetchError> {
        let client = build_client(&settings, false)?;
        let insecure = if settings.allow_insecure_fallback {
            Some(build_client(&settings, true)?)
        } else {
            None
        };
        Ok(Self {
            client,
            insecure,
            settings,
        })
    }

    /// Fetch `url` and render it to lines. Never fails; problems end up in
    /// [`FetchedPage::error`].
    pub async fn fetch_lines(&self, url: &str) -> FetchedPage {
        if let Some(path) = url.strip_prefix("file://") {
            return match read_file_lines(path.to_string()).await {
                Ok(lines) => FetchedPage::ok(lines),
                Err(e) => FetchedPage::failed(e.to_string()),
            };
        }

        let err = match self.fetch_body(&self.client, url).await {
            Ok(body) => return into_page(render(body).await, None),
            Err(e) => e,
        };

        let tls_failed = matches!(&err, FetchError::Http(e) if is_tls_error(e));
        match &self.insecure {
            Some(insecure) if tls_failed => {
                tracing::warn!(url, error = %err, "TLS verification failed, refetching without it");
                match self.fetch_body(insecure, url).await {
                    Ok(body) => into_page(render(body).await, Some(INSECURE_FETCH_WARNING)),
                    Err(e) => FetchedPage::failed(e.to_string()),
                }
            }
            _ => FetchedPage::failed(err.to_string()),
        }
    }

    async fn fetch_body(&self, client: &reqwest::Client, url: &str) -> Result<String, FetchError> {
        let mut attempt = 0;
        loop {
            match get_once(client, url).await {
                Ok(body) => return Ok(body),
                Err(e) if attempt < self.settings.max_retries && e.is_transient() => {
                    let delay = backoff_delay(self.settings.retry_base, attempt);
                    tracing::debug!(
                        url,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retrying fetch"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl LineSource for HttpLineSource {
    fn fetch<'a>(&'a self, url: &'a str) -> Pin<Box<dyn Future<Output = FetchedPage> + Send + 'a>> {
        Box::pin(self.fetch_lines(url))
    }
}

fn build_client(settings: &FetchSettings, insecure: bool) -> Result<reqwest::Client, FetchError> {
    let client = reqwest::Client::builder()
        .user_agent(settings.user_agent.as_str())
        .timeout(settings.timeout)
        .pool_max_idle_per_host(2)
        .danger_accept_invalid_certs(insecure)
        .build()?;
    Ok(client)
}

async fn get_once(client: &reqwest::Client, url: &str) -> Result<String, FetchError> {
    let resp = client.get(url).send().await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(FetchError::Status(status));
    }
    Ok(resp.text().await?)
}

// Parse in spawn_blocking to keep !Send scraper types off the async task
async fn render(body: String) -> Result<Vec<String>, FetchError> {
    Ok(tokio::task::spawn_blocking(move || html_to_lines(&body)).await?)
}

async fn read_file_lines(path: String) -> Result<Vec<String>, FetchError> {
    tokio::task::spawn_blocking(move || -> Result<Vec<String>, FetchError> {
        let content = std::fs::read_to_string(&path)?;
        Ok(html_to_lines(&content))
    })
    .await?
}

fn into_page(lines: Result<Vec<String>, FetchError>, warning: Option<&str>) -> FetchedPage {
    match lines {
        Ok(lines) => FetchedPage {
            lines,
            error: warning.map(str::to_string),
        },
        Err(e) => FetchedPage::failed(e.to_string()),
    }
}
