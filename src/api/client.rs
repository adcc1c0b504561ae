//! HTTP fetch client with bounded retry.
//!
//! Every network interaction in the crate goes through [`ApiClient`]: the
//! classifier's probes, the pagination engine's page fetches, and the media
//! workers' binary downloads. The client owns the timeout, the TLS
//! verification policy, and the retry/backoff loop, so callers only ever see
//! a final response or a final failure.

use std::path::Path;

use futures_util::StreamExt;
use reqwest::{Client, ClientBuilder};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::cancel::CancelFlag;
use crate::config::CrawlConfig;

use super::error::FetchError;
use super::retry::{FailureKind, RetryDecision, RetryPolicy, classify_error, classify_status};

/// User-Agent sent with every request.
///
/// Some hosts reject default library agents outright; a browser string keeps
/// the probe results representative of what a reader would see.
pub const REQUEST_USER_AGENT: &str = "Mozilla/5.0 (Linux; Android 6.0; Nexus 5 Build/MRA58N) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/67.0.3396.99 Mobile Safari/537.36";

/// Pagination total-pages header declared by the server.
pub const TOTAL_PAGES_HEADER: &str = "X-WP-TotalPages";

/// Pagination total-items header declared by the server.
pub const TOTAL_ITEMS_HEADER: &str = "X-WP-Total";

/// Extension appended to in-progress binary downloads before the atomic rename.
const PART_SUFFIX: &str = ".part";

/// A completed fetch: final status, declared pagination totals, and body text.
///
/// 4xx statuses are delivered through this type rather than as errors - the
/// classifier branches on them.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// The URL that was fetched.
    pub url: String,
    /// Final HTTP status code.
    pub status: u16,
    /// Server-declared total page count, when the header was present and valid.
    pub total_pages: Option<u64>,
    /// Server-declared total item count, when the header was present and valid.
    pub total_items: Option<u64>,
    /// Response body as text.
    pub body: String,
}

impl FetchedPage {
    /// True for 401/403 - the route requires authentication.
    #[must_use]
    pub fn is_auth_denied(&self) -> bool {
        self.status == 401 || self.status == 403
    }

    /// True for a plain 200.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// HTTP client wrapping a pooled `reqwest::Client` with retry and cancellation.
///
/// Create once and reuse; connections are pooled underneath.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    policy: RetryPolicy,
    cancel: CancelFlag,
}

impl ApiClient {
    /// Creates a client from the crawl configuration.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails with the supplied
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new(config: &CrawlConfig, cancel: CancelFlag) -> Self {
        let client = ClientBuilder::new()
            .timeout(config.timeout)
            .user_agent(REQUEST_USER_AGENT)
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .expect("failed to build HTTP client with static configuration");

        Self {
            client,
            policy: RetryPolicy::with_max_attempts(config.retry_count),
            cancel,
        }
    }

    /// Returns the configured retry policy.
    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// True once cancellation has been requested on the shared flag.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Fetches a URL, retrying transient failures with exponential backoff.
    ///
    /// Retried: timeouts, connection errors, and 5xx responses, up to the
    /// configured attempt budget. Not retried: 4xx responses (returned as
    /// `Ok` - they are classification signals) and definitive failures.
    /// Cancellation aborts before the next attempt without sleeping.
    ///
    /// # Errors
    ///
    /// Returns `FetchError` when the URL is invalid, the retry budget is
    /// exhausted, or a definitive failure occurs.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        Url::parse(url).map_err(|_| FetchError::invalid_url(url))?;

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            if self.cancel.is_cancelled() {
                return Err(FetchError::Cancelled);
            }
            debug!(attempt, "fetching page");

            let (error, kind) = match self.try_fetch(url).await {
                Ok(page) if classify_status(page.status) == FailureKind::Transient => {
                    // 5xx: treat like any other transient failure.
                    (
                        FetchError::status(url, page.status, attempt),
                        FailureKind::Transient,
                    )
                }
                Ok(page) => return Ok(page),
                Err(e) => {
                    let kind = classify_error(&e);
                    (e, kind)
                }
            };

            match self.policy.should_retry(kind, attempt) {
                RetryDecision::Retry {
                    delay,
                    attempt: next_attempt,
                } => {
                    warn!(
                        attempt = next_attempt,
                        max_attempts = self.policy.max_attempts(),
                        delay_ms = delay.as_millis(),
                        error = %error,
                        "retrying fetch"
                    );
                    if self.cancel.is_cancelled() {
                        return Err(FetchError::Cancelled);
                    }
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::GiveUp { reason } => {
                    debug!(%reason, "not retrying fetch");
                    return Err(error);
                }
            }
        }
    }

    /// Streams a binary body to `dest`, writing through a temporary `.part`
    /// file and renaming into place only after the bytes are flushed.
    ///
    /// Retries transient failures like [`fetch`](Self::fetch). Any non-2xx
    /// status is an error here: a media asset either downloads or it does not.
    /// Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns `FetchError` on network failure after the retry budget, on any
    /// non-success status, or on file system errors.
    #[instrument(skip(self), fields(url = %url, dest = %dest.display()))]
    pub async fn fetch_to_file(&self, url: &str, dest: &Path) -> Result<u64, FetchError> {
        Url::parse(url).map_err(|_| FetchError::invalid_url(url))?;

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            if self.cancel.is_cancelled() {
                return Err(FetchError::Cancelled);
            }

            let (error, kind) = match self.try_fetch_to_file(url, dest, attempt).await {
                Ok(bytes) => {
                    info!(bytes, "asset download complete");
                    return Ok(bytes);
                }
                Err(e) => {
                    let kind = classify_error(&e);
                    (e, kind)
                }
            };

            match self.policy.should_retry(kind, attempt) {
                RetryDecision::Retry {
                    delay,
                    attempt: next_attempt,
                } => {
                    warn!(
                        attempt = next_attempt,
                        delay_ms = delay.as_millis(),
                        error = %error,
                        "retrying asset download"
                    );
                    if self.cancel.is_cancelled() {
                        return Err(FetchError::Cancelled);
                    }
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::GiveUp { .. } => return Err(error),
            }
        }
    }

    /// Single fetch attempt: send, read headers, read body.
    async fn try_fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::timeout(url)
            } else {
                FetchError::network(url, e)
            }
        })?;

        let status = response.status().as_u16();
        let total_pages = header_u64(&response, TOTAL_PAGES_HEADER);
        let total_items = header_u64(&response, TOTAL_ITEMS_HEADER);

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::timeout(url)
            } else {
                FetchError::network(url, e)
            }
        })?;

        Ok(FetchedPage {
            url: url.to_string(),
            status,
            total_pages,
            total_items,
            body,
        })
    }

    /// Single streaming download attempt into a temp file, then atomic rename.
    async fn try_fetch_to_file(
        &self,
        url: &str,
        dest: &Path,
        attempt: u32,
    ) -> Result<u64, FetchError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::timeout(url)
            } else {
                FetchError::network(url, e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::status(url, status.as_u16(), attempt));
        }

        let tmp = part_path(dest);
        let file = File::create(&tmp)
            .await
            .map_err(|e| FetchError::io(tmp.clone(), e))?;
        let mut writer = BufWriter::new(file);

        let mut bytes_written = 0u64;
        let mut stream = response.bytes_stream();
        let stream_result = loop {
            match stream.next().await {
                Some(Ok(chunk)) => {
                    if let Err(e) = writer.write_all(&chunk).await {
                        break Err(FetchError::io(tmp.clone(), e));
                    }
                    bytes_written += chunk.len() as u64;
                }
                Some(Err(e)) => {
                    break Err(if e.is_timeout() {
                        FetchError::timeout(url)
                    } else {
                        FetchError::network(url, e)
                    });
                }
                None => break Ok(()),
            }
        };

        let flush_result = match stream_result {
            Ok(()) => writer
                .flush()
                .await
                .map_err(|e| FetchError::io(tmp.clone(), e)),
            Err(e) => Err(e),
        };

        if let Err(e) = flush_result {
            // Leave no stray partial data behind; the retry starts fresh.
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e);
        }

        drop(writer);
        tokio::fs::rename(&tmp, dest)
            .await
            .map_err(|e| FetchError::io(dest.to_path_buf(), e))?;

        Ok(bytes_written)
    }
}

/// Derives the temporary path used while a download is in flight.
fn part_path(dest: &Path) -> std::path::PathBuf {
    let mut name = dest
        .file_name()
        .map_or_else(|| "download".to_string(), |n| n.to_string_lossy().to_string());
    name.push_str(PART_SUFFIX);
    dest.with_file_name(name)
}

/// Parses a numeric response header, ignoring absent or invalid values.
fn header_u64(response: &reqwest::Response, name: &str) -> Option<u64> {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|text| text.trim().parse().ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_part_path_appends_suffix() {
        let dest = Path::new("/out/files/2020/01/photo.jpg");
        assert_eq!(
            part_path(dest),
            Path::new("/out/files/2020/01/photo.jpg.part")
        );
    }

    #[test]
    fn test_part_path_without_extension() {
        let dest = Path::new("/out/files/asset");
        assert_eq!(part_path(dest), Path::new("/out/files/asset.part"));
    }

    #[test]
    fn test_fetched_page_auth_denied() {
        let mut page = FetchedPage {
            url: "https://example.com".to_string(),
            status: 401,
            total_pages: None,
            total_items: None,
            body: String::new(),
        };
        assert!(page.is_auth_denied());
        page.status = 403;
        assert!(page.is_auth_denied());
        page.status = 200;
        assert!(!page.is_auth_denied());
        assert!(page.is_ok());
    }
}
