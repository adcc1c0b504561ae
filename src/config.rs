//! Crawl configuration with documented defaults.

use std::time::Duration;

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 360;

/// Default number of fetch attempts for transient failures.
pub const DEFAULT_RETRY_COUNT: u32 = 5;

/// Default page size for paginated collection requests.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Default number of concurrent download workers.
pub const DEFAULT_WORKERS: usize = 5;

/// Configuration surface consumed by the crawler and download manager.
///
/// Every knob has a documented default; the CLI maps flags onto this struct
/// and the library never reads ambient state.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Per-request timeout.
    pub timeout: Duration,
    /// Fetch attempt budget for transient failures (including the first try).
    pub retry_count: u32,
    /// Items requested per collection page.
    pub page_size: u32,
    /// Whether to verify TLS certificates.
    pub verify_tls: bool,
    /// Concurrent download workers for media assets.
    pub workers: usize,
    /// Use https:// when building the API root URL.
    pub force_https: bool,
    /// Render terminal progress bars for long operations.
    pub show_progress: bool,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            retry_count: DEFAULT_RETRY_COUNT,
            page_size: DEFAULT_PAGE_SIZE,
            verify_tls: true,
            workers: DEFAULT_WORKERS,
            force_https: true,
            show_progress: false,
        }
    }
}

impl CrawlConfig {
    /// Returns the URL scheme implied by `force_https`.
    #[must_use]
    pub fn scheme(&self) -> &'static str {
        if self.force_https { "https" } else { "http" }
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the fetch attempt budget (clamped to at least 1).
    #[must_use]
    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count.max(1);
        self
    }

    /// Sets the collection page size (clamped to at least 1).
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Enables or disables TLS certificate verification.
    #[must_use]
    pub fn with_verify_tls(mut self, verify_tls: bool) -> Self {
        self.verify_tls = verify_tls;
        self
    }

    /// Sets the download worker count (clamped to at least 1).
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Chooses between https and http for the API root.
    #[must_use]
    pub fn with_force_https(mut self, force_https: bool) -> Self {
        self.force_https = force_https;
        self
    }

    /// Enables terminal progress bars.
    #[must_use]
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }
}
