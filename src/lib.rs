//! WordPress REST API archiver library.
//!
//! Crawls a site's REST API, classifies each discovered route, extracts the
//! public ones to line-delimited JSON, and downloads the referenced media
//! files with resumable, checkpointed concurrency.
//!
//! # Architecture
//!
//! - [`api`] - HTTP fetching with retry, backoff, and streaming downloads
//! - [`catalog`] - the known-route table and route categories
//! - [`crawler`] - route discovery, classification, and extraction
//! - [`media`] - concurrent, checkpoint-resumable media downloads

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod cancel;
pub mod catalog;
pub mod config;
pub mod crawler;
pub mod media;

// Re-export commonly used types
pub use api::{ApiClient, FetchError, FetchedPage, RetryPolicy};
pub use cancel::CancelFlag;
pub use catalog::{RouteCatalog, RouteCategory};
pub use config::{
    CrawlConfig, DEFAULT_PAGE_SIZE, DEFAULT_RETRY_COUNT, DEFAULT_TIMEOUT_SECS, DEFAULT_WORKERS,
};
pub use crawler::{AnalysisReport, CollectStats, CrawlError, Crawler, PingReport, RouteStats};
pub use media::{DownloadManager, DownloadSummary, MediaError};
