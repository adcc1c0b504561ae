//! Crawl orchestration: route discovery, analysis, and data collection.
//!
//! Classification and extraction run sequentially, one route at a time; route
//! counts are small and each route's extraction must preserve page order. The
//! only concurrent component lives in [`crate::media`].

pub mod classify;
pub mod domain;
pub mod extract;
pub mod sink;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use indicatif::ProgressBar;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::api::{ApiClient, FetchError};
use crate::cancel::CancelFlag;
use crate::catalog::{RouteCatalog, RouteCategory};
use crate::config::CrawlConfig;

pub use classify::RouteClassifier;
pub use domain::{DomainError, validate_domain};
pub use extract::{ExtractionSummary, PageCursor, PageExtractor};
pub use sink::{JsonlSink, RecordSink, route_file_name};

/// Subdirectory of the output tree holding extracted JSONL data.
pub const DATA_DIR: &str = "data";

/// File name of the persisted route index document.
pub const INDEX_FILE: &str = "wp-json.json";

/// Errors raised by crawl orchestration.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// The supplied domain failed validation. Fatal before any work starts.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The API root could not be fetched.
    #[error(transparent)]
    Api(#[from] FetchError),

    /// The API root answered with a non-200 status.
    #[error("API root {url} answered HTTP {status}\n  Suggestion: check that the REST API is enabled on this site")]
    IndexStatus {
        /// The API root URL.
        url: String,
        /// The status returned.
        status: u16,
    },

    /// The API root body was not valid JSON.
    #[error("API root {url} returned a malformed index: {source}")]
    MalformedIndex {
        /// The API root URL.
        url: String,
        /// The underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// The index parsed but carried no route map.
    #[error("API root {url} returned no routes")]
    MissingRoutes {
        /// The API root URL.
        url: String,
    },

    /// File system failure while persisting crawl output.
    #[error("IO error writing {path}: {source}")]
    Io {
        /// The path being written.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl CrawlError {
    fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// The discovered route index: the raw document plus the route paths it names.
#[derive(Debug, Clone)]
pub struct RouteIndex {
    /// The API root URL the index came from.
    pub url: String,
    /// The full index document, persisted verbatim as the authoritative
    /// route list for the run.
    pub document: Value,
    /// Route paths in index order.
    pub routes: Vec<String>,
}

impl RouteIndex {
    /// Resolves a route's request URL from its `_links.self` entry, which the
    /// API encodes variously as an object, a bare string, or a list.
    #[must_use]
    pub fn self_url(&self, route: &str) -> Option<String> {
        let entry = self.document.get("routes")?.get(route)?;
        let linked = entry.get("_links")?.get("self")?;
        match linked {
            Value::String(href) => Some(href.clone()),
            Value::Object(map) => map.get("href")?.as_str().map(str::to_string),
            Value::Array(list) => list.first()?.get("href")?.as_str().map(str::to_string),
            _ => None,
        }
    }
}

/// Result of a `ping` against the API root.
#[derive(Debug, Clone)]
pub struct PingReport {
    /// The API root URL that answered.
    pub url: String,
    /// Number of routes the index declares.
    pub route_count: usize,
}

/// Per-category route counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteStats {
    /// Routes requiring authentication.
    pub protected: usize,
    /// Paginated public collections.
    pub public_list: usize,
    /// Single public documents.
    pub public_dict: usize,
    /// Unextractable routes.
    pub useless: usize,
    /// Unresolved routes.
    pub unknown: usize,
}

impl RouteStats {
    fn bump(&mut self, category: RouteCategory) {
        match category {
            RouteCategory::Protected => self.protected += 1,
            RouteCategory::PublicList => self.public_list += 1,
            RouteCategory::PublicDict => self.public_dict += 1,
            RouteCategory::Useless => self.useless += 1,
            RouteCategory::Unknown => self.unknown += 1,
        }
    }
}

/// Result of route analysis: catalog matches plus live-probed unknowns.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    /// The API root URL.
    pub url: String,
    /// Total routes in the index.
    pub total_routes: usize,
    /// Routes found in the catalog, with their authoritative categories.
    pub known: BTreeMap<String, RouteCategory>,
    /// Routes absent from the catalog, in index order.
    pub unknown_routes: Vec<String>,
    /// Categories resolved by live probes (the unknown-resolved set).
    pub resolved: BTreeMap<String, RouteCategory>,
    /// Counts per category across known and resolved routes.
    pub statistics: RouteStats,
    /// Catalog table fragment for the resolved routes, ready to merge.
    pub catalog_update: String,
}

/// Result of a full data collection run.
#[derive(Debug, Clone)]
pub struct CollectStats {
    /// Routes extracted (list or dict).
    pub processed: usize,
    /// Routes skipped (protected, useless, unresolved, or failed setup).
    pub skipped: usize,
    /// Total routes in the index.
    pub total_routes: usize,
    /// Categories resolved by live probes during collection.
    pub resolved: BTreeMap<String, RouteCategory>,
}

/// Sequential crawler over one site's API.
#[derive(Debug)]
pub struct Crawler {
    client: ApiClient,
    config: CrawlConfig,
}

impl Crawler {
    /// Creates a crawler from the configuration and a shared cancel flag.
    #[must_use]
    pub fn new(config: CrawlConfig, cancel: CancelFlag) -> Self {
        let client = ApiClient::new(&config, cancel);
        Self { client, config }
    }

    /// The fetch client, shared with the download manager.
    #[must_use]
    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Builds the API root URL for a validated domain.
    #[must_use]
    pub fn api_root(&self, domain: &str) -> String {
        format!("{}://{domain}/wp-json/", self.config.scheme())
    }

    /// Verifies the API root is reachable and counts its routes.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError`] when the domain is invalid or the index cannot
    /// be fetched or parsed.
    #[instrument(skip(self))]
    pub async fn ping(&self, domain: &str) -> Result<PingReport, CrawlError> {
        let domain = validate_domain(domain)?;
        let index = self.fetch_index(&self.api_root(&domain)).await?;
        info!(url = %index.url, routes = index.routes.len(), "endpoint is OK");
        Ok(PingReport {
            url: index.url,
            route_count: index.routes.len(),
        })
    }

    /// Buckets every discovered route by catalog category and probes the
    /// unknowns live. Known catalog entries are never downgraded by a probe.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError`] when the domain is invalid or the index cannot
    /// be fetched; individual probe failures are reported, not raised.
    #[instrument(skip(self, catalog))]
    pub async fn analyze(
        &self,
        domain: &str,
        catalog: &RouteCatalog,
    ) -> Result<AnalysisReport, CrawlError> {
        let domain = validate_domain(domain)?;
        let index = self.fetch_index(&self.api_root(&domain)).await?;

        let mut known = BTreeMap::new();
        let mut unknown_routes = Vec::new();
        let mut statistics = RouteStats::default();

        for route in &index.routes {
            match catalog.category_of(route) {
                Some(category) => {
                    known.insert(route.clone(), category);
                    statistics.bump(category);
                }
                None => unknown_routes.push(route.clone()),
            }
        }

        info!(
            total = index.routes.len(),
            known = known.len(),
            unknown = unknown_routes.len(),
            "catalog pass complete"
        );

        let classifier = RouteClassifier::new(&self.client);
        let mut resolved = BTreeMap::new();
        let bar = self.progress_bar(unknown_routes.len() as u64);
        for route in &unknown_routes {
            bar.set_message(route.clone());
            let category = match index.self_url(route) {
                Some(route_url) => classifier.classify(route, &route_url).await,
                // No request URL to probe; unusable for extraction.
                None => RouteCategory::Useless,
            };
            statistics.bump(category);
            resolved.insert(route.clone(), category);
            bar.inc(1);
        }
        bar.finish_and_clear();

        let catalog_update = RouteCatalog::render_update(&resolved);

        Ok(AnalysisReport {
            url: index.url,
            total_routes: index.routes.len(),
            known,
            unknown_routes,
            resolved,
            statistics,
            catalog_update,
        })
    }

    /// Extracts every extractable route to JSONL files under
    /// `<out_dir>/data/`, persisting the route index document first.
    ///
    /// Per-route failures are logged and scoped to that route; siblings
    /// continue. When `get_unknown` is set, uncataloged routes are classified
    /// live and dispatched per the resolved category.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError`] when the domain is invalid, the index cannot be
    /// fetched, or the output tree cannot be created.
    #[instrument(skip(self, catalog), fields(out_dir = %out_dir.display()))]
    pub async fn collect_data(
        &self,
        domain: &str,
        catalog: &RouteCatalog,
        out_dir: &Path,
        get_unknown: bool,
    ) -> Result<CollectStats, CrawlError> {
        let domain = validate_domain(domain)?;
        let index = self.fetch_index(&self.api_root(&domain)).await?;

        let data_dir = out_dir.join(DATA_DIR);
        std::fs::create_dir_all(&data_dir).map_err(|e| CrawlError::io(&data_dir, e))?;
        Self::persist_index(&index, &data_dir)?;

        // Local working copy: live classifications extend it append-only.
        let mut catalog = catalog.clone();
        let classifier = RouteClassifier::new(&self.client);
        let extractor = PageExtractor::new(&self.client, self.config.page_size);

        let mut stats = CollectStats {
            processed: 0,
            skipped: 0,
            total_routes: index.routes.len(),
            resolved: BTreeMap::new(),
        };

        let bar = self.progress_bar(index.routes.len() as u64);
        for route in &index.routes {
            if self.client.is_cancelled() {
                info!("cancellation requested, stopping after completed routes");
                break;
            }
            bar.set_message(route.clone());
            bar.inc(1);

            let category = match catalog.category_of(route) {
                Some(category) => category,
                None if get_unknown => {
                    let category = match index.self_url(route) {
                        Some(route_url) => classifier.classify(route, &route_url).await,
                        None => RouteCategory::Useless,
                    };
                    catalog.record(route.clone(), category);
                    stats.resolved.insert(route.clone(), category);
                    category
                }
                None => RouteCategory::Unknown,
            };

            match category {
                RouteCategory::PublicList => {
                    if extract_route(&extractor, &index, route, &data_dir, false).await {
                        stats.processed += 1;
                    } else {
                        stats.skipped += 1;
                    }
                }
                RouteCategory::PublicDict => {
                    if extract_route(&extractor, &index, route, &data_dir, true).await {
                        stats.processed += 1;
                    } else {
                        stats.skipped += 1;
                    }
                }
                RouteCategory::Protected | RouteCategory::Useless | RouteCategory::Unknown => {
                    debug!(%route, %category, "route skipped");
                    stats.skipped += 1;
                }
            }
        }
        bar.finish_and_clear();

        info!(
            processed = stats.processed,
            skipped = stats.skipped,
            total = stats.total_routes,
            "data collection complete"
        );
        Ok(stats)
    }

    /// Fetches and parses the API root index.
    async fn fetch_index(&self, url: &str) -> Result<RouteIndex, CrawlError> {
        let page = self.client.fetch(url).await?;
        if !page.is_ok() {
            return Err(CrawlError::IndexStatus {
                url: url.to_string(),
                status: page.status,
            });
        }

        let document: Value =
            serde_json::from_str(&page.body).map_err(|source| CrawlError::MalformedIndex {
                url: url.to_string(),
                source,
            })?;

        let routes = document
            .get("routes")
            .and_then(Value::as_object)
            .map(|map| map.keys().cloned().collect::<Vec<_>>())
            .ok_or_else(|| CrawlError::MissingRoutes {
                url: url.to_string(),
            })?;

        Ok(RouteIndex {
            url: url.to_string(),
            document,
            routes,
        })
    }

    /// Persists the full index document as the authoritative route list.
    fn persist_index(index: &RouteIndex, data_dir: &Path) -> Result<(), CrawlError> {
        let path = data_dir.join(INDEX_FILE);
        let body = index.document.to_string();
        std::fs::write(&path, body).map_err(|e| CrawlError::io(&path, e))?;
        debug!(path = %path.display(), "route index persisted");
        Ok(())
    }

    fn progress_bar(&self, total: u64) -> ProgressBar {
        if self.config.show_progress {
            ProgressBar::new(total)
        } else {
            ProgressBar::hidden()
        }
    }
}

/// Extracts one route; returns true when the route was processed.
async fn extract_route(
    extractor: &PageExtractor<'_>,
    index: &RouteIndex,
    route: &str,
    data_dir: &Path,
    as_document: bool,
) -> bool {
    let Some(route_url) = index.self_url(route) else {
        warn!(%route, "could not resolve route URL, skipping");
        return false;
    };

    let mut sink = match JsonlSink::for_route(data_dir, route) {
        Ok(sink) => sink,
        Err(error) => {
            warn!(%route, %error, "could not open sink, skipping");
            return false;
        }
    };

    info!(%route, dict = as_document, "extracting route");
    let summary = if as_document {
        extractor.extract_document(&route_url, route, &mut sink).await
    } else {
        extractor.extract_paginated(&route_url, route, &mut sink).await
    };
    if !summary.complete {
        warn!(%route, "extraction incomplete, partial data kept");
    }
    true
}
