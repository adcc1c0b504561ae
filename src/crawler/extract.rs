//! Pagination engine: drives one route's full extraction across pages.
//!
//! The engine prefers server-declared page totals and falls back to a
//! short-page heuristic when the deployment does not expose them. Records are
//! written to the sink incrementally, one page batch at a time, so memory
//! stays bounded by the page size and a partial extraction still leaves
//! usable data behind.

use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::api::{ApiClient, BodyShape, FetchedPage};

use super::sink::RecordSink;

/// Per-route pagination state. Lives only for one route's extraction and
/// advances monotonically.
#[derive(Debug)]
pub struct PageCursor {
    /// Current page number, 1-based.
    pub page: u64,
    /// Fixed number of items requested per page.
    pub page_size: u32,
    /// Server-declared total pages, captured from the first response.
    pub total_pages: Option<u64>,
    /// Server-declared total items, captured from the first response.
    pub total_items: Option<u64>,
}

impl PageCursor {
    fn new(page_size: u32) -> Self {
        Self {
            page: 1,
            page_size,
            total_pages: None,
            total_items: None,
        }
    }

    /// Captures declared totals from the first page's headers.
    fn note_totals(&mut self, fetched: &FetchedPage) {
        self.total_pages = fetched.total_pages;
        self.total_items = fetched.total_items;
    }

    /// Whether the route's extraction is finished after the current page.
    ///
    /// Declared totals take precedence: when the server said how many pages
    /// exist, a short non-final page does not end extraction. The short-page
    /// heuristic only applies when no total was declared.
    fn finished_after(&self, items_on_page: usize) -> bool {
        match self.total_pages {
            Some(total) => self.page >= total,
            None => (items_on_page as u64) < u64::from(self.page_size),
        }
    }

    fn advance(&mut self) {
        self.page += 1;
    }
}

/// Outcome of one route's extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionSummary {
    /// Pages that contributed records.
    pub pages: u64,
    /// Records written to the sink.
    pub items: u64,
    /// False when extraction aborted early (retries exhausted, malformed
    /// body, or sink failure); records already written are kept.
    pub complete: bool,
}

impl ExtractionSummary {
    fn empty() -> Self {
        Self {
            pages: 0,
            items: 0,
            complete: true,
        }
    }
}

/// Extracts routes through an [`ApiClient`], writing to a [`RecordSink`].
#[derive(Debug)]
pub struct PageExtractor<'a> {
    client: &'a ApiClient,
    page_size: u32,
}

impl<'a> PageExtractor<'a> {
    /// Creates an extractor with a fixed page size.
    #[must_use]
    pub fn new(client: &'a ApiClient, page_size: u32) -> Self {
        Self { client, page_size }
    }

    /// Extracts a paginated collection route page by page.
    ///
    /// Items are appended to the sink in server-returned order with no
    /// reordering or deduplication. The sink is flushed on every terminal
    /// path, including aborts.
    #[instrument(skip(self, sink), fields(route = %route))]
    pub async fn extract_paginated(
        &self,
        base_url: &str,
        route: &str,
        sink: &mut dyn RecordSink,
    ) -> ExtractionSummary {
        let mut cursor = PageCursor::new(self.page_size);
        let mut summary = ExtractionSummary::empty();

        loop {
            let page_url = paginated_url(base_url, cursor.page, cursor.page_size);
            let fetched = match self.client.fetch(&page_url).await {
                Ok(fetched) => fetched,
                Err(error) => {
                    warn!(page = cursor.page, %error, "aborting route after retries");
                    summary.complete = false;
                    break;
                }
            };

            if !fetched.is_ok() {
                debug!(status = fetched.status, "non-200 page, ending route");
                break;
            }

            if cursor.page == 1 {
                cursor.note_totals(&fetched);
                if let Some(total) = cursor.total_pages {
                    debug!(total_pages = total, "server declared page total");
                }
            }

            match cursor.total_pages {
                Some(total) => {
                    info!(page = cursor.page, total_pages = total, "processing page");
                }
                None => info!(page = cursor.page, "processing page"),
            }

            match BodyShape::parse(&fetched.body) {
                BodyShape::Object(_) => {
                    // Dict-style responses are single-page by definition.
                    debug!("object body, end of iteration");
                    break;
                }
                BodyShape::Malformed => {
                    warn!(page = cursor.page, "malformed body, ending route");
                    summary.complete = false;
                    break;
                }
                BodyShape::List(items) if items.is_empty() => {
                    debug!("empty page, end of iteration");
                    break;
                }
                BodyShape::List(items) => {
                    let count = items.len();
                    if let Err(error) = append_batch(sink, &items) {
                        warn!(page = cursor.page, %error, "sink write failed, ending route");
                        summary.complete = false;
                        break;
                    }
                    summary.pages += 1;
                    summary.items += count as u64;
                    debug!(records = count, "extracted records");

                    if cursor.finished_after(count) {
                        break;
                    }
                    cursor.advance();
                }
            }
        }

        if let Err(error) = sink.finish() {
            warn!(%error, "failed to flush sink");
            summary.complete = false;
        }

        info!(
            pages = summary.pages,
            items = summary.items,
            complete = summary.complete,
            "route extraction finished"
        );
        summary
    }

    /// Extracts a dict-style route: one fetch, one record.
    #[instrument(skip(self, sink), fields(route = %route))]
    pub async fn extract_document(
        &self,
        url: &str,
        route: &str,
        sink: &mut dyn RecordSink,
    ) -> ExtractionSummary {
        let mut summary = ExtractionSummary::empty();

        match self.client.fetch(url).await {
            Ok(fetched) if fetched.is_ok() => {
                match serde_json::from_str::<Value>(&fetched.body) {
                    Ok(document) => {
                        if let Err(error) = sink.append(&document) {
                            warn!(%error, "sink write failed");
                            summary.complete = false;
                        } else {
                            summary.pages = 1;
                            summary.items = 1;
                        }
                    }
                    Err(error) => {
                        warn!(%error, "malformed document body");
                        summary.complete = false;
                    }
                }
            }
            Ok(fetched) => {
                debug!(status = fetched.status, "non-200 document response");
                summary.complete = false;
            }
            Err(error) => {
                warn!(%error, "document fetch failed after retries");
                summary.complete = false;
            }
        }

        if let Err(error) = sink.finish() {
            warn!(%error, "failed to flush sink");
            summary.complete = false;
        }
        summary
    }
}

/// Builds the page request URL with the original API's ordering parameters,
/// so repeated runs see a stable stream.
fn paginated_url(base_url: &str, page: u64, page_size: u32) -> String {
    let separator = if base_url.contains('?') { '&' } else { '?' };
    format!("{base_url}{separator}page={page}&order=asc&orderby=id&per_page={page_size}")
}

fn append_batch(sink: &mut dyn RecordSink, items: &[Value]) -> std::io::Result<()> {
    for item in items {
        sink.append(item)?;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_paginated_url_parameters() {
        let url = paginated_url("https://example.com/wp-json/wp/v2/posts", 3, 100);
        assert_eq!(
            url,
            "https://example.com/wp-json/wp/v2/posts?page=3&order=asc&orderby=id&per_page=100"
        );
    }

    #[test]
    fn test_paginated_url_appends_to_existing_query() {
        let url = paginated_url("https://example.com/wp-json/wp/v2/posts?lang=en", 1, 10);
        assert!(url.starts_with("https://example.com/wp-json/wp/v2/posts?lang=en&page=1"));
    }

    #[test]
    fn test_cursor_short_page_heuristic_without_totals() {
        let mut cursor = PageCursor::new(100);
        assert!(!cursor.finished_after(100));
        cursor.advance();
        assert!(cursor.finished_after(37));
    }

    #[test]
    fn test_cursor_declared_totals_take_precedence() {
        let mut cursor = PageCursor::new(100);
        cursor.total_pages = Some(3);
        // A short non-final page does not end extraction when totals are declared.
        assert!(!cursor.finished_after(12));
        cursor.advance();
        assert!(!cursor.finished_after(100));
        cursor.advance();
        assert!(cursor.finished_after(100));
    }

    #[test]
    fn test_cursor_declared_total_of_one_page() {
        let mut cursor = PageCursor::new(100);
        cursor.total_pages = Some(1);
        assert!(cursor.finished_after(100));
    }

    #[test]
    fn test_cursor_starts_at_page_one() {
        let cursor = PageCursor::new(50);
        assert_eq!(cursor.page, 1);
        assert_eq!(cursor.page_size, 50);
        assert!(cursor.total_pages.is_none());
    }
}
