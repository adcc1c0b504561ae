//! Probe-based route classification.
//!
//! A route not found in the catalog gets one live probe: a single-item page
//! request. The HTTP status and the response shape decide the category.

use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, instrument, warn};

use crate::api::{ApiClient, BodyShape};
use crate::catalog::RouteCategory;

/// Classifies routes by probing them through an [`ApiClient`].
#[derive(Debug)]
pub struct RouteClassifier<'a> {
    client: &'a ApiClient,
}

impl<'a> RouteClassifier<'a> {
    /// Creates a classifier over the given client.
    #[must_use]
    pub fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// Assigns a category to a route by issuing one probe request.
    ///
    /// - 401/403 -> [`RouteCategory::Protected`]
    /// - other non-200 -> [`RouteCategory::Useless`]
    /// - 200 with a list body -> [`RouteCategory::PublicList`]
    /// - 200 with an object body on a single-item route -> [`RouteCategory::Useless`]
    /// - 200 with any other object body -> [`RouteCategory::PublicDict`]
    /// - malformed body -> [`RouteCategory::Useless`]
    /// - fetch failure after retries -> [`RouteCategory::Unknown`]
    ///   (unresolved; must not be cached)
    #[instrument(skip(self), fields(route = %route))]
    pub async fn classify(&self, route: &str, route_url: &str) -> RouteCategory {
        // Routes carrying a regex path segment address single items; no probe
        // can make them extractable.
        if is_single_item_route(route) {
            debug!("single-item route pattern, no probe needed");
            return RouteCategory::Useless;
        }

        let probe = probe_url(route_url);
        let category = match self.client.fetch(&probe).await {
            Err(error) => {
                warn!(%error, "probe failed after retries, leaving unresolved");
                RouteCategory::Unknown
            }
            Ok(page) if page.is_auth_denied() => RouteCategory::Protected,
            Ok(page) if !page.is_ok() => RouteCategory::Useless,
            Ok(page) => match BodyShape::parse(&page.body) {
                BodyShape::List(_) => RouteCategory::PublicList,
                BodyShape::Object(_) => RouteCategory::PublicDict,
                BodyShape::Malformed => RouteCategory::Useless,
            },
        };

        debug!(%category, "route classified");
        category
    }
}

/// Probe URL requesting a single item of the first page.
#[must_use]
pub fn probe_url(route_url: &str) -> String {
    let separator = if route_url.contains('?') { '&' } else { '?' };
    format!("{route_url}{separator}per_page=1&page=1")
}

fn trailing_numeric_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        #[allow(clippy::expect_used)]
        Regex::new(r"/[^/]*\d[^/]*$").expect("numeric segment pattern compiles")
    })
}

/// Heuristic for routes that address a single item rather than a collection.
///
/// Matches regex path placeholders (`(?P<id>...)`), revision/autosave/batch
/// semantics, and numeric-looking trailing segments at depth greater than
/// three (`/wp/v2/posts/123`); version prefixes like `/wp/v2/posts` sit at
/// depth three and stay clear of the check.
#[must_use]
pub fn is_single_item_route(route: &str) -> bool {
    if route.contains("(?P<") {
        return true;
    }

    let trimmed = route.trim_matches('/');
    let depth = trimmed.split('/').count();
    if let Some(last) = trimmed.rsplit('/').next() {
        if last == "revisions" || last == "autosaves" {
            return true;
        }
    }
    if trimmed.split('/').any(|segment| segment == "batch") {
        return true;
    }

    depth > 3 && trailing_numeric_pattern().is_match(route)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_url_requests_one_item() {
        assert_eq!(
            probe_url("https://example.com/wp-json/wp/v2/posts"),
            "https://example.com/wp-json/wp/v2/posts?per_page=1&page=1"
        );
    }

    #[test]
    fn test_probe_url_respects_existing_query() {
        assert_eq!(
            probe_url("https://example.com/wp-json/wp/v2/posts?lang=en"),
            "https://example.com/wp-json/wp/v2/posts?lang=en&per_page=1&page=1"
        );
    }

    #[test]
    fn test_regex_placeholder_routes_are_single_item() {
        assert!(is_single_item_route(r"/wp/v2/posts/(?P<id>[\d]+)"));
        assert!(is_single_item_route(
            r"/wp/v2/posts/(?P<parent>[\d]+)/revisions"
        ));
    }

    #[test]
    fn test_revisions_and_batch_routes_are_single_item() {
        assert!(is_single_item_route("/wp/v2/posts/10/revisions"));
        assert!(is_single_item_route("/batch/v1"));
    }

    #[test]
    fn test_numeric_trailing_segment_beyond_depth_three() {
        assert!(is_single_item_route("/wp/v2/posts/123"));
        assert!(!is_single_item_route("/wp/v2/posts"));
        // The version segment's digit does not count against depth-3 routes.
        assert!(!is_single_item_route("/oembed/1.0"));
    }

    #[test]
    fn test_collection_routes_are_not_single_item() {
        assert!(!is_single_item_route("/wp/v2/media"));
        assert!(!is_single_item_route("/wp/v2/categories"));
        assert!(!is_single_item_route("/"));
    }
}
