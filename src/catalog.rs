//! Route catalog: the seeded path-to-category lookup table.
//!
//! The catalog is seeded from a static table (category to route-path lists,
//! same shape as the bundled `data/known_routes.json`), consulted during
//! analysis and extraction, and extended only by appending newly classified
//! routes. Known entries are authoritative and never overwritten by a live
//! probe.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Category describing how a route behaves for extraction purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RouteCategory {
    /// Requires authentication (401/403 on probe). Skipped.
    Protected,
    /// Paginated public collection. Extracted page by page.
    PublicList,
    /// Single public document. Extracted in one request.
    PublicDict,
    /// Unreachable, malformed, or single-item pattern. Skipped.
    Useless,
    /// Not yet categorized; probe failed or route never seen.
    Unknown,
}

impl RouteCategory {
    /// Stable name as used in the catalog table file.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Protected => "protected",
            Self::PublicList => "public-list",
            Self::PublicDict => "public-dict",
            Self::Useless => "useless",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for RouteCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// On-disk shape of the catalog table: category name to route paths.
#[derive(Debug, Default, Serialize, Deserialize)]
struct CatalogTable {
    #[serde(default, rename = "protected")]
    protected: Vec<String>,
    #[serde(default, rename = "public-list")]
    public_list: Vec<String>,
    #[serde(default, rename = "public-dict")]
    public_dict: Vec<String>,
    #[serde(default, rename = "useless")]
    useless: Vec<String>,
}

/// In-memory mapping of route path to category.
#[derive(Debug, Clone, Default)]
pub struct RouteCatalog {
    routes: HashMap<String, RouteCategory>,
}

impl RouteCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the catalog bundled with the crate.
    ///
    /// # Panics
    ///
    /// Panics if the embedded table is not valid JSON, which would be a
    /// packaging defect caught by the unit tests.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn builtin() -> Self {
        Self::from_json_str(include_str!("data/known_routes.json"))
            .expect("bundled route table is valid JSON")
    }

    /// Parses a catalog from its JSON table form.
    ///
    /// # Errors
    ///
    /// Returns the underlying parse error when the table is not valid JSON.
    pub fn from_json_str(table: &str) -> Result<Self, serde_json::Error> {
        let table: CatalogTable = serde_json::from_str(table)?;
        let mut catalog = Self::new();
        for (paths, category) in [
            (table.protected, RouteCategory::Protected),
            (table.public_list, RouteCategory::PublicList),
            (table.public_dict, RouteCategory::PublicDict),
            (table.useless, RouteCategory::Useless),
        ] {
            for path in paths {
                catalog.record(path, category);
            }
        }
        Ok(catalog)
    }

    /// Looks up the category assigned to a route path.
    #[must_use]
    pub fn category_of(&self, path: &str) -> Option<RouteCategory> {
        self.routes.get(path).copied()
    }

    /// Appends a newly classified route, never overwriting a known entry.
    ///
    /// Returns true when the entry was added, false when the path was already
    /// present (the existing category stays).
    pub fn record(&mut self, path: impl Into<String>, category: RouteCategory) -> bool {
        let path = path.into();
        if self.routes.contains_key(&path) {
            return false;
        }
        self.routes.insert(path, category);
        true
    }

    /// Number of cataloged routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// True when no route is cataloged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Renders newly resolved routes as a JSON table fragment the operator can
    /// merge back into the catalog file.
    ///
    /// # Panics
    ///
    /// Never panics: the rendered value is built from plain maps and lists.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn render_update(resolved: &BTreeMap<String, RouteCategory>) -> String {
        let mut grouped: BTreeMap<&'static str, Vec<&str>> = BTreeMap::new();
        for (path, category) in resolved {
            // Unknown means the probe failed; there is nothing to persist.
            if *category == RouteCategory::Unknown {
                continue;
            }
            grouped.entry(category.as_str()).or_default().push(path);
        }
        serde_json::to_string_pretty(&grouped).expect("route table fragment serializes")
    }
}
