//! Media manifest: the extracted media route file read back as a download list.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use super::MediaError;
use crate::crawler::DATA_DIR;

/// Manifest file name, derived from the media route.
pub const MANIFEST_FILE: &str = "wp_v2_media.jsonl";

/// One downloadable asset from the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaAsset {
    /// The asset's source URL, also its identity in the checkpoint.
    pub source_url: String,
    /// Destination path relative to the files directory, mirroring the URL
    /// path so the archive layout matches the site's upload tree.
    pub relative_path: PathBuf,
}

impl MediaAsset {
    /// Builds an asset from a source URL, deriving the destination path from
    /// the URL path. Returns `None` for URLs that cannot be mapped to a safe
    /// relative path.
    #[must_use]
    pub fn from_source_url(source_url: &str) -> Option<Self> {
        let parsed = Url::parse(source_url).ok()?;
        let path = parsed.path().trim_start_matches('/');
        if path.is_empty() {
            return None;
        }
        // Reject traversal segments so the archive stays inside the files tree.
        if Path::new(path)
            .components()
            .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return None;
        }
        Some(Self {
            source_url: source_url.to_string(),
            relative_path: PathBuf::from(path),
        })
    }
}

/// Path of the media manifest under an output directory.
#[must_use]
pub fn manifest_path(out_dir: &Path) -> PathBuf {
    out_dir.join(DATA_DIR).join(MANIFEST_FILE)
}

/// Reads the manifest, yielding one asset per record carrying a usable
/// `source_url`. Malformed lines and unmappable URLs are skipped with a
/// warning, never aborting the run.
///
/// # Errors
///
/// Returns [`MediaError::ManifestNotFound`] when no manifest exists, and
/// [`MediaError::Io`] when it exists but cannot be read.
pub fn read_manifest(out_dir: &Path) -> Result<Vec<MediaAsset>, MediaError> {
    let path = manifest_path(out_dir);
    let file = File::open(&path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            MediaError::ManifestNotFound { path: path.clone() }
        } else {
            MediaError::io(&path, source)
        }
    })?;

    let mut assets = Vec::new();
    for (number, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|source| MediaError::io(&path, source))?;
        if line.trim().is_empty() {
            continue;
        }

        let record: Value = match serde_json::from_str(&line) {
            Ok(record) => record,
            Err(error) => {
                warn!(line = number + 1, %error, "skipping malformed manifest line");
                continue;
            }
        };
        let Some(source_url) = record.get("source_url").and_then(Value::as_str) else {
            warn!(line = number + 1, "manifest record has no source_url, skipping");
            continue;
        };
        match MediaAsset::from_source_url(source_url) {
            Some(asset) => assets.push(asset),
            None => warn!(line = number + 1, url = %source_url, "unmappable source URL, skipping"),
        }
    }

    debug!(assets = assets.len(), path = %path.display(), "manifest read");
    Ok(assets)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_asset_path_mirrors_url_path() {
        let asset = MediaAsset::from_source_url(
            "https://example.com/wp-content/uploads/2023/05/photo.jpg",
        )
        .unwrap();
        assert_eq!(
            asset.relative_path,
            PathBuf::from("wp-content/uploads/2023/05/photo.jpg")
        );
    }

    #[test]
    fn test_asset_rejects_traversal_and_empty_paths() {
        assert!(MediaAsset::from_source_url("https://example.com/a/../../etc/passwd").is_none());
        assert!(MediaAsset::from_source_url("https://example.com/").is_none());
        assert!(MediaAsset::from_source_url("not a url").is_none());
    }

    #[test]
    fn test_read_manifest_skips_bad_lines() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join(DATA_DIR);
        std::fs::create_dir_all(&data_dir).unwrap();
        let mut file = File::create(data_dir.join(MANIFEST_FILE)).unwrap();
        writeln!(
            file,
            r#"{{"id": 1, "source_url": "https://example.com/uploads/a.jpg"}}"#
        )
        .unwrap();
        writeln!(file, "not json at all").unwrap();
        writeln!(file, r#"{{"id": 3}}"#).unwrap();
        writeln!(
            file,
            r#"{{"id": 4, "source_url": "https://example.com/uploads/b.png"}}"#
        )
        .unwrap();

        let assets = read_manifest(dir.path()).unwrap();
        assert_eq!(assets.len(), 2);
        assert_eq!(assets[0].source_url, "https://example.com/uploads/a.jpg");
        assert_eq!(assets[1].relative_path, PathBuf::from("uploads/b.png"));
    }

    #[test]
    fn test_read_manifest_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_manifest(dir.path()).unwrap_err();
        assert!(matches!(err, MediaError::ManifestNotFound { .. }));
        assert!(err.to_string().contains("dump"));
    }
}
