//! Append-only record sinks for extracted items.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde_json::Value;

/// Destination for extracted records.
///
/// The pagination engine appends one record at a time in server order and
/// calls `finish` on every terminal path, so partial extractions still leave
/// a flushed, readable file behind.
pub trait RecordSink {
    /// Appends one record.
    ///
    /// # Errors
    ///
    /// Returns an IO error when the record cannot be written.
    fn append(&mut self, record: &Value) -> io::Result<()>;

    /// Flushes buffered records.
    ///
    /// # Errors
    ///
    /// Returns an IO error when the flush fails.
    fn finish(&mut self) -> io::Result<()>;
}

/// Line-delimited JSON file sink: one compact record per line, UTF-8,
/// non-ASCII characters written as-is.
#[derive(Debug)]
pub struct JsonlSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl JsonlSink {
    /// Opens (truncating) the sink file for a route under `dir`.
    ///
    /// # Errors
    ///
    /// Returns an IO error when the file cannot be created.
    pub fn for_route(dir: &Path, route: &str) -> io::Result<Self> {
        let path = dir.join(route_file_name(route));
        let writer = BufWriter::new(File::create(&path)?);
        Ok(Self { path, writer })
    }

    /// Path of the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSink for JsonlSink {
    fn append(&mut self, record: &Value) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")
    }

    fn finish(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Deterministic file name for a route: surrounding slashes stripped, inner
/// slashes replaced with underscores. `/wp/v2/posts` becomes `wp_v2_posts.jsonl`.
#[must_use]
pub fn route_file_name(route: &str) -> String {
    format!("{}.jsonl", route.trim_matches('/').replace('/', "_"))
}
