//! Concurrent media downloader with checkpoint-based resumption.
//!
//! The manager reads the extracted media manifest, skips assets that are
//! already on disk or recorded in the checkpoint, and downloads the rest
//! through a semaphore-bounded task pool. Completions flow over a channel to
//! a single writer task that owns the checkpoint, so the completed set never
//! needs a lock.

pub mod checkpoint;
pub mod manifest;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use indicatif::ProgressBar;
use thiserror::Error;
use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, info, instrument, warn};

use crate::api::ApiClient;
use crate::cancel::CancelFlag;
use crate::config::CrawlConfig;

pub use checkpoint::{CHECKPOINT_FILE, Checkpoint};
pub use manifest::{MANIFEST_FILE, MediaAsset, manifest_path, read_manifest};

/// Subdirectory of the output tree holding downloaded media files.
pub const FILES_DIR: &str = "files";

/// Minimum allowed worker count.
const MIN_WORKERS: usize = 1;

/// Maximum allowed worker count.
const MAX_WORKERS: usize = 100;

/// Errors raised by the media downloader.
#[derive(Debug, Error)]
pub enum MediaError {
    /// The media manifest does not exist yet.
    #[error(
        "media manifest not found at {path}\n  Suggestion: run the dump command first to extract the media route"
    )]
    ManifestNotFound {
        /// The expected manifest path.
        path: PathBuf,
    },

    /// Invalid worker count.
    #[error("invalid worker count {value}: must be between {MIN_WORKERS} and {MAX_WORKERS}")]
    InvalidWorkers {
        /// The value that was provided.
        value: usize,
    },

    /// File system failure.
    #[error("IO error on {path}: {source}")]
    Io {
        /// The path involved.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl MediaError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Statistics from a download run. Atomic counters, updated from concurrent
/// download tasks.
#[derive(Debug, Default)]
pub struct DownloadSummary {
    downloaded: AtomicUsize,
    failed: AtomicUsize,
    skipped: AtomicUsize,
}

impl DownloadSummary {
    /// Creates a summary with zero counts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assets fetched to completion in this run.
    #[must_use]
    pub fn downloaded(&self) -> usize {
        self.downloaded.load(Ordering::SeqCst)
    }

    /// Assets that failed after their retry budget.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    /// Assets skipped because they were already complete.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.skipped.load(Ordering::SeqCst)
    }

    /// Total assets considered.
    #[must_use]
    pub fn total(&self) -> usize {
        self.downloaded() + self.failed() + self.skipped()
    }

    fn increment_downloaded(&self) {
        self.downloaded.fetch_add(1, Ordering::SeqCst);
    }

    fn increment_failed(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }

    fn increment_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::SeqCst);
    }
}

/// Report sent from a download task to the checkpoint writer.
#[derive(Debug)]
struct Completion {
    source_url: String,
}

/// Coordinates concurrent media downloads against one output directory.
///
/// # Concurrency Model
///
/// - Each asset downloads in its own Tokio task
/// - A semaphore permit bounds the number of in-flight downloads
/// - A single writer task owns the checkpoint and persists after every
///   completion report, so a crash loses at most the in-flight assets
/// - Cancellation stops dispatching new assets; in-flight tasks finish
#[derive(Debug)]
pub struct DownloadManager {
    client: ApiClient,
    semaphore: Arc<Semaphore>,
    workers: usize,
    cancel: CancelFlag,
    show_progress: bool,
}

impl DownloadManager {
    /// Creates a manager with the configured worker count.
    ///
    /// # Errors
    ///
    /// Returns [`MediaError::InvalidWorkers`] when the worker count is
    /// outside 1-100.
    pub fn new(
        client: ApiClient,
        config: &CrawlConfig,
        cancel: CancelFlag,
    ) -> Result<Self, MediaError> {
        let workers = config.workers;
        if !(MIN_WORKERS..=MAX_WORKERS).contains(&workers) {
            return Err(MediaError::InvalidWorkers { value: workers });
        }

        Ok(Self {
            client,
            semaphore: Arc::new(Semaphore::new(workers)),
            workers,
            cancel,
            show_progress: config.show_progress,
        })
    }

    /// Configured worker count.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Downloads every manifest asset not already complete.
    ///
    /// With `resume` set, the persisted checkpoint and existing destination
    /// files both count as complete; otherwise everything is re-fetched.
    /// Individual download failures are counted, never raised; one failed
    /// asset does not affect its siblings.
    ///
    /// # Errors
    ///
    /// Returns [`MediaError`] when the manifest is missing or the output tree
    /// cannot be created.
    #[instrument(skip(self), fields(out_dir = %out_dir.display()))]
    pub async fn run(&self, out_dir: &Path, resume: bool) -> Result<DownloadSummary, MediaError> {
        let assets = read_manifest(out_dir)?;
        let checkpoint = if resume {
            Checkpoint::load(out_dir)
        } else {
            Checkpoint::fresh(out_dir)
        };
        let files_dir = out_dir.join(FILES_DIR);
        std::fs::create_dir_all(&files_dir).map_err(|e| MediaError::io(&files_dir, e))?;

        info!(
            assets = assets.len(),
            completed = checkpoint.len(),
            workers = self.workers,
            resume,
            "starting media download"
        );

        let summary = Arc::new(DownloadSummary::new());
        let bar = self.progress_bar(assets.len() as u64);

        // The writer task owns the checkpoint; completed URLs arrive over the
        // channel and each one is persisted before the next is read.
        let already_completed: HashSet<String> =
            assets.iter().map(|a| a.source_url.clone()).filter(|url| checkpoint.contains(url)).collect();
        let (tx, rx) = mpsc::channel::<Completion>(self.workers * 2);
        let writer = tokio::spawn(checkpoint_writer(checkpoint, rx));

        let mut handles = Vec::new();
        let mut seen = HashSet::new();
        for asset in assets {
            if self.cancel.is_cancelled() {
                info!("cancellation requested, not dispatching further assets");
                break;
            }
            // The manifest may list the same URL more than once.
            if !seen.insert(asset.source_url.clone()) {
                continue;
            }

            if already_completed.contains(&asset.source_url) {
                debug!(url = %asset.source_url, "already in checkpoint, skipping");
                summary.increment_skipped();
                bar.inc(1);
                continue;
            }

            let dest = files_dir.join(&asset.relative_path);
            if resume && dest.exists() {
                // On disk but unrecorded: trust the file, record it now.
                debug!(url = %asset.source_url, "file already present, recording");
                summary.increment_skipped();
                bar.inc(1);
                if tx.send(Completion { source_url: asset.source_url }).await.is_err() {
                    warn!("checkpoint writer stopped early");
                }
                continue;
            }

            let permit = match self.semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };

            let client = self.client.clone();
            let summary = Arc::clone(&summary);
            let tx = tx.clone();
            let bar = bar.clone();
            handles.push(tokio::spawn(async move {
                let _permit = permit;

                match download_asset(&client, &asset, &dest).await {
                    Ok(bytes) => {
                        debug!(url = %asset.source_url, bytes, "asset downloaded");
                        summary.increment_downloaded();
                        if tx.send(Completion { source_url: asset.source_url }).await.is_err() {
                            warn!("checkpoint writer stopped early");
                        }
                    }
                    Err(error) => {
                        warn!(url = %asset.source_url, %error, "asset download failed");
                        summary.increment_failed();
                    }
                }
                bar.inc(1);
            }));
        }
        drop(tx);

        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "download task panicked");
            }
        }
        if let Err(e) = writer.await {
            warn!(error = %e, "checkpoint writer panicked");
        }
        bar.finish_and_clear();

        info!(
            downloaded = summary.downloaded(),
            failed = summary.failed(),
            skipped = summary.skipped(),
            "media download complete"
        );

        match Arc::try_unwrap(summary) {
            Ok(summary) => Ok(summary),
            Err(shared) => {
                // All tasks are joined, so this branch should be unreachable;
                // rebuild from the atomic values just in case.
                let summary = DownloadSummary::new();
                summary.downloaded.store(shared.downloaded(), Ordering::SeqCst);
                summary.failed.store(shared.failed(), Ordering::SeqCst);
                summary.skipped.store(shared.skipped(), Ordering::SeqCst);
                Ok(summary)
            }
        }
    }

    fn progress_bar(&self, total: u64) -> ProgressBar {
        if self.show_progress {
            ProgressBar::new(total)
        } else {
            ProgressBar::hidden()
        }
    }
}

/// Downloads one asset, creating its parent directories first. The client
/// writes through a temporary file and renames into place, so the checkpoint
/// report only ever follows a fully materialized file.
async fn download_asset(
    client: &ApiClient,
    asset: &MediaAsset,
    dest: &Path,
) -> Result<u64, MediaError> {
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| MediaError::io(parent, e))?;
    }
    client
        .fetch_to_file(&asset.source_url, dest)
        .await
        .map_err(|e| MediaError::io(dest, std::io::Error::other(e)))
}

/// Owns the checkpoint for the duration of a run, persisting after every
/// completion report.
async fn checkpoint_writer(mut checkpoint: Checkpoint, mut rx: mpsc::Receiver<Completion>) {
    while let Some(completion) = rx.recv().await {
        checkpoint.record(completion.source_url);
        if let Err(error) = checkpoint.persist() {
            warn!(%error, "failed to persist checkpoint");
        }
    }
    if let Err(error) = checkpoint.persist() {
        warn!(%error, "failed to persist final checkpoint");
    }
}
