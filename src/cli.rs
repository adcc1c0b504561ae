//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use wparchive_core::{
    CrawlConfig, DEFAULT_PAGE_SIZE, DEFAULT_RETRY_COUNT, DEFAULT_TIMEOUT_SECS, DEFAULT_WORKERS,
};

/// Archive a WordPress site through its public REST API.
///
/// Discovers the site's API routes, extracts the publicly readable ones to
/// line-delimited JSON, and downloads the referenced media files.
#[derive(Parser, Debug)]
#[command(name = "wparchive")]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Use http:// instead of https:// for the API root
    #[arg(long, global = true)]
    pub no_https: bool,

    /// Disable TLS certificate verification (not recommended)
    #[arg(long, global = true)]
    pub no_verify_tls: bool,

    /// Request timeout in seconds
    #[arg(long, global = true, default_value_t = DEFAULT_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: u64,

    /// Disable terminal progress bars
    #[arg(long, global = true)]
    pub no_progress: bool,
}

/// Subcommands mirroring the archive workflow: verify, inspect, extract,
/// download.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Verify the API root is reachable and count its routes
    Ping {
        /// Domain name (e.g., example.com)
        domain: String,
    },

    /// Classify every discovered route and report per-category statistics
    Analyze {
        /// Domain name (e.g., example.com)
        domain: String,
    },

    /// Extract all public routes to line-delimited JSON files
    Dump {
        /// Domain name (e.g., example.com)
        domain: String,

        /// Skip uncataloged routes instead of probing them live
        #[arg(long)]
        known_only: bool,

        /// Number of items per collection page (1-100)
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE, value_parser = clap::value_parser!(u32).range(1..=100))]
        page_size: u32,

        /// Fetch attempt budget for transient failures (1-10)
        #[arg(long, default_value_t = DEFAULT_RETRY_COUNT, value_parser = clap::value_parser!(u32).range(1..=10))]
        retry_count: u32,

        /// Output directory (defaults to the domain name)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Download all media files listed in the extracted media route
    Getfiles {
        /// Domain name (e.g., example.com)
        domain: String,

        /// Concurrent download workers (1-100)
        #[arg(short, long, default_value_t = DEFAULT_WORKERS, value_parser = workers_in_range)]
        workers: usize,

        /// Ignore the checkpoint and re-download everything
        #[arg(long)]
        no_resume: bool,

        /// Output directory (defaults to the domain name)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

impl Cli {
    /// Maps the parsed flags onto the library configuration.
    #[must_use]
    pub fn crawl_config(&self) -> CrawlConfig {
        let mut config = CrawlConfig::default()
            .with_timeout(Duration::from_secs(self.timeout))
            .with_force_https(!self.no_https)
            .with_verify_tls(!self.no_verify_tls)
            .with_progress(!self.no_progress && !self.quiet);

        match &self.command {
            Command::Dump {
                page_size,
                retry_count,
                ..
            } => {
                config = config
                    .with_page_size(*page_size)
                    .with_retry_count(*retry_count);
            }
            Command::Getfiles { workers, .. } => {
                config = config.with_workers(*workers);
            }
            Command::Ping { .. } | Command::Analyze { .. } => {}
        }
        config
    }
}

fn workers_in_range(value: &str) -> Result<usize, String> {
    let workers: usize = value
        .parse()
        .map_err(|_| format!("'{value}' is not a number"))?;
    if (1..=100).contains(&workers) {
        Ok(workers)
    } else {
        Err(format!("{workers} is not between 1 and 100"))
    }
}
