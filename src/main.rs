//! CLI entry point for the wparchive tool.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{debug, info, warn};
use wparchive_core::{
    CancelFlag, Crawler, DownloadManager, RouteCatalog, RouteCategory, crawler::validate_domain,
};

mod cli;

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let cli = Cli::parse();

    // Determine log level based on verbose/quiet flags
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?cli, "CLI arguments parsed");

    // First Ctrl-C requests a clean stop; in-flight work finishes and state
    // is persisted. A second Ctrl-C aborts the process.
    let cancel = CancelFlag::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, finishing in-flight work");
                cancel.cancel();
            }
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("second interrupt, aborting");
                std::process::exit(130);
            }
        });
    }

    let config = cli.crawl_config();
    let crawler = Crawler::new(config.clone(), cancel.clone());
    let catalog = RouteCatalog::builtin();

    match &cli.command {
        Command::Ping { domain } => {
            let report = crawler.ping(domain).await?;
            println!("\nEndpoint {} is OK", report.url);
            println!("Total routes: {}", report.route_count);
        }

        Command::Analyze { domain } => {
            let report = crawler.analyze(domain, &catalog).await?;
            println!("\nAnalysis complete for {}", report.url);
            println!("Total routes: {}", report.total_routes);
            println!("\nRoute statistics:");
            println!("  Protected:   {}", report.statistics.protected);
            println!("  Public-list: {}", report.statistics.public_list);
            println!("  Public-dict: {}", report.statistics.public_dict);
            println!("  Useless:     {}", report.statistics.useless);
            println!("  Unknown:     {}", report.statistics.unknown);

            if !report.unknown_routes.is_empty() {
                println!(
                    "\nProbed {} routes not present in the catalog",
                    report.unknown_routes.len()
                );
                for (route, category) in &report.resolved {
                    println!("  {category}: {route}");
                }
                if report
                    .resolved
                    .values()
                    .any(|c| *c != RouteCategory::Unknown)
                {
                    println!("\nCatalog update for these routes:");
                    println!("{}", report.catalog_update);
                }
            }
        }

        Command::Dump {
            domain,
            known_only,
            output,
            ..
        } => {
            let out_dir = output_dir(domain, output.as_deref())?;
            let stats = crawler
                .collect_data(domain, &catalog, &out_dir, !known_only)
                .await?;
            println!(
                "\nData collection complete: {} routes processed, {} skipped (of {})",
                stats.processed, stats.skipped, stats.total_routes
            );
        }

        Command::Getfiles {
            domain,
            no_resume,
            output,
            ..
        } => {
            let out_dir = output_dir(domain, output.as_deref())?;
            let manager = DownloadManager::new(crawler.client().clone(), &config, cancel)?;
            let summary = manager.run(&out_dir, !no_resume).await?;
            println!(
                "\nFile download complete: {} downloaded, {} failed, {} skipped",
                summary.downloaded(),
                summary.failed(),
                summary.skipped()
            );
            if summary.failed() > 0 {
                info!("failed assets are retried on the next run");
            }
        }
    }

    Ok(())
}

/// Resolves the output directory: an explicit `--output` wins, otherwise the
/// normalized domain name in the working directory.
fn output_dir(domain: &str, output: Option<&std::path::Path>) -> Result<PathBuf> {
    match output {
        Some(path) => Ok(path.to_path_buf()),
        None => Ok(PathBuf::from(validate_domain(domain)?)),
    }
}
