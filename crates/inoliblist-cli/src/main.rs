//! CLI entry point for inoliblist.

use anyhow::{Context, Result};
use clap::Parser;
use inoliblist_core::{AuditLog, Catalog, GithubClient};
use tracing::{debug, info, warn};

mod cli;
mod output;

use cli::Args;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(args.log_level()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = args.run_config();
    debug!(?config, "CLI arguments parsed");

    let client = GithubClient::with_config(config.client).context("failed to create HTTP client")?;
    let audit = AuditLog::in_dir(&config.output_dir).with_context(|| {
        format!(
            "failed to prepare output folder {}",
            config.output_dir.display()
        )
    })?;
    let mut catalog = Catalog::new(client, audit);

    if config.process_index {
        catalog
            .process_library_manager_index(&config.index_url)
            .await
            .context("failed to process the Library Manager index")?;
    }
    if config.run_searches {
        catalog.run_default_searches().await;
    }

    let stats = catalog.stats();
    println!("Number of sources: {}", stats.sources);
    println!(
        "Number of sources with non-blacklisted repository name: {}",
        stats.non_blacklisted
    );
    println!("Number of non-blacklisted, unique sources: {}", stats.unique);
    println!("\nNumber of libraries found: {}", catalog.records().len());

    match output::write_table(&config.output_dir, catalog.records())
        .context("failed to write the output table")?
    {
        Some(path) => info!(path = %path.display(), "wrote library list"),
        None => warn!("Canceling output file creation because the list has no libraries"),
    }

    Ok(())
}
