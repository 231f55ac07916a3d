//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use inoliblist_core::{ClientConfig, LIBRARY_INDEX_URL};

/// Generate a list of Arduino library repositories on GitHub.
///
/// Repositories come from the Library Manager index and from a set of
/// GitHub searches; each one is checked for an Arduino library before it is
/// added to the list.
#[derive(Parser, Debug)]
#[command(name = "inoliblist")]
#[command(author, version, about)]
pub struct Args {
    /// GitHub personal access token
    #[arg(long = "ghtoken", env = "GITHUB_TOKEN", hide_env_values = true, value_name = "TOKEN")]
    pub github_token: Option<String>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Folder for the list and the audit logs
    #[arg(short, long, default_value = "output")]
    pub output_dir: PathBuf,

    /// Library Manager index location
    #[arg(long, default_value = LIBRARY_INDEX_URL)]
    pub index_url: String,

    /// Do not process the Library Manager index
    #[arg(long)]
    pub skip_index: bool,

    /// Do not run the GitHub searches
    #[arg(long)]
    pub skip_search: bool,

    /// Per-request timeout in seconds (default: none)
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

/// Settings of one run
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub client: ClientConfig,
    pub output_dir: PathBuf,
    pub index_url: String,
    pub process_index: bool,
    pub run_searches: bool,
}

impl Args {
    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            client: ClientConfig {
                token: self.github_token.clone().filter(|token| !token.trim().is_empty()),
                timeout_secs: self.timeout,
                ..ClientConfig::default()
            },
            output_dir: self.output_dir.clone(),
            index_url: self.index_url.clone(),
            process_index: !self.skip_index,
            run_searches: !self.skip_search,
        }
    }

    /// Default log filter; `RUST_LOG` takes precedence over it
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "info",
                1 => "debug",
                _ => "trace",
            }
        }
    }
}
