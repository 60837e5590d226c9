//! subsnap CLI
//!
//! Local execution entry point.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use subsnap::{
    error::Result,
    models::Config,
    pipeline,
    services::{Credentials, FieldExtractor, RedditClient, RetryPolicy},
    storage::{LocalStorage, SnapshotStorage},
};

/// subsnap - Subreddit Submission Snapshots
#[derive(Parser, Debug)]
#[command(
    name = "subsnap",
    version,
    about = "Snapshots subreddit listings and merges them into combined tables"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

/// Listing selection shared by `fetch` and `merge`.
#[derive(Args, Debug)]
struct ListingArgs {
    /// Forum to process (repeatable, default: fetch.forums)
    #[arg(long = "forum")]
    forums: Vec<String>,

    /// Sort mode: new, hot, rising, top, controversial
    #[arg(long)]
    sort: Option<String>,

    /// Time window for top/controversial: all, year, month, week, day, hour
    #[arg(long)]
    time_window: Option<String>,
}

impl ListingArgs {
    fn apply(self, config: &mut Config) {
        if !self.forums.is_empty() {
            config.fetch.forums = self.forums;
        }
        if let Some(sort) = self.sort {
            config.fetch.sort = sort;
        }
        if let Some(window) = self.time_window {
            config.fetch.time_window = Some(window);
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch a snapshot of each forum's listing
    Fetch {
        #[command(flatten)]
        listing: ListingArgs,

        /// Maximum submissions per forum
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Merge snapshots into combined tables
    Merge {
        #[command(flatten)]
        listing: ListingArgs,

        /// Delete snapshot files once merged
        #[arg(long)]
        delete_merged: bool,
    },

    /// Validate configuration
    Validate,

    /// Show snapshot and combined table info
    Info,
}

/// Initialize logging with the given default level; `RUST_LOG` wins.
fn init_logging(level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Read the config before the logger exists so its level can apply.
    let loaded = Config::load(&cli.config);
    let level = match (&loaded, cli.verbose) {
        (_, true) => "debug".to_string(),
        (Ok(config), false) => config.logging.level.clone(),
        (Err(_), false) => "info".to_string(),
    };
    init_logging(&level);

    let mut config = loaded.unwrap_or_else(|e| {
        log::warn!(
            "Config load failed from {}: {}. Using defaults.",
            cli.config.display(),
            e
        );
        Config::default()
    });

    log::info!("subsnap starting...");

    match cli.command {
        Command::Fetch { listing, limit } => {
            listing.apply(&mut config);
            if let Some(limit) = limit {
                config.fetch.limit = limit;
            }
            config.validate()?;

            let client = RedditClient::new(&config.reddit)?;
            let extractor = FieldExtractor::new(RetryPolicy::from_config(&config.retry));
            let storage = LocalStorage::from_config(&config.paths);

            let written = pipeline::run_fetch(&config.fetch, &client, &extractor, &storage).await?;
            log::info!("Fetch complete! {} snapshot(s) written.", written.len());
        }

        Command::Merge {
            listing,
            delete_merged,
        } => {
            listing.apply(&mut config);
            config.validate()?;

            let sort_tag = config.fetch.sort_mode()?.file_tag();
            let storage = LocalStorage::from_config(&config.paths);
            let delete = delete_merged || config.merge.delete_merged;

            let outcomes =
                pipeline::run_merge(&storage, &config.fetch.forums, &sort_tag, delete).await?;
            for outcome in &outcomes {
                log::info!(
                    "r/{}: {} rows from {} file(s){}",
                    outcome.forum,
                    outcome.rows,
                    outcome.merged_files.len(),
                    if outcome.unchanged() { " (unchanged)" } else { "" }
                );
            }
            log::info!("Merge complete!");
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK");
            log::info!("  Forums: {}", config.fetch.forums.join(", "));
            log::info!("  Listing: {}", config.fetch.sort_mode()?);
            log::info!(
                "  Retry: {} attempts, {}s apart",
                config.retry.max_attempts,
                config.retry.backoff_secs
            );

            match Credentials::load(&config.reddit.credentials_file) {
                Ok(_) => log::info!("✓ Credentials found"),
                Err(e) => log::warn!("Credentials unavailable: {}", e),
            }

            log::info!("All validations passed!");
        }

        Command::Info => {
            let storage = LocalStorage::from_config(&config.paths);
            let sort_tag = config.fetch.sort_mode()?.file_tag();

            log::info!("Snapshot directory: {}", storage.snapshot_dir().display());
            log::info!("Combined directory: {}", storage.combined_dir().display());

            for forum in &config.fetch.forums {
                let snapshots = storage.list_snapshots(forum, &sort_tag).await?;
                log::info!("r/{} ({}): {} snapshot(s)", forum, sort_tag, snapshots.len());
                if let Some(latest) = snapshots.first() {
                    log::info!("    Latest: {}", latest);
                }
                match storage.load_combined(forum, &sort_tag).await? {
                    Some(combined) => log::info!(
                        "    Combined: {} rows, last retrieved {}",
                        combined.len(),
                        combined.retrieved_at.format("%Y-%m-%d %H:%M")
                    ),
                    None => log::info!("    No combined table yet."),
                }
            }
        }
    }

    log::info!("Done!");

    Ok(())
}
