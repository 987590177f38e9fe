use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use podsync::{
    Database, NoopReporter, ProgressEvent, ProgressReporter, ReqwestClient, ScheduleConfig,
    SharedProgressReporter, SyncConfig, SyncLogEntry, SyncResult, SyncService, SyncStatus,
    WriteFailurePolicy, run_periodic,
};

// Emoji with fallback for terminals without Unicode support
static RADIO: Emoji<'_, '_> = Emoji("📻 ", "");
static SEARCH: Emoji<'_, '_> = Emoji("🔍 ", "[~] ");
static HEADPHONES: Emoji<'_, '_> = Emoji("🎧 ", "[i] ");
static SUCCESS: Emoji<'_, '_> = Emoji("✅ ", "[+] ");
static FAILURE: Emoji<'_, '_> = Emoji("❌ ", "[!] ");
static PARTY: Emoji<'_, '_> = Emoji("🎉 ", "[*] ");
static CLOCK: Emoji<'_, '_> = Emoji("⏰ ", "[@] ");
static CROSS: Emoji<'_, '_> = Emoji("✗ ", "x ");

/// Keep a podcast catalogue in sync with its RSS feeds
#[derive(Parser, Debug)]
#[command(name = "podsync")]
#[command(about = "Keep a podcast catalogue in sync with its RSS feeds")]
#[command(version)]
struct Args {
    /// Path to the SQLite catalogue database
    #[arg(short, long, env = "PODSYNC_DATABASE", default_value = "podsync.db", global = true)]
    database: PathBuf,

    /// Maximum number of podcasts synced concurrently by sync-all
    #[arg(short = 'c', long, env = "PODSYNC_CONCURRENCY", default_value = "4", global = true)]
    concurrent: usize,

    /// Roll back only the failing episode instead of the whole sync
    #[arg(long, env = "PODSYNC_SKIP_FAILED_ITEMS", global = true)]
    skip_failed_items: bool,

    /// Quiet mode - suppress progress output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register a new podcast from its feed URL and run a first sync
    Add {
        /// RSS feed URL
        rss_url: String,

        /// Podcaster account that owns the podcast
        #[arg(long)]
        owner: Uuid,

        /// Only register the podcast, do not import episodes
        #[arg(long)]
        no_sync: bool,
    },

    /// Synchronize a single podcast
    Sync { podcast_id: Uuid },

    /// Synchronize every active podcast once and exit
    SyncAll,

    /// Synchronize every active podcast periodically until interrupted
    Serve {
        /// Seconds to wait before the first run
        #[arg(long, env = "PODSYNC_INITIAL_DELAY", default_value = "60")]
        initial_delay: u64,

        /// Seconds between runs
        #[arg(long, env = "PODSYNC_INTERVAL", default_value = "21600")]
        interval: u64,
    },

    /// Show the sync state of a podcast
    Status {
        podcast_id: Uuid,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// List past sync attempts of a podcast, newest first
    Logs {
        podcast_id: Uuid,

        #[arg(long, default_value = "1")]
        page: u32,

        #[arg(long, default_value = "20")]
        page_size: u32,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

/// Progress reporter using indicatif for terminal output
struct IndicatifReporter {
    main_bar: ProgressBar,
}

impl IndicatifReporter {
    fn new() -> Self {
        let main_style = ProgressStyle::default_bar()
            .template("{spinner:.green} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());

        let main_bar = ProgressBar::new_spinner();
        main_bar.set_style(main_style);
        main_bar.enable_steady_tick(Duration::from_millis(100));

        Self { main_bar }
    }

    fn finish(&self) {
        self.main_bar.finish_and_clear();
    }
}

impl ProgressReporter for IndicatifReporter {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::BatchStarted { total } => {
                self.main_bar.set_message(format!(
                    "{RADIO}Syncing {} active podcasts",
                    total.to_string().cyan()
                ));
            }

            ProgressEvent::FetchingFeed { url, .. } => {
                self.main_bar
                    .set_message(format!("{SEARCH}Fetching feed: {}", url.cyan()));
            }

            ProgressEvent::FeedParsed {
                podcast_title,
                total_items,
                ..
            } => {
                self.main_bar.set_message(format!(
                    "{HEADPHONES}{} • {} episodes in feed",
                    podcast_title.bold().green(),
                    total_items.to_string().cyan()
                ));
            }

            ProgressEvent::SyncCompleted {
                podcast_title,
                episodes_added,
                episodes_updated,
                episodes_skipped,
                ..
            } => {
                let skipped = if episodes_skipped > 0 {
                    format!(", {} skipped", episodes_skipped.to_string().red().bold())
                } else {
                    String::new()
                };
                self.main_bar.println(format!(
                    "{SUCCESS}{} • {} added, {} updated{skipped}",
                    truncate_title(&podcast_title, 40).green(),
                    episodes_added.to_string().green().bold(),
                    episodes_updated.to_string().yellow()
                ));
            }

            ProgressEvent::SyncFailed { podcast_id, error } => {
                self.main_bar.println(format!(
                    "{FAILURE}{} - {}",
                    podcast_id.to_string().red(),
                    error.red()
                ));
            }

            ProgressEvent::BatchCompleted { succeeded, failed } => {
                self.main_bar.finish_and_clear();
                println!(
                    "\n{PARTY}{} {} succeeded, {} failed",
                    "Sync complete:".bold().green(),
                    succeeded.to_string().green().bold(),
                    if failed > 0 {
                        failed.to_string().red().bold()
                    } else {
                        failed.to_string().green()
                    }
                );
            }
        }
    }
}

fn truncate_title(title: &str, max_len: usize) -> String {
    if title.chars().count() <= max_len {
        title.to_string()
    } else {
        let kept: String = title.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

fn init_tracing(command: &Command) {
    let default_filter = match command {
        Command::Serve { .. } => "podsync=info",
        _ => "podsync=warn",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_failed_items(result: &SyncResult) {
    if result.failed_items.is_empty() {
        return;
    }
    println!("\n{}", "Skipped episodes:".red().bold());
    for (guid, error) in &result.failed_items {
        println!("  {}{} - {}", CROSS, guid.yellow(), error.dimmed());
    }
}

fn describe_log(entry: &SyncLogEntry) -> String {
    let when = entry.created_at.format("%Y-%m-%d %H:%M:%S UTC").to_string();
    match entry.status {
        SyncStatus::Success => format!(
            "{} {} {} added, {} updated",
            when.dimmed(),
            "success".green(),
            entry.episodes_added,
            entry.episodes_updated
        ),
        SyncStatus::Failure => format!(
            "{} {} {}",
            when.dimmed(),
            "failure".red(),
            entry.error_message.as_deref().unwrap_or_default()
        ),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.command);

    let db = Database::open(&args.database)
        .with_context(|| format!("Failed to open database {}", args.database.display()))?;

    let config = SyncConfig {
        max_concurrent_syncs: args.concurrent,
        write_failure_policy: if args.skip_failed_items {
            WriteFailurePolicy::SkipItem
        } else {
            WriteFailurePolicy::Abort
        },
        ..SyncConfig::default()
    };

    let client = ReqwestClient::new(&config.user_agent, config.fetch_timeout)
        .context("Failed to build HTTP client")?;

    let interactive = !args.quiet && !matches!(args.command, Command::Serve { .. });
    let indicatif = interactive.then(|| Arc::new(IndicatifReporter::new()));
    let reporter: SharedProgressReporter = match &indicatif {
        Some(reporter) => Arc::clone(reporter) as SharedProgressReporter,
        None => NoopReporter::shared(),
    };

    let service = Arc::new(SyncService::new(client, Arc::new(db), config).with_reporter(reporter));
    let cancel = CancellationToken::new();

    if interactive {
        println!(
            "\n{}{} {}\n",
            RADIO,
            "podsync".bold().magenta(),
            "- Podcast Feed Sync".dimmed()
        );
    }

    match args.command {
        Command::Add {
            rss_url,
            owner,
            no_sync,
        } => {
            let podcast = service
                .register_podcast(owner, &rss_url)
                .await
                .context("Failed to register podcast")?;
            if !args.quiet {
                println!(
                    "{SUCCESS}Registered {} as {}",
                    podcast.title.bold().green(),
                    podcast.id.to_string().cyan()
                );
            }

            if !no_sync {
                let result = service
                    .sync_podcast_with_timeout(podcast.id, &cancel)
                    .await
                    .context("Failed to sync podcast");
                if let Some(reporter) = &indicatif {
                    reporter.finish();
                }
                let result = result?;
                if !args.quiet {
                    print_failed_items(&result);
                }
            }
        }

        Command::Sync { podcast_id } => {
            let result = service
                .sync_podcast_with_timeout(podcast_id, &cancel)
                .await
                .context("Failed to sync podcast");
            if let Some(reporter) = &indicatif {
                reporter.finish();
            }
            let result = result?;
            if !args.quiet {
                print_failed_items(&result);
            }
        }

        Command::SyncAll => {
            let results = service
                .sync_all_with_timeout(&cancel)
                .await
                .context("Failed to sync podcasts")?;

            let succeeded = results.iter().filter(|r| r.success).count();
            if !args.quiet {
                for result in &results {
                    print_failed_items(result);
                }
            }
            if succeeded == 0 && !results.is_empty() {
                std::process::exit(1);
            }
        }

        Command::Serve {
            initial_delay,
            interval,
        } => {
            let schedule = ScheduleConfig {
                initial_delay: Duration::from_secs(initial_delay),
                interval: Duration::from_secs(interval.max(1)),
            };

            let signal_token = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("shutdown requested");
                    signal_token.cancel();
                }
            });

            let runs = run_periodic(schedule, cancel.clone(), || {
                let service = Arc::clone(&service);
                let cancel = cancel.clone();
                async move {
                    match service.sync_all_with_timeout(&cancel).await {
                        Ok(results) => {
                            let failed = results.iter().filter(|r| !r.success).count();
                            info!(total = results.len(), failed, "scheduled sync finished");
                        }
                        Err(e) => error!(error = %e, "scheduled sync failed"),
                    }
                }
            })
            .await;

            if !args.quiet {
                println!("{CLOCK}Stopped after {} scheduled runs", runs.to_string().cyan());
            }
        }

        Command::Status { podcast_id, json } => {
            let status = service
                .sync_status(podcast_id)
                .await
                .context("Failed to load sync status")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                println!("{HEADPHONES}{}", status.title.bold().green());
                println!(
                    "  running:     {}",
                    if status.running { "yes".yellow() } else { "no".normal() }
                );
                println!(
                    "  last synced: {}",
                    status
                        .last_synced_at
                        .map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                        .unwrap_or_else(|| "never".to_string())
                );
                if let Some(latest) = &status.latest {
                    println!("  last result: {}", describe_log(latest));
                }
            }
        }

        Command::Logs {
            podcast_id,
            page,
            page_size,
            json,
        } => {
            let logs = service
                .sync_history(podcast_id, page, page_size)
                .await
                .context("Failed to load sync logs")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&logs)?);
            } else {
                for entry in &logs.items {
                    println!("  {}", describe_log(entry));
                }
                println!(
                    "\n  page {} • {} per page • {} attempts total",
                    logs.page, logs.page_size, logs.total
                );
            }
        }
    }

    Ok(())
}
