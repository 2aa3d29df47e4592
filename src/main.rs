//! Channel Ops - Main Entry Point
//!
//! Command-line automation toolkit for a single Telegram channel:
//! boosts, leaderboard, reminders, queued posts/stories/ads, moderation
//! checks, and admin-log group creation.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use channel_ops_bot::commands;
use channel_ops_bot::commands::ads::AdsOpts;
use channel_ops_bot::commands::posts::PostsOpts;
use channel_ops_bot::commands::stories::StoriesOpts;
use channel_ops_bot::config::Settings;
use channel_ops_bot::metrics;

/// Telegram channel boost and content automation.
#[derive(Parser, Debug)]
#[command(name = "channel-ops")]
#[command(about = "Automate boosts, posts, stories and moderation for a Telegram channel")]
#[command(version)]
struct Args {
    /// Path to the .env file for environment variables.
    #[arg(long, default_value = ".env")]
    env_file: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply boosts to the configured channel.
    Boost {
        /// Number of boost slots to apply.
        #[arg(short, long, default_value_t = 1)]
        slots: usize,

        /// Only show what would be done.
        #[arg(long)]
        dry_run: bool,
    },

    /// Show the top boosters leaderboard.
    Leaderboard {
        /// Number of top boosters to show.
        #[arg(short, long, default_value_t = 10)]
        limit: usize,

        /// Only show what would be done.
        #[arg(long)]
        dry_run: bool,
    },

    /// Send reminder messages for expiring boosts.
    Reminder {
        /// Threshold in days for expiring boosts.
        #[arg(short, long, default_value_t = 3)]
        days: i64,

        /// Only show what would be done.
        #[arg(long)]
        dry_run: bool,
    },

    /// Process and publish scheduled posts from markdown files.
    Posts {
        /// Directory to scan for markdown files.
        #[arg(long, default_value = "content/queue")]
        queue_dir: PathBuf,

        /// Directory to move processed files into.
        #[arg(long, default_value = "content/done")]
        done_dir: PathBuf,

        /// Use the bot token instead of the user session for posting.
        #[arg(long)]
        use_bot: bool,

        /// Only show what would be done.
        #[arg(long)]
        dry_run: bool,
    },

    /// Upload queued media files as channel stories.
    Stories {
        /// Directory to scan for media files.
        #[arg(long, default_value = "story/queue")]
        queue_dir: PathBuf,

        /// Directory to move processed files into.
        #[arg(long, default_value = "story/done")]
        done_dir: PathBuf,

        /// Only show what would be done.
        #[arg(long)]
        dry_run: bool,
    },

    /// Process queued advertising campaign configs.
    Ads {
        /// Directory to scan for YAML campaign configs.
        #[arg(long, default_value = "ads/queue")]
        queue_dir: PathBuf,

        /// Directory to move processed files into.
        #[arg(long, default_value = "ads/done")]
        done_dir: PathBuf,

        /// Only show what would be done.
        #[arg(long)]
        dry_run: bool,
    },

    /// Run moderation guard checks on the channel.
    Moderation {
        /// Path to the expected moderation bot configuration.
        #[arg(long, default_value = "moderation_config.json")]
        config: PathBuf,

        /// Only show what would be done.
        #[arg(long)]
        dry_run: bool,
    },

    /// Create a private mega-group for admin logging.
    AdminLog {
        /// Name for the admin log group.
        #[arg(long)]
        name: String,

        /// Update the .env file with the created chat id.
        #[arg(long)]
        write_env: bool,

        /// Only show what would be done.
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(&args.log_level);

    // Load environment variables
    if let Err(e) = dotenvy::from_filename(&args.env_file) {
        debug!("Could not load .env file ({}): {}", args.env_file, e);
    }

    // Configuration errors are fatal before any remote action.
    let settings =
        Settings::from_env().context("Failed to load configuration from environment")?;

    if let Some(addr) = settings.metrics_addr {
        metrics::init(addr);
    }

    metrics::record_run();
    let started = Instant::now();

    let result = dispatch(args.command, &settings).await;

    metrics::record_duration(started);
    if result.is_err() {
        metrics::record_error();
    }
    result
}

async fn dispatch(command: Command, settings: &Settings) -> Result<()> {
    match command {
        Command::Boost { slots, dry_run } => commands::boost::run(settings, slots, dry_run).await,
        Command::Leaderboard { limit, dry_run } => {
            commands::leaderboard::run(settings, limit, dry_run).await
        }
        Command::Reminder { days, dry_run } => {
            commands::reminder::run(settings, days, dry_run).await
        }
        Command::Posts {
            queue_dir,
            done_dir,
            use_bot,
            dry_run,
        } => {
            commands::posts::run(
                settings,
                &PostsOpts {
                    queue_dir,
                    done_dir,
                    use_bot,
                    dry_run,
                },
            )
            .await
        }
        Command::Stories {
            queue_dir,
            done_dir,
            dry_run,
        } => {
            commands::stories::run(
                settings,
                &StoriesOpts {
                    queue_dir,
                    done_dir,
                    dry_run,
                },
            )
            .await
        }
        Command::Ads {
            queue_dir,
            done_dir,
            dry_run,
        } => {
            commands::ads::run(&AdsOpts {
                queue_dir,
                done_dir,
                dry_run,
            })
            .await
        }
        Command::Moderation { config, dry_run } => {
            commands::moderation::run(settings, &config, dry_run).await
        }
        Command::AdminLog {
            name,
            write_env,
            dry_run,
        } => commands::admin_log::run(settings, &name, write_env, dry_run).await,
    }
}

/// Initializes the logging subsystem.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
