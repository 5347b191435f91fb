use anyhow::{Context, Result};
use chrono::{DateTime, Local, TimeZone, Utc};
use clap::{Parser, Subcommand};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use skybanner::catalog::{Catalog, CatalogStore};
use skybanner::config::Config;
use skybanner::error::{Error, SkybannerErrorTrait};
use skybanner::publisher::BlueskyPublisher;
use skybanner::scheduler::{
    total_weight, weighted_order, BannerRotation, RotationTrigger, ScheduleMode, SchedulerResult,
    TriggerEvent,
};

/// Number of upcoming fires listed by `status`
const STATUS_UPCOMING: usize = 6;

#[derive(Parser)]
#[command(
    name = "skybanner",
    version,
    about = "Rotate your Bluesky profile banner from a folder of images",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true)]
    log_format: Option<String>,

    /// Read configuration from a TOML file instead of the environment
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Rotate the banner on a schedule until interrupted
    Run {
        /// Schedule mode (hourly, daily, weekly, biweekly, monthly)
        #[arg(short, long)]
        schedule: Option<String>,
    },

    /// Publish one banner now and exit
    Once,

    /// Reconcile the catalog and list the banners found
    Scan,

    /// Show lottery weights and upcoming fire times
    Status {
        /// Schedule mode (hourly, daily, weekly, biweekly, monthly)
        #[arg(short, long)]
        schedule: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };
    if let Some(format) = &cli.log_format {
        config.logging.format = format.clone();
    }

    // Initialize tracing/logging
    setup_tracing(&config.logging.format, &config.logging.level, cli.verbose)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "skybanner starting");

    match cli.command {
        Commands::Run { schedule } => {
            if let Some(schedule) = schedule {
                config.rotation.schedule = schedule;
            }
            tracing::info!(schedule = %config.rotation.schedule, "Starting run command");
            run(config).await?;
        }

        Commands::Once => {
            tracing::info!("Starting once command");
            once(config).await?;
        }

        Commands::Scan => {
            tracing::info!(dir = %config.rotation.banner_dir.display(), "Starting scan command");
            scan(config)?;
        }

        Commands::Status { schedule } => {
            if let Some(schedule) = schedule {
                config.rotation.schedule = schedule;
            }
            tracing::info!(schedule = %config.rotation.schedule, "Starting status command");
            status(config)?;
        }
    }

    Ok(())
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let default_filter = if verbose {
        "skybanner=debug,info".to_string()
    } else {
        format!("skybanner={level},warn")
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    // Reports go to stdout; keep logs on stderr
    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    Ok(())
}

/// Reconcile the catalog once, as every command does at startup
fn reconcile(config: &Config) -> Result<(CatalogStore, Catalog)> {
    let store = CatalogStore::new(&config.rotation.data_file);
    let catalog = store
        .reconcile(&config.rotation.banner_dir)
        .map_err(classified)
        .context("Failed to reconcile banner catalog")?;
    Ok((store, catalog))
}

fn build_rotation(config: &Config) -> Result<BannerRotation<BlueskyPublisher>> {
    config.validate_for_publishing()?;
    let (store, catalog) = reconcile(config)?;
    print_banners(&catalog);

    let publisher = BlueskyPublisher::new(config.bluesky.clone()).map_err(classified)?;
    let rotation = BannerRotation::new(store, catalog, publisher)
        .map_err(classified)
        .with_context(|| {
            format!(
                "No banners available in {}",
                config.rotation.banner_dir.display()
            )
        })?;

    Ok(match config.rotation.seed {
        Some(seed) => rotation.with_seed(seed),
        None => rotation,
    })
}

/// Log a fatal failure with its category before it aborts the command
fn classified(err: impl Into<Error>) -> Error {
    let err = err.into();
    tracing::error!(
        category = %err.category(),
        recoverable = err.is_recoverable(),
        error = %err,
        "Command failed"
    );
    err
}

async fn run(config: Config) -> Result<()> {
    let mode = config.schedule_mode()?;
    let rotation = build_rotation(&config)?;

    let trigger = Arc::new(RotationTrigger::new(mode, rotation));
    println!("{}", trigger.status().await.display());
    let printer = tokio::spawn(print_events(trigger.subscribe()));

    let mut handle = tokio::spawn({
        let trigger = Arc::clone(&trigger);
        async move { trigger.start().await }
    });

    if wait_for_shutdown(&mut handle, tokio::signal::ctrl_c()).await? {
        tracing::info!("Shutdown requested");
        trigger.stop().await;
        handle.await.context("Trigger task panicked")??;
    }

    drop(trigger);
    let _ = printer.await;

    Ok(())
}

/// Wait for `shutdown`, or for the trigger loop to end on its own
///
/// Returns `true` when shutdown was requested and the loop still has to be
/// stopped. A loop that ends with an error surfaces that error immediately.
async fn wait_for_shutdown<F>(
    handle: &mut JoinHandle<SchedulerResult<()>>,
    shutdown: F,
) -> Result<bool>
where
    F: Future<Output = std::io::Result<()>>,
{
    tokio::select! {
        signal = shutdown => {
            signal.context("Failed to listen for shutdown signal")?;
            Ok(true)
        }
        finished = handle => {
            finished
                .context("Trigger task panicked")?
                .map_err(classified)
                .context("Rotation trigger stopped")?;
            tracing::warn!("Rotation trigger ended without a shutdown request");
            Ok(false)
        }
    }
}

async fn print_events(mut events: broadcast::Receiver<TriggerEvent>) {
    loop {
        match events.recv().await {
            Ok(TriggerEvent::Armed {
                next_fire,
                executes,
                ..
            }) => {
                let when = format_local(&next_fire);
                if executes {
                    println!("Next rotation: {when}");
                } else {
                    println!("Next fire: {when} (odd ISO week, will be skipped)");
                }
            }
            Ok(TriggerEvent::CycleFinished { result, .. }) => {
                println!("{}\n", result.report);
            }
            Ok(TriggerEvent::TickSkipped { missed, .. }) => {
                println!("Cycle overran {missed} scheduled fire(s); they were skipped");
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Event printer lagged behind");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn once(config: Config) -> Result<()> {
    let mut rotation = build_rotation(&config)?;

    let result = rotation.run_cycle().await;
    println!("{}", result.report);

    if result.outcome.is_failure() {
        match result.outcome.identity() {
            Some(identity) => anyhow::bail!("Banner rotation cycle failed for {identity}"),
            None => anyhow::bail!("Banner rotation cycle failed"),
        }
    }
    Ok(())
}

fn scan(config: Config) -> Result<()> {
    config.validate()?;
    let (_, catalog) = reconcile(&config)?;
    print_banners(&catalog);
    Ok(())
}

fn status(config: Config) -> Result<()> {
    config.validate()?;
    let mode = config.schedule_mode()?;
    let (_, catalog) = reconcile(&config)?;

    let total = total_weight(catalog.len());
    println!("Lottery order ({} banners, total weight {total})", catalog.len());
    println!("{:-<72}", "");
    for banner in weighted_order(&catalog) {
        println!(
            "{:>4}  {:>6.2}%  {:<20}  {}",
            banner.weight,
            banner.probability(total) * 100.0,
            format_last_used(banner.entry.last_used_at),
            banner.entry.identity
        );
    }

    println!();
    print_upcoming(mode, &Local::now());
    Ok(())
}

fn print_upcoming<Tz: TimeZone>(mode: ScheduleMode, now: &DateTime<Tz>)
where
    Tz::Offset: std::fmt::Display,
{
    println!("Schedule: {mode} ({})", mode.description());
    for fire in mode.upcoming_fires(now, STATUS_UPCOMING) {
        let action = if mode.executes_on(fire.date_naive()) {
            "publish"
        } else {
            "skip"
        };
        println!("  {}  {action}", fire.format("%Y-%m-%d %H:%M %Z"));
    }
}

fn print_banners(catalog: &Catalog) {
    println!("Found {} banner(s):", catalog.len());
    for entry in catalog {
        println!(
            "  - {} (last used: {})",
            entry.identity,
            format_last_used(entry.last_used_at)
        );
    }
}

fn format_last_used(timestamp: i64) -> String {
    if timestamp == 0 {
        return "never".to_string();
    }
    Utc.timestamp_opt(timestamp, 0)
        .single()
        .map(|t| format_local(&t))
        .unwrap_or_else(|| timestamp.to_string())
}

fn format_local(time: &DateTime<Utc>) -> String {
    time.with_timezone(&Local)
        .format("%Y-%m-%d %H:%M")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use skybanner::scheduler::SchedulerError;
    use std::time::Duration;

    #[tokio::test]
    async fn test_dead_trigger_loop_surfaces_immediately() {
        let mut handle = tokio::spawn(async {
            Err(SchedulerError::NoUpcomingFire {
                mode: "monthly".into(),
            })
        });

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            wait_for_shutdown(&mut handle, std::future::pending()),
        )
        .await
        .unwrap();

        let err = result.unwrap_err();
        assert!(format!("{err:#}").contains("No upcoming fire time for monthly"));
    }

    #[tokio::test]
    async fn test_shutdown_request_leaves_loop_to_stop() {
        let mut handle = tokio::spawn(async {
            std::future::pending::<()>().await;
            Ok(())
        });

        let stop_requested = wait_for_shutdown(&mut handle, async { Ok(()) })
            .await
            .unwrap();

        assert!(stop_requested);
        assert!(!handle.is_finished());
        handle.abort();
    }
}
