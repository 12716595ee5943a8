//! Agewatch CLI
//!
//! Drives the aged-file tracking engine as a polling loop:
//! - Validates paths up front (fatal before the loop ever starts)
//! - Runs an immediate first detection cycle, then sleeps between cycles
//! - Reconciles journal + mirror on a configurable cadence
//! - Shuts down cooperatively on SIGINT/SIGTERM between cycles

use agewatch_engine::{AgeWatchEngine, EngineConfig};
use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

mod logging;

#[derive(Parser)]
#[command(name = "agewatch")]
#[command(
    author,
    version,
    about = "Watch a directory tree and journal files that outlive an age threshold"
)]
struct Cli {
    /// Directory tree to watch.
    #[arg(short = 'd', long = "directory", value_name = "DIR")]
    directory: PathBuf,

    /// Journal store (one `<record_id>, <path>` line per aged file).
    #[arg(short = 'j', long = "journal", value_name = "FILE")]
    journal: PathBuf,

    /// Directory receiving one placeholder file per journal record.
    #[arg(short = 'e', long = "expired-dir", value_name = "DIR")]
    expired_dir: PathBuf,

    /// Newline-delimited list of paths to exclude; re-read every cycle,
    /// directories exclude everything beneath them.
    #[arg(short = 'x', long = "exclude-file", value_name = "FILE")]
    exclude_file: Option<PathBuf>,

    /// Age threshold in seconds (strictly greater-than).
    #[arg(short = 't', long, default_value_t = 10)]
    threshold: u64,

    /// Seconds to sleep between cycles.
    #[arg(short = 'i', long, default_value_t = 60)]
    interval: u64,

    /// Also append log lines to this file.
    #[arg(short = 'l', long = "log-file", value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Run the reconciliation sweep every N cycles.
    #[arg(long, default_value_t = 1, value_name = "N")]
    reconcile_every: u64,

    /// Run one detection + reconciliation pass, print a JSON summary,
    /// and exit.
    #[arg(long)]
    once: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_file.as_deref())?;

    let config = EngineConfig {
        watch_root: cli.directory.clone(),
        journal_path: cli.journal.clone(),
        mirror_dir: cli.expired_dir.clone(),
        exclude_file: cli.exclude_file.clone(),
        threshold_secs: cli.threshold,
        poll_interval_secs: cli.interval,
    };

    let mut engine = AgeWatchEngine::open(config).context("engine startup failed")?;

    println!(
        "{} watching {} (threshold {}s, interval {}s)",
        "agewatch".green().bold(),
        cli.directory.display().to_string().cyan(),
        cli.threshold,
        cli.interval
    );
    println!(
        "  journal: {}",
        cli.journal.display().to_string().yellow()
    );
    println!(
        "  expired: {}",
        cli.expired_dir.display().to_string().yellow()
    );
    if let Some(exclude) = &cli.exclude_file {
        println!("  exclude: {}", exclude.display().to_string().yellow());
    }

    if cli.once {
        let cycle = engine.run_cycle();
        let sweep = engine.reconcile_cycle()?;
        println!(
            "{}",
            serde_json::json!({ "cycle": cycle, "reconcile": sweep })
        );
        return Ok(());
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    for signal in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
        signal_hook::flag::register(signal, Arc::clone(&shutdown))
            .context("cannot register shutdown signal")?;
    }

    let reconcile_every = cli.reconcile_every.max(1);
    let mut cycle_count: u64 = 0;

    // Immediate first pass, then the sleep loop.
    while !shutdown.load(Ordering::Relaxed) {
        cycle_count += 1;
        let report = engine.run_cycle();
        if report.journaled > 0 || report.failed > 0 {
            tracing::info!(
                cycle = cycle_count,
                journaled = report.journaled,
                failed = report.failed,
                "detection cycle finished"
            );
        }

        if cycle_count % reconcile_every == 0 {
            match engine.reconcile_cycle() {
                Ok(sweep) if sweep.records_removed > 0 || sweep.placeholders_removed > 0 => {
                    tracing::info!(
                        records_removed = sweep.records_removed,
                        placeholders_removed = sweep.placeholders_removed,
                        "reconciliation finished"
                    );
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(%err, "reconciliation failed; retrying next cadence");
                }
            }
        }

        sleep_interruptibly(cli.interval, &shutdown);
    }

    println!("{} stopped", "agewatch".green().bold());
    Ok(())
}

/// Sleep for `secs`, waking early when the shutdown flag is raised.
/// One-second granularity keeps Ctrl-C responsive without a timer
/// thread.
fn sleep_interruptibly(secs: u64, shutdown: &AtomicBool) {
    for _ in 0..secs {
        if shutdown.load(Ordering::Relaxed) {
            return;
        }
        thread::sleep(Duration::from_secs(1));
    }
}
