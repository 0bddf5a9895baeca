//! Evidence logger CLI
//!
//! Usage:
//!   evidence-logger serve  [--config FILE] [--listen ADDR] [--log-dir DIR]
//!   evidence-logger verify [--date YYYY-MM-DD] [--config FILE] [--log-dir DIR]
//!
//! `serve` runs the HTTP service until Ctrl-C.  `verify` checks one day-file
//! offline and exits non-zero if its chain does not hold.

use std::path::PathBuf;

use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use evidence_chain::verify_day;
use evidence_contracts::{DayId, EvidenceError, EvidenceResult};
use evidence_logger::{http, AppState, LoggerConfig};

// ── CLI definition ────────────────────────────────────────────────────────────

/// Append-only, hash-chained evidence log.
#[derive(Parser)]
#[command(
    name = "evidence-logger",
    about = "Hash-chained, day-rotated evidence log service",
    long_about = "Accepts evidence events over HTTP, appends them to one hash-chained\n\
                  JSON Lines file per UTC day, and verifies those files on demand."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct Common {
    /// TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding the day-files (overrides config and environment).
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP service.
    Serve {
        #[command(flatten)]
        common: Common,

        /// Address to bind, e.g. 127.0.0.1:8000.
        #[arg(long)]
        listen: Option<String>,
    },
    /// Verify one day-file and print the result.
    Verify {
        #[command(flatten)]
        common: Common,

        /// Day to verify; defaults to today (UTC).
        #[arg(long)]
        date: Option<String>,
    },
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    // RUST_LOG=debug logs every appended record.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Serve { common, listen } => run_serve(common, listen).await,
        Command::Verify { common, date } => run_verify(common, date),
    };

    if let Err(e) = result {
        eprintln!("evidence-logger: {}", e);
        std::process::exit(1);
    }
}

fn load_config(common: &Common) -> EvidenceResult<LoggerConfig> {
    let mut cfg = LoggerConfig::load(common.config.as_deref())?;
    if let Some(dir) = &common.log_dir {
        cfg.log_dir = dir.clone();
    }
    Ok(cfg)
}

// ── Subcommands ───────────────────────────────────────────────────────────────

async fn run_serve(common: Common, listen: Option<String>) -> EvidenceResult<()> {
    let mut cfg = load_config(&common)?;
    if let Some(addr) = listen {
        cfg.listen = addr;
    }

    let state = AppState::from_config(&cfg)?;
    let listener = tokio::net::TcpListener::bind(&cfg.listen)
        .await
        .map_err(|e| EvidenceError::Io {
            reason: format!("cannot bind {}: {}", cfg.listen, e),
        })?;

    info!(
        listen = %cfg.listen,
        log_dir = %cfg.log_dir.display(),
        recovery = ?cfg.recovery,
        fsync = cfg.fsync,
        "evidence logger listening"
    );

    http::serve(listener, http::router(state, cfg.max_body_bytes), shutdown_signal()).await?;
    info!("evidence logger stopped");
    Ok(())
}

fn run_verify(common: Common, date: Option<String>) -> EvidenceResult<()> {
    let cfg = load_config(&common)?;
    let day = match date {
        Some(raw) => DayId::parse(&raw)?,
        None => DayId::from_timestamp(Utc::now()),
    };

    let report = verify_day(&cfg.log_dir, day)?;
    println!(
        "{}: OK, {} records verified",
        report.day, report.verified_lines
    );
    if let Some(hash) = &report.terminal_hash {
        println!("terminal hash: {}", hash);
    }
    if report.trailing_partial {
        println!("note: file ends in an incomplete line (append in progress?)");
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "cannot listen for Ctrl-C; shutting down");
    }
    info!("shutdown requested");
}
