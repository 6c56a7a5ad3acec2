//! ktp-scan - continuous ID card scanning
//!
//! Reads an Indonesian KTP from camera frames, extracts the visitor record and
//! logs the visit with the visit service.

mod app;
mod capture;
mod config;
mod error;
mod extract;
mod feedback;
mod scan;
mod submit;
mod vision;

use anyhow::{bail, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::app::{apply_edits, record_summary, KtpScannerApp};
use crate::capture::{RawFrame, SnapshotFileSource};
use crate::config::AppConfig;
use crate::extract::{ExtractedRecord, RecordEdit};
use crate::scan::ScanOutcome;

/// ktp-scan - ID card capture and visit logging
#[derive(Parser, Debug)]
#[command(name = "ktp-scan", version)]
#[command(about = "Scan an Indonesian ID card (KTP) and record the visit")]
struct Args {
    /// Configuration file (defaults to the per-user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan continuously until a card number is read
    Scan {
        /// Snapshot file refreshed by the camera
        #[arg(short, long)]
        source: Option<PathBuf>,

        /// Save the matching frame to this file
        #[arg(long)]
        save_frame: Option<PathBuf>,

        #[command(flatten)]
        visit: VisitArgs,
    },
    /// Read a single captured or uploaded image
    Read {
        /// Image file, or a `data:image/...;base64,` URL
        image: String,

        #[command(flatten)]
        visit: VisitArgs,
    },
    /// Submit a previously read record
    Submit {
        /// Record JSON file, or `-` for stdin
        #[arg(short, long)]
        record: PathBuf,

        #[command(flatten)]
        visit: VisitArgs,
    },
    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(ClapArgs, Debug)]
struct VisitArgs {
    /// Visit purpose; when given, the record is submitted
    #[arg(short, long)]
    purpose: Option<String>,

    /// Correct a field before submitting (e.g. `--set nama="BUDI SANTOSO"`)
    #[arg(long = "set", value_name = "FIELD=VALUE")]
    edits: Vec<RecordEdit>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout is reserved for record JSON
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    let config_path = match args.config {
        Some(path) => path,
        None => config::default_config_path()?,
    };

    if let Command::Init { force } = args.command {
        return init_config(&config_path, force);
    }

    let app = KtpScannerApp::new(load_or_create_config(&config_path));

    match args.command {
        Command::Scan {
            source,
            save_frame,
            visit,
        } => run_scan(&app, source, save_frame, visit).await,
        Command::Read { image, visit } => run_read(&app, &image, visit).await,
        Command::Submit { record, visit } => run_submit(&app, &record, visit).await,
        Command::Init { .. } => Ok(()),
    }
}

/// Load configuration from file or fall back to defaults
fn load_or_create_config(path: &Path) -> AppConfig {
    if path.exists() {
        match config::load_config(path) {
            Ok(config) => {
                info!("Loaded configuration from {:?}", path);
                return config;
            }
            Err(e) => warn!("{:#}, using defaults", e),
        }
    }
    info!("Using default configuration");
    AppConfig::default()
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    config::save_config(&AppConfig::default(), path)?;
    info!("Wrote default configuration to {:?}", path);
    Ok(())
}

async fn run_scan(
    app: &KtpScannerApp,
    source: Option<PathBuf>,
    save_frame: Option<PathBuf>,
    visit: VisitArgs,
) -> Result<()> {
    let Some(source) = source.or_else(|| app.config().capture.snapshot_path.clone()) else {
        bail!("No frame source: pass --source or set capture.snapshot_path");
    };
    app.check_language().await;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let source = SnapshotFileSource::new(source);
    info!("Watching {:?} for frames (Ctrl-C to stop)", source.path());
    let found = match app.scan(source, cancel).await {
        ScanOutcome::Matched(found) => found,
        ScanOutcome::Stopped => {
            info!("Scan cancelled");
            return Ok(());
        }
    };

    debug!("Matching text:\n{}", found.text.text());
    if let Some(path) = save_frame {
        found.frame.save(&path)?;
        info!("Saved matching frame to {:?}", path);
    }
    finish_record(app, found.record, visit).await
}

async fn run_read(app: &KtpScannerApp, image: &str, visit: VisitArgs) -> Result<()> {
    let frame = if image.starts_with("data:") {
        RawFrame::from_data_url(image)?
    } else {
        let bytes = std::fs::read(image).with_context(|| format!("failed to read {image}"))?;
        RawFrame::from_encoded(bytes)
    };
    app.check_language().await;

    let output = app.read(frame).await?;
    finish_record(app, output.record, visit).await
}

async fn run_submit(app: &KtpScannerApp, path: &Path, visit: VisitArgs) -> Result<()> {
    let content = if path == Path::new("-") {
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .context("failed to read record from stdin")?;
        content
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?
    };
    let record: ExtractedRecord =
        serde_json::from_str(&content).context("record is not valid JSON")?;

    if visit.purpose.is_none() {
        bail!("--purpose is required to submit");
    }
    finish_record(app, record, visit).await
}

/// Apply edits, print the record and submit it when a purpose is given. A
/// failed submission leaves the printed record for a retry with `submit`.
async fn finish_record(
    app: &KtpScannerApp,
    mut record: ExtractedRecord,
    visit: VisitArgs,
) -> Result<()> {
    apply_edits(&mut record, &visit.edits);
    eprintln!("{}", record_summary(&record));
    println!("{}", serde_json::to_string_pretty(&record)?);

    if let Some(purpose) = visit.purpose {
        let message = app.submit(&record, &purpose).await?;
        eprintln!("{message}");
    }
    Ok(())
}
