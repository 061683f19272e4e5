//! calbridge - device calendar bridge
//!
//! Reads one JSON request per line on stdin and writes one JSON response per
//! line on stdout. Interactive creates answer `pending` at once and
//! `resolved` when the external editor exits. Logs go to stderr.

mod file_store;
mod handlers;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use calbridge_core::accessor::AccessorSlot;
use calbridge_core::interactive::ProcessEditor;
use calbridge_core::protocol::{Request, Response};
use calbridge_core::{CalendarError, CalendarService, Settings};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::file_store::JsonFileStore;

#[derive(Parser)]
#[command(name = "calbridge")]
#[command(about = "Bridge a host application to the device calendar over JSON lines")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ~/.config/calbridge/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Store file, overriding the configured one
    #[arg(long)]
    store: Option<PathBuf>,

    /// Platform API level, overriding the configured one
    #[arg(long)]
    api_level: Option<u32>,
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    }
    .context("Failed to load settings")?;

    if let Some(store) = &cli.store {
        settings.store_path = store.clone();
    }
    if let Some(api_level) = cli.api_level {
        settings.api_level = api_level;
    }
    Ok(settings)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let settings = load_settings(&cli)?;
    let store_path = settings.store_path();
    let store = JsonFileStore::open(&store_path)
        .with_context(|| format!("Failed to open store at {}", store_path.display()))?;

    let slot = AccessorSlot::new(
        settings.capabilities(),
        Arc::new(store),
        settings.accessor_options()?,
    );

    let (completions_tx, mut completions) = mpsc::unbounded_channel();
    let editor = ProcessEditor::new(settings.editor.clone(), Handle::current(), completions_tx);
    let service = CalendarService::new(slot, Arc::new(editor));

    info!(
        store = %store_path.display(),
        api_level = settings.api_level,
        variant = %service.variant(),
        "calbridge ready"
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        let response = tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }

                match serde_json::from_str::<Request>(&line) {
                    Ok(request) => handlers::handle_request(&service, request).await,
                    Err(e) => {
                        warn!(error = %e, "Unparseable request");
                        Response::error(&CalendarError::InvalidRequest(format!(
                            "Failed to parse request: {e}"
                        )))
                    }
                }
            }
            Some(completion) = completions.recv() => {
                handlers::handle_completion(&service, completion).await
            }
        };

        stdout.write_all(response.to_line().as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }

    info!("stdin closed, shutting down");
    Ok(())
}
