use std::{fs::File, path::PathBuf, sync::Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{ChatOptions, ResourceClient};
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod app;
mod config;
mod prompt;

use app::App;
use config::{load_settings, normalize_host, Settings};
use prompt::Prompt;

#[derive(Parser, Debug)]
#[command(about = "Terminal client for the thread chat service")]
struct Args {
    /// Service address, `http://` is added when no scheme is given.
    #[arg(long)]
    host: Option<String>,
    #[arg(long, default_value = "chat-client.toml")]
    config: PathBuf,
    #[arg(long)]
    poll_interval_ms: Option<u64>,
    /// Write logs here instead of stderr.
    #[arg(long)]
    log_file: Option<String>,
}

fn apply_args(settings: &mut Settings, args: &Args) {
    if let Some(host) = &args.host {
        settings.host = normalize_host(host);
    }
    if let Some(ms) = args.poll_interval_ms {
        settings.poll_interval_ms = ms;
    }
    if let Some(path) = &args.log_file {
        settings.log_file = Some(path.clone());
    }
}

fn init_tracing(settings: &Settings) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_filter))
        .context("invalid log filter")?;

    match &settings.log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create log file '{path}'"))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut settings = load_settings(&args.config)?;
    apply_args(&mut settings, &args);
    init_tracing(&settings)?;

    let client = ResourceClient::new(&settings.host, settings.request_timeout())
        .with_context(|| format!("cannot use host '{}'", settings.host))?;
    info!(host = %settings.host, "terminal: starting");

    let options = ChatOptions {
        poll_interval: settings.poll_interval(),
    };
    let prompt = Prompt::new(BufReader::new(io::stdin()).lines());
    App::new(client, options, prompt).run().await?;

    info!("terminal: bye");
    Ok(())
}
