mod codec;
mod config;
mod error;
mod ipc;
mod reports;
mod seed;
mod session;
mod store;
mod table;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::config::{Config, StoreKind};

/// Gradebook sidecar: newline-delimited JSON requests on stdin, responses on stdout.
#[derive(Parser, Debug)]
#[command(name = "gradebookd", version, about)]
struct Cli {
    /// TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed CSV used when the store is empty
    #[arg(long)]
    seed: Option<PathBuf>,

    /// Storage backend: memory or sqlite
    #[arg(long, value_parser = parse_store_kind)]
    store: Option<StoreKind>,

    /// Directory for the sqlite store
    #[arg(long)]
    workspace: Option<PathBuf>,

    /// Storage slot key
    #[arg(long)]
    slot: Option<String>,

    /// Seed file delimiter
    #[arg(long)]
    delimiter: Option<char>,
}

fn parse_store_kind(s: &str) -> Result<StoreKind, String> {
    match s.to_ascii_lowercase().as_str() {
        "memory" => Ok(StoreKind::Memory),
        "sqlite" => Ok(StoreKind::Sqlite),
        other => Err(format!("unknown store '{other}', expected memory or sqlite")),
    }
}

fn build_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut cfg = Config::load(cli.config.as_deref())?;
    if let Some(seed) = &cli.seed {
        cfg.seed_path = seed.clone();
    }
    if let Some(kind) = cli.store {
        cfg.store.kind = kind;
    }
    if let Some(ws) = &cli.workspace {
        cfg.store.workspace = Some(ws.clone());
    }
    if let Some(slot) = &cli.slot {
        cfg.store.slot_key = slot.clone();
    }
    if let Some(d) = cli.delimiter {
        cfg.delimiter = d;
    }
    cfg.validate().context("invalid configuration")?;
    Ok(cfg)
}

fn main() -> anyhow::Result<()> {
    // stdout is the IPC channel; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gradebookd=info")),
        )
        .with_writer(io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();
    let config = build_config(&cli)?;
    tracing::info!(
        seed = %config.seed_path.display(),
        store = config.store.kind.as_str(),
        "gradebookd starting"
    );

    let mut state = ipc::AppState::new(config);

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id; answer with an empty one.
                let _ = writeln!(stdout, "{}", ipc::err("", "bad_json", e.to_string(), None));
                let _ = stdout.flush();
                continue;
            }
        };

        tracing::debug!(id = %req.id, method = %req.method, "request");
        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }

    tracing::info!("stdin closed, shutting down");
    Ok(())
}
