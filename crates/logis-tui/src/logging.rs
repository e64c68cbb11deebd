use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_FILTER: &str = "logis_core=info,logis_tui=info";

fn env_filter(fallback: Option<&str>) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(fallback.unwrap_or(DEFAULT_FILTER)))
}

pub fn default_log_path() -> Result<PathBuf> {
    let data_dir = dirs::data_local_dir()
        .ok_or_else(|| anyhow!("Could not determine local data directory"))?;

    Ok(data_dir.join("logis").join("logis.log"))
}

/// Log to a file. The TUI owns the terminal, so nothing may go to stderr.
pub fn init_file(filter: Option<&str>, path: Option<PathBuf>) -> Result<PathBuf> {
    let path = match path {
        Some(path) => path,
        None => default_log_path()?,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening log file {}", path.display()))?;

    tracing_subscriber::registry()
        .with(env_filter(filter))
        .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        .init();

    Ok(path)
}

/// Log to stderr, for the one-shot subcommands.
pub fn init_stderr(filter: Option<&str>) {
    tracing_subscriber::registry()
        .with(env_filter(filter.or(Some("warn"))))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
