use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

const LOG_FILE_NAME: &str = "presenter.log";
const LOG_ENV_VAR: &str = "PRESENTER_LOG";

/// Send tracing output to a log file in `data_dir`; the terminal belongs to
/// the UI. `PRESENTER_LOG` overrides `level`.
pub fn init(data_dir: &Path, level: &str) -> Result<PathBuf> {
    fs::create_dir_all(data_dir).context("failed to create data directory")?;
    let path = data_dir.join(LOG_FILE_NAME);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(build_filter(level))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .with_thread_names(true)
        .try_init()
        .map_err(|err| anyhow::anyhow!(err))
        .context("failed to install log subscriber")?;

    Ok(path)
}

fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(parse_level(level).into())
        .with_env_var(LOG_ENV_VAR)
        .from_env_lossy()
}

fn parse_level(level: &str) -> LevelFilter {
    level.trim().parse().unwrap_or(LevelFilter::INFO)
}
