//! Diagnostic tracing setup.
//!
//! The terminal dashboard owns the screen, so in TUI mode traces only go to a file when
//! one is given. Headless modes trace to stderr by default.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVE: &str = "stress_console=info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

pub fn init(log_file: Option<&Path>, headless: bool) -> Result<()> {
    let registry = tracing_subscriber::registry().with(env_filter());

    if let Some(path) = log_file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("open log file {}", path.display()))?;
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
            .try_init()
            .context("install tracing subscriber")?;
    } else if headless {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
            .context("install tracing subscriber")?;
    }
    // TUI without a log file: no subscriber, events are dropped

    Ok(())
}
