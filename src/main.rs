//! Replay tool for the read-along highlighter.
//!
//! Runs a scripted scenario (document tree plus button, host and engine
//! events) through the narration controller with a recording speech engine
//! and prints a JSON report of what was spoken, what was announced and what
//! the document looks like afterwards.

mod engine;
mod scenario;

use crate::scenario::{load_scenario, run_scenario};
use anyhow::{Context, Result, anyhow};
use readalong_core::config::load_config;
use std::env;
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*, reload};

type ReloadHandle = reload::Handle<EnvFilter, tracing_subscriber::Registry>;

const DEFAULT_CONFIG_PATH: &str = "conf/config.toml";

struct Args {
    scenario: PathBuf,
    config: PathBuf,
}

fn main() {
    let reload_handle = init_tracing();
    if let Err(err) = run(&reload_handle) {
        error!("{err:?}");
        std::process::exit(1);
    }
}

fn run(reload_handle: &ReloadHandle) -> Result<()> {
    let args = parse_args()?;
    let config = load_config(&args.config);
    set_log_level(reload_handle, config.log_level.as_filter_str());
    info!(
        scenario = %args.scenario.display(),
        level = %config.log_level,
        separator = ?config.separator,
        unit = %config.offset_unit,
        "Starting replay"
    );

    let scenario = load_scenario(&args.scenario)?;
    let report = run_scenario(scenario, &config)?;
    info!(
        spoken = report.spoken.len(),
        notices = report.notices.len(),
        markers = report.markers,
        "Replay finished"
    );
    let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
    println!("{json}");
    Ok(())
}

fn parse_args() -> Result<Args> {
    let mut args = env::args().skip(1);
    let scenario = args
        .next()
        .ok_or_else(|| anyhow!("Usage: readalong <scenario.json> [config.toml]"))?;
    let scenario = PathBuf::from(scenario);
    if !scenario.exists() {
        return Err(anyhow!("File not found: {}", scenario.display()));
    }
    let config = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    Ok(Args { scenario, config })
}

fn init_tracing() -> ReloadHandle {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let (filter_layer, handle) = reload::Layer::new(env_filter);
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_filter(filter_layer),
        )
        .init();
    warn!("Logging initialized; override level with config.log_level or RUST_LOG");
    handle
}

fn set_log_level(handle: &ReloadHandle, level: &str) {
    let parsed = EnvFilter::builder()
        .parse(level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    if let Err(err) = handle.modify(|filter| *filter = parsed.clone()) {
        warn!(%level, "Failed to update log level from config: {err}");
    } else {
        info!(%level, "Applied log level from config");
    }
}
