use std::path::Path;

use anyhow::{Context, Result};
use aprwatch_common::observability::{LogConfig, LogFormat, init_logging};
use aprwatch_config::{AprwatchConfig, AprwatchConfigLoader, DEFAULT_CONFIG_FILE};
use clap::Parser;
use cli::Cli;
use tracing::info;

mod cli;
mod run;

fn load_config(cli: &Cli) -> Result<AprwatchConfig> {
    let loader = match &cli.config {
        Some(path) => AprwatchConfigLoader::new().with_file(path),
        None => AprwatchConfigLoader::new().with_optional_file(Path::new(DEFAULT_CONFIG_FILE)),
    };
    let mut cfg = loader.load().context("loading configuration")?;
    if cli.headed() {
        cfg.browser.headless = false;
    }
    Ok(cfg)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_path = init_logging(LogConfig {
        format: if cli.log_json {
            LogFormat::Json
        } else {
            LogFormat::Text
        },
        ..LogConfig::default()
    })?;

    let cfg = load_config(&cli)?;
    info!(
        log = %log_path.display(),
        headless = cfg.browser.headless,
        targets = cfg.farms.targets.len(),
        pools = cfg.feed.mappings.len(),
        "aprwatch starting"
    );

    run::run(&cli, &cfg).await
}
