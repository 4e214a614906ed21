use std::path::Path;

use aprwatch_config::{AprwatchConfig, BrowserConfig};
use aprwatch_drivers::browser::launch::LaunchOptions;
use aprwatch_scrape::browser::FantocciniLauncher;
use aprwatch_scrape::{
    DomLocator, FarmExtractor, FeedExtractor, PageNavigator, ResultRecord, ResultWriter, run_farms,
    run_feed,
};
use anyhow::Result;
use tracing::{error, info, warn};

use crate::cli::{Cli, Pipeline};

pub fn launch_options(browser: &BrowserConfig) -> LaunchOptions {
    LaunchOptions {
        webdriver_url: browser.webdriver_url.clone(),
        headless: browser.headless,
        window: (browser.window_width, browser.window_height),
        user_agent: browser.user_agent.clone(),
    }
}

/// Run the selected pipelines concurrently and write their artifacts.
///
/// Pipeline failures are logged and leave that pipeline's artifact untouched;
/// only configuration problems are returned.
pub async fn run(cli: &Cli, cfg: &AprwatchConfig) -> Result<()> {
    let farms = async {
        if cli.runs(Pipeline::Farms) {
            farm_run(cfg).await
        } else {
            Ok(())
        }
    };
    let feed = async {
        if cli.runs(Pipeline::Feed) {
            feed_run(cfg).await
        } else {
            Ok(())
        }
    };

    let (farms, feed) = tokio::join!(farms, feed);
    farms?;
    feed?;
    Ok(())
}

async fn farm_run(cfg: &AprwatchConfig) -> Result<()> {
    let extractor = FarmExtractor::new(
        cfg.farms.base_url()?,
        PageNavigator::new(cfg.browser.ready_timeout()),
        DomLocator::new(cfg.farms.label_selector.clone()),
        cfg.farms.screenshot.clone(),
    );
    let launcher = FantocciniLauncher::new(launch_options(&cfg.browser));

    match run_farms(&launcher, &extractor, &cfg.farms.targets).await {
        Ok(report) => {
            if report.failures() > 0 {
                warn!(
                    failures = report.failures(),
                    screenshot = %extractor.screenshot_path().display(),
                    "some farm targets fell back to 0"
                );
            }
            write(&cfg.farms.output, &report.record).await;
        }
        Err(e) => error!(error = %e, "farm pipeline aborted"),
    }
    Ok(())
}

async fn feed_run(cfg: &AprwatchConfig) -> Result<()> {
    let extractor = FeedExtractor::new(&cfg.feed.url()?, cfg.feed.timeout())?;
    match run_feed(&extractor, &cfg.feed.mappings).await {
        Ok(record) => write(&cfg.feed.output, &record).await,
        Err(e) => error!(error = %e, "feed pipeline aborted"),
    }
    Ok(())
}

async fn write(path: &Path, record: &ResultRecord) {
    match ResultWriter::write(path, record).await {
        Ok(()) => info!(path = %path.display(), "results saved"),
        Err(e) => error!(path = %path.display(), error = %e, "failed to save results"),
    }
}
