//! Whole-run pipelines.
//!
//! `run_farms` owns the browser session for the run: it is launched once,
//! shared by every target in order, and closed exactly once, even when an
//! extraction panics. `run_feed` performs one fetch and transforms it.

use std::panic::AssertUnwindSafe;

use aprwatch_common::{AprError, FeedMapping, Target};
use futures::FutureExt;
use serde_json::Map;
use tracing::{error, info, warn};

use crate::browser::{BrowserSession, SessionLauncher};
use crate::farm::{FarmExtractor, FarmOutcome, sentinel};
use crate::feed::{FeedError, FeedExtractor};
use crate::record::{ResultRecord, json_number};

/// Farm artifact contents plus the typed outcome behind each field.
#[derive(Debug)]
pub struct FarmReport {
    pub record: ResultRecord,
    pub outcomes: Vec<(String, FarmOutcome)>,
}

impl FarmReport {
    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|(_, o)| o.is_err()).count()
    }
}

/// Extract every target, in order, on one browser session.
pub async fn run_farms(
    launcher: &dyn SessionLauncher,
    extractor: &FarmExtractor,
    targets: &[Target],
) -> aprwatch_common::Result<FarmReport> {
    let mut session = launcher.launch().await.map_err(|e| {
        error!(target: "scrape.pipeline", error = %e, "browser session failed to start");
        AprError::SessionLaunch(e.to_string())
    })?;
    info!(target: "scrape.pipeline", targets = targets.len(), "browser session started");

    let run = AssertUnwindSafe(extract_all(session.as_mut(), extractor, targets)).catch_unwind();
    let result = run.await;

    if let Err(e) = session.close().await {
        warn!(target: "scrape.pipeline", error = %e, "failed to close browser session");
    }

    let outcomes = match result {
        Ok(outcomes) => outcomes,
        Err(panic) => std::panic::resume_unwind(panic),
    };

    let mut fields = Map::new();
    for (field, outcome) in &outcomes {
        fields.insert(field.clone(), json_number(sentinel(outcome)));
    }
    let report = FarmReport {
        record: ResultRecord::capture(fields),
        outcomes,
    };
    info!(
        target: "scrape.pipeline",
        targets = targets.len(),
        failures = report.failures(),
        "farm pipeline finished"
    );
    Ok(report)
}

async fn extract_all(
    session: &mut dyn BrowserSession,
    extractor: &FarmExtractor,
    targets: &[Target],
) -> Vec<(String, FarmOutcome)> {
    let mut outcomes = Vec::with_capacity(targets.len());
    for target in targets {
        let outcome = extractor.extract(session, target).await;
        outcomes.push((target.output_field.clone(), outcome));
    }
    outcomes
}

/// Fetch the feed once and collect the configured pools.
pub async fn run_feed(
    extractor: &FeedExtractor,
    mappings: &[FeedMapping],
) -> Result<ResultRecord, FeedError> {
    let records = extractor.fetch_all().await.inspect_err(|e| {
        error!(target: "scrape.pipeline", error = %e, "feed pipeline aborted");
    })?;

    let mut fields = Map::new();
    for mapping in mappings {
        FeedExtractor::extract_one(&records, mapping.pool_id, &mapping.name, &mut fields);
    }
    info!(
        target: "scrape.pipeline",
        pools = mappings.len(),
        found = fields.len() / 2,
        "feed pipeline finished"
    );
    Ok(ResultRecord::capture(fields))
}
