use std::path::{Path, PathBuf};

use aprwatch_common::Target;
use tracing::{info, warn};
use url::Url;

use crate::browser::{BrowserSession, PageHandle};
use crate::locator::{DomLocator, readiness_selector};
use crate::navigator::PageNavigator;
use crate::percent::parse_percentage;

/// Value written for a target whose APR could not be determined.
pub const SENTINEL: f64 = 0.0;

/// Why a farm's APR could not be read.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FarmFailure {
    #[error("navigation failed: {0}")]
    Navigation(String),
    #[error("`{selector}` did not appear within {timeout_ms} ms")]
    NotReady { selector: String, timeout_ms: u64 },
    #[error("no visible farm panel with an APR label")]
    NodeNotFound,
    #[error("no percentage in {text:?}")]
    Unparsable { text: String },
    #[error("negative percentage {value}")]
    OutOfRange { value: f64 },
    #[error("DOM query failed: {0}")]
    Dom(String),
}

/// Either the extracted percentage or the reason it is missing.
pub type FarmOutcome = Result<f64, FarmFailure>;

/// Collapse an outcome to the number stored in the output artifact.
pub fn sentinel(outcome: &FarmOutcome) -> f64 {
    outcome.as_ref().map_or(SENTINEL, |v| *v)
}

/// Reads one farm's APR from its rendered page.
pub struct FarmExtractor {
    base_url: Url,
    navigator: PageNavigator,
    locator: DomLocator,
    screenshot_path: PathBuf,
}

impl FarmExtractor {
    pub fn new(
        base_url: Url,
        navigator: PageNavigator,
        locator: DomLocator,
        screenshot_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            base_url,
            navigator,
            locator,
            screenshot_path: screenshot_path.into(),
        }
    }

    pub fn screenshot_path(&self) -> &Path {
        &self.screenshot_path
    }

    /// Extract `target`'s APR on a fresh page of `session`.
    ///
    /// Every failure is contained here. When a page was opened, a failed
    /// extraction leaves one diagnostic screenshot behind.
    pub async fn extract(&self, session: &mut dyn BrowserSession, target: &Target) -> FarmOutcome {
        let url = target.url(&self.base_url).map_err(|error| {
            warn!(target: "scrape.farm", target_id = %target.id, base_url = %self.base_url, %error, "cannot build target url");
            FarmFailure::Navigation(error.to_string())
        })?;
        let page = self
            .navigator
            .open(session, &url, &target.id)
            .await
            .map_err(|e| FarmFailure::Navigation(e.to_string()))?;

        let outcome = self.read(page.as_ref(), target).await;
        match &outcome {
            Ok(value) => {
                info!(target: "scrape.farm", target_id = %target.id, field = %target.output_field, value, "farm apr read");
            }
            Err(failure) => {
                warn!(target: "scrape.farm", target_id = %target.id, %url, error = %failure, "farm extraction failed");
                self.capture(page.as_ref(), target).await;
            }
        }

        if let Err(error) = page.close().await {
            warn!(target: "scrape.farm", target_id = %target.id, %error, "failed to close page");
        }
        outcome
    }

    async fn read(&self, page: &dyn PageHandle, target: &Target) -> FarmOutcome {
        let addressing = target.addressing();
        let ready = target
            .ready_selector
            .clone()
            .unwrap_or_else(|| readiness_selector(&addressing));

        if !self.navigator.wait_ready(page, &ready, &target.id).await {
            return Err(FarmFailure::NotReady {
                selector: ready,
                timeout_ms: self.navigator.ready_timeout().as_millis() as u64,
            });
        }

        let node = self
            .locator
            .locate(page, &addressing)
            .await
            .map_err(|e| FarmFailure::Dom(e.to_string()))?
            .ok_or(FarmFailure::NodeNotFound)?;
        let text = node
            .inner_text()
            .await
            .map_err(|e| FarmFailure::Dom(e.to_string()))?;

        match parse_percentage(&text) {
            Some(value) if value < 0.0 => Err(FarmFailure::OutOfRange { value }),
            Some(value) => Ok(value),
            None => Err(FarmFailure::Unparsable { text }),
        }
    }

    async fn capture(&self, page: &dyn PageHandle, target: &Target) {
        let path = &self.screenshot_path;
        let png = match page.screenshot().await {
            Ok(png) => png,
            Err(error) => {
                warn!(target: "scrape.farm", target_id = %target.id, %error, "screenshot failed");
                return;
            }
        };
        match tokio::fs::write(path, png).await {
            Ok(()) => {
                info!(target: "scrape.farm", target_id = %target.id, path = %path.display(), "saved diagnostic screenshot");
            }
            Err(error) => {
                warn!(target: "scrape.farm", target_id = %target.id, path = %path.display(), %error, "failed to save screenshot");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_collapses_failures_to_zero() {
        assert_eq!(sentinel(&Ok(12.5)), 12.5);
        assert_eq!(sentinel(&Err(FarmFailure::NodeNotFound)), SENTINEL);
        assert_eq!(
            sentinel(&Err(FarmFailure::Unparsable { text: "—".into() })),
            0.0
        );
    }

    #[test]
    fn failures_render_their_context() {
        let err = FarmFailure::NotReady {
            selector: r#"div[id="535"]"#.into(),
            timeout_ms: 20_000,
        };
        assert_eq!(
            err.to_string(),
            r#"`div[id="535"]` did not appear within 20000 ms"#
        );
    }
}
