use std::time::Duration;

use tracing::{debug, warn};
use url::Url;

use crate::browser::{BrowserError, BrowserSession, PageHandle};

/// How long a page gets to render its readiness marker.
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_millis(20_000);

#[derive(Debug, thiserror::Error)]
#[error("failed to open {url}: {source}")]
pub struct NavigationError {
    pub url: Url,
    #[source]
    pub source: BrowserError,
}

/// Opens pages and waits, with a bound, for client-side rendering to finish.
#[derive(Debug, Clone)]
pub struct PageNavigator {
    ready_timeout: Duration,
}

impl Default for PageNavigator {
    fn default() -> Self {
        Self::new(DEFAULT_READY_TIMEOUT)
    }
}

impl PageNavigator {
    pub fn new(ready_timeout: Duration) -> Self {
        Self { ready_timeout }
    }

    pub fn ready_timeout(&self) -> Duration {
        self.ready_timeout
    }

    /// Open a fresh page at `url`.
    pub async fn open(
        &self,
        session: &mut dyn BrowserSession,
        url: &Url,
        target_id: &str,
    ) -> Result<Box<dyn PageHandle>, NavigationError> {
        debug!(target: "scrape.navigator", target_id, %url, "opening page");
        session.open_page(url).await.map_err(|source| {
            warn!(target: "scrape.navigator", target_id, %url, error = %source, "navigation failed");
            NavigationError {
                url: url.clone(),
                source,
            }
        })
    }

    /// Wait for `selector` to appear. Returns `false` on timeout or error.
    ///
    /// The timeout is enforced here as well as handed to the page, so a page
    /// that never answers still releases the run after one timeout.
    pub async fn wait_ready(&self, page: &dyn PageHandle, selector: &str, target_id: &str) -> bool {
        let wait = page.wait_for(selector, self.ready_timeout);
        let result = match tokio::time::timeout(self.ready_timeout, wait).await {
            Ok(result) => result,
            Err(_) => Err(BrowserError::Timeout(self.ready_timeout)),
        };

        match result {
            Ok(()) => {
                debug!(target: "scrape.navigator", target_id, selector, "page ready");
                true
            }
            Err(error) => {
                warn!(
                    target: "scrape.navigator",
                    target_id,
                    selector,
                    timeout_ms = self.ready_timeout.as_millis() as u64,
                    %error,
                    "page did not become ready"
                );
                false
            }
        }
    }
}
