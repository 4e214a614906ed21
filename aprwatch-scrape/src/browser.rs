use std::time::Duration;

use aprwatch_drivers::browser::{
    driver::AprDriver,
    launch::LaunchOptions,
    page::{AprElement, AprPage},
};
use async_trait::async_trait;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BrowserError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("webdriver command failed: {0}")]
    Command(String),
}

impl From<anyhow::Error> for BrowserError {
    fn from(err: anyhow::Error) -> Self {
        Self::Command(format!("{err:#}"))
    }
}

/// A DOM node inside a rendered page.
#[async_trait]
pub trait NodeHandle: Send + Sync {
    async fn attribute(&self, name: &str) -> Result<Option<String>, BrowserError>;

    /// Descendants matching `selector`, in document order.
    async fn find_all(&self, selector: &str) -> Result<Vec<Box<dyn NodeHandle>>, BrowserError>;

    /// Rendered text of the node.
    async fn inner_text(&self) -> Result<String, BrowserError>;
}

/// One navigated page. Pages are never reused across navigations.
#[async_trait]
pub trait PageHandle: Send + Sync {
    /// Resolve once an element matching `selector` exists, or fail after `timeout`.
    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<(), BrowserError>;

    /// Elements matching `selector`, in document order.
    async fn find_all(&self, selector: &str) -> Result<Vec<Box<dyn NodeHandle>>, BrowserError>;

    /// PNG capture of the whole page.
    async fn screenshot(&self) -> Result<Vec<u8>, BrowserError>;

    async fn close(self: Box<Self>) -> Result<(), BrowserError>;
}

/// A running browser owned by a single run.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Open a fresh page navigated to `url`.
    async fn open_page(&mut self, url: &Url) -> Result<Box<dyn PageHandle>, BrowserError>;

    async fn close(self: Box<Self>) -> Result<(), BrowserError>;
}

/// Starts browser sessions.
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, BrowserError>;
}

/// Launcher backed by the fantoccini WebDriver client.
pub struct FantocciniLauncher {
    options: LaunchOptions,
}

impl FantocciniLauncher {
    pub fn new(options: LaunchOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl SessionLauncher for FantocciniLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, BrowserError> {
        let driver = AprDriver::connect(&self.options).await?;
        Ok(Box::new(driver))
    }
}

#[async_trait]
impl BrowserSession for AprDriver {
    async fn open_page(&mut self, url: &Url) -> Result<Box<dyn PageHandle>, BrowserError> {
        let page = AprDriver::open_page(self, url.as_str()).await?;
        Ok(Box::new(page))
    }

    async fn close(self: Box<Self>) -> Result<(), BrowserError> {
        AprDriver::close(*self).await?;
        Ok(())
    }
}

#[async_trait]
impl PageHandle for AprPage {
    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<(), BrowserError> {
        AprPage::wait_for(self, selector, timeout).await?;
        Ok(())
    }

    async fn find_all(&self, selector: &str) -> Result<Vec<Box<dyn NodeHandle>>, BrowserError> {
        let elements = self.find_elements(selector).await?;
        Ok(boxed(elements))
    }

    async fn screenshot(&self) -> Result<Vec<u8>, BrowserError> {
        Ok(self.screenshot_full_page().await?)
    }

    async fn close(self: Box<Self>) -> Result<(), BrowserError> {
        AprPage::close(*self).await?;
        Ok(())
    }
}

#[async_trait]
impl NodeHandle for AprElement {
    async fn attribute(&self, name: &str) -> Result<Option<String>, BrowserError> {
        Ok(self.get_attribute(name).await?)
    }

    async fn find_all(&self, selector: &str) -> Result<Vec<Box<dyn NodeHandle>>, BrowserError> {
        let elements = self.find_elements(selector).await?;
        Ok(boxed(elements))
    }

    async fn inner_text(&self) -> Result<String, BrowserError> {
        Ok(self.get_inner_text().await?)
    }
}

fn boxed(elements: Vec<AprElement>) -> Vec<Box<dyn NodeHandle>> {
    elements
        .into_iter()
        .map(|e| Box::new(e) as Box<dyn NodeHandle>)
        .collect()
}
