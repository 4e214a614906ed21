use crate::browser::{
    launch::{chrome_capabilities, LaunchOptions},
    page::AprPage,
};
use anyhow::{Context, Result};
use fantoccini::{wd::WindowHandle, Client, ClientBuilder};
use tracing::{debug, warn};

/// Thin wrapper around a `fantoccini` WebDriver session.
///
/// Every navigation gets its own window; the window the session started with
/// stays open as the place to return to once a page is closed.
pub struct AprDriver {
    pub client: Client,
    home: WindowHandle,
}

impl AprDriver {
    /// Connect to a running WebDriver service (chromedriver by default).
    pub async fn connect(options: &LaunchOptions) -> Result<Self> {
        let client = ClientBuilder::native()
            .capabilities(chrome_capabilities(options))
            .connect(&options.webdriver_url)
            .await
            .with_context(|| format!("failed to connect to WebDriver at {}", options.webdriver_url))?;

        let home = client
            .window()
            .await
            .context("failed to read the initial window handle")?;

        debug!(
            target: "browser.session",
            webdriver_url = %options.webdriver_url,
            headless = options.headless,
            "webdriver session started"
        );
        Ok(Self { client, home })
    }

    /// Open a fresh window, navigate it to `url` and return it as a page.
    pub async fn open_page(&mut self, url: &str) -> Result<AprPage> {
        let window = self
            .client
            .new_window(true)
            .await
            .context("failed to open a new window")?;
        self.client
            .switch_to_window(window.handle.clone())
            .await
            .context("failed to switch to the new window")?;

        let page = AprPage::new(self.client.clone(), window.handle, self.home.clone());
        if let Err(err) = page.goto(url).await {
            if let Err(close_err) = page.close().await {
                warn!(target: "browser.session", error = %close_err, "failed to close window after navigation error");
            }
            return Err(err);
        }
        Ok(page)
    }

    /// Close the underlying browser session.
    pub async fn close(self) -> Result<()> {
        self.client.close().await?;
        debug!(target: "browser.session", "webdriver session closed");
        Ok(())
    }
}
