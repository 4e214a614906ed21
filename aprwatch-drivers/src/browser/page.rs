use anyhow::{Context, Result};
use fantoccini::{elements::Element, wd::WindowHandle, Client, Locator};
use std::time::Duration;
use tracing::debug;

/// Upper bound for the window height used by full-page screenshots.
const MAX_CAPTURE_HEIGHT: u32 = 16_384;

/// One browser window navigated to a single URL.
pub struct AprPage {
    pub(crate) client: Client,
    pub(crate) window: WindowHandle,
    pub(crate) home: WindowHandle,
}

impl AprPage {
    pub(crate) fn new(client: Client, window: WindowHandle, home: WindowHandle) -> Self {
        Self {
            client,
            window,
            home,
        }
    }

    pub(crate) async fn goto(&self, url: &str) -> Result<()> {
        self.client
            .goto(url)
            .await
            .with_context(|| format!("navigation to {url} failed"))
    }

    /// Wait up to `timeout` for an element matching `selector` to appear.
    pub async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<AprElement> {
        let element = self
            .client
            .wait()
            .at_most(timeout)
            .for_element(Locator::Css(selector))
            .await
            .with_context(|| format!("`{selector}` did not appear within {timeout:?}"))?;
        Ok(AprElement::new(element))
    }

    /// Find zero or more elements by CSS selector, in document order.
    pub async fn find_elements(&self, selector: &str) -> Result<Vec<AprElement>> {
        let elements = self.client.find_all(Locator::Css(selector)).await?;
        Ok(elements.into_iter().map(AprElement::new).collect())
    }

    /// PNG capture of the whole document.
    ///
    /// WebDriver only captures the viewport, so the window is stretched to
    /// the document height for the capture and restored afterwards.
    pub async fn screenshot_full_page(&self) -> Result<Vec<u8>> {
        let (width, height) = self.client.get_window_size().await?;
        let doc_height = self
            .client
            .execute(
                "return Math.max(document.body.scrollHeight, document.documentElement.scrollHeight);",
                vec![],
            )
            .await
            .ok()
            .and_then(|v| v.as_u64())
            .map(|h| (h as u32).clamp(1, MAX_CAPTURE_HEIGHT));

        if let Some(h) = doc_height {
            self.client.set_window_size(width as u32, h).await?;
        }
        let png = self.client.screenshot().await;
        if doc_height.is_some() {
            self.client
                .set_window_size(width as u32, height as u32)
                .await?;
        }
        debug!(target: "browser.page", ?doc_height, "captured screenshot");
        png.context("screenshot failed")
    }

    /// Close this window and switch back to the session's initial window.
    pub async fn close(self) -> Result<()> {
        self.client
            .switch_to_window(self.window.clone())
            .await
            .context("failed to focus the page window")?;
        self.client
            .close_window()
            .await
            .context("failed to close window")?;
        self.client
            .switch_to_window(self.home)
            .await
            .context("failed to switch back to the initial window")?;
        Ok(())
    }
}

#[derive(Clone)]
/// A DOM element inside an [`AprPage`].
pub struct AprElement {
    pub element: Element,
}

impl AprElement {
    pub fn new(element: Element) -> Self {
        Self { element }
    }

    /// Find zero or more child elements by CSS selector.
    pub async fn find_elements(&self, selector: &str) -> Result<Vec<AprElement>> {
        let elements = self.element.find_all(Locator::Css(selector)).await?;
        Ok(elements.into_iter().map(AprElement::new).collect())
    }

    /// Read an attribute value.
    pub async fn get_attribute(&self, attribute: &str) -> Result<Option<String>> {
        self.element
            .attr(attribute)
            .await
            .map_err(anyhow::Error::from)
    }

    /// Return the element's rendered text.
    pub async fn get_inner_text(&self) -> Result<String> {
        self.element.text().await.map_err(anyhow::Error::from)
    }
}
