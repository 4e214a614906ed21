#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use aprwatch_scrape::{BrowserError, BrowserSession, NodeHandle, PageHandle, SessionLauncher};
use async_trait::async_trait;
use url::Url;

pub const PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake";

static TRACING: Once = Once::new();

pub fn init_test_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

#[derive(Debug, Clone, Default)]
pub struct FakeNode {
    attrs: HashMap<String, String>,
    text: String,
    children: HashMap<String, Vec<FakeNode>>,
}

impl FakeNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.into();
        self
    }

    pub fn child(mut self, selector: &str, node: FakeNode) -> Self {
        self.children.entry(selector.into()).or_default().push(node);
        self
    }
}

/// A farm panel holding one APR label.
pub fn panel(label_selector: &str, text: &str) -> FakeNode {
    FakeNode::new().child(label_selector, FakeNode::new().text(text))
}

#[async_trait]
impl NodeHandle for FakeNode {
    async fn attribute(&self, name: &str) -> Result<Option<String>, BrowserError> {
        Ok(self.attrs.get(name).cloned())
    }

    async fn find_all(&self, selector: &str) -> Result<Vec<Box<dyn NodeHandle>>, BrowserError> {
        Ok(boxed(self.children.get(selector)))
    }

    async fn inner_text(&self) -> Result<String, BrowserError> {
        Ok(self.text.clone())
    }
}

fn boxed(nodes: Option<&Vec<FakeNode>>) -> Vec<Box<dyn NodeHandle>> {
    nodes
        .into_iter()
        .flatten()
        .cloned()
        .map(|n| Box::new(n) as Box<dyn NodeHandle>)
        .collect()
}

#[derive(Debug, Clone)]
pub enum Wait {
    Ready,
    /// Never resolves; the caller's timeout has to fire.
    Never,
    Delay(Duration),
    Fail,
}

#[derive(Debug, Clone)]
pub struct PageFixture {
    nodes: HashMap<String, Vec<FakeNode>>,
    wait: Wait,
    screenshot_fails: bool,
}

impl PageFixture {
    pub fn ready() -> Self {
        Self {
            nodes: HashMap::new(),
            wait: Wait::Ready,
            screenshot_fails: false,
        }
    }

    pub fn waiting(wait: Wait) -> Self {
        Self {
            wait,
            ..Self::ready()
        }
    }

    pub fn waiting_on(mut self, wait: Wait) -> Self {
        self.wait = wait;
        self
    }

    pub fn with(mut self, selector: &str, node: FakeNode) -> Self {
        self.nodes.entry(selector.into()).or_default().push(node);
        self
    }

    pub fn screenshot_fails(mut self) -> Self {
        self.screenshot_fails = true;
        self
    }
}

#[derive(Debug, Default)]
pub struct Stats {
    pub pages_opened: AtomicUsize,
    pub pages_closed: AtomicUsize,
    pub screenshots: AtomicUsize,
    pub sessions_closed: AtomicUsize,
    pub waited_on: Mutex<Vec<String>>,
    pub visited: Mutex<Vec<String>>,
}

impl Stats {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().unwrap().clone()
    }

    pub fn waited_on(&self) -> Vec<String> {
        self.waited_on.lock().unwrap().clone()
    }
}

pub struct FakePage {
    fixture: PageFixture,
    stats: Arc<Stats>,
}

#[async_trait]
impl PageHandle for FakePage {
    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<(), BrowserError> {
        self.stats.waited_on.lock().unwrap().push(selector.into());
        match &self.fixture.wait {
            Wait::Ready => Ok(()),
            Wait::Never => std::future::pending().await,
            Wait::Delay(d) => {
                tokio::time::sleep(*d).await;
                Ok(())
            }
            Wait::Fail => Err(BrowserError::Timeout(timeout)),
        }
    }

    async fn find_all(&self, selector: &str) -> Result<Vec<Box<dyn NodeHandle>>, BrowserError> {
        Ok(boxed(self.fixture.nodes.get(selector)))
    }

    async fn screenshot(&self) -> Result<Vec<u8>, BrowserError> {
        self.stats.screenshots.fetch_add(1, Ordering::SeqCst);
        if self.fixture.screenshot_fails {
            return Err(BrowserError::Command("screenshot unavailable".into()));
        }
        Ok(PNG.to_vec())
    }

    async fn close(self: Box<Self>) -> Result<(), BrowserError> {
        self.stats.pages_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Serves a page per URL; unknown URLs fail navigation.
pub struct FakeSession {
    pages: HashMap<String, PageFixture>,
    panic_on: Option<String>,
    stats: Arc<Stats>,
}

impl FakeSession {
    pub fn new(stats: Arc<Stats>) -> Self {
        Self {
            pages: HashMap::new(),
            panic_on: None,
            stats,
        }
    }

    pub fn page(mut self, url: &str, fixture: PageFixture) -> Self {
        self.pages.insert(url.into(), fixture);
        self
    }

    pub fn panic_on(mut self, url: &str) -> Self {
        self.panic_on = Some(url.into());
        self
    }
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn open_page(&mut self, url: &Url) -> Result<Box<dyn PageHandle>, BrowserError> {
        self.stats.visited.lock().unwrap().push(url.to_string());
        if self.panic_on.as_deref() == Some(url.as_str()) {
            panic!("renderer crashed on {url}");
        }
        let fixture = self
            .pages
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| BrowserError::Command(format!("net::ERR_NAME_NOT_RESOLVED at {url}")))?;
        self.stats.pages_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakePage {
            fixture,
            stats: self.stats.clone(),
        }))
    }

    async fn close(self: Box<Self>) -> Result<(), BrowserError> {
        self.stats.sessions_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Hands out one prepared session, or fails to launch.
pub struct FakeLauncher {
    session: Mutex<Option<FakeSession>>,
}

impl FakeLauncher {
    pub fn new(session: FakeSession) -> Self {
        Self {
            session: Mutex::new(Some(session)),
        }
    }

    pub fn failing() -> Self {
        Self {
            session: Mutex::new(None),
        }
    }
}

#[async_trait]
impl SessionLauncher for FakeLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, BrowserError> {
        let session = self.session.lock().unwrap().take();
        match session {
            Some(s) => Ok(Box::new(s)),
            None => Err(BrowserError::Command("chromedriver not reachable".into())),
        }
    }
}
