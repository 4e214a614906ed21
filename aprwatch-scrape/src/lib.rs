//! APR extraction from browser-rendered farm pages and a public JSON feed.
//!
//! - Browser capability traits and their WebDriver-backed implementation (`browser`)
//! - Percentage parsing (`percent`), DOM addressing (`locator`) and bounded
//!   page readiness (`navigator`)
//! - Per-target orchestration with diagnostic screenshots (`farm`)
//! - Feed lookup and transform (`feed`)
//! - Output records and the artifact writer (`record`)
//! - Whole-run pipelines that own the browser session (`pipeline`)

pub mod browser;
pub mod farm;
pub mod feed;
pub mod locator;
pub mod navigator;
pub mod percent;
pub mod pipeline;
pub mod record;

pub use browser::{BrowserError, BrowserSession, NodeHandle, PageHandle, SessionLauncher};
pub use farm::{FarmExtractor, FarmFailure, FarmOutcome, sentinel};
pub use feed::{FeedError, FeedExtractor, FeedRecord};
pub use locator::DomLocator;
pub use navigator::PageNavigator;
pub use percent::parse_percentage;
pub use pipeline::{FarmReport, run_farms, run_feed};
pub use record::{ResultRecord, ResultWriter};
