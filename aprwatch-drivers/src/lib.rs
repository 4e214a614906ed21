//! Driver layer for browser automation.
//!
//! This crate wraps a `fantoccini` WebDriver client with the handful of
//! capabilities the scraper needs: a session per run, a fresh window per
//! navigation, bounded element waits, nested element queries and full-page
//! screenshots.
//!
//! - [`browser::driver::AprDriver`]: WebDriver session wrapper
//! - [`browser::page::AprPage`]: one navigated window and its DOM helpers
//! - [`browser::launch`]: Chrome capabilities for headless and visible runs
pub mod browser;
