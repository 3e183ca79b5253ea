// src/browser/mod.rs
//! Browser session provider.
//!
//! A provider hands out browser instances, a browser hands out pages. The
//! caller owns both and must close them on every exit path; use
//! [`close_page`] and [`close_browser`] so a failing close is logged instead
//! of masking the outcome of the scrape.

pub mod chrome;
#[cfg(test)]
pub mod fake;

use crate::error::FetchError;
use async_trait::async_trait;
use std::time::Duration;
use tracing::warn;

pub use chrome::ChromeProvider;

pub const VIEWPORT_WIDTH: u32 = 1080;
pub const VIEWPORT_HEIGHT: u32 = 1024;

/// Time allowed for a selector to show up on a page
pub const SELECTOR_TIMEOUT: Duration = Duration::from_secs(10);

#[async_trait]
pub trait BrowserProvider: Send + Sync {
    type Browser: BrowserSession;

    /// Start one headless, incognito browser instance
    async fn new_browser(&self) -> Result<Self::Browser, FetchError>;
}

#[async_trait]
pub trait BrowserSession: Send + Sync + Sized {
    type Page: PageSession;

    /// Open a page with the fixed viewport
    async fn new_page(&self) -> Result<Self::Page, FetchError>;

    async fn close(self) -> Result<(), FetchError>;
}

#[async_trait]
pub trait PageSession: Send + Sync + Sized {
    async fn goto(&self, url: &str) -> Result<(), FetchError>;

    /// Wait until an element matching `selector` exists, failing with
    /// [`FetchError::SelectorTimeout`] once `timeout` elapses.
    async fn wait_for_selector(&self, selector: &str, timeout: Duration)
        -> Result<(), FetchError>;

    /// Current DOM serialized as HTML
    async fn content(&self) -> Result<String, FetchError>;

    /// URL the page ended up on, used to resolve relative links
    async fn url(&self) -> Result<Option<String>, FetchError>;

    async fn close(self) -> Result<(), FetchError>;
}

pub async fn close_page<P: PageSession>(page: P) {
    if let Err(e) = page.close().await {
        warn!("Failed to close page: {}", e);
    }
}

pub async fn close_browser<B: BrowserSession>(browser: B) {
    if let Err(e) = browser.close().await {
        warn!("Failed to close browser: {}", e);
    }
}
