// src/browser/chrome.rs
//! Headless Chrome over the DevTools protocol

use super::{BrowserProvider, BrowserSession, PageSession, VIEWPORT_HEIGHT, VIEWPORT_WIDTH};
use crate::error::FetchError;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::Page;
use futures::StreamExt;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Default)]
pub struct ChromeProvider {
    executable: Option<PathBuf>,
}

impl ChromeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific Chrome/Chromium binary instead of auto-detection
    pub fn with_executable(mut self, executable: Option<PathBuf>) -> Self {
        self.executable = executable;
        self
    }

    fn browser_config(&self) -> Result<BrowserConfig, FetchError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .arg("--incognito")
            .arg("--disable-setuid-sandbox")
            .window_size(VIEWPORT_WIDTH, VIEWPORT_HEIGHT)
            .viewport(Viewport {
                width: VIEWPORT_WIDTH,
                height: VIEWPORT_HEIGHT,
                ..Viewport::default()
            });

        if let Some(executable) = &self.executable {
            builder = builder.chrome_executable(executable);
        }

        builder.build().map_err(FetchError::Launch)
    }
}

#[async_trait]
impl BrowserProvider for ChromeProvider {
    type Browser = ChromeBrowser;

    async fn new_browser(&self) -> Result<ChromeBrowser, FetchError> {
        let config = self.browser_config()?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| FetchError::Launch(e.to_string()))?;

        // The protocol handler must be polled for the browser to make progress
        let handler = tokio::spawn(async move { while handler.next().await.is_some() {} });

        debug!("Launched headless browser");
        Ok(ChromeBrowser { browser, handler })
    }
}

pub struct ChromeBrowser {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl Drop for ChromeBrowser {
    fn drop(&mut self) {
        // chromiumoxide kills the process on drop; the handler task goes with it
        self.handler.abort();
    }
}

#[async_trait]
impl BrowserSession for ChromeBrowser {
    type Page = ChromePage;

    async fn new_page(&self) -> Result<ChromePage, FetchError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| FetchError::Page(e.to_string()))?;
        Ok(ChromePage { page })
    }

    async fn close(mut self) -> Result<(), FetchError> {
        let closed = self
            .browser
            .close()
            .await
            .map_err(|e| FetchError::Protocol(e.to_string()));
        // Reap the process even when the close command failed
        let _ = self.browser.wait().await;
        self.handler.abort();
        closed.map(|_| ())
    }
}

pub struct ChromePage {
    page: Page,
}

#[async_trait]
impl PageSession for ChromePage {
    async fn goto(&self, url: &str) -> Result<(), FetchError> {
        self.page
            .goto(url)
            .await
            .map_err(|e| FetchError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), FetchError> {
        let poll = async {
            while self.page.find_element(selector).await.is_err() {
                tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
            }
        };

        tokio::time::timeout(timeout, poll)
            .await
            .map_err(|_| FetchError::SelectorTimeout {
                selector: selector.to_string(),
                timeout,
            })
    }

    async fn content(&self) -> Result<String, FetchError> {
        self.page
            .content()
            .await
            .map_err(|e| FetchError::Protocol(e.to_string()))
    }

    async fn url(&self) -> Result<Option<String>, FetchError> {
        self.page
            .url()
            .await
            .map_err(|e| FetchError::Protocol(e.to_string()))
    }

    async fn close(self) -> Result<(), FetchError> {
        self.page
            .close()
            .await
            .map_err(|e| FetchError::Protocol(e.to_string()))
    }
}
