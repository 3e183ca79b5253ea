// src/browser/fake.rs
//! Scripted in-memory browser for tests.
//!
//! Pages are served from a URL → HTML map. Navigations can be made to fail a
//! number of times, selectors resolve against the served HTML, and every
//! open/close is counted so tests can check that nothing leaks.

use super::{BrowserProvider, BrowserSession, PageSession};
use crate::error::FetchError;
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct Script {
    pages: HashMap<String, String>,
    failures: HashMap<String, usize>,
    delays: HashMap<String, Duration>,
    fail_launch: bool,
    fail_new_page: bool,
}

#[derive(Debug, Default, Clone)]
pub struct FakeStats {
    pub browsers_opened: usize,
    pub browsers_closed: usize,
    pub pages_opened: usize,
    pub pages_closed: usize,
    pub max_pages_per_browser: usize,
    pub navigations: Vec<String>,
}

#[derive(Clone, Default)]
pub struct FakeProvider {
    script: Arc<Mutex<Script>>,
    stats: Arc<Mutex<FakeStats>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, url: &str, html: &str) -> Self {
        self.script
            .lock()
            .unwrap()
            .pages
            .insert(url.to_string(), html.to_string());
        self
    }

    /// Make the next `times` navigations to `url` fail
    pub fn failing(self, url: &str, times: usize) -> Self {
        self.script
            .lock()
            .unwrap()
            .failures
            .insert(url.to_string(), times);
        self
    }

    pub fn with_delay(self, url: &str, delay: Duration) -> Self {
        self.script
            .lock()
            .unwrap()
            .delays
            .insert(url.to_string(), delay);
        self
    }

    pub fn failing_launch(self) -> Self {
        self.script.lock().unwrap().fail_launch = true;
        self
    }

    pub fn failing_new_page(self) -> Self {
        self.script.lock().unwrap().fail_new_page = true;
        self
    }

    pub fn stats(&self) -> FakeStats {
        self.stats.lock().unwrap().clone()
    }

    pub fn navigations_to(&self, url: &str) -> usize {
        self.stats
            .lock()
            .unwrap()
            .navigations
            .iter()
            .filter(|visited| visited.as_str() == url)
            .count()
    }
}

#[async_trait]
impl BrowserProvider for FakeProvider {
    type Browser = FakeBrowser;

    async fn new_browser(&self) -> Result<FakeBrowser, FetchError> {
        if self.script.lock().unwrap().fail_launch {
            return Err(FetchError::Launch("chrome not found".to_string()));
        }
        self.stats.lock().unwrap().browsers_opened += 1;
        Ok(FakeBrowser {
            provider: self.clone(),
            open_pages: Arc::new(AtomicUsize::new(0)),
        })
    }
}

pub struct FakeBrowser {
    provider: FakeProvider,
    open_pages: Arc<AtomicUsize>,
}

#[async_trait]
impl BrowserSession for FakeBrowser {
    type Page = FakePage;

    async fn new_page(&self) -> Result<FakePage, FetchError> {
        if self.provider.script.lock().unwrap().fail_new_page {
            return Err(FetchError::Page("target crashed".to_string()));
        }
        let open = self.open_pages.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut stats = self.provider.stats.lock().unwrap();
            stats.pages_opened += 1;
            stats.max_pages_per_browser = stats.max_pages_per_browser.max(open);
        }
        Ok(FakePage {
            provider: self.provider.clone(),
            open_pages: self.open_pages.clone(),
            current: Mutex::new(None),
        })
    }

    async fn close(self) -> Result<(), FetchError> {
        self.provider.stats.lock().unwrap().browsers_closed += 1;
        Ok(())
    }
}

pub struct FakePage {
    provider: FakeProvider,
    open_pages: Arc<AtomicUsize>,
    current: Mutex<Option<(String, String)>>,
}

impl FakePage {
    fn current_html(&self) -> Option<String> {
        self.current
            .lock()
            .unwrap()
            .as_ref()
            .map(|(_, html)| html.clone())
    }
}

#[async_trait]
impl PageSession for FakePage {
    async fn goto(&self, url: &str) -> Result<(), FetchError> {
        self.provider
            .stats
            .lock()
            .unwrap()
            .navigations
            .push(url.to_string());

        let delay = self.provider.script.lock().unwrap().delays.get(url).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let html = {
            let mut script = self.provider.script.lock().unwrap();
            if let Some(remaining) = script.failures.get_mut(url) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(FetchError::Navigation {
                        url: url.to_string(),
                        reason: "net::ERR_CONNECTION_RESET".to_string(),
                    });
                }
            }
            script.pages.get(url).cloned()
        };

        match html {
            Some(html) => {
                *self.current.lock().unwrap() = Some((url.to_string(), html));
                Ok(())
            }
            None => Err(FetchError::Navigation {
                url: url.to_string(),
                reason: "404".to_string(),
            }),
        }
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), FetchError> {
        let found = self.current_html().is_some_and(|html| {
            let document = Html::parse_document(&html);
            Selector::parse(selector)
                .map(|parsed| document.select(&parsed).next().is_some())
                .unwrap_or(false)
        });

        if found {
            Ok(())
        } else {
            Err(FetchError::SelectorTimeout {
                selector: selector.to_string(),
                timeout,
            })
        }
    }

    async fn content(&self) -> Result<String, FetchError> {
        self.current_html()
            .ok_or_else(|| FetchError::Protocol("page has no document".to_string()))
    }

    async fn url(&self) -> Result<Option<String>, FetchError> {
        Ok(self
            .current
            .lock()
            .unwrap()
            .as_ref()
            .map(|(url, _)| url.clone()))
    }

    async fn close(self) -> Result<(), FetchError> {
        self.open_pages.fetch_sub(1, Ordering::SeqCst);
        self.provider.stats.lock().unwrap().pages_closed += 1;
        Ok(())
    }
}
