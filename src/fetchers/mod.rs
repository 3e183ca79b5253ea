// src/fetchers/mod.rs
//! Job board fetchers.
//!
//! Every board follows the same two phases: scrape a search-results page into
//! [`JobStub`]s, then expand the stubs into [`JobRecord`]s by visiting each
//! listing. The orchestrator finds fetchers through a [`FetcherRegistry`]
//! keyed by [`SourceId`].
//!
//! Both phases take the run's [`CancellationToken`]. Once it fires a fetcher
//! stops scraping, closes every page and browser it opened and returns
//! [`FetchError::Cancelled`].

pub mod linkedin;

use crate::error::FetchError;
use crate::events::EventSink;
use crate::models::{JobRecord, JobStub, SourceId};
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub use linkedin::LinkedIn;

#[derive(Debug, Clone, PartialEq)]
pub struct SearchResults {
    pub source: SourceId,
    pub jobs: Vec<JobStub>,
}

#[derive(Debug, Clone)]
pub struct DetailOptions {
    /// Pages fetched simultaneously inside one browser window
    pub concurrency: usize,
    pub retry: RetryPolicy,
    pub selector_timeout: Duration,
}

impl Default for DetailOptions {
    fn default() -> Self {
        Self {
            concurrency: 5,
            retry: RetryPolicy::immediate(3),
            selector_timeout: crate::browser::SELECTOR_TIMEOUT,
        }
    }
}

impl DetailOptions {
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_selector_timeout(mut self, timeout: Duration) -> Self {
        self.selector_timeout = timeout;
        self
    }
}

#[async_trait]
pub trait JobFetcher: Send + Sync {
    fn source(&self) -> SourceId;

    /// Scrape one page of search results into stubs
    async fn fetch_search_results(
        &self,
        keywords: &[String],
        location: &str,
        page_num: u32,
        cancel: &CancellationToken,
    ) -> Result<SearchResults, FetchError>;

    /// Expand stubs window by window. Each finished window is sent as one
    /// batch through `events`; listings that keep failing are dropped.
    async fn fetch_full_job_details(
        &self,
        stubs: Vec<JobStub>,
        options: &DetailOptions,
        events: &EventSink,
        cancel: &CancellationToken,
    ) -> Result<Vec<JobRecord>, FetchError>;
}

#[derive(Clone, Default)]
pub struct FetcherRegistry {
    fetchers: BTreeMap<SourceId, Arc<dyn JobFetcher>>,
}

impl FetcherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, fetcher: Arc<dyn JobFetcher>) -> Self {
        self.register(fetcher);
        self
    }

    /// Register a fetcher, replacing any previous one for the same source
    pub fn register(&mut self, fetcher: Arc<dyn JobFetcher>) {
        self.fetchers.insert(fetcher.source(), fetcher);
    }

    pub fn get(&self, source: SourceId) -> Result<Arc<dyn JobFetcher>, FetchError> {
        self.fetchers
            .get(&source)
            .cloned()
            .ok_or(FetchError::UnknownSource(source))
    }

    pub fn fetchers(&self) -> impl Iterator<Item = &Arc<dyn JobFetcher>> {
        self.fetchers.values()
    }

    pub fn len(&self) -> usize {
        self.fetchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fetchers.is_empty()
    }
}
