// src/fetchers/linkedin/mod.rs
pub mod scraper;
pub mod url;

use super::{DetailOptions, JobFetcher, SearchResults};
use crate::browser::{
    close_browser, close_page, BrowserProvider, BrowserSession, SELECTOR_TIMEOUT,
};
use crate::error::FetchError;
use crate::events::EventSink;
use crate::models::{JobRecord, JobStub, SourceId};
use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub use self::url::{build_linkedin_job_list_url, sanitize_job_link};

pub struct LinkedIn<P: BrowserProvider> {
    provider: P,
    list_timeout: Duration,
}

impl<P: BrowserProvider> LinkedIn<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            list_timeout: SELECTOR_TIMEOUT,
        }
    }

    /// Timeout for the search-results container
    pub fn with_list_timeout(mut self, timeout: Duration) -> Self {
        self.list_timeout = timeout;
        self
    }

    async fn fetch_job_list(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<JobStub>, FetchError> {
        let browser = self.provider.new_browser().await?;
        let page = match browser.new_page().await {
            Ok(page) => page,
            Err(e) => {
                close_browser(browser).await;
                return Err(e);
            }
        };

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FetchError::Cancelled),
            outcome = scraper::job_list_from_page(&page, url, self.list_timeout) => outcome,
        };

        close_page(page).await;
        close_browser(browser).await;

        outcome.inspect_err(|e| error!("Error fetching LinkedIn job ids: {}", e))
    }

    /// One window: a dedicated browser, one page per stub. Every stub settles
    /// before the browser is closed, even when the run is cancelled.
    async fn fetch_window(
        &self,
        window: &[JobStub],
        options: &DetailOptions,
        cancel: &CancellationToken,
    ) -> Result<Vec<JobRecord>, FetchError> {
        let browser = self.provider.new_browser().await?;

        let mut fetched = Vec::with_capacity(window.len());
        let mut failure = None;
        {
            let mut in_flight = window
                .iter()
                .map(|stub| self.fetch_job_with_retry(&browser, stub, options, cancel))
                .collect::<FuturesUnordered<_>>();

            while let Some(outcome) = in_flight.next().await {
                match outcome {
                    Ok(Some(record)) => fetched.push(record),
                    Ok(None) => {}
                    Err(e) => {
                        failure.get_or_insert(e);
                    }
                }
            }
        }

        close_browser(browser).await;
        match failure {
            Some(e) => Err(e),
            None => Ok(fetched),
        }
    }

    /// `Ok(None)` when the listing is dropped after its last attempt
    async fn fetch_job_with_retry(
        &self,
        browser: &P::Browser,
        stub: &JobStub,
        options: &DetailOptions,
        cancel: &CancellationToken,
    ) -> Result<Option<JobRecord>, FetchError> {
        let outcome = options
            .retry
            .run_if(
                |_attempt| async move {
                    if cancel.is_cancelled() {
                        return Err(FetchError::Cancelled);
                    }
                    let page = browser.new_page().await?;
                    let result = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => Err(FetchError::Cancelled),
                        result = scraper::job_details_from_page(
                            &page,
                            stub,
                            SourceId::Linkedin,
                            options.selector_timeout,
                        ) => result,
                    };
                    close_page(page).await;
                    result
                },
                FetchError::is_retryable,
            )
            .await;

        match outcome {
            Ok(record) => Ok(Some(record)),
            Err(e) if e.is_retryable() => {
                warn!(
                    job_id = %stub.source_job_id,
                    attempts = options.retry.max_attempts(),
                    "Failed to fetch job details, dropping listing: {}",
                    e
                );
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl<P> JobFetcher for LinkedIn<P>
where
    P: BrowserProvider + 'static,
{
    fn source(&self) -> SourceId {
        SourceId::Linkedin
    }

    async fn fetch_search_results(
        &self,
        keywords: &[String],
        location: &str,
        page_num: u32,
        cancel: &CancellationToken,
    ) -> Result<SearchResults, FetchError> {
        let url = build_linkedin_job_list_url(keywords, location, page_num);
        info!(%url, "LinkedIn job list URL");

        let mut jobs = self.fetch_job_list(&url, cancel).await?;
        for job in &mut jobs {
            job.link = sanitize_job_link(&job.link);
        }

        info!(count = jobs.len(), "Fetched LinkedIn search results");
        Ok(SearchResults {
            source: SourceId::Linkedin,
            jobs,
        })
    }

    async fn fetch_full_job_details(
        &self,
        stubs: Vec<JobStub>,
        options: &DetailOptions,
        events: &EventSink,
        cancel: &CancellationToken,
    ) -> Result<Vec<JobRecord>, FetchError> {
        if stubs.is_empty() {
            return Ok(Vec::new());
        }

        let total = stubs.len();
        let window_size = options.concurrency.max(1);
        let mut results = Vec::with_capacity(total);
        let mut processed = 0;

        for window in stubs.chunks(window_size) {
            if cancel.is_cancelled() {
                return Err(FetchError::Cancelled);
            }
            let fetched = self.fetch_window(window, options, cancel).await?;
            processed += window.len();

            results.extend(fetched.iter().cloned());
            events.batch(SourceId::Linkedin, fetched).await?;
            events
                .status(format!(
                    "Fetched {}/{} jobs from {}.",
                    processed,
                    total,
                    SourceId::Linkedin.display_name()
                ))
                .await;
        }

        Ok(results)
    }
}


#[cfg(test)]
mod tests {
    use super::scraper::fixtures::{detail_page, search_page};
    use super::*;
    use crate::browser::fake::FakeProvider;
    use crate::events::FetchEvent;
    use crate::retry::RetryPolicy;

    fn live() -> CancellationToken {
        CancellationToken::new()
    }

    fn stub(id: u32) -> JobStub {
        JobStub {
            source_job_id: format!("40000000{:02}", id),
            link: format!("https://www.linkedin.com/jobs/view/40000000{:02}/", id),
        }
    }

    fn provider_with_jobs(count: u32) -> FakeProvider {
        (0..count).fold(FakeProvider::new(), |provider, id| {
            let stub = stub(id);
            provider.with_page(&stub.link, &detail_page(&format!("Role {}", id), "Acme"))
        })
    }

    fn drain(rx: &mut tokio::sync::mpsc::Receiver<FetchEvent>) -> Vec<FetchEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn batches(events: &[FetchEvent]) -> Vec<Vec<JobRecord>> {
        events
            .iter()
            .filter_map(|event| match event {
                FetchEvent::BatchReady { jobs, .. } => Some(jobs.clone()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_search_results_sanitizes_links() {
        let keywords = vec!["Rust Engineer".to_string()];
        let url = build_linkedin_job_list_url(&keywords, "105149290", 0);
        let provider = FakeProvider::new().with_page(
            &url,
            &search_page(&[
                (
                    Some("urn:li:jobPosting:4012345678"),
                    Some("https://ca.linkedin.com/jobs/view/rust-engineer-at-acme-4012345678?refId=abc"),
                ),
                (
                    Some("urn:li:jobPosting:4087654321"),
                    Some("https://ca.linkedin.com/jobs/view/4087654321?trk=public_jobs"),
                ),
            ]),
        );
        let linkedin = LinkedIn::new(provider.clone());

        let results = linkedin
            .fetch_search_results(&keywords, "105149290", 0, &live())
            .await
            .unwrap();

        assert_eq!(results.source, SourceId::Linkedin);
        assert_eq!(
            results.jobs,
            vec![
                JobStub {
                    source_job_id: "4012345678".to_string(),
                    link: "https://www.linkedin.com/jobs/view/4012345678/".to_string(),
                },
                JobStub {
                    source_job_id: "4087654321".to_string(),
                    link: "https://ca.linkedin.com/jobs/view/4087654321".to_string(),
                },
            ]
        );
        let stats = provider.stats();
        assert_eq!((stats.browsers_opened, stats.browsers_closed), (1, 1));
        assert_eq!((stats.pages_opened, stats.pages_closed), (1, 1));
    }

    #[tokio::test]
    async fn test_search_results_navigation_failure_closes_everything() {
        let url = build_linkedin_job_list_url(&[], "105149290", 0);
        let provider = FakeProvider::new().failing(&url, 1);
        let linkedin = LinkedIn::new(provider.clone());

        let err = linkedin
            .fetch_search_results(&[], "105149290", 0, &live())
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Navigation { .. }));
        assert_eq!(provider.navigations_to(&url), 1, "list phase is not retried");
        let stats = provider.stats();
        assert_eq!((stats.browsers_opened, stats.browsers_closed), (1, 1));
        assert_eq!((stats.pages_opened, stats.pages_closed), (1, 1));
    }

    #[tokio::test]
    async fn test_search_results_page_failure_closes_browser() {
        let linkedin = LinkedIn::new(FakeProvider::new().failing_new_page());
        let provider = linkedin.provider.clone();

        let err = linkedin
            .fetch_search_results(&[], "", 0, &live())
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Page(_)));
        let stats = provider.stats();
        assert_eq!((stats.browsers_opened, stats.browsers_closed), (1, 1));
        assert_eq!(stats.pages_opened, 0);
    }

    #[tokio::test]
    async fn test_seven_stubs_in_windows_of_five() {
        let provider = provider_with_jobs(7);
        let linkedin = LinkedIn::new(provider.clone());
        let (sink, mut rx) = EventSink::channel(32);
        let stubs: Vec<JobStub> = (0..7).map(stub).collect();

        let records = linkedin
            .fetch_full_job_details(stubs, &DetailOptions::default(), &sink, &live())
            .await
            .unwrap();

        assert_eq!(records.len(), 7);
        let events = drain(&mut rx);
        let batches = batches(&events);
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].len(), 5);
        assert_eq!(batches[1].len(), 2);
        assert!(events.contains(&FetchEvent::StatusUpdate(
            "Fetched 5/7 jobs from LinkedIn.".to_string()
        )));
        assert!(events.contains(&FetchEvent::StatusUpdate(
            "Fetched 7/7 jobs from LinkedIn.".to_string()
        )));

        let stats = provider.stats();
        assert_eq!(stats.browsers_opened, 2, "one browser per window");
        assert_eq!(stats.browsers_closed, 2);
        assert_eq!(stats.pages_opened, stats.pages_closed);
        assert!(stats.max_pages_per_browser <= 5);
    }

    #[tokio::test]
    async fn test_concurrency_one_delivers_each_stub_in_order() {
        let provider = provider_with_jobs(4);
        let linkedin = LinkedIn::new(provider.clone());
        let (sink, mut rx) = EventSink::channel(32);
        let stubs: Vec<JobStub> = (0..4).map(stub).collect();
        let options = DetailOptions::default().with_concurrency(1);

        linkedin
            .fetch_full_job_details(stubs.clone(), &options, &sink, &live())
            .await
            .unwrap();

        let batches = batches(&drain(&mut rx));
        assert_eq!(batches.len(), 4);
        for (batch, stub) in batches.iter().zip(&stubs) {
            assert_eq!(batch.len(), 1);
            assert_eq!(batch[0].source_job_id, stub.source_job_id);
        }
        assert_eq!(provider.stats().max_pages_per_browser, 1);
    }

    #[tokio::test]
    async fn test_exhausted_retries_drop_only_that_listing() {
        let bad = stub(1);
        let provider = provider_with_jobs(3).failing(&bad.link, 4);
        let linkedin = LinkedIn::new(provider.clone());
        let (sink, mut rx) = EventSink::channel(32);
        let stubs: Vec<JobStub> = (0..3).map(stub).collect();
        let options = DetailOptions::default().with_retry(RetryPolicy::immediate(3));

        let records = linkedin
            .fetch_full_job_details(stubs, &options, &sink, &live())
            .await
            .unwrap();

        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.source_job_id != bad.source_job_id));
        for batch in batches(&drain(&mut rx)) {
            assert!(batch.iter().all(|r| r.source_job_id != bad.source_job_id));
        }
        assert_eq!(provider.navigations_to(&bad.link), 4);

        let stats = provider.stats();
        assert_eq!(stats.pages_opened, stats.pages_closed);
        assert_eq!(stats.browsers_opened, stats.browsers_closed);
    }

    #[tokio::test]
    async fn test_transient_failure_recovered_by_retry() {
        let flaky = stub(0);
        let provider = provider_with_jobs(2).failing(&flaky.link, 3);
        let linkedin = LinkedIn::new(provider.clone());
        let (sink, _rx) = EventSink::channel(32);

        let records = linkedin
            .fetch_full_job_details(
                (0..2).map(stub).collect(),
                &DetailOptions::default(),
                &sink,
                &live(),
            )
            .await
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(provider.navigations_to(&flaky.link), 4);
    }

    #[tokio::test]
    async fn test_missing_selector_counts_as_listing_failure() {
        let broken = stub(2);
        let provider = provider_with_jobs(2).with_page(&broken.link, "<html><body>gone</body></html>");
        let linkedin = LinkedIn::new(provider.clone());
        let (sink, _rx) = EventSink::channel(32);

        let records = linkedin
            .fetch_full_job_details(
                (0..3).map(stub).collect(),
                &DetailOptions::default(),
                &sink,
                &live(),
            )
            .await
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(provider.navigations_to(&broken.link), 4);
    }

    #[tokio::test]
    async fn test_batch_follows_completion_order() {
        let slow = stub(0);
        let provider = provider_with_jobs(2).with_delay(&slow.link, Duration::from_millis(50));
        let linkedin = LinkedIn::new(provider);
        let (sink, mut rx) = EventSink::channel(32);

        linkedin
            .fetch_full_job_details(
                (0..2).map(stub).collect(),
                &DetailOptions::default(),
                &sink,
                &live(),
            )
            .await
            .unwrap();

        let batches = batches(&drain(&mut rx));
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0][0].source_job_id, stub(1).source_job_id);
        assert_eq!(batches[0][1].source_job_id, slow.source_job_id);
    }

    #[tokio::test]
    async fn test_empty_stub_list_launches_nothing() {
        let provider = FakeProvider::new();
        let linkedin = LinkedIn::new(provider.clone());
        let (sink, mut rx) = EventSink::channel(4);

        let records = linkedin
            .fetch_full_job_details(Vec::new(), &DetailOptions::default(), &sink, &live())
            .await
            .unwrap();

        assert!(records.is_empty());
        assert!(drain(&mut rx).is_empty());
        assert_eq!(provider.stats().browsers_opened, 0);
    }

    #[tokio::test]
    async fn test_window_launch_failure_is_fatal() {
        let linkedin = LinkedIn::new(FakeProvider::new().failing_launch());
        let (sink, _rx) = EventSink::channel(4);

        let err = linkedin
            .fetch_full_job_details(vec![stub(0)], &DetailOptions::default(), &sink, &live())
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Launch(_)));
    }

    #[tokio::test]
    async fn test_dropped_receiver_stops_detail_phase() {
        let provider = provider_with_jobs(3);
        let linkedin = LinkedIn::new(provider.clone());
        let (sink, rx) = EventSink::channel(4);
        drop(rx);
        let options = DetailOptions::default().with_concurrency(1);

        let err = linkedin
            .fetch_full_job_details((0..3).map(stub).collect(), &options, &sink, &live())
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::ChannelClosed));
        assert_eq!(provider.stats().browsers_opened, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_search_closes_page_and_browser() {
        let url = build_linkedin_job_list_url(&[], "105149290", 0);
        let provider = FakeProvider::new()
            .with_page(&url, &search_page(&[]))
            .with_delay(&url, Duration::from_secs(120));
        let linkedin = LinkedIn::new(provider.clone());
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            trigger.cancel();
        });

        let err = linkedin
            .fetch_search_results(&[], "105149290", 0, &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Cancelled));
        let stats = provider.stats();
        assert_eq!((stats.browsers_opened, stats.browsers_closed), (1, 1));
        assert_eq!((stats.pages_opened, stats.pages_closed), (1, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_mid_window_settles_every_page() {
        let slow = stub(0);
        let provider = provider_with_jobs(2).with_delay(&slow.link, Duration::from_secs(120));
        let linkedin = LinkedIn::new(provider.clone());
        let (sink, mut rx) = EventSink::channel(8);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            trigger.cancel();
        });

        let err = linkedin
            .fetch_full_job_details(
                (0..2).map(stub).collect(),
                &DetailOptions::default(),
                &sink,
                &cancel,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Cancelled));
        assert!(batches(&drain(&mut rx)).is_empty());
        assert_eq!(provider.navigations_to(&slow.link), 1, "cancelled pages are not retried");
        let stats = provider.stats();
        assert_eq!((stats.browsers_opened, stats.browsers_closed), (1, 1));
        assert_eq!((stats.pages_opened, stats.pages_closed), (2, 2));
    }

    #[tokio::test]
    async fn test_cancelled_run_opens_no_window() {
        let provider = provider_with_jobs(2);
        let linkedin = LinkedIn::new(provider.clone());
        let (sink, _rx) = EventSink::channel(4);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = linkedin
            .fetch_full_job_details(
                (0..2).map(stub).collect(),
                &DetailOptions::default(),
                &sink,
                &cancel,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Cancelled));
        assert_eq!(provider.stats().browsers_opened, 0);
    }
}
