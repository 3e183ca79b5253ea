// src/orchestrator.rs
//! Fans a fetch run out over every registered job board.
//!
//! Progress is reported only through [`FetchEvent`]s. Every run ends with
//! exactly one terminal event: `Completed` when all boards finished, or a
//! single generic `Failed` whatever went wrong. Details of the failure are in
//! the logs.
//!
//! A run never drops a fetcher mid-phase. The first failing board and the
//! run deadline both cancel the run's token instead; every board then closes
//! what it opened and the run waits for all of them before reporting.

use crate::browser::ChromeProvider;
use crate::config::FetchConfig;
use crate::error::FetchError;
use crate::events::{EventSink, FetchEvent, FAILURE_MESSAGE};
use crate::fetchers::{DetailOptions, FetcherRegistry, LinkedIn, SearchResults};
use crate::retry::RetryPolicy;
use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

const EVENT_CHANNEL_CAPACITY: usize = 64;

pub struct FetchOrchestrator {
    registry: FetcherRegistry,
    detail_options: DetailOptions,
    run_timeout: Option<Duration>,
}

impl FetchOrchestrator {
    /// Detail pages are fetched one at a time per board with three retries,
    /// to stay gentle with the scraped sites.
    pub fn new(registry: FetcherRegistry) -> Self {
        Self {
            registry,
            detail_options: DetailOptions::default()
                .with_concurrency(1)
                .with_retry(RetryPolicy::immediate(3)),
            run_timeout: None,
        }
    }

    /// Production wiring: every supported board scraped through headless
    /// Chrome
    pub fn from_config(config: &FetchConfig) -> Self {
        let chrome = ChromeProvider::new().with_executable(config.chrome_executable.clone());
        let registry = FetcherRegistry::new()
            .with(Arc::new(LinkedIn::new(chrome).with_list_timeout(config.selector_timeout())));

        Self::new(registry)
            .with_detail_options(config.detail_options())
            .with_run_timeout(config.run_timeout())
    }

    pub fn with_detail_options(mut self, options: DetailOptions) -> Self {
        self.detail_options = options;
        self
    }

    /// Bound the wall-clock time of a whole run; unbounded by default
    pub fn with_run_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.run_timeout = timeout;
        self
    }

    /// Start a run in the background and hand back its event stream
    pub fn spawn(
        self: &Arc<Self>,
        keywords: Vec<String>,
        location: String,
    ) -> mpsc::Receiver<FetchEvent> {
        let (sink, rx) = EventSink::channel(EVENT_CHANNEL_CAPACITY);
        let orchestrator = Arc::clone(self);
        tokio::spawn(async move {
            orchestrator.run_job_fetch(&keywords, &location, &sink).await;
        });
        rx
    }

    /// Run every fetcher to completion. Never returns an error: the outcome
    /// is the terminal event sent through `events`.
    pub async fn run_job_fetch(&self, keywords: &[String], location: &str, events: &EventSink) {
        let run_id = Uuid::new_v4();
        let span = info_span!("job_fetch", %run_id, sources = self.registry.len());

        async {
            let cancel = CancellationToken::new();
            let run = self.fetch_all(keywords, location, events, &cancel);
            tokio::pin!(run);

            let outcome = match self.run_timeout {
                Some(limit) => tokio::select! {
                    outcome = &mut run => outcome.map_err(RunError::Fetch),
                    _ = tokio::time::sleep(limit) => {
                        warn!(?limit, "Run deadline reached, stopping fetchers");
                        cancel.cancel();
                        if let Err(e) = run.await {
                            info!("Fetchers stopped: {}", e);
                        }
                        Err(RunError::Deadline(limit))
                    }
                },
                None => run.await.map_err(RunError::Fetch),
            };

            match outcome {
                Ok(total) => {
                    let summary = format!("Job fetch completed. Total jobs fetched: {}", total);
                    info!(total, "{}", summary);
                    events.completed(summary, total).await;
                }
                Err(e) => {
                    error!("Error executing job fetch: {}", e);
                    events.failed(FAILURE_MESSAGE).await;
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn fetch_all(
        &self,
        keywords: &[String],
        location: &str,
        events: &EventSink,
        cancel: &CancellationToken,
    ) -> Result<usize, FetchError> {
        events.status("Fetching jobs...").await;

        let search_results: Vec<SearchResults> = settle_all(
            self.registry
                .fetchers()
                .map(|fetcher| fetcher.fetch_search_results(keywords, location, 0, cancel)),
            cancel,
        )
        .await?;

        let stub_count: usize = search_results.iter().map(|r| r.jobs.len()).sum();
        events
            .status(format!(
                "Fetched a total of {} jobs from all sources. Fetching full job details...",
                stub_count
            ))
            .await;

        let detail_runs = search_results
            .into_iter()
            .map(|results| {
                let fetcher = self.registry.get(results.source)?;
                Ok(async move {
                    fetcher
                        .fetch_full_job_details(results.jobs, &self.detail_options, events, cancel)
                        .await
                })
            })
            .collect::<Result<Vec<_>, FetchError>>()?;

        let fetched = settle_all(detail_runs, cancel).await?;
        Ok(fetched.iter().map(Vec::len).sum())
    }
}

/// Drive every board to the end of its phase. The first failure cancels the
/// others; the error reported is the first one that is not a cancellation.
async fn settle_all<T, F>(
    runs: impl IntoIterator<Item = F>,
    cancel: &CancellationToken,
) -> Result<Vec<T>, FetchError>
where
    F: Future<Output = Result<T, FetchError>>,
{
    let outcomes = join_all(runs.into_iter().map(|run| async move {
        let outcome = run.await;
        if outcome.is_err() {
            cancel.cancel();
        }
        outcome
    }))
    .await;

    let mut values = Vec::with_capacity(outcomes.len());
    let mut cancelled = false;
    for outcome in outcomes {
        match outcome {
            Ok(value) => values.push(value),
            Err(FetchError::Cancelled) => cancelled = true,
            Err(e) => return Err(e),
        }
    }

    if cancelled {
        Err(FetchError::Cancelled)
    } else {
        Ok(values)
    }
}

#[derive(Debug, thiserror::Error)]
enum RunError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("run exceeded {0:?}")]
    Deadline(Duration),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::FakeProvider;
    use crate::fetchers::linkedin::testing::{guest_site, job_link};
    use crate::fetchers::JobFetcher;
    use crate::models::{JobRecord, JobStub, SourceId};
    use async_trait::async_trait;
    use crate::fetchers::linkedin::build_linkedin_job_list_url;

    const GEO: &str = "105149290";

    fn keywords() -> Vec<String> {
        vec!["Software Engineer".to_string()]
    }

    fn linkedin_site(job_ids: &[&str]) -> FakeProvider {
        guest_site(&keywords(), GEO, job_ids)
    }

    async fn collect(mut rx: mpsc::Receiver<FetchEvent>) -> Vec<FetchEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    /// Board whose search phase always rejects
    struct BrokenBoard;

    #[async_trait]
    impl JobFetcher for BrokenBoard {
        fn source(&self) -> SourceId {
            SourceId::Indeed
        }

        async fn fetch_search_results(
            &self,
            _keywords: &[String],
            _location: &str,
            _page_num: u32,
            _cancel: &CancellationToken,
        ) -> Result<SearchResults, FetchError> {
            Err(FetchError::Navigation {
                url: "https://ca.indeed.com/jobs".to_string(),
                reason: "blocked".to_string(),
            })
        }

        async fn fetch_full_job_details(
            &self,
            _stubs: Vec<JobStub>,
            _options: &DetailOptions,
            _events: &EventSink,
            _cancel: &CancellationToken,
        ) -> Result<Vec<JobRecord>, FetchError> {
            Ok(Vec::new())
        }
    }

    /// Board that reports results under another board's id
    struct MislabelledBoard;

    #[async_trait]
    impl JobFetcher for MislabelledBoard {
        fn source(&self) -> SourceId {
            SourceId::Other
        }

        async fn fetch_search_results(
            &self,
            _keywords: &[String],
            _location: &str,
            _page_num: u32,
            _cancel: &CancellationToken,
        ) -> Result<SearchResults, FetchError> {
            Ok(SearchResults {
                source: SourceId::Glassdoor,
                jobs: Vec::new(),
            })
        }

        async fn fetch_full_job_details(
            &self,
            _stubs: Vec<JobStub>,
            _options: &DetailOptions,
            _events: &EventSink,
            _cancel: &CancellationToken,
        ) -> Result<Vec<JobRecord>, FetchError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_successful_run_streams_batches_then_completes() {
        let site = linkedin_site(&["4000000001", "4000000002", "4000000003"]);
        let registry = FetcherRegistry::new().with(Arc::new(LinkedIn::new(site.clone())));
        let orchestrator = Arc::new(FetchOrchestrator::new(registry));

        let events = collect(orchestrator.spawn(keywords(), GEO.to_string())).await;

        assert_eq!(events[0], FetchEvent::StatusUpdate("Fetching jobs...".to_string()));
        assert_eq!(
            events[1],
            FetchEvent::StatusUpdate(
                "Fetched a total of 3 jobs from all sources. Fetching full job details..."
                    .to_string()
            )
        );

        let batch_sizes: Vec<usize> = events
            .iter()
            .filter_map(|e| match e {
                FetchEvent::BatchReady { jobs, .. } => Some(jobs.len()),
                _ => None,
            })
            .collect();
        assert_eq!(batch_sizes, vec![1, 1, 1], "detail phase runs one page at a time");

        assert_eq!(
            events.last(),
            Some(&FetchEvent::Completed {
                summary: "Job fetch completed. Total jobs fetched: 3".to_string(),
                total: 3,
            })
        );
        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);

        let stats = site.stats();
        assert_eq!(stats.browsers_opened, stats.browsers_closed);
        assert_eq!(stats.pages_opened, stats.pages_closed);
    }

    #[tokio::test]
    async fn test_one_failing_board_fails_the_run_once() {
        let list_url = build_linkedin_job_list_url(&keywords(), GEO, 0);
        let site = linkedin_site(&["4000000001"]).with_delay(&list_url, Duration::from_millis(200));
        let registry = FetcherRegistry::new()
            .with(Arc::new(LinkedIn::new(site.clone())))
            .with(Arc::new(BrokenBoard));
        let orchestrator = Arc::new(FetchOrchestrator::new(registry));

        let events = collect(orchestrator.spawn(keywords(), GEO.to_string())).await;

        let failures = events
            .iter()
            .filter(|e| matches!(e, FetchEvent::Failed(_)))
            .count();
        assert_eq!(failures, 1);
        assert!(!events.iter().any(|e| matches!(e, FetchEvent::Completed { .. })));
        assert_eq!(
            events.last(),
            Some(&FetchEvent::Failed("Error executing job fetch.".to_string()))
        );

        // The slower board still closes what it opened
        let stats = site.stats();
        assert_eq!((stats.browsers_opened, stats.browsers_closed), (1, 1));
        assert_eq!((stats.pages_opened, stats.pages_closed), (1, 1));
    }

    #[tokio::test]
    async fn test_unregistered_source_is_a_failure() {
        let orchestrator = FetchOrchestrator::new(FetcherRegistry::new().with(Arc::new(MislabelledBoard)));
        let (sink, rx) = EventSink::channel(16);

        orchestrator.run_job_fetch(&keywords(), GEO, &sink).await;
        drop(sink);

        let events = collect(rx).await;
        assert_eq!(
            events.last(),
            Some(&FetchEvent::Failed(FAILURE_MESSAGE.to_string()))
        );
    }

    #[tokio::test]
    async fn test_launch_failure_is_reported_not_raised() {
        let registry = FetcherRegistry::new().with(Arc::new(LinkedIn::new(
            FakeProvider::new().failing_launch(),
        )));
        let orchestrator = Arc::new(FetchOrchestrator::new(registry));

        let events = collect(orchestrator.spawn(keywords(), GEO.to_string())).await;

        assert_eq!(
            events,
            vec![
                FetchEvent::StatusUpdate("Fetching jobs...".to_string()),
                FetchEvent::Failed(FAILURE_MESSAGE.to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_search_page_without_cards_fails() {
        let site = linkedin_site(&[]);
        let registry = FetcherRegistry::new().with(Arc::new(LinkedIn::new(site.clone())));
        let orchestrator = Arc::new(FetchOrchestrator::new(registry));

        let events = collect(orchestrator.spawn(keywords(), GEO.to_string())).await;

        assert!(!events.iter().any(|e| matches!(e, FetchEvent::BatchReady { .. })));
        assert_eq!(
            events.last(),
            Some(&FetchEvent::Failed(FAILURE_MESSAGE.to_string()))
        );
        let stats = site.stats();
        assert_eq!(stats.browsers_opened, 1, "only the search page was opened");
        assert_eq!(stats.browsers_closed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_timeout_reports_failure() {
        let site = linkedin_site(&["4000000001"]).with_delay(
            &job_link("4000000001"),
            Duration::from_secs(120),
        );
        let registry = FetcherRegistry::new().with(Arc::new(LinkedIn::new(site.clone())));
        let orchestrator = Arc::new(
            FetchOrchestrator::new(registry).with_run_timeout(Some(Duration::from_secs(30))),
        );
        let started = tokio::time::Instant::now();

        let events = collect(orchestrator.spawn(keywords(), GEO.to_string())).await;

        assert_eq!(
            events.last(),
            Some(&FetchEvent::Failed(FAILURE_MESSAGE.to_string()))
        );
        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
        assert!(!events.iter().any(|e| matches!(e, FetchEvent::BatchReady { .. })));
        assert!(started.elapsed() < Duration::from_secs(120), "the slow page is abandoned");

        let stats = site.stats();
        assert_eq!((stats.browsers_opened, stats.browsers_closed), (2, 2));
        assert_eq!((stats.pages_opened, stats.pages_closed), (2, 2));
    }
}
