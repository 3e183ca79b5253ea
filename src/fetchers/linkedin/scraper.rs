// src/fetchers/linkedin/scraper.rs
use crate::browser::PageSession;
use crate::error::FetchError;
use crate::models::{JobRecord, JobStub, SourceId};
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const JOB_CARD_SELECTOR: &str = ".base-card";
const JOB_CARD_ID_ATTRIBUTE: &str = "data-entity-urn";

pub const TITLE_SELECTOR: &str = ".top-card-layout__title";
pub const COMPANY_SELECTOR: &str = ".topcard__org-name-link";
pub const LOCATION_SELECTOR: &str = ".topcard__flavor--bullet";
pub const DATE_POSTED_SELECTOR: &str = ".posted-time-ago__text";
pub const DESCRIPTION_SELECTOR: &str = ".show-more-less-html__markup";

/// Detail selectors, in the order they are awaited on a listing page
pub const DETAIL_SELECTORS: [&str; 5] = [
    TITLE_SELECTOR,
    COMPANY_SELECTOR,
    LOCATION_SELECTOR,
    DATE_POSTED_SELECTOR,
    DESCRIPTION_SELECTOR,
];

/// Navigate to a search-results page and read its job cards
pub async fn job_list_from_page<P: PageSession>(
    page: &P,
    url: &str,
    timeout: Duration,
) -> Result<Vec<JobStub>, FetchError> {
    page.goto(url).await?;
    page.wait_for_selector(JOB_CARD_SELECTOR, timeout).await?;

    let html = page.content().await?;
    let base = page.url().await?.unwrap_or_else(|| url.to_string());
    Ok(job_list_from_html(&html, &base))
}

/// Navigate to a listing and read its details
pub async fn job_details_from_page<P: PageSession>(
    page: &P,
    stub: &JobStub,
    source_id: SourceId,
    timeout: Duration,
) -> Result<JobRecord, FetchError> {
    page.goto(&stub.link).await?;
    for selector in DETAIL_SELECTORS {
        page.wait_for_selector(selector, timeout).await?;
    }

    let html = page.content().await?;
    job_details_from_html(stub, source_id, &html)
}

/// One stub per job card. Cards without an id or a link are skipped.
pub fn job_list_from_html(html: &str, base_url: &str) -> Vec<JobStub> {
    let document = Html::parse_document(html);
    let card_selector = selector(JOB_CARD_SELECTOR);
    let link_selector = selector("a");
    let base = Url::parse(base_url).ok();

    document
        .select(&card_selector)
        .filter_map(|card| {
            let urn = card.value().attr(JOB_CARD_ID_ATTRIBUTE)?;
            let source_job_id = urn.rsplit(':').next().unwrap_or_default().trim();
            if source_job_id.is_empty() {
                return None;
            }

            let href = card
                .select(&link_selector)
                .next()
                .and_then(|anchor| anchor.value().attr("href"))?;
            let link = resolve_link(base.as_ref(), href)?;

            Some(JobStub {
                source_job_id: source_job_id.to_string(),
                link,
            })
        })
        .collect()
}

pub fn job_details_from_html(
    stub: &JobStub,
    source_id: SourceId,
    html: &str,
) -> Result<JobRecord, FetchError> {
    let document = Html::parse_document(html);

    let record = JobRecord {
        source_id,
        source_job_id: stub.source_job_id.clone(),
        link: stub.link.clone(),
        title: clean_text(&required_text(&document, TITLE_SELECTOR)?),
        company: clean_text(&required_text(&document, COMPANY_SELECTOR)?),
        location: clean_text(&required_text(&document, LOCATION_SELECTOR)?),
        date_posted: clean_text(&required_text(&document, DATE_POSTED_SELECTOR)?),
        description: required_text(&document, DESCRIPTION_SELECTOR)?
            .trim()
            .to_string(),
    };

    debug!(
        job_id = %record.source_job_id,
        "Extracted job: {} at {}",
        record.title,
        record.company
    );
    Ok(record)
}

fn required_text(document: &Html, selector_str: &str) -> Result<String, FetchError> {
    document
        .select(&selector(selector_str))
        .next()
        .map(element_text)
        .ok_or_else(|| FetchError::MissingElement(selector_str.to_string()))
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<Vec<_>>().join("")
}

fn resolve_link(base: Option<&Url>, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    match Url::parse(href) {
        Ok(url) => Some(url.to_string()),
        Err(_) => base.and_then(|base| base.join(href).ok()).map(|url| url.to_string()),
    }
}

fn selector(selector_str: &str) -> Selector {
    Selector::parse(selector_str).expect("static selector is valid CSS")
}

/// Collapse the whitespace LinkedIn markup is padded with
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
