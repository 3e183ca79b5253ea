// src/fetchers/linkedin/url.rs
//! LinkedIn guest job-search URLs.
//!
//! Example:
//! `https://www.linkedin.com/jobs/search/?f_E=4&f_TPR=r86400&f_WT=2%2C1%2C3&geoId=105149290&keywords=%22Software+Engineer%22&sortBy=DD&position=1&pageNum=0&refresh=true`
//!
//! - `f_E=4`: mid-senior experience level
//! - `f_TPR=r86400`: posted in the past 24 hours
//! - `f_WT=2,1,3`: full-time, internship, contract
//! - `geoId`: LinkedIn location id (105149290 is Ontario, Canada)
//! - `keywords`: each keyword quoted, joined with `,`
//! - `sortBy=DD`: newest first
//! - `position` / `pageNum`: pagination

use regex::Regex;
use std::sync::LazyLock;
use url::Url;

pub const LINKEDIN_BASE_URL: &str = "https://www.linkedin.com";
pub const DEFAULT_GEO_ID: &str = "105149290";

static JOB_ID_IN_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-(\d{10})\?").expect("valid job id pattern"));

pub fn build_linkedin_job_list_url(keywords: &[String], location: &str, page_num: u32) -> String {
    let geo_id = if location.trim().is_empty() {
        DEFAULT_GEO_ID
    } else {
        location.trim()
    };

    let quoted_keywords = keywords
        .iter()
        .map(|keyword| format!("\"{}\"", keyword))
        .collect::<Vec<_>>()
        .join(",");

    let mut url = Url::parse(&format!("{}/jobs/search/", LINKEDIN_BASE_URL))
        .expect("static LinkedIn search URL is valid");
    url.query_pairs_mut()
        .append_pair("f_E", "4")
        .append_pair("f_TPR", "r86400")
        .append_pair("f_WT", "2,1,3")
        .append_pair("geoId", geo_id)
        .append_pair("keywords", &quoted_keywords)
        .append_pair("sortBy", "DD")
        .append_pair("position", "1")
        .append_pair("pageNum", &page_num.to_string())
        .append_pair("refresh", "true");

    url.to_string()
}

/// Rewrite a listing link to its canonical `/jobs/view/<id>/` form when the
/// ten digit job id can be found, otherwise drop the query string to keep
/// links short.
pub fn sanitize_job_link(link: &str) -> String {
    match JOB_ID_IN_PATH.captures(link) {
        Some(captures) => format!("{}/jobs/view/{}/", LINKEDIN_BASE_URL, &captures[1]),
        None => link.split('?').next().unwrap_or(link).to_string(),
    }
}
