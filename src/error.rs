// src/error.rs
use crate::models::SourceId;
use std::time::Duration;
use thiserror::Error;

/// Failures raised inside the fetch pipeline.
///
/// In the list phase every error is fatal for the call. In the detail phase a
/// retryable error only concerns one listing: it is retried and the listing is
/// dropped once the attempts run out. `Launch` stays fatal there, and
/// `Cancelled` stops the phase after its pages are closed.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to launch browser: {0}")]
    Launch(String),

    #[error("failed to open page: {0}")]
    Page(String),

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("timed out after {timeout:?} waiting for selector `{selector}`")]
    SelectorTimeout { selector: String, timeout: Duration },

    #[error("no element matched selector `{0}`")]
    MissingElement(String),

    #[error("browser protocol error: {0}")]
    Protocol(String),

    #[error("no fetcher registered for source {0}")]
    UnknownSource(SourceId),

    #[error("fetch event receiver was dropped")]
    ChannelClosed,

    #[error("fetch run was cancelled")]
    Cancelled,
}

impl FetchError {
    /// Whether another attempt at the same page may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FetchError::Page(_)
                | FetchError::Navigation { .. }
                | FetchError::SelectorTimeout { .. }
                | FetchError::MissingElement(_)
                | FetchError::Protocol(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_level_errors_are_retryable() {
        assert!(FetchError::Navigation {
            url: "https://www.linkedin.com/jobs/view/1/".to_string(),
            reason: "net::ERR_CONNECTION_RESET".to_string(),
        }
        .is_retryable());
        assert!(FetchError::Page("target crashed".to_string()).is_retryable());
        assert!(FetchError::MissingElement(".topcard__org-name-link".to_string()).is_retryable());
    }

    #[test]
    fn test_run_level_errors_are_not_retryable() {
        assert!(!FetchError::Cancelled.is_retryable());
        assert!(!FetchError::ChannelClosed.is_retryable());
        assert!(!FetchError::Launch("chrome not found".to_string()).is_retryable());
        assert!(!FetchError::UnknownSource(SourceId::Indeed).is_retryable());
    }
}
