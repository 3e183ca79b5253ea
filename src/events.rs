// src/events.rs
//! Progress of a fetch run as a single ordered event stream

use crate::error::FetchError;
use crate::models::{JobRecord, SourceId};
use tokio::sync::mpsc;
use tracing::debug;

pub const FAILURE_MESSAGE: &str = "Error executing job fetch.";

#[derive(Debug, Clone, PartialEq)]
pub enum FetchEvent {
    /// Records of one finished detail window
    BatchReady { source: SourceId, jobs: Vec<JobRecord> },
    StatusUpdate(String),
    Completed { summary: String, total: usize },
    Failed(String),
}

impl FetchEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, FetchEvent::Completed { .. } | FetchEvent::Failed(_))
    }
}

/// Sending half handed to the orchestrator and the fetchers.
///
/// Batches wait for channel capacity, so a slow consumer applies
/// backpressure to the scrape instead of buffering unbounded results.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::Sender<FetchEvent>,
}

impl EventSink {
    pub fn new(tx: mpsc::Sender<FetchEvent>) -> Self {
        Self { tx }
    }

    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<FetchEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }

    /// Deliver a batch; fails when nobody listens anymore
    pub async fn batch(&self, source: SourceId, jobs: Vec<JobRecord>) -> Result<(), FetchError> {
        self.tx
            .send(FetchEvent::BatchReady { source, jobs })
            .await
            .map_err(|_| FetchError::ChannelClosed)
    }

    pub async fn status(&self, message: impl Into<String>) {
        let message = message.into();
        debug!("Fetch status: {}", message);
        if self.tx.send(FetchEvent::StatusUpdate(message)).await.is_err() {
            debug!("Status update dropped, receiver closed");
        }
    }

    pub async fn completed(&self, summary: String, total: usize) {
        if self
            .tx
            .send(FetchEvent::Completed { summary, total })
            .await
            .is_err()
        {
            debug!("Completion dropped, receiver closed");
        }
    }

    pub async fn failed(&self, message: impl Into<String>) {
        if self.tx.send(FetchEvent::Failed(message.into())).await.is_err() {
            debug!("Failure dropped, receiver closed");
        }
    }
}
