use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use thiserror::Error;

use crate::payload::ContactPayload;

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Endpoint rejected submission with status {0}")]
    Status(u16),
}

/// Record of one accepted submission, for logging and metrics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReceipt {
    pub backend: &'static str,
    /// HTTP status when the backend observes one; the form relay is
    /// fire-and-forget and reports none.
    pub status: Option<u16>,
    pub at: DateTime<Utc>,
}

/// The external submission collaborator.
#[async_trait]
pub trait SubmissionBackend: Send + Sync {
    fn id(&self) -> &'static str;

    async fn submit(&self, payload: &ContactPayload) -> Result<SubmissionReceipt, SubmissionError>;
}

/// Test backend that records payloads instead of sending them, and can be
/// told to fail the next attempts.
#[derive(Default)]
pub struct RecordingBackend {
    submitted: Mutex<Vec<ContactPayload>>,
    failing: Mutex<bool>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock() = failing;
    }

    pub fn submissions(&self) -> Vec<ContactPayload> {
        self.submitted.lock().clone()
    }
}

#[async_trait]
impl SubmissionBackend for RecordingBackend {
    fn id(&self) -> &'static str {
        "recording"
    }

    async fn submit(&self, payload: &ContactPayload) -> Result<SubmissionReceipt, SubmissionError> {
        if *self.failing.lock() {
            return Err(SubmissionError::Status(503));
        }
        self.submitted.lock().push(payload.clone());
        Ok(SubmissionReceipt {
            backend: self.id(),
            status: Some(200),
            at: Utc::now(),
        })
    }
}
