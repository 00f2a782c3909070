use async_trait::async_trait;
use chrono::Utc;
use url::Url;

use crate::backend::{SubmissionBackend, SubmissionError, SubmissionReceipt};
use crate::payload::ContactPayload;

/// Endpoint B: the JSON results route.
///
/// The status is awaited to tell success from failure; the body is never
/// parsed.
pub struct ResultsApiBackend {
    client: reqwest::Client,
    endpoint: Url,
}

impl ResultsApiBackend {
    pub fn new(endpoint: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
        }
    }
}

#[async_trait]
impl SubmissionBackend for ResultsApiBackend {
    fn id(&self) -> &'static str {
        "results-api"
    }

    async fn submit(&self, payload: &ContactPayload) -> Result<SubmissionReceipt, SubmissionError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(payload)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SubmissionError::Status(status.as_u16()));
        }
        Ok(SubmissionReceipt {
            backend: self.id(),
            status: Some(status.as_u16()),
            at: Utc::now(),
        })
    }
}
