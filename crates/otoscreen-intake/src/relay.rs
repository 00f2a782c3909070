use async_trait::async_trait;
use chrono::Utc;
use url::Url;

use crate::backend::{SubmissionBackend, SubmissionError, SubmissionReceipt};
use crate::payload::ContactPayload;

/// Endpoint A: the third-party form relay.
///
/// The deployed site submits a detached form into a new browsing context and
/// never observes the response, so this backend is fire-and-forget too: a
/// completed POST is accepted without reading the status or body.
pub struct FormRelayBackend {
    client: reqwest::Client,
    endpoint: Url,
}

impl FormRelayBackend {
    pub fn new(endpoint: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
        }
    }
}

#[async_trait]
impl SubmissionBackend for FormRelayBackend {
    fn id(&self) -> &'static str {
        "form-relay"
    }

    async fn submit(&self, payload: &ContactPayload) -> Result<SubmissionReceipt, SubmissionError> {
        let fields = payload.form_fields();
        let response = self
            .client
            .post(self.endpoint.clone())
            .form(&fields)
            .send()
            .await?;
        tracing::debug!(
            endpoint = %self.endpoint,
            status = response.status().as_u16(),
            "Relay submission posted"
        );
        Ok(SubmissionReceipt {
            backend: self.id(),
            status: None,
            at: Utc::now(),
        })
    }
}
