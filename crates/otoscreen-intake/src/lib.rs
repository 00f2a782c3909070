//! Contact capture and submission for otoscreen.
//!
//! The form itself is plain state with a trim-based validity rule; the
//! network edge is the [`backend::SubmissionBackend`] seam with two real
//! implementations (the third-party form relay and the JSON results route)
//! plus a recording stub for tests.

pub mod backend;
pub mod form;
pub mod links;
pub mod payload;
pub mod relay;
pub mod results_api;

pub use backend::{RecordingBackend, SubmissionBackend, SubmissionError, SubmissionReceipt};
pub use form::ContactForm;
pub use links::{Branch, MessagingLink};
pub use payload::ContactPayload;
pub use relay::FormRelayBackend;
pub use results_api::ResultsApiBackend;
