//! Flow layer: the stage machine that sequences the hearing test, survey and
//! contact capture, plus the delayed landing contact prompt.

pub mod controller;
pub mod landing;

pub use controller::{submit_standalone, FlowController, FlowError, FlowEvent, FlowStage};
pub use landing::LandingGate;
