//! otoscreen application layer: configuration, the flow controller that
//! sequences test, survey and contact capture, and the terminal driver that
//! stands in for the original browser UI.

pub mod config;
pub mod flow;
pub mod notify;
pub mod runtime;
pub mod wizard;
