use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Playback subsystem error: {0}")]
    Playback(#[from] PlaybackError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Shutdown requested")]
    ShutdownRequested,

    #[error("Fatal error, cannot recover: {0}")]
    Fatal(String),

    #[error("Transient error: {0}")]
    Transient(String),
}

#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error("Output device not found: {name:?}")]
    DeviceNotFound { name: Option<String> },

    #[error("No sound loaded")]
    NotLoaded,

    #[error("Default stream config error: {0}")]
    DefaultStreamConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("Build stream error: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("Play stream error: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("Pause stream error: {0}")]
    PauseStream(#[from] cpal::PauseStreamError),

    #[error("Playback backend error: {0}")]
    Backend(String),
}

/// How the flow should react to an error. Nothing in the screening flow is
/// retried automatically; a step either stays put so the user can try again,
/// or the condition is logged and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryStrategy {
    /// Leave the current step untouched; the triggering control retries.
    Reprompt,
    /// Log and continue; no user-visible consequence.
    Ignore,
    Fatal,
}

impl AppError {
    pub fn recovery_strategy(&self) -> RecoveryStrategy {
        match self {
            AppError::Playback(_) => RecoveryStrategy::Reprompt,
            AppError::Transient(_) => RecoveryStrategy::Ignore,
            AppError::Config(_) | AppError::Fatal(_) | AppError::ShutdownRequested => {
                RecoveryStrategy::Fatal
            }
        }
    }
}
