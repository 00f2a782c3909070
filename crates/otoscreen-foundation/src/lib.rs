pub mod clock;
pub mod error;
pub mod shutdown;
pub mod state;

pub use clock::{real_clock, test_clock, Clock, RealClock, SharedClock, TestClock};
pub use error::{AppError, PlaybackError, RecoveryStrategy};
pub use shutdown::{ShutdownGuard, ShutdownHandler};
pub use state::{AppState, StateManager};
