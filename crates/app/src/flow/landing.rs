use std::time::{Duration, Instant};

use otoscreen_foundation::SharedClock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GateState {
    Armed,
    Shown,
    Suppressed,
}

/// Delayed landing contact prompt.
///
/// Arms on construction and fires exactly once when the delay elapses. A
/// successful submission, from the prompt or from the main flow, suppresses
/// it for the rest of the process lifetime.
pub struct LandingGate {
    clock: SharedClock,
    deadline: Instant,
    state: GateState,
}

impl LandingGate {
    pub fn new(clock: SharedClock, delay: Duration) -> Self {
        let deadline = clock.now() + delay;
        Self {
            clock,
            deadline,
            state: GateState::Armed,
        }
    }

    /// True exactly once, when the delay has elapsed and the prompt has not
    /// been suppressed in the meantime.
    pub fn poll(&mut self) -> bool {
        if self.state == GateState::Armed && self.clock.now() >= self.deadline {
            self.state = GateState::Shown;
            return true;
        }
        false
    }

    pub fn is_shown(&self) -> bool {
        self.state == GateState::Shown
    }

    pub fn suppress(&mut self) {
        self.state = GateState::Suppressed;
    }

    pub fn is_suppressed(&self) -> bool {
        self.state == GateState::Suppressed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use otoscreen_foundation::test_clock;

    #[test]
    fn fires_exactly_once_after_the_delay() {
        let clock = test_clock();
        let mut gate = LandingGate::new(clock.clone(), Duration::from_millis(1000));

        assert!(!gate.poll());
        clock.advance(Duration::from_millis(999));
        assert!(!gate.poll());
        clock.advance(Duration::from_millis(1));
        assert!(gate.poll());
        assert!(gate.is_shown());

        clock.advance(Duration::from_secs(5));
        assert!(!gate.poll());
    }

    #[test]
    fn suppression_before_the_deadline_wins() {
        let clock = test_clock();
        let mut gate = LandingGate::new(clock.clone(), Duration::from_millis(1000));

        gate.suppress();
        clock.advance(Duration::from_secs(2));
        assert!(!gate.poll());
        assert!(gate.is_suppressed());
    }

    #[test]
    fn suppression_after_showing_is_permanent() {
        let clock = test_clock();
        let mut gate = LandingGate::new(clock.clone(), Duration::from_millis(10));

        clock.advance(Duration::from_millis(10));
        assert!(gate.poll());
        gate.suppress();
        clock.advance(Duration::from_secs(60));
        assert!(!gate.poll());
        assert!(gate.is_suppressed());
    }
}
