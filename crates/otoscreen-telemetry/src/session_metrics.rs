use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Shared metrics for cross-thread session monitoring.
///
/// Everything the flow touches more than once per second goes through
/// atomics; the only lock is around the last-submission timestamp.
#[derive(Clone)]
pub struct SessionMetrics {
    // Playback tracking
    pub playbacks_started: Arc<AtomicU64>,
    pub playback_failures: Arc<AtomicU64>,
    pub stale_events_dropped: Arc<AtomicU64>, // Events from superseded playbacks

    // Screening progress
    pub test_answers: Arc<AtomicU64>,
    pub survey_answers: Arc<AtomicU64>,
    pub flow_resets: Arc<AtomicU64>,

    // Submission tracking
    pub submissions_attempted: Arc<AtomicU64>,
    pub submissions_succeeded: Arc<AtomicU64>,
    pub submissions_failed: Arc<AtomicU64>,
    pub last_submission_time: Arc<RwLock<Option<Instant>>>,
}

impl Default for SessionMetrics {
    fn default() -> Self {
        Self {
            playbacks_started: Arc::new(AtomicU64::new(0)),
            playback_failures: Arc::new(AtomicU64::new(0)),
            stale_events_dropped: Arc::new(AtomicU64::new(0)),

            test_answers: Arc::new(AtomicU64::new(0)),
            survey_answers: Arc::new(AtomicU64::new(0)),
            flow_resets: Arc::new(AtomicU64::new(0)),

            submissions_attempted: Arc::new(AtomicU64::new(0)),
            submissions_succeeded: Arc::new(AtomicU64::new(0)),
            submissions_failed: Arc::new(AtomicU64::new(0)),
            last_submission_time: Arc::new(RwLock::new(None)),
        }
    }
}

impl SessionMetrics {
    pub fn increment_playbacks(&self) {
        self.playbacks_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_playback_failures(&self) {
        self.playback_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_stale_events(&self) {
        self.stale_events_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_test_answers(&self) {
        self.test_answers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_survey_answers(&self) {
        self.survey_answers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_flow_resets(&self) {
        self.flow_resets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_submission_attempt(&self) {
        self.submissions_attempted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_submission_success(&self) {
        self.submissions_succeeded.fetch_add(1, Ordering::Relaxed);
        *self.last_submission_time.write() = Some(Instant::now());
    }

    pub fn record_submission_failure(&self) {
        self.submissions_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            playbacks_started: self.playbacks_started.load(Ordering::Relaxed),
            playback_failures: self.playback_failures.load(Ordering::Relaxed),
            stale_events_dropped: self.stale_events_dropped.load(Ordering::Relaxed),
            test_answers: self.test_answers.load(Ordering::Relaxed),
            survey_answers: self.survey_answers.load(Ordering::Relaxed),
            flow_resets: self.flow_resets.load(Ordering::Relaxed),
            submissions_attempted: self.submissions_attempted.load(Ordering::Relaxed),
            submissions_succeeded: self.submissions_succeeded.load(Ordering::Relaxed),
            submissions_failed: self.submissions_failed.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the counters, for periodic logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub playbacks_started: u64,
    pub playback_failures: u64,
    pub stale_events_dropped: u64,
    pub test_answers: u64,
    pub survey_answers: u64,
    pub flow_resets: u64,
    pub submissions_attempted: u64,
    pub submissions_succeeded: u64,
    pub submissions_failed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_into_snapshot() {
        let metrics = SessionMetrics::default();
        metrics.increment_playbacks();
        metrics.increment_playbacks();
        metrics.increment_stale_events();
        metrics.record_submission_attempt();
        metrics.record_submission_success();

        let snap = metrics.snapshot();
        assert_eq!(snap.playbacks_started, 2);
        assert_eq!(snap.stale_events_dropped, 1);
        assert_eq!(snap.submissions_attempted, 1);
        assert_eq!(snap.submissions_succeeded, 1);
        assert_eq!(snap.submissions_failed, 0);
        assert!(metrics.last_submission_time.read().is_some());
    }

    #[test]
    fn clones_share_the_same_counters() {
        let metrics = SessionMetrics::default();
        let clone = metrics.clone();
        clone.increment_test_answers();
        assert_eq!(metrics.snapshot().test_answers, 1);
    }
}
