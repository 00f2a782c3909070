use serde::{Deserialize, Serialize};

use crate::stimulus::{StimulusBank, StimulusQuestion};
use crate::ScreeningError;

/// Outcome classification for a completed test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Classification {
    Normal,
    MildLossSuspected,
    ReferToSpecialist,
}

impl Classification {
    pub fn from_percentage(percentage: f32) -> Self {
        if percentage >= 80.0 {
            Self::Normal
        } else if percentage >= 50.0 {
            Self::MildLossSuspected
        } else {
            Self::ReferToSpecialist
        }
    }

    /// Sentence appended to the completion notification.
    pub fn sentence(&self) -> &'static str {
        match self {
            Self::Normal => "Your hearing appears normal.",
            Self::MildLossSuspected => "A mild hearing loss is possible.",
            Self::ReferToSpecialist => "We recommend consulting a specialist.",
        }
    }
}

/// Summary computed when the last response is recorded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TestReport {
    pub heard: usize,
    pub total: usize,
    pub percentage: f32,
    pub classification: Classification,
}

impl TestReport {
    fn from_responses(responses: &[bool]) -> Self {
        let heard = responses.iter().filter(|&&r| r).count();
        let total = responses.len();
        let percentage = if total == 0 {
            0.0
        } else {
            heard as f32 / total as f32 * 100.0
        };
        Self {
            heard,
            total,
            percentage,
            classification: Classification::from_percentage(percentage),
        }
    }

    /// Text of the completion notification.
    pub fn notice_text(&self) -> String {
        format!(
            "Heard {}/{} tones. {}",
            self.heard,
            self.total,
            self.classification.sentence()
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestProgress {
    pub answered: usize,
    pub total: usize,
    pub percent: u32,
}

/// State machine for the tone test.
///
/// One response per question, recorded in order, each set exactly once.
/// Playback is driven by the flow layer around `answer`.
pub struct TestRunner {
    bank: StimulusBank,
    current: usize,
    responses: Vec<bool>,
    report: Option<TestReport>,
}

impl TestRunner {
    pub fn new(bank: StimulusBank) -> Self {
        let capacity = bank.len();
        Self {
            bank,
            current: 0,
            responses: Vec::with_capacity(capacity),
            report: None,
        }
    }

    pub fn bank(&self) -> &StimulusBank {
        &self.bank
    }

    /// The question under test, `None` once completed.
    pub fn current_question(&self) -> Option<&StimulusQuestion> {
        if self.is_completed() {
            None
        } else {
            self.bank.get(self.current)
        }
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn is_completed(&self) -> bool {
        self.report.is_some()
    }

    pub fn responses(&self) -> &[bool] {
        &self.responses
    }

    pub fn report(&self) -> Option<&TestReport> {
        self.report.as_ref()
    }

    pub fn progress(&self) -> TestProgress {
        let total = self.bank.len();
        let answered = self.responses.len();
        let percent = if total == 0 {
            0
        } else {
            (answered as f32 / total as f32 * 100.0).round() as u32
        };
        TestProgress {
            answered,
            total,
            percent,
        }
    }

    /// Record the response for the current question and advance.
    ///
    /// Returns the completion report when this was the last question.
    /// Answering after completion is rejected; no recorded response is ever
    /// overwritten.
    pub fn answer(&mut self, heard: bool) -> Result<Option<TestReport>, ScreeningError> {
        if self.is_completed() {
            return Err(ScreeningError::TestCompleted);
        }
        self.responses.push(heard);
        self.current += 1;

        if self.current == self.bank.len() {
            let report = TestReport::from_responses(&self.responses);
            self.report = Some(report);
            Ok(Some(report))
        } else {
            Ok(None)
        }
    }

    /// Discard the session and start over from the first question.
    pub fn reset(&mut self) {
        self.current = 0;
        self.responses.clear();
        self.report = None;
    }
}
