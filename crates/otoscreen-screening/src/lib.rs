//! Screening domain: the nine-tone hearing self-test and the short Likert
//! survey, as pure state machines. Neither runner does I/O; the flow layer
//! drives playback and notifications around them.

use thiserror::Error;

pub mod stimulus;
pub mod summary;
pub mod survey;
pub mod test_runner;

pub use stimulus::{default_bank, FrequencyBand, StimulusBank, StimulusQuestion};
pub use summary::{render_survey, render_test, SummaryStyle};
pub use survey::{default_questions, likert_options, LikertOption, SurveyQuestion, SurveyRunner};
pub use test_runner::{Classification, TestProgress, TestReport, TestRunner};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScreeningError {
    #[error("Test already completed")]
    TestCompleted,

    #[error("Current survey question has no answer yet")]
    StepUnanswered,

    #[error("Survey already completed")]
    SurveyCompleted,

    #[error("Unknown survey question: {id}")]
    UnknownQuestion { id: String },

    #[error("Unknown answer option: {value}")]
    UnknownOption { value: String },
}
