use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::ScreeningError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyQuestion {
    pub id: String,
    pub text: String,
}

/// One point on the shared five-point agreement scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikertOption {
    pub value: &'static str,
    pub label: &'static str,
}

const LIKERT_OPTIONS: [LikertOption; 5] = [
    LikertOption {
        value: "1",
        label: "Strongly disagree",
    },
    LikertOption {
        value: "2",
        label: "Disagree",
    },
    LikertOption {
        value: "3",
        label: "Undecided",
    },
    LikertOption {
        value: "4",
        label: "Agree",
    },
    LikertOption {
        value: "5",
        label: "Strongly agree",
    },
];

/// The five-point scale shared by every survey question.
pub fn likert_options() -> &'static [LikertOption] {
    &LIKERT_OPTIONS
}

pub(crate) fn option_label(value: &str) -> Option<&'static str> {
    LIKERT_OPTIONS
        .iter()
        .find(|o| o.value == value)
        .map(|o| o.label)
}

static DEFAULT_QUESTIONS: Lazy<Vec<SurveyQuestion>> = Lazy::new(|| {
    vec![
        SurveyQuestion {
            id: "q1".into(),
            text: "I tend to withdraw from social settings because following \
                   conversations is hard."
                .into(),
        },
        SurveyQuestion {
            id: "q2".into(),
            text: "I struggle to hear conversations in places like restaurants and at parties."
                .into(),
        },
        SurveyQuestion {
            id: "q3".into(),
            text: "Improving my hearing matters to me.".into(),
        },
    ]
});

pub fn default_questions() -> &'static [SurveyQuestion] {
    &DEFAULT_QUESTIONS
}

/// Stepper over the Likert questions.
///
/// Selecting an answer never advances by itself, and advancing requires the
/// current question to have one. `step == questions.len()` is the terminal
/// state.
pub struct SurveyRunner {
    questions: Vec<SurveyQuestion>,
    step: usize,
    answers: HashMap<String, String>,
}

impl SurveyRunner {
    pub fn new(questions: Vec<SurveyQuestion>) -> Self {
        Self {
            questions,
            step: 0,
            answers: HashMap::new(),
        }
    }

    pub fn questions(&self) -> &[SurveyQuestion] {
        &self.questions
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn current_question(&self) -> Option<&SurveyQuestion> {
        self.questions.get(self.step)
    }

    pub fn is_completed(&self) -> bool {
        self.step == self.questions.len()
    }

    pub fn answers(&self) -> &HashMap<String, String> {
        &self.answers
    }

    pub fn answer_for(&self, question_id: &str) -> Option<&str> {
        self.answers.get(question_id).map(String::as_str)
    }

    /// Store (or overwrite) the answer for a question. Does not advance.
    pub fn select_answer(&mut self, question_id: &str, value: &str) -> Result<(), ScreeningError> {
        if !self.questions.iter().any(|q| q.id == question_id) {
            return Err(ScreeningError::UnknownQuestion {
                id: question_id.to_owned(),
            });
        }
        if option_label(value).is_none() {
            return Err(ScreeningError::UnknownOption {
                value: value.to_owned(),
            });
        }
        self.answers
            .insert(question_id.to_owned(), value.to_owned());
        Ok(())
    }

    /// Whether the "next" control should be live for the current question.
    pub fn can_advance(&self) -> bool {
        self.current_question()
            .map(|q| self.answers.contains_key(&q.id))
            .unwrap_or(false)
    }

    /// Move past the current question. Rejected while it has no answer.
    pub fn advance(&mut self) -> Result<(), ScreeningError> {
        let question = self
            .current_question()
            .ok_or(ScreeningError::SurveyCompleted)?;
        if !self.answers.contains_key(&question.id) {
            return Err(ScreeningError::StepUnanswered);
        }
        self.step += 1;
        Ok(())
    }

    pub fn reset(&mut self) {
        self.step = 0;
        self.answers.clear();
    }
}
