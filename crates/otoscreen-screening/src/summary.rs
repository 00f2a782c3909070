//! Human-readable renderings of the two sessions.
//!
//! The results route takes one `question: answer` line per entry; the form
//! relay takes compact `question:answer` pairs joined by `"; "`. Both render
//! only answered entries, in question order, and yield `None` when nothing
//! is answered.

use crate::survey::{option_label, SurveyRunner};
use crate::test_runner::TestRunner;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryStyle {
    /// One entry per line, `label: answer`.
    Multiline,
    /// `label:answer` pairs joined by `"; "`.
    Compact,
}

pub fn render_test(runner: &TestRunner, style: SummaryStyle) -> Option<String> {
    if runner.responses().is_empty() {
        return None;
    }
    let entries = runner.responses().iter().enumerate().map(|(i, &heard)| {
        let question = &runner.bank().questions()[i];
        match style {
            SummaryStyle::Multiline => format!(
                "{} - {}: {}",
                question.frequency_label,
                question.volume_label(),
                if heard { "Yes" } else { "No" }
            ),
            SummaryStyle::Compact => format!(
                "{}-{}:{}",
                question.frequency_label,
                question.volume_label(),
                if heard { "heard" } else { "not heard" }
            ),
        }
    });
    Some(join(entries, style))
}

pub fn render_survey(runner: &SurveyRunner, style: SummaryStyle) -> Option<String> {
    let entries: Vec<String> = runner
        .questions()
        .iter()
        .filter_map(|question| {
            let value = runner.answer_for(&question.id)?;
            let label = option_label(value).unwrap_or(value);
            Some(match style {
                SummaryStyle::Multiline => format!("{}: {}", question.text, label),
                SummaryStyle::Compact => format!("{}:{}", question.text, label),
            })
        })
        .collect();
    if entries.is_empty() {
        return None;
    }
    Some(join(entries.into_iter(), style))
}

fn join(entries: impl Iterator<Item = String>, style: SummaryStyle) -> String {
    let separator = match style {
        SummaryStyle::Multiline => "\n",
        SummaryStyle::Compact => "; ",
    };
    entries.collect::<Vec<_>>().join(separator)
}
