use std::sync::Arc;

use thiserror::Error;
use tokio::sync::broadcast;

use otoscreen_audio::TonePlayer;
use otoscreen_foundation::PlaybackError;
use otoscreen_intake::{
    ContactForm, ContactPayload, SubmissionBackend, SubmissionError, SubmissionReceipt,
};
use otoscreen_screening::{
    render_survey, render_test, ScreeningError, StimulusBank, SummaryStyle, SurveyQuestion,
    SurveyRunner, TestRunner,
};
use otoscreen_telemetry::SessionMetrics;

use crate::notify::{Notice, Notifier};

/// The stage the session is in. Stages advance strictly forward except for
/// the popup/contact pair at the end and the global restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowStage {
    Testing,
    Survey,
    ThankYou,
    Contact,
    ThankYouPopup,
}

#[derive(Debug, Clone)]
pub enum FlowEvent {
    StageEntered(FlowStage),
}

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("Operation '{op}' is not valid in stage {stage:?}")]
    InvalidOperation { stage: FlowStage, op: &'static str },

    #[error(transparent)]
    Screening(#[from] ScreeningError),

    #[error(transparent)]
    Playback(#[from] PlaybackError),

    #[error(transparent)]
    Submission(#[from] SubmissionError),

    #[error("Contact form is missing required fields (name and phone)")]
    NotSubmittable,
}

/// Summaries rendered once, when the visitor leaves the thank-you page for
/// the contact stage. Later edits to nothing (the runners are done by then)
/// cannot change what gets submitted.
#[derive(Debug, Clone, Default)]
struct SeededSummaries {
    test: Option<String>,
    survey: Option<String>,
}

/// Sequences the whole session: tone test, survey, thank-you, contact
/// capture and the post-submission popup.
///
/// The runners hold the domain state; the controller adds the stage gate,
/// drives playback around test answers, and owns the submission path.
pub struct FlowController {
    stage: FlowStage,
    test: TestRunner,
    survey: SurveyRunner,
    form: ContactForm,
    seeded: SeededSummaries,
    player: Arc<TonePlayer>,
    backend: Arc<dyn SubmissionBackend>,
    notifier: Arc<dyn Notifier>,
    metrics: Arc<SessionMetrics>,
    summary_style: SummaryStyle,
    events: broadcast::Sender<FlowEvent>,
}

impl FlowController {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        bank: StimulusBank,
        questions: Vec<SurveyQuestion>,
        player: Arc<TonePlayer>,
        backend: Arc<dyn SubmissionBackend>,
        notifier: Arc<dyn Notifier>,
        metrics: Arc<SessionMetrics>,
        summary_style: SummaryStyle,
    ) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            stage: FlowStage::Testing,
            test: TestRunner::new(bank),
            survey: SurveyRunner::new(questions),
            form: ContactForm::default(),
            seeded: SeededSummaries::default(),
            player,
            backend,
            notifier,
            metrics,
            summary_style,
            events,
        }
    }

    pub fn stage(&self) -> FlowStage {
        self.stage
    }

    pub fn test(&self) -> &TestRunner {
        &self.test
    }

    pub fn survey(&self) -> &SurveyRunner {
        &self.survey
    }

    pub fn form(&self) -> &ContactForm {
        &self.form
    }

    pub fn player(&self) -> &Arc<TonePlayer> {
        &self.player
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FlowEvent> {
        self.events.subscribe()
    }

    /// Start playback for the current test question.
    ///
    /// A playback failure is surfaced as a notice and the question stays
    /// answerable; the replay control retries. The question is never
    /// auto-answered on failure.
    pub fn present_question(&self) -> Result<(), FlowError> {
        self.require(FlowStage::Testing, "present_question")?;
        let question = self
            .test
            .current_question()
            .ok_or(FlowError::InvalidOperation {
                stage: self.stage,
                op: "present_question",
            })?;

        match self
            .player
            .start(&question.asset, question.volume, question.asset.lead_in)
        {
            Ok(_) => {
                self.notifier.notify(Notice::new(
                    format!("Question {}/{}", question.id, self.test.bank().len()),
                    format!(
                        "{} at {} ({})",
                        question.frequency_label,
                        question.volume_label(),
                        question.band.label()
                    ),
                ));
                Ok(())
            }
            Err(e) => {
                self.notifier.notify(Notice::new(
                    "Playback problem",
                    format!("The tone could not be played ({e}). Use replay to try again."),
                ));
                Err(e.into())
            }
        }
    }

    /// Record the response for the current question.
    ///
    /// Playback is force-stopped before the response is recorded. On the last
    /// question the completion report is announced and the flow moves to the
    /// survey; otherwise the next question is presented immediately.
    pub fn answer(&mut self, heard: bool) -> Result<(), FlowError> {
        self.require(FlowStage::Testing, "answer")?;
        self.player.stop();

        let report = self.test.answer(heard)?;
        self.metrics.increment_test_answers();

        match report {
            Some(report) => {
                self.notifier
                    .notify(Notice::new("Test completed!", report.notice_text()));
                self.transition(FlowStage::Survey)?;
            }
            None => {
                // Failure is already surfaced by present_question; the
                // listener stays on the new question and can replay.
                let _ = self.present_question();
            }
        }
        Ok(())
    }

    /// Pause or replay the current tone. Returns whether it is now playing.
    ///
    /// When nothing is loaded (a previous start failed), the question is
    /// presented again instead.
    pub fn toggle_playback(&mut self) -> Result<bool, FlowError> {
        self.require(FlowStage::Testing, "toggle_playback")?;
        match self.player.toggle() {
            Ok(playing) => Ok(playing),
            Err(PlaybackError::NotLoaded) => {
                self.present_question()?;
                Ok(true)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn select_survey_answer(&mut self, question_id: &str, value: &str) -> Result<(), FlowError> {
        self.require(FlowStage::Survey, "select_survey_answer")?;
        self.survey.select_answer(question_id, value)?;
        self.metrics.increment_survey_answers();
        Ok(())
    }

    pub fn can_advance_survey(&self) -> bool {
        self.stage == FlowStage::Survey && self.survey.can_advance()
    }

    /// Advance past the current survey question; after the last one the flow
    /// moves to the thank-you stage.
    pub fn advance_survey(&mut self) -> Result<(), FlowError> {
        self.require(FlowStage::Survey, "advance_survey")?;
        self.survey.advance()?;
        if self.survey.is_completed() {
            self.transition(FlowStage::ThankYou)?;
        }
        Ok(())
    }

    /// Leave the thank-you page for the contact stage, freezing the result
    /// summaries that will accompany the submission.
    pub fn continue_to_contact(&mut self) -> Result<(), FlowError> {
        self.require(FlowStage::ThankYou, "continue_to_contact")?;
        self.seeded = SeededSummaries {
            test: render_test(&self.test, self.summary_style),
            survey: render_survey(&self.survey, self.summary_style),
        };
        self.transition(FlowStage::Contact)
    }

    pub fn test_summary(&self) -> Option<&str> {
        self.seeded.test.as_deref()
    }

    pub fn survey_summary(&self) -> Option<&str> {
        self.seeded.survey.as_deref()
    }

    /// Mutable access to the contact form, only while the contact stage (or
    /// its popup) is showing it.
    pub fn form_mut(&mut self) -> Result<&mut ContactForm, FlowError> {
        if matches!(self.stage, FlowStage::Contact | FlowStage::ThankYouPopup) {
            Ok(&mut self.form)
        } else {
            Err(FlowError::InvalidOperation {
                stage: self.stage,
                op: "form_mut",
            })
        }
    }

    pub fn can_submit(&self) -> bool {
        self.stage == FlowStage::Contact && self.form.is_valid()
    }

    /// Submit the contact form together with the seeded summaries.
    ///
    /// On success the form is cleared and the thank-you popup shows; on
    /// failure the form contents and stage are preserved so the visitor can
    /// retry.
    pub async fn submit(&mut self) -> Result<SubmissionReceipt, FlowError> {
        self.require(FlowStage::Contact, "submit")?;
        if !self.form.is_valid() {
            return Err(FlowError::NotSubmittable);
        }

        let payload = ContactPayload::new(
            &self.form,
            self.seeded.test.clone(),
            self.seeded.survey.clone(),
        );
        self.metrics.record_submission_attempt();

        match self.backend.submit(&payload).await {
            Ok(receipt) => {
                self.metrics.record_submission_success();
                tracing::info!(backend = receipt.backend, status = ?receipt.status, "Submission accepted");
                self.form.clear();
                self.notifier.notify(Notice::new(
                    "Thank you!",
                    "Your results were sent. We will be in touch shortly.",
                ));
                self.transition(FlowStage::ThankYouPopup)?;
                Ok(receipt)
            }
            Err(e) => {
                self.metrics.record_submission_failure();
                tracing::warn!(backend = self.backend.id(), error = %e, "Submission failed");
                self.notifier.notify(Notice::new(
                    "Error",
                    "Your results could not be sent. Please try again.",
                ));
                Err(e.into())
            }
        }
    }

    /// Close the post-submission popup, returning to the contact stage.
    pub fn dismiss_thanks(&mut self) -> Result<(), FlowError> {
        self.require(FlowStage::ThankYouPopup, "dismiss_thanks")?;
        self.transition(FlowStage::Contact)
    }

    /// Restart the whole session from the first test question.
    pub fn abort(&mut self) {
        tracing::info!(stage = ?self.stage, "Session restarted");
        self.player.stop();
        self.test.reset();
        self.survey.reset();
        self.form.clear();
        self.seeded = SeededSummaries::default();
        self.stage = FlowStage::Testing;
        self.metrics.increment_flow_resets();
        let _ = self.events.send(FlowEvent::StageEntered(FlowStage::Testing));
    }

    fn require(&self, stage: FlowStage, op: &'static str) -> Result<(), FlowError> {
        if self.stage == stage {
            Ok(())
        } else {
            Err(FlowError::InvalidOperation {
                stage: self.stage,
                op,
            })
        }
    }

    fn transition(&mut self, to: FlowStage) -> Result<(), FlowError> {
        let valid = matches!(
            (self.stage, to),
            (FlowStage::Testing, FlowStage::Survey)
                | (FlowStage::Survey, FlowStage::ThankYou)
                | (FlowStage::ThankYou, FlowStage::Contact)
                | (FlowStage::Contact, FlowStage::ThankYouPopup)
                | (FlowStage::ThankYouPopup, FlowStage::Contact)
        );
        if !valid {
            return Err(FlowError::InvalidOperation {
                stage: self.stage,
                op: "transition",
            });
        }
        tracing::info!("Flow stage: {:?} -> {:?}", self.stage, to);
        self.stage = to;
        let _ = self.events.send(FlowEvent::StageEntered(to));
        Ok(())
    }
}

/// Submit a bare contact form outside the screening flow (the landing
/// prompt). No summaries accompany the payload.
pub async fn submit_standalone(
    backend: &dyn SubmissionBackend,
    metrics: &SessionMetrics,
    form: &ContactForm,
) -> Result<SubmissionReceipt, FlowError> {
    if !form.is_valid() {
        return Err(FlowError::NotSubmittable);
    }
    let payload = ContactPayload::new(form, None, None);
    metrics.record_submission_attempt();
    match backend.submit(&payload).await {
        Ok(receipt) => {
            metrics.record_submission_success();
            Ok(receipt)
        }
        Err(e) => {
            metrics.record_submission_failure();
            Err(e.into())
        }
    }
}
