//! End-to-end flow tests over the simulated sink and recording backend.

use std::sync::Arc;

use otoscreen_app::flow::{submit_standalone, FlowController, FlowError, FlowEvent, FlowStage};
use otoscreen_app::notify::RecordingNotifier;
use otoscreen_audio::{sim::SimulatedSink, TonePlayer};
use otoscreen_foundation::test_clock;
use otoscreen_intake::{ContactForm, RecordingBackend};
use otoscreen_screening::{default_bank, default_questions, ScreeningError, SummaryStyle};
use otoscreen_telemetry::SessionMetrics;

struct Harness {
    flow: FlowController,
    backend: Arc<RecordingBackend>,
    notifier: Arc<RecordingNotifier>,
    metrics: Arc<SessionMetrics>,
}

fn harness(style: SummaryStyle) -> Harness {
    let player = Arc::new(TonePlayer::new(Box::new(SimulatedSink::new(test_clock()))));
    let backend = Arc::new(RecordingBackend::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let metrics = Arc::new(SessionMetrics::default());
    let flow = FlowController::new(
        default_bank().clone(),
        default_questions().to_vec(),
        player,
        backend.clone(),
        notifier.clone(),
        metrics.clone(),
        style,
    );
    Harness {
        flow,
        backend,
        notifier,
        metrics,
    }
}

fn complete_test(flow: &mut FlowController, pattern: &[bool]) {
    flow.present_question().unwrap();
    for &heard in pattern {
        flow.answer(heard).unwrap();
    }
}

fn complete_survey(flow: &mut FlowController) {
    for (id, value) in [("q1", "4"), ("q2", "5"), ("q3", "2")] {
        flow.select_survey_answer(id, value).unwrap();
        flow.advance_survey().unwrap();
    }
}

fn fill_form(flow: &mut FlowController) {
    let form = flow.form_mut().unwrap();
    form.name = "Ali Veli".into();
    form.phone = "05551234567".into();
    form.email = "ali@example.com".into();
}

#[tokio::test]
async fn full_flow_submits_both_summaries_and_shows_the_popup() {
    let mut h = harness(SummaryStyle::Multiline);

    complete_test(&mut h.flow, &[true, true, true, true, true, false, false, false, false]);
    assert_eq!(h.flow.stage(), FlowStage::Survey);
    assert!(h
        .notifier
        .notices()
        .iter()
        .any(|n| n.title == "Test completed!" && n.body.starts_with("Heard 5/9 tones.")));

    complete_survey(&mut h.flow);
    assert_eq!(h.flow.stage(), FlowStage::ThankYou);

    h.flow.continue_to_contact().unwrap();
    assert_eq!(h.flow.stage(), FlowStage::Contact);
    assert!(h.flow.test_summary().unwrap().contains("500 Hz - 80% volume: Yes"));
    assert!(h.flow.survey_summary().unwrap().contains(": Agree"));

    fill_form(&mut h.flow);
    assert!(h.flow.can_submit());
    h.flow.submit().await.unwrap();
    assert_eq!(h.flow.stage(), FlowStage::ThankYouPopup);

    let submissions = h.backend.submissions();
    assert_eq!(submissions.len(), 1);
    let payload = &submissions[0];
    assert_eq!(payload.name, "Ali Veli");
    assert_eq!(payload.test_results.as_deref().unwrap().lines().count(), 9);
    assert_eq!(payload.survey_results.as_deref().unwrap().lines().count(), 3);

    // The form is cleared after a successful send.
    assert_eq!(h.flow.form(), &ContactForm::default());

    h.flow.dismiss_thanks().unwrap();
    assert_eq!(h.flow.stage(), FlowStage::Contact);
}

#[tokio::test]
async fn failed_submission_preserves_form_and_stage_for_retry() {
    let mut h = harness(SummaryStyle::Compact);
    complete_test(&mut h.flow, &[true; 9]);
    complete_survey(&mut h.flow);
    h.flow.continue_to_contact().unwrap();
    fill_form(&mut h.flow);

    h.backend.set_failing(true);
    assert!(matches!(
        h.flow.submit().await,
        Err(FlowError::Submission(_))
    ));
    assert_eq!(h.flow.stage(), FlowStage::Contact);
    assert_eq!(h.flow.form().name, "Ali Veli");
    assert!(h.notifier.notices().iter().any(|n| n.title == "Error"));

    h.backend.set_failing(false);
    h.flow.submit().await.unwrap();
    assert_eq!(h.flow.stage(), FlowStage::ThankYouPopup);

    let snapshot = h.metrics.snapshot();
    assert_eq!(snapshot.submissions_attempted, 2);
    assert_eq!(snapshot.submissions_failed, 1);
    assert_eq!(snapshot.submissions_succeeded, 1);
}

#[tokio::test]
async fn submission_requires_name_and_phone() {
    let mut h = harness(SummaryStyle::Multiline);
    complete_test(&mut h.flow, &[false; 9]);
    complete_survey(&mut h.flow);
    h.flow.continue_to_contact().unwrap();

    assert!(!h.flow.can_submit());
    assert!(matches!(
        h.flow.submit().await,
        Err(FlowError::NotSubmittable)
    ));
    assert!(h.backend.submissions().is_empty());
}

#[tokio::test]
async fn standalone_submission_carries_no_summaries() {
    let h = harness(SummaryStyle::Multiline);
    let form = ContactForm {
        name: "Ayşe".into(),
        phone: "05550001122".into(),
        ..Default::default()
    };

    submit_standalone(h.backend.as_ref(), &h.metrics, &form)
        .await
        .unwrap();

    let submissions = h.backend.submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].test_results, None);
    assert_eq!(submissions[0].survey_results, None);
    assert_eq!(submissions[0].name, "Ayşe");
}

#[test]
fn operations_are_gated_by_stage() {
    let mut h = harness(SummaryStyle::Multiline);

    // Survey and contact operations are rejected while testing.
    assert!(matches!(
        h.flow.select_survey_answer("q1", "3"),
        Err(FlowError::InvalidOperation { .. })
    ));
    assert!(matches!(
        h.flow.form_mut(),
        Err(FlowError::InvalidOperation { .. })
    ));
    assert!(matches!(
        h.flow.dismiss_thanks(),
        Err(FlowError::InvalidOperation { .. })
    ));

    complete_test(&mut h.flow, &[true; 9]);
    // Test answers are rejected once the survey has begun.
    assert!(matches!(
        h.flow.answer(true),
        Err(FlowError::InvalidOperation { .. })
    ));
    // The thank-you page cannot be skipped to from the survey.
    assert!(matches!(
        h.flow.continue_to_contact(),
        Err(FlowError::InvalidOperation { .. })
    ));
}

#[test]
fn survey_advance_without_an_answer_is_rejected() {
    let mut h = harness(SummaryStyle::Multiline);
    complete_test(&mut h.flow, &[true; 9]);

    assert!(!h.flow.can_advance_survey());
    assert!(matches!(
        h.flow.advance_survey(),
        Err(FlowError::Screening(ScreeningError::StepUnanswered))
    ));
    assert_eq!(h.flow.stage(), FlowStage::Survey);

    h.flow.select_survey_answer("q1", "3").unwrap();
    assert!(h.flow.can_advance_survey());
    h.flow.advance_survey().unwrap();
}

#[tokio::test]
async fn stage_entries_are_observable_on_the_event_channel() {
    let mut h = harness(SummaryStyle::Multiline);
    let mut rx = h.flow.subscribe();

    complete_test(&mut h.flow, &[true; 9]);
    complete_survey(&mut h.flow);
    h.flow.continue_to_contact().unwrap();
    fill_form(&mut h.flow);
    h.flow.submit().await.unwrap();
    h.flow.dismiss_thanks().unwrap();

    let mut stages = Vec::new();
    while let Ok(FlowEvent::StageEntered(stage)) = rx.try_recv() {
        stages.push(stage);
    }
    assert_eq!(
        stages,
        [
            FlowStage::Survey,
            FlowStage::ThankYou,
            FlowStage::Contact,
            FlowStage::ThankYouPopup,
            FlowStage::Contact,
        ]
    );

    // A restart is announced on the same channel.
    h.flow.abort();
    assert!(matches!(
        rx.try_recv(),
        Ok(FlowEvent::StageEntered(FlowStage::Testing))
    ));
}

#[test]
fn restart_returns_to_the_first_question_from_any_stage() {
    let mut h = harness(SummaryStyle::Multiline);
    complete_test(&mut h.flow, &[true; 9]);
    h.flow.select_survey_answer("q1", "5").unwrap();

    h.flow.abort();
    assert_eq!(h.flow.stage(), FlowStage::Testing);
    assert_eq!(h.flow.test().progress().answered, 0);
    assert!(h.flow.survey().answers().is_empty());
    assert_eq!(h.metrics.snapshot().flow_resets, 1);

    // The session can run again from scratch.
    h.flow.present_question().unwrap();
    h.flow.answer(true).unwrap();
    assert_eq!(h.flow.test().progress().answered, 1);
}
