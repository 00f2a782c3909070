//! Line-oriented terminal driver for the screening flow.
//!
//! Stands in for the original page: it renders the current stage, maps typed
//! commands onto flow operations, shows playback progress, and hosts the
//! delayed landing contact prompt as a modal form.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;

use otoscreen_audio::PlaybackEvent;
use otoscreen_foundation::ShutdownGuard;
use otoscreen_intake::{ContactForm, MessagingLink};
use otoscreen_screening::likert_options;

use crate::flow::{submit_standalone, FlowEvent, FlowStage};
use crate::runtime::AppHandle;

enum InputSource {
    Stdin(Lines<BufReader<Stdin>>),
    Script(std::vec::IntoIter<String>),
}

impl InputSource {
    fn stdin() -> Self {
        Self::Stdin(BufReader::new(tokio::io::stdin()).lines())
    }

    fn script(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading script {}", path.display()))?;
        let lines: Vec<String> = raw
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(str::to_owned)
            .collect();
        Ok(Self::Script(lines.into_iter()))
    }

    async fn next_line(&mut self) -> Option<String> {
        match self {
            Self::Stdin(lines) => lines.next_line().await.ok().flatten(),
            Self::Script(iter) => iter.next(),
        }
    }
}

pub async fn run(
    handle: &mut AppHandle,
    shutdown: &ShutdownGuard,
    script: Option<&Path>,
) -> Result<()> {
    let mut input = match script {
        Some(path) => InputSource::script(path)?,
        None => InputSource::stdin(),
    };
    let mut events = handle.player.subscribe();
    let mut stage_events = handle.flow.subscribe();
    let mut landing_form: Option<ContactForm> = None;
    let mut last_decile: u32 = 0;

    println!("Welcome. Put on your headphones and answer each tone with yes/no.");
    // A failed first start is already surfaced as a notice; 'r' retries.
    let _ = handle.flow.present_question();
    render(handle, landing_form.as_ref());

    let mut ticker = tokio::time::interval(Duration::from_millis(200));
    loop {
        tokio::select! {
            _ = shutdown.wait() => break,
            _ = ticker.tick() => {
                if landing_form.is_none() && handle.landing.poll() {
                    landing_form = Some(ContactForm::default());
                    render(handle, landing_form.as_ref());
                }
                drain_playback(&mut events, &mut last_decile);
                while let Ok(FlowEvent::StageEntered(stage)) = stage_events.try_recv() {
                    tracing::debug!(?stage, "Stage entered");
                }
            }
            line = input.next_line() => {
                let Some(line) = line else { break };
                let line = line.trim().to_string();
                if line.is_empty() {
                    continue;
                }
                if line == "quit" {
                    break;
                }
                if line.starts_with("wait ") {
                    if let Ok(ms) = line[5..].trim().parse::<u64>() {
                        tokio::time::sleep(Duration::from_millis(ms)).await;
                    }
                    if landing_form.is_none() && handle.landing.poll() {
                        landing_form = Some(ContactForm::default());
                    }
                    render(handle, landing_form.as_ref());
                    continue;
                }

                match landing_form.as_mut() {
                    Some(form) => {
                        if landing_command(handle, form, &line).await {
                            landing_form = None;
                        }
                    }
                    None => flow_command(handle, &line).await,
                }
                render(handle, landing_form.as_ref());
            }
        }
    }
    Ok(())
}

async fn flow_command(handle: &mut AppHandle, line: &str) {
    let result = match (handle.flow.stage(), line) {
        (FlowStage::Testing, "y" | "yes") => handle.flow.answer(true),
        (FlowStage::Testing, "n" | "no") => handle.flow.answer(false),
        (FlowStage::Testing, "r" | "replay") => match handle.flow.toggle_playback() {
            Ok(playing) => {
                println!("{}", if playing { "Playing." } else { "Paused." });
                Ok(())
            }
            Err(e) => Err(e),
        },
        (FlowStage::Survey, "1" | "2" | "3" | "4" | "5") => {
            let id = handle
                .flow
                .survey()
                .current_question()
                .map(|q| q.id.clone());
            match id {
                Some(id) => handle.flow.select_survey_answer(&id, line),
                None => Ok(()),
            }
        }
        (FlowStage::Survey, "next") => handle.flow.advance_survey(),
        (FlowStage::ThankYou, "c" | "continue") => handle.flow.continue_to_contact(),
        (FlowStage::Contact, "send") => match handle.flow.submit().await {
            Ok(receipt) => {
                handle.landing.suppress();
                println!("Sent via {}.", receipt.backend);
                Ok(())
            }
            Err(e) => Err(e),
        },
        (FlowStage::Contact, "branches") => {
            for branch in &handle.config.intake.branches {
                println!(
                    "  {} | {} | {}",
                    branch.name, branch.phone, branch.address
                );
                if let Ok(url) = branch.map_url() {
                    println!("    map: {url}");
                }
            }
            Ok(())
        }
        (FlowStage::Contact, "chat") => {
            let link = MessagingLink::new(handle.config.intake.messaging_contact.clone());
            match link.url() {
                Ok(url) => println!("Chat with us: {url}"),
                Err(e) => println!("Chat link unavailable: {e}"),
            }
            Ok(())
        }
        (FlowStage::Contact, _) if line.contains(' ') || is_field(line) => {
            edit_form_field(handle, line)
        }
        (FlowStage::ThankYouPopup, "close") => handle.flow.dismiss_thanks(),
        (_, "restart") => {
            handle.flow.abort();
            let _ = handle.flow.present_question();
            Ok(())
        }
        _ => {
            println!("Unrecognized command: {line}");
            Ok(())
        }
    };

    if let Err(e) = result {
        println!("{e}");
    }
}

fn is_field(word: &str) -> bool {
    matches!(word, "name" | "email" | "phone" | "comment")
}

fn edit_form_field(handle: &mut AppHandle, line: &str) -> Result<(), crate::flow::FlowError> {
    let (field, value) = line.split_once(' ').unwrap_or((line, ""));
    if !is_field(field) {
        println!("Unrecognized command: {line}");
        return Ok(());
    }
    let form = handle.flow.form_mut()?;
    set_field(form, field, value);
    Ok(())
}

fn set_field(form: &mut ContactForm, field: &str, value: &str) {
    let value = value.trim().to_string();
    match field {
        "name" => form.name = value,
        "email" => form.email = value,
        "phone" => form.phone = value,
        "comment" => form.comment = value,
        _ => {}
    }
}

/// Handle a command while the landing prompt is up. Returns true once the
/// prompt is dismissed (submission is the only way out).
async fn landing_command(handle: &mut AppHandle, form: &mut ContactForm, line: &str) -> bool {
    if line == "send" {
        match submit_standalone(handle.backend.as_ref(), &handle.metrics, form).await {
            Ok(receipt) => {
                handle.landing.suppress();
                println!("Thank you! Sent via {}. We will call you back.", receipt.backend);
                return true;
            }
            Err(e) => {
                println!("{e}");
                return false;
            }
        }
    }
    let (field, value) = line.split_once(' ').unwrap_or((line, ""));
    if is_field(field) {
        set_field(form, field, value);
    } else {
        println!("Please fill the form (name/phone required), then 'send'.");
    }
    false
}

fn drain_playback(events: &mut broadcast::Receiver<PlaybackEvent>, last_decile: &mut u32) {
    loop {
        match events.try_recv() {
            Ok(PlaybackEvent::Started { .. }) => {
                *last_decile = 0;
                println!("[tone playing]");
            }
            Ok(PlaybackEvent::Progress { ratio, .. }) => {
                let decile = (ratio * 10.0) as u32;
                if decile > *last_decile {
                    *last_decile = decile;
                    println!("[tone {}%]", decile * 10);
                }
            }
            Ok(PlaybackEvent::Ended { .. }) => {
                println!("[tone finished; answer yes/no]");
            }
            Ok(PlaybackEvent::Failed { reason, .. }) => {
                println!("[playback failed: {reason}]");
            }
            Err(TryRecvError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }
}

fn render(handle: &AppHandle, landing_form: Option<&ContactForm>) {
    if let Some(form) = landing_form {
        println!();
        println!("== Leave your number, we will call you ==");
        println!("  name:    {}", form.name);
        println!("  phone:   {}", form.phone);
        println!("  email:   {}", form.email);
        println!("  comment: {}", form.comment);
        println!("Commands: name <..>, phone <..>, email <..>, comment <..>, send");
        return;
    }

    match handle.flow.stage() {
        FlowStage::Testing => {
            let progress = handle.flow.test().progress();
            if let Some(question) = handle.flow.test().current_question() {
                println!();
                println!(
                    "-- Question {}/{} | {} at {} --",
                    question.id,
                    progress.total,
                    question.frequency_label,
                    question.volume_label()
                );
                let ticks = otoscreen_audio::volume_ticks(question.volume);
                let bar: String = (0..5).map(|i| if i < ticks { '#' } else { '-' }).collect();
                println!("Volume: [{bar}]");
                println!("{}", question.instruction);
                println!("Commands: yes, no, r (pause/replay), restart, quit");
            }
        }
        FlowStage::Survey => {
            if let Some(question) = handle.flow.survey().current_question() {
                println!();
                println!(
                    "-- Survey {}/{} --",
                    handle.flow.survey().step() + 1,
                    handle.flow.survey().questions().len()
                );
                println!("{}", question.text);
                for option in likert_options() {
                    let mark = if handle.flow.survey().answer_for(&question.id) == Some(option.value)
                    {
                        "*"
                    } else {
                        " "
                    };
                    println!(" {mark}{}. {}", option.value, option.label);
                }
                println!("Commands: 1-5 to answer, next, restart, quit");
            }
        }
        FlowStage::ThankYou => {
            println!();
            println!("== Thank you for completing the test ==");
            if let Some(report) = handle.flow.test().report() {
                println!("{}", report.notice_text());
            }
            println!("Type 'continue' to leave your contact details.");
        }
        FlowStage::Contact => {
            let form = handle.flow.form();
            println!();
            println!("== Contact us ==");
            println!("  name:    {}", form.name);
            println!("  phone:   {}", form.phone);
            println!("  email:   {}", form.email);
            println!("  comment: {}", form.comment);
            let ready = if handle.flow.can_submit() {
                "ready to send"
            } else {
                "name and phone required"
            };
            println!("Commands: name/phone/email/comment <..>, send ({ready}), branches, chat");
        }
        FlowStage::ThankYouPopup => {
            println!();
            println!("== Your message has been received ==");
            println!("We will get back to you as soon as possible. Type 'close'.");
        }
    }
}
