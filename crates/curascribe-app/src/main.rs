//! CuraScribe application binary - composition root.
//!
//! Wires the focus tracker, dictation controller and in-memory
//! collaborators together, replays the transcripts given on the command
//! line into a single field, or into the form's transcript field with
//! `--transcript`, and prints a JSON report of the outcome.

mod cli;

use std::collections::BTreeMap;
use std::sync::Arc;

use clap::Parser;
use serde::Serialize;
use tokio::sync::broadcast;

use curascribe_core::config::CuraScribeConfig;
use curascribe_core::events::DomainEvent;
use curascribe_core::types::Notification;
use curascribe_dictation::memory::{
    MemoryField, MemoryFormStore, RecordingNotifier, ScriptedRecognizer,
};
use curascribe_dictation::{
    recognition_channel, DictationController, EditableField, FanoutNotifier, FieldHandle,
    FocusTracker, FormStore, RecognitionEvent, ResultSegment, SelectionRange, SpeechRecognizer,
    TracingNotifier,
};

use cli::CliArgs;

/// What the run left behind.
#[derive(Debug, Serialize)]
struct Report {
    field: String,
    value: String,
    selection: SelectionRange,
    store: Option<BTreeMap<String, String>>,
    notifications: Vec<Notification>,
    events: Vec<DomainEvent>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config first, so its log level can seed the filter.
    let config_file = args.resolve_config_path();
    let config = CuraScribeConfig::load_or_default(&config_file);
    let log_level = args.resolve_log_level(&config.general.log_level);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting CuraScribe v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration loaded");

    let dictation = config.dictation.clone();
    let tracker = FocusTracker::from_config(&dictation);

    let recognizer = Arc::new(ScriptedRecognizer::new());
    let recorded = Arc::new(RecordingNotifier::new());
    let notifier = FanoutNotifier::new()
        .with(Arc::new(TracingNotifier))
        .with(recorded.clone());

    let (sink, mut rx) = recognition_channel();
    let (event_tx, mut event_rx) = broadcast::channel::<DomainEvent>(256);

    let store = (!args.no_store).then(|| Arc::new(MemoryFormStore::new()));

    let mut controller = DictationController::new(
        dictation,
        tracker.handle(),
        Some(recognizer.clone() as Arc<dyn SpeechRecognizer>),
        Arc::new(notifier),
        sink,
    )
    .with_event_bus(event_tx);
    if let Some(ref store) = store {
        controller = controller.with_form_store(store.clone() as Arc<dyn FormStore>);
    }

    let memory = if args.textarea {
        MemoryField::textarea(&args.value)
    } else {
        MemoryField::input(&args.value)
    }
    .with_attribute("id", &args.field)
    .with_selection(args.selection());
    let field: FieldHandle = memory.clone();
    tracker.on_focus_in(&field);

    if args.transcript {
        match controller.start_transcript() {
            Ok(_) => {
                // One continuous session; the result list grows with each utterance.
                let mut segments = Vec::new();
                for (index, transcript) in args.transcripts.iter().enumerate() {
                    segments.push(ResultSegment::final_text(transcript.as_str()));
                    recognizer.emit(RecognitionEvent::results(index, segments.clone()));
                }
                controller.stop()?;
                let handled = controller.process_pending(&mut rx).await;
                tracing::debug!(handled, "Transcript session drained");
            }
            Err(e) => tracing::warn!(error = %e, "Transcript capture did not start"),
        }
    } else {
        for transcript in &args.transcripts {
            recognizer.push_script(vec![
                RecognitionEvent::final_result(transcript.as_str()),
                RecognitionEvent::End,
            ]);
            if let Err(e) = controller.toggle() {
                tracing::warn!(error = %e, "Dictation did not start");
                continue;
            }
            let handled = controller.process_pending(&mut rx).await;
            tracing::debug!(handled, "Session drained");
        }
    }

    if let Some(ref code) = args.fail_with {
        recognizer.push_script(vec![
            RecognitionEvent::error(code.as_str()),
            RecognitionEvent::End,
        ]);
        if controller.toggle().is_ok() {
            controller.process_pending(&mut rx).await;
        }
    }

    let mut events = Vec::new();
    while let Ok(event) = event_rx.try_recv() {
        events.push(event);
    }

    let report = Report {
        field: args.field.clone(),
        value: memory.value(),
        selection: memory.selection(),
        store: store.as_ref().map(|s| s.values()),
        notifications: recorded.notifications(),
        events,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
