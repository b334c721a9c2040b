//! Headless mode runner - drives one run or export without an editor UI
//!
//! Loads a textual sketch, starts the toolchain, issues the request and
//! forwards engine events to stdout until the job finishes.

use std::path::{Path, PathBuf};

use tokio::sync::broadcast;

use sketchd_app::{sanitize, validate, Engine, EngineEvent, JobOutcome, Message};
use sketchd_core::prelude::*;
use sketchd_core::{DeviceId, PersistedSketch, RepresentationKind};

use super::HeadlessEvent;

/// What the headless host asks the toolchain to do
#[derive(Debug, Clone, PartialEq, Eq)]
enum JobRequest {
    Run,
    Export(PathBuf),
}

/// Compile and upload `file` to `device`
pub async fn run_sketch(sketchbook: &Path, file: &Path, device: &str) -> Result<()> {
    run_job(sketchbook, file, device, JobRequest::Run).await
}

/// Compile `file` for `device` into a binary at `dest`
pub async fn run_export(sketchbook: &Path, file: &Path, dest: &Path, device: &str) -> Result<()> {
    run_job(sketchbook, file, device, JobRequest::Export(dest.to_path_buf())).await
}

/// Print the Save-As validation result for `name`
pub fn validate_name(name: &str, existing: &[String]) {
    let result = validate(name, existing).map(|e| e.code()).unwrap_or("OK");
    HeadlessEvent::validation(name, sanitize(name), result).emit();
}

/// Block sketches are markup files; everything else is source text
pub fn detect_kind(file: &Path, text: &str) -> RepresentationKind {
    let markup_ext = file
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("xml"));
    if markup_ext || text.trim_start().starts_with('<') {
        RepresentationKind::Visual
    } else {
        RepresentationKind::Textual
    }
}

/// Title a sketch file is known by: its file stem
pub fn sketch_title(file: &Path) -> String {
    file.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "sketch".to_string())
}

/// Read a textual sketch from disk
pub fn load_textual(file: &Path, device: &str) -> Result<(PersistedSketch, String)> {
    let text = std::fs::read_to_string(file)?;
    if detect_kind(file, &text) == RepresentationKind::Visual {
        return Err(Error::malformed_sketch(
            "block sketches need a block renderer and cannot be run headless",
        ));
    }
    let device = DeviceId::new(device)?;
    let sketch = PersistedSketch::from_container(RepresentationKind::Textual, &text, &device)?;
    Ok((sketch, sketch_title(file)))
}

async fn run_job(sketchbook: &Path, file: &Path, device: &str, request: JobRequest) -> Result<()> {
    info!("═══════════════════════════════════════════════════════");
    info!("sketchd starting in HEADLESS mode");
    info!("Sketch: {} ({:?})", file.display(), request);
    info!("═══════════════════════════════════════════════════════");

    let (sketch, title) = match load_textual(file, device) {
        Ok(loaded) => loaded,
        Err(e) => {
            HeadlessEvent::error(e.to_string(), true).emit();
            return Err(e);
        }
    };

    let mut engine = Engine::new(sketchbook.to_path_buf());
    let mut events = engine.subscribe();

    if let Err(e) = engine.start_toolchain() {
        HeadlessEvent::error(e.to_string(), true).emit();
        engine.shutdown().await;
        return Err(e);
    }
    HeadlessEvent::toolchain_started(&engine.settings.toolchain.command).emit();

    engine.process_message(Message::LoadSketch { sketch, title });
    let start = match request {
        JobRequest::Run => Message::RunToggle,
        JobRequest::Export(dest) => Message::ExportPathChosen { path: Some(dest) },
    };
    engine.process_message(start);

    let outcome = headless_event_loop(&mut engine, &mut events).await;

    engine.shutdown().await;
    info!("sketchd headless mode exiting");

    match outcome {
        Some(JobOutcome::Completed) => Ok(()),
        Some(JobOutcome::Cancelled) => Err(Error::toolchain("job cancelled")),
        Some(JobOutcome::Aborted) => Err(Error::toolchain("job aborted")),
        None => Err(Error::toolchain("interrupted before the job finished")),
    }
}

/// Process messages until the job finishes. The first Ctrl-C stops a running
/// job; a second one (or one before the toolchain acknowledged) gives up.
async fn headless_event_loop(
    engine: &mut Engine,
    events: &mut broadcast::Receiver<EngineEvent>,
) -> Option<JobOutcome> {
    let mut stop_sent = false;

    loop {
        if let Some(outcome) = forward_events(events) {
            return Some(outcome);
        }

        tokio::select! {
            msg = engine.msg_rx.recv() => {
                let Some(msg) = msg else {
                    info!("Message channel closed");
                    return None;
                };
                engine.process_message(msg);
            }
            _ = tokio::signal::ctrl_c() => {
                if stop_sent || !engine.state.is_running() {
                    warn!("Interrupted");
                    return None;
                }
                info!("Ctrl-C, stopping the running job");
                stop_sent = true;
                engine.process_message(Message::RunToggle);
            }
        }
    }
}

/// Print pending engine events; returns the outcome once the job finished
fn forward_events(events: &mut broadcast::Receiver<EngineEvent>) -> Option<JobOutcome> {
    let mut finished = None;
    loop {
        match events.try_recv() {
            Ok(event) => {
                if let Some(headless) = HeadlessEvent::from_engine_event(&event) {
                    headless.emit();
                }
                if let EngineEvent::JobFinished { outcome } = event {
                    finished = Some(outcome);
                }
            }
            Err(broadcast::error::TryRecvError::Lagged(n)) => {
                warn!("Dropped {} engine events", n);
            }
            Err(_) => return finished,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sketchd_app::NotificationLevel;

    #[test]
    fn test_forward_events_reports_outcome() {
        let (tx, mut rx) = broadcast::channel(8);
        tx.send(EngineEvent::StageChanged {
            stage: "COMPILE".into(),
        })
        .unwrap();
        tx.send(EngineEvent::JobFinished {
            outcome: JobOutcome::Completed,
        })
        .unwrap();
        tx.send(EngineEvent::NotificationRaised {
            id: 1,
            text: "Upload finished.".into(),
            level: NotificationLevel::Success,
        })
        .unwrap();

        assert_eq!(forward_events(&mut rx), Some(JobOutcome::Completed));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_forward_events_without_finish() {
        let (tx, mut rx) = broadcast::channel(8);
        tx.send(EngineEvent::DirtyChanged { unsaved: true }).unwrap();
        assert_eq!(forward_events(&mut rx), None);
    }

    #[test]
    fn test_load_textual_rejects_block_markup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lights.xml");
        std::fs::write(&path, "<xml><block type=\"led\"/></xml>").unwrap();

        let err = load_textual(&path, "cm:esp8266:nibble").unwrap_err();
        assert!(matches!(err, Error::MalformedSketch { .. }));
    }

    #[test]
    fn test_load_textual_reads_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blink.ino");
        std::fs::write(&path, "void loop() {}").unwrap();

        let (sketch, title) = load_textual(&path, "cm:esp8266:nibble").unwrap();
        assert_eq!(title, "blink");
        assert_eq!(sketch.kind, RepresentationKind::Textual);
        assert_eq!(sketch.payload, "void loop() {}");
        assert_eq!(sketch.device_id.as_str(), "cm:esp8266:nibble");
    }

    #[test]
    fn test_load_textual_rejects_empty_device() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blink.ino");
        std::fs::write(&path, "void loop() {}").unwrap();

        assert!(matches!(
            load_textual(&path, ""),
            Err(Error::InvalidDeviceId)
        ));
    }
}
