//! Engine - shared orchestration state for hosting shells
//!
//! The Engine owns the editor state, the message channel, the toolchain
//! connection, the shutdown signal and settings. Hosts feed it `Message`s
//! and subscribe to the `EngineEvent`s it broadcasts.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, watch};

use sketchd_core::prelude::*;
use sketchd_core::{RepresentationKind, ToolchainEvent};
use sketchd_toolchain::{CommandSender, JobKind, JobPhase, RequestTracker, ToolchainProcess};

use crate::config::{self, Settings};
use crate::engine_event::{EngineEvent, JobOutcome};
use crate::message::Message;
use crate::process;
use crate::state::AppState;

/// Lightweight snapshot of state for change detection.
///
/// Captured before message processing, compared after to detect
/// what changed and emit the matching EngineEvents.
#[derive(Debug, Clone, PartialEq)]
struct StateSnapshot {
    editor_open: bool,
    load_generation: u64,
    title: String,
    unsaved: bool,
    save_dialog_open: bool,
    job_phase: JobPhase,
    job_id: Option<u64>,
    job_kind: Option<JobKind>,
    stage: Option<String>,
    last_notification_id: u64,
    device_connected: Option<bool>,
}

impl StateSnapshot {
    fn capture(state: &AppState) -> Self {
        Self {
            editor_open: state.editor_open,
            load_generation: state.load_generation,
            title: state.title().to_string(),
            unsaved: state.unsaved_changes,
            save_dialog_open: state.save_dialog.open,
            job_phase: state.job.phase(),
            job_id: state.job.job_id(),
            job_kind: state.job.kind(),
            stage: state.running_stage.clone(),
            last_notification_id: state.notifications.last_id(),
            device_connected: state.device_connected,
        }
    }
}

/// Orchestration engine for sketchd.
///
/// Encapsulates:
/// - TEA state management
/// - Message channel
/// - Toolchain process and command sender
/// - Shutdown signaling
/// - Event broadcasting for the host
pub struct Engine {
    /// TEA application state (the Model)
    pub state: AppState,

    /// Sender half of the unified message channel.
    /// Clone this to give to input sources (host UI, toolchain bridge, timers).
    pub msg_tx: mpsc::Sender<Message>,

    /// Receiver half of the unified message channel.
    pub msg_rx: mpsc::Receiver<Message>,

    /// Send `true` to stop background tasks
    pub shutdown_tx: watch::Sender<bool>,

    pub shutdown_rx: watch::Receiver<bool>,

    pub settings: Settings,

    /// Directory the toolchain stores sketches in
    pub sketchbook: PathBuf,

    toolchain: Option<ToolchainProcess>,

    cmd_sender: Option<CommandSender>,

    event_tx: broadcast::Sender<EngineEvent>,
}

impl Engine {
    /// Create an Engine with headless editing surfaces.
    ///
    /// Initializes the config directory, loads settings and creates the
    /// message (256) and event (256) channels. The toolchain is not started.
    pub fn new(sketchbook: PathBuf) -> Self {
        if let Err(e) = config::init_config_dir(&sketchbook) {
            warn!("Failed to initialize config directory: {}", e);
        }
        let settings = config::load_settings(&sketchbook);
        let state = AppState::headless(settings);
        Self::with_state(sketchbook, state)
    }

    /// Create an Engine around state built with the host's own surfaces
    pub fn with_state(sketchbook: PathBuf, state: AppState) -> Self {
        let settings = state.settings.clone();
        let (msg_tx, msg_rx) = mpsc::channel::<Message>(256);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (event_tx, _) = broadcast::channel(256);

        Self {
            state,
            msg_tx,
            msg_rx,
            shutdown_tx,
            shutdown_rx,
            settings,
            sketchbook,
            toolchain: None,
            cmd_sender: None,
            event_tx,
        }
    }

    /// Spawn the toolchain and bridge its events into the message channel
    pub fn start_toolchain(&mut self) -> Result<()> {
        if self.toolchain.as_ref().is_some_and(|p| p.is_running()) {
            debug!("Toolchain already running");
            return Ok(());
        }

        let mut spawn = self.settings.toolchain.spawn_config();
        spawn.working_dir = Some(self.sketchbook.clone());

        let (event_tx, mut event_rx) = mpsc::channel::<ToolchainEvent>(256);
        let process = ToolchainProcess::spawn(&spawn, event_tx)?;

        let timeout = Duration::from_millis(self.settings.toolchain.request_timeout_ms);
        let tracker = Arc::new(RequestTracker::new(timeout));
        self.cmd_sender = Some(process.command_sender(tracker));
        self.toolchain = Some(process);

        let msg_tx = self.msg_tx.clone();
        let mut shutdown_rx = self.shutdown_rx.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    event = event_rx.recv() => {
                        let Some(event) = event else { break };
                        if msg_tx.send(Message::Toolchain(event)).await.is_err() {
                            break;
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            debug!("Toolchain bridge finished");
        });

        Ok(())
    }

    /// Command sender for the running toolchain, if any
    pub fn command_sender(&self) -> Option<&CommandSender> {
        self.cmd_sender.as_ref()
    }

    /// Subscribe to engine events.
    ///
    /// Subscribers that fall behind lose the oldest events
    /// (`broadcast::error::RecvError::Lagged`).
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.event_tx.subscribe()
    }

    /// Process a single message through the TEA update cycle and emit
    /// EngineEvents for the state changes it caused
    pub fn process_message(&mut self, msg: Message) {
        let pre = StateSnapshot::capture(&self.state);

        process::process_message(
            &mut self.state,
            msg,
            &self.msg_tx,
            self.cmd_sender.as_ref(),
            &self.event_tx,
        );

        let post = StateSnapshot::capture(&self.state);
        if pre != post {
            self.emit_events(&pre, &post);
        }
    }

    /// Drain and process all pending messages. Returns how many were processed.
    pub fn drain_pending_messages(&mut self) -> usize {
        let mut count = 0;
        while let Ok(msg) = self.msg_rx.try_recv() {
            self.process_message(msg);
            count += 1;
        }
        count
    }

    /// Wait for the next message and process it. Returns false once the channel is closed.
    pub async fn process_next(&mut self) -> bool {
        match self.msg_rx.recv().await {
            Some(msg) => {
                self.process_message(msg);
                true
            }
            None => false,
        }
    }

    pub fn msg_sender(&self) -> mpsc::Sender<Message> {
        self.msg_tx.clone()
    }

    pub fn shutdown_receiver(&self) -> watch::Receiver<bool> {
        self.shutdown_rx.clone()
    }

    /// Emit Shutdown, stop background tasks, fail pending requests and stop the toolchain
    pub async fn shutdown(&mut self) {
        self.emit(EngineEvent::Shutdown);

        let _ = self.shutdown_tx.send(true);

        if let Some(sender) = self.cmd_sender.take() {
            sender.tracker().cancel_all().await;
        }

        if let Some(mut process) = self.toolchain.take() {
            if let Err(e) = process.shutdown().await {
                warn!("Toolchain shutdown failed: {}", e);
            }
        }
    }

    /// Compare pre/post snapshots and broadcast what changed
    fn emit_events(&self, pre: &StateSnapshot, post: &StateSnapshot) {
        if post.load_generation != pre.load_generation {
            if let Some(doc) = self.state.document.as_ref() {
                self.emit(EngineEvent::SketchLoaded {
                    title: doc.title().to_string(),
                    kind: doc.kind(),
                    device_id: doc.device_id().to_string(),
                });
            }
        } else if post.editor_open && pre.title != post.title {
            self.emit(EngineEvent::TitleChanged {
                title: post.title.clone(),
            });
        }

        if pre.unsaved != post.unsaved {
            self.emit(EngineEvent::DirtyChanged {
                unsaved: post.unsaved,
            });
        }

        if !pre.save_dialog_open && post.save_dialog_open {
            self.emit(EngineEvent::SaveDialogOpened);
        }

        self.emit_job_events(pre, post);

        for notification in self
            .state
            .notifications
            .iter()
            .filter(|n| n.id > pre.last_notification_id)
        {
            self.emit(EngineEvent::NotificationRaised {
                id: notification.id,
                text: notification.text.clone(),
                level: notification.level,
            });
        }

        if pre.device_connected != post.device_connected {
            if let Some(connected) = post.device_connected {
                self.emit(EngineEvent::DeviceConnectionChanged { connected });
            }
        }
    }

    fn emit_job_events(&self, pre: &StateSnapshot, post: &StateSnapshot) {
        let new_job = pre.job_id != post.job_id;

        if pre.job_phase.is_active() && (new_job || !post.job_phase.is_active()) {
            let outcome = match post.job_phase {
                JobPhase::Completed if !new_job => JobOutcome::Completed,
                JobPhase::Cancelled if !new_job => JobOutcome::Cancelled,
                _ => JobOutcome::Aborted,
            };
            self.emit(EngineEvent::JobFinished { outcome });
        }

        if post.job_phase == JobPhase::Running && (new_job || pre.job_phase != JobPhase::Running)
        {
            if let Some(kind) = post.job_kind {
                self.emit(EngineEvent::JobStarted {
                    job_id: post.job_id,
                    kind,
                });
            }
        }

        if post.job_phase == JobPhase::Running && pre.stage != post.stage {
            if let Some(stage) = &post.stage {
                self.emit(EngineEvent::StageChanged {
                    stage: stage.clone(),
                });
            }
        }
    }

    /// send() only fails with no receivers, which is fine
    fn emit(&self, event: EngineEvent) {
        let _ = self.event_tx.send(event);
    }

    pub fn editor_open(&self) -> bool {
        self.state.editor_open
    }

    pub fn kind(&self) -> Option<RepresentationKind> {
        self.state.kind()
    }
}
