//! Command building and request tracking for toolchain communication
//!
//! This module provides:
//! - Request ID allocation (also used as job ids for run/export)
//! - Command building for the NDJSON request format
//! - Response matching with timeouts

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot, RwLock};

use sketchd_core::prelude::*;
use sketchd_core::{DeviceId, RepresentationKind};

use crate::protocol::error_text;

/// Global request ID counter
static REQUEST_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generate a unique request ID
pub fn next_request_id() -> u64 {
    REQUEST_ID_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// A pending request awaiting response
struct PendingRequest {
    response_tx: oneshot::Sender<CommandResponse>,
    created_at: Instant,
    description: String,
}

/// Response from a command
#[derive(Debug, Clone)]
pub struct CommandResponse {
    pub id: u64,
    pub success: bool,
    pub result: Option<Value>,
    pub error: Option<String>,
}

impl CommandResponse {
    /// Build from a protocol response. An `{"error": ...}` result counts as failure.
    pub fn from_toolchain_response(id: u64, result: Option<Value>, error: Option<Value>) -> Self {
        let error = error
            .as_ref()
            .and_then(error_text)
            .or_else(|| result.as_ref().and_then(error_text_in_result));
        Self {
            id,
            success: error.is_none(),
            result,
            error,
        }
    }

    pub fn success(id: u64, result: Option<Value>) -> Self {
        Self {
            id,
            success: true,
            result,
            error: None,
        }
    }

    pub fn error(id: u64, message: impl Into<String>) -> Self {
        Self {
            id,
            success: false,
            result: None,
            error: Some(message.into()),
        }
    }
}

fn error_text_in_result(result: &Value) -> Option<String> {
    result.get("error").and_then(error_text)
}

/// Tracks pending requests and matches responses
pub struct RequestTracker {
    pending: Arc<RwLock<HashMap<u64, PendingRequest>>>,
    default_timeout: Duration,
}

impl RequestTracker {
    pub fn new(default_timeout: Duration) -> Self {
        Self {
            pending: Arc::new(RwLock::new(HashMap::new())),
            default_timeout,
        }
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Register a new pending request.
    /// Returns (request_id, receiver for response)
    pub async fn register(&self, description: &str) -> (u64, oneshot::Receiver<CommandResponse>) {
        let id = next_request_id();
        let (tx, rx) = oneshot::channel();

        let pending = PendingRequest {
            response_tx: tx,
            created_at: Instant::now(),
            description: description.to_string(),
        };

        self.pending.write().await.insert(id, pending);

        (id, rx)
    }

    /// Handle an incoming response.
    /// Returns true if the response was matched to a pending request
    pub async fn handle_response(
        &self,
        id: u64,
        result: Option<Value>,
        error: Option<Value>,
    ) -> bool {
        if let Some(pending) = self.pending.write().await.remove(&id) {
            trace!("Response #{} matched '{}'", id, pending.description);
            let response = CommandResponse::from_toolchain_response(id, result, error);
            let _ = pending.response_tx.send(response);
            true
        } else {
            false
        }
    }

    /// Cancel all pending requests (e.g., on shutdown or process exit)
    pub async fn cancel_all(&self) {
        let mut pending = self.pending.write().await;
        for (id, req) in pending.drain() {
            let _ = req
                .response_tx
                .send(CommandResponse::error(id, "Request cancelled"));
        }
    }

    /// Remove stale requests that have timed out
    pub async fn cleanup_stale(&self, timeout: Duration) -> Vec<u64> {
        let mut pending = self.pending.write().await;
        let now = Instant::now();

        let stale: Vec<u64> = pending
            .iter()
            .filter(|(_, req)| now.duration_since(req.created_at) >= timeout)
            .map(|(id, _)| *id)
            .collect();

        for id in &stale {
            if let Some(req) = pending.remove(id) {
                let _ = req
                    .response_tx
                    .send(CommandResponse::error(*id, "Request timed out"));
            }
        }

        stale
    }

    pub async fn pending_count(&self) -> usize {
        self.pending.read().await.len()
    }
}

impl Default for RequestTracker {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

/// Toolchain request types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolchainCommand {
    /// Compile and upload
    Run {
        code: String,
        device: DeviceId,
        minimal: bool,
    },
    /// Ask the toolchain to cancel the given job
    Stop {
        code: String,
        minimal: bool,
        job: Option<u64>,
    },
    /// Compile to a binary at `path`
    Export {
        code: String,
        path: String,
        device: DeviceId,
        minimal: bool,
    },
    /// Persist a sketch container to the sketchbook
    Save {
        title: String,
        data: String,
        kind: RepresentationKind,
        device: DeviceId,
    },
    /// List the sketchbook titles
    Sketches,
    /// Ask the toolchain to exit
    Shutdown,
}

impl ToolchainCommand {
    /// Build the request line
    pub fn build(&self, id: u64) -> String {
        let (method, params) = match self {
            ToolchainCommand::Run {
                code,
                device,
                minimal,
            } => (
                "run",
                json!({ "code": code, "device": device.as_str(), "minimal": minimal }),
            ),
            ToolchainCommand::Stop { code, minimal, job } => {
                let mut params = json!({ "code": code, "minimal": minimal });
                if let Some(job) = job {
                    params["job"] = json!(job);
                }
                ("stop", params)
            }
            ToolchainCommand::Export {
                code,
                path,
                device,
                minimal,
            } => (
                "export",
                json!({
                    "code": code,
                    "path": path,
                    "device": device.as_str(),
                    "minimal": minimal,
                }),
            ),
            ToolchainCommand::Save {
                title,
                data,
                kind,
                device,
            } => (
                "save",
                json!({
                    "title": title,
                    "data": data,
                    "type": kind.wire_name(),
                    "device": device.as_str(),
                }),
            ),
            ToolchainCommand::Sketches => ("sketches", json!({})),
            ToolchainCommand::Shutdown => ("shutdown", json!({})),
        };

        json!({
            "id": id,
            "method": method,
            "params": params,
        })
        .to_string()
    }

    pub fn description(&self) -> &'static str {
        match self {
            ToolchainCommand::Run { .. } => "run",
            ToolchainCommand::Stop { .. } => "stop",
            ToolchainCommand::Export { .. } => "export",
            ToolchainCommand::Save { .. } => "save",
            ToolchainCommand::Sketches => "list sketches",
            ToolchainCommand::Shutdown => "shutdown",
        }
    }
}

/// Sends commands to the toolchain process with request tracking
#[derive(Clone)]
pub struct CommandSender {
    stdin_tx: mpsc::Sender<String>,
    tracker: Arc<RequestTracker>,
}

impl std::fmt::Debug for CommandSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandSender")
            .field("stdin_tx", &"<channel>")
            .field("tracker", &"<tracker>")
            .finish()
    }
}

impl CommandSender {
    pub fn new(stdin_tx: mpsc::Sender<String>, tracker: Arc<RequestTracker>) -> Self {
        Self { stdin_tx, tracker }
    }

    /// Create a CommandSender whose written lines can be inspected
    #[cfg(any(test, feature = "test-helpers"))]
    pub fn new_for_test() -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(16);
        (
            Self {
                stdin_tx: tx,
                tracker: Arc::new(RequestTracker::default()),
            },
            rx,
        )
    }

    /// Send a command and wait for its response, using the tracker's default timeout
    pub async fn send(&self, command: ToolchainCommand) -> Result<CommandResponse> {
        let timeout = self.tracker.default_timeout();
        self.send_with_timeout(command, timeout).await
    }

    /// Send a command with custom timeout
    pub async fn send_with_timeout(
        &self,
        command: ToolchainCommand,
        timeout: Duration,
    ) -> Result<CommandResponse> {
        let (id, response_rx) = self.tracker.register(command.description()).await;

        let wrapped = format!("[{}]", command.build(id));
        debug!("Sending command #{}: {}", id, command.description());

        self.stdin_tx
            .send(wrapped)
            .await
            .map_err(|_| Error::channel_send("toolchain stdin"))?;

        match tokio::time::timeout(timeout, response_rx).await {
            Ok(Ok(response)) => {
                debug!("Command #{} completed: success={}", id, response.success);
                Ok(response)
            }
            Ok(Err(_)) => Err(Error::toolchain("Command cancelled")),
            Err(_) => {
                self.tracker.cleanup_stale(Duration::ZERO).await;
                Err(Error::toolchain(format!(
                    "Command '{}' timed out after {:?}",
                    command.description(),
                    timeout
                )))
            }
        }
    }

    /// Send a fire-and-forget command (no response expected). Returns the id used.
    pub async fn send_fire_and_forget(&self, command: ToolchainCommand) -> Result<u64> {
        let id = next_request_id();
        self.send_with_id(command, id).await?;
        Ok(id)
    }

    /// Send a fire-and-forget command under an id allocated by the caller.
    ///
    /// Run and export use this so the job id is known before the request leaves.
    pub async fn send_with_id(&self, command: ToolchainCommand, id: u64) -> Result<()> {
        let wrapped = format!("[{}]", command.build(id));

        debug!("Sending fire-and-forget #{}: {}", id, command.description());

        self.stdin_tx
            .send(wrapped)
            .await
            .map_err(|_| Error::channel_send("toolchain stdin"))
    }

    /// Get the request tracker (for response handling)
    pub fn tracker(&self) -> &Arc<RequestTracker> {
        &self.tracker
    }
}
