//! Toolchain event definitions

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────
// Event Payloads
// ─────────────────────────────────────────────────────────

/// `runprogress` event: one stage notification for the active job
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RunProgress {
    pub stage: String,
    #[serde(default)]
    pub running: bool,
    /// The stream ended because of a stop request
    #[serde(default, rename = "cancel", alias = "cancelled")]
    pub cancelled: bool,
    /// Request id of the run/export this event belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunProgress {
    pub fn new(stage: impl Into<String>, running: bool) -> Self {
        Self {
            stage: stage.into(),
            running,
            cancelled: false,
            job: None,
            error: None,
        }
    }

    pub fn cancelled(mut self) -> Self {
        self.cancelled = true;
        self
    }

    pub fn for_job(mut self, job: u64) -> Self {
        self.job = Some(job);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// `ports` event: the target device's serial port appeared or went away
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PortsChanged {
    #[serde(default)]
    pub port: Option<String>,
}

impl PortsChanged {
    pub fn is_connected(&self) -> bool {
        self.port.is_some()
    }
}

/// `log` event: free-form toolchain output
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ToolchainLog {
    pub message: String,
}

// ─────────────────────────────────────────────────────────
// ToolchainMessage Enum
// ─────────────────────────────────────────────────────────

/// Fully typed message from the toolchain's stdout
#[derive(Debug, Clone, PartialEq)]
pub enum ToolchainMessage {
    RunProgress(RunProgress),
    Ports(PortsChanged),
    Log(ToolchainLog),

    Response {
        id: serde_json::Value,
        result: Option<serde_json::Value>,
        error: Option<serde_json::Value>,
    },

    UnknownEvent {
        event: String,
        params: serde_json::Value,
    },
}

impl ToolchainMessage {
    /// Check if this is an error message
    pub fn is_error(&self) -> bool {
        match self {
            ToolchainMessage::RunProgress(p) => p.error.is_some(),
            ToolchainMessage::Response { error, .. } => error.is_some(),
            _ => false,
        }
    }

    /// Get a human-readable summary
    pub fn summary(&self) -> String {
        match self {
            ToolchainMessage::RunProgress(p) => match &p.error {
                Some(err) => format!("{} failed: {}", p.stage, err),
                None if p.cancelled => format!("{} (cancelled)", p.stage),
                None => p.stage.clone(),
            },
            ToolchainMessage::Ports(p) => match &p.port {
                Some(port) => format!("Device on {}", port),
                None => "Device disconnected".to_string(),
            },
            ToolchainMessage::Log(l) => l.message.clone(),
            ToolchainMessage::Response { id, error, .. } => match error {
                Some(err) => format!("Response #{} error: {}", id, err),
                None => format!("Response #{}", id),
            },
            ToolchainMessage::UnknownEvent { event, .. } => format!("Unknown event: {}", event),
        }
    }
}

// ─────────────────────────────────────────────────────────
// ToolchainEvent (process-level)
// ─────────────────────────────────────────────────────────

/// Everything the toolchain process connection can report
#[derive(Debug, Clone)]
pub enum ToolchainEvent {
    /// Raw stdout line that did not parse as a protocol message
    Stdout(String),

    /// Parsed protocol message
    Message(ToolchainMessage),

    /// Stderr output
    Stderr(String),

    /// Process has exited
    Exited { code: Option<i32> },

    /// Process spawn failed
    SpawnFailed { reason: String },
}
