//! Application error types with rich context

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Application error types organized by layer/domain
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Common/Infrastructure Errors
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // Document/Sketch Errors
    // ─────────────────────────────────────────────────────────────
    #[error("No starter template registered for device: {device_id}")]
    UnknownDevice { device_id: String },

    #[error("Device id must not be empty")]
    InvalidDeviceId,

    #[error("Sketch format version {found} is newer than supported version {supported}")]
    UnsupportedSketchVersion { found: u32, supported: u32 },

    #[error("Malformed sketch: {message}")]
    MalformedSketch { message: String },

    #[error("Workspace error: {message}")]
    Workspace { message: String },

    // ─────────────────────────────────────────────────────────────
    // Validation Errors (blocked locally, never reach the toolchain)
    // ─────────────────────────────────────────────────────────────
    #[error("You can't save an empty sketch.")]
    EmptyWorkspace,

    #[error("Sketch name must not be empty")]
    EmptyFilename,

    #[error("A sketch named '{name}' already exists")]
    DuplicateFilename { name: String },

    // ─────────────────────────────────────────────────────────────
    // Toolchain Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Toolchain executable not found: {command}")]
    ToolchainNotFound { command: String },

    #[error("Toolchain error: {message}")]
    Toolchain { message: String },

    #[error("Failed to spawn toolchain process: {reason}")]
    ProcessSpawn { reason: String },

    #[error("Toolchain protocol error: {message}")]
    Protocol { message: String },

    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    // ─────────────────────────────────────────────────────────────
    // Channel/Communication Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Channel send error: {message}")]
    ChannelSend { message: String },

    #[error("Channel closed unexpectedly")]
    ChannelClosed,
}

// ─────────────────────────────────────────────────────────────────
// Convenience Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn unknown_device(device_id: impl Into<String>) -> Self {
        Self::UnknownDevice {
            device_id: device_id.into(),
        }
    }

    pub fn malformed_sketch(message: impl Into<String>) -> Self {
        Self::MalformedSketch {
            message: message.into(),
        }
    }

    pub fn workspace(message: impl Into<String>) -> Self {
        Self::Workspace {
            message: message.into(),
        }
    }

    pub fn duplicate_filename(name: impl Into<String>) -> Self {
        Self::DuplicateFilename { name: name.into() }
    }

    pub fn toolchain(message: impl Into<String>) -> Self {
        Self::Toolchain {
            message: message.into(),
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn channel_send(message: impl Into<String>) -> Self {
        Self::ChannelSend {
            message: message.into(),
        }
    }

    /// Local validation failures: surfaced inline, never sent to the toolchain
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::EmptyWorkspace | Error::EmptyFilename | Error::DuplicateFilename { .. }
        )
    }

    /// Check if this is a recoverable error
    pub fn is_recoverable(&self) -> bool {
        self.is_validation()
            || matches!(
                self,
                Error::Toolchain { .. }
                    | Error::Protocol { .. }
                    | Error::ChannelSend { .. }
                    | Error::Workspace { .. }
            )
    }

    /// Check if this error aborts the operation that raised it
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::UnknownDevice { .. }
                | Error::InvalidDeviceId
                | Error::UnsupportedSketchVersion { .. }
                | Error::ToolchainNotFound { .. }
                | Error::ProcessSpawn { .. }
        )
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Context Extensions
// ─────────────────────────────────────────────────────────────────

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", context.into(), err);
            err
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", f(), err);
            err
        })
    }
}
