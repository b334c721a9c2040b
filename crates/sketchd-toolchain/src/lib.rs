//! # sketchd-toolchain - Build/Run Channel
//!
//! Talks to the external toolchain process that compiles, uploads, exports and
//! saves sketches. Requests go to its stdin and responses/events come back on
//! its stdout, one JSON object per line.
//!
//! ## Public API
//!
//! - [`ToolchainProcess`] - Spawns and owns the child process
//! - [`CommandSender`] / [`ToolchainCommand`] - Builds and sends requests
//! - [`RequestTracker`] - Matches responses to requests by id
//! - [`parse_toolchain_message()`] - Parses one stdout line
//! - [`JobTracker`] - Run/export job state machine

pub mod commands;
pub mod job;
pub mod process;
pub mod protocol;

pub use commands::{
    next_request_id, CommandResponse, CommandSender, RequestTracker, ToolchainCommand,
};
pub use job::{JobKind, JobPhase, JobTracker, JobTransition, StageSequence};
pub use process::{ToolchainProcess, ToolchainSpawn};
pub use protocol::{error_text, parse_sketch_titles, parse_toolchain_message, response_id};
pub use sketchd_core::ToolchainMessage;
