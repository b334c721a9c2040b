//! # sketchd-core - Core Domain Types
//!
//! Foundation crate for sketchd. Provides the document model, the sketch
//! container format and codec, the device catalog, the contracts for the
//! external editing surfaces, toolchain event types, errors and logging.
//!
//! This crate has **zero internal dependencies**.
//!
//! ## Public API
//!
//! ### Document Model (`document`)
//! - [`Document`] - The program being edited: kind, device, payload, title, dirty flag
//! - [`RepresentationKind`] - Visual (blocks) or Textual (source)
//! - [`DeviceId`] - Non-empty target device identifier
//!
//! ### Sketches (`sketch`, `codec`)
//! - [`PersistedSketch`] - Versioned on-disk form, with container rendering/parsing
//! - [`encode()`] / [`decode()`] - Document ⇄ sketch conversion
//!
//! ### Devices (`device`)
//! - [`DeviceCatalog`] - Device id → name, palette and starter template
//!
//! ### Editing Surfaces (`workspace`)
//! - [`Workspace`], [`SnapshotProvider`], [`TextBuffer`] - Collaborator contracts
//!
//! ### Events (`events`)
//! - [`ToolchainMessage`] - Parsed toolchain stdout messages
//! - [`ToolchainEvent`] - Process-level events (message, stderr, exit)
//!
//! ## Prelude
//!
//! ```rust
//! use sketchd_core::prelude::*;
//! ```

pub mod codec;
pub mod device;
pub mod document;
pub mod error;
pub mod events;
pub mod logging;
pub mod sketch;
pub mod workspace;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_utils;

/// Prelude for common imports used throughout all sketchd crates
pub mod prelude {
    pub use super::error::{Error, Result, ResultExt};
    pub use tracing::{debug, error, info, instrument, trace, warn};
}

pub use codec::{decode, encode, Decoded};
pub use device::{DeviceCatalog, DeviceOverride, DeviceProfile, StarterTemplate};
pub use document::{DeviceId, Document, RepresentationKind};
pub use error::{Error, Result, ResultExt};
pub use events::{PortsChanged, RunProgress, ToolchainEvent, ToolchainLog, ToolchainMessage};
pub use sketch::{PersistedSketch, SKETCH_FORMAT_VERSION};
pub use workspace::{DetachedWorkspace, SnapshotProvider, StringBuffer, TextBuffer, Workspace};
