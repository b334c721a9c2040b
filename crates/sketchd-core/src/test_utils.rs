//! Test utilities for the editing-surface contracts
//!
//! In-memory fakes for [`Workspace`] and [`TextBuffer`] that record how they
//! were driven.

use crate::document::{DeviceId, RepresentationKind};
use crate::error::{Error, Result};
use crate::workspace::{SnapshotProvider, TextBuffer, Workspace};

/// In-memory block workspace.
///
/// `block_count` is whatever the test says it is; markup is stored verbatim.
#[derive(Debug, Clone, Default)]
pub struct MemoryWorkspace {
    pub markup: String,
    pub blocks: usize,
    pub snapshot: Option<String>,
    pub code: String,
    pub palette: Vec<String>,
    /// Names of mutating calls, in order
    pub calls: Vec<&'static str>,
    /// Make the next `load_markup` fail
    pub fail_load: bool,
}

impl MemoryWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_markup(markup: &str, blocks: usize) -> Self {
        Self {
            markup: markup.to_string(),
            blocks,
            ..Self::default()
        }
    }

    pub fn with_snapshot(mut self, snapshot: &str) -> Self {
        self.snapshot = Some(snapshot.to_string());
        self
    }

    pub fn with_code(mut self, code: &str) -> Self {
        self.code = code.to_string();
        self
    }

    /// Simulate the user dropping blocks on the canvas
    pub fn user_edit(&mut self, markup: &str, blocks: usize, code: &str) {
        self.markup = markup.to_string();
        self.blocks = blocks;
        self.code = code.to_string();
    }
}

impl SnapshotProvider for MemoryWorkspace {
    fn serialize_markup(&self) -> String {
        self.markup.clone()
    }

    fn snapshot_markup(&self) -> Option<String> {
        self.snapshot.clone()
    }

    fn block_count(&self) -> usize {
        self.blocks
    }
}

impl Workspace for MemoryWorkspace {
    fn clear(&mut self) {
        self.calls.push("clear");
        self.markup.clear();
        self.blocks = 0;
    }

    fn load_markup(&mut self, markup: &str) -> Result<()> {
        self.calls.push("load_markup");
        if self.fail_load {
            return Err(Error::workspace("renderer rejected markup"));
        }
        self.markup = markup.to_string();
        self.blocks = markup.matches("<block").count();
        Ok(())
    }

    fn generate_code(&self) -> String {
        self.code.clone()
    }

    fn set_palette(&mut self, categories: &[String]) {
        self.calls.push("set_palette");
        self.palette = categories.to_vec();
    }
}

/// In-memory text buffer
#[derive(Debug, Clone, Default)]
pub struct MemoryTextBuffer {
    pub text: String,
    pub dirty: bool,
    /// Number of programmatic `set_text` calls
    pub set_count: usize,
}

impl MemoryTextBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            ..Self::default()
        }
    }
}

impl TextBuffer for MemoryTextBuffer {
    fn text(&self) -> String {
        self.text.clone()
    }

    fn set_text(&mut self, text: &str) {
        self.set_count += 1;
        self.text = text.to_string();
        self.dirty = false;
    }

    fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }
}

/// Device id of a built-in device, for tests
pub fn test_device_id() -> DeviceId {
    DeviceId::new("cm:esp8266:nibble").expect("built-in device id is non-empty")
}

/// Both kinds, for tests that cover each representation
pub fn all_kinds() -> [RepresentationKind; 2] {
    [RepresentationKind::Visual, RepresentationKind::Textual]
}
