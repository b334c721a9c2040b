//! Contracts for the external editing surfaces
//!
//! The block renderer and the text editor live outside this crate. The session
//! controller only talks to them through these traits and never looks inside.

use crate::error::Result;

/// Read-only view of the block canvas used by the codec when saving
pub trait SnapshotProvider {
    /// Block graph serialized as markup
    fn serialize_markup(&self) -> String;

    /// Rendered capture of the canvas, if the renderer can produce one
    fn snapshot_markup(&self) -> Option<String>;

    fn block_count(&self) -> usize;
}

/// The visual block-editing capability
pub trait Workspace: SnapshotProvider + Send {
    /// Remove every block from the canvas
    fn clear(&mut self);

    /// Replace the canvas contents with the given markup
    fn load_markup(&mut self, markup: &str) -> Result<()>;

    /// Generate source code from the current block graph
    fn generate_code(&self) -> String;

    /// Swap the block categories offered to the user
    fn set_palette(&mut self, categories: &[String]);
}

/// The text-editing capability
pub trait TextBuffer: Send {
    fn text(&self) -> String;

    fn set_text(&mut self, text: &str);

    fn is_dirty(&self) -> bool;

    fn set_dirty(&mut self, dirty: bool);
}

/// Plain in-process text buffer, used when no editor widget is attached
#[derive(Debug, Clone, Default)]
pub struct StringBuffer {
    text: String,
    dirty: bool,
}

impl StringBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a user edit: replaces the text and marks the buffer dirty
    pub fn edit(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.dirty = true;
    }
}

impl TextBuffer for StringBuffer {
    fn text(&self) -> String {
        self.text.clone()
    }

    fn set_text(&mut self, text: &str) {
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

/// Stand-in workspace for hosts without a block renderer.
///
/// Holds markup verbatim, reports no blocks and generates no code, so visual
/// sketches cannot be saved or run through it.
#[derive(Debug, Clone, Default)]
pub struct DetachedWorkspace {
    markup: String,
    palette: Vec<String>,
}

impl DetachedWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn palette(&self) -> &[String] {
        &self.palette
    }
}

impl SnapshotProvider for DetachedWorkspace {
    fn serialize_markup(&self) -> String {
        self.markup.clone()
    }

    fn snapshot_markup(&self) -> Option<String> {
        None
    }

    fn block_count(&self) -> usize {
        0
    }
}

impl Workspace for DetachedWorkspace {
    fn clear(&mut self) {
        self.markup.clear();
    }

    fn load_markup(&mut self, markup: &str) -> Result<()> {
        self.markup = markup.to_string();
        Ok(())
    }

    fn generate_code(&self) -> String {
        String::new()
    }

    fn set_palette(&mut self, categories: &[String]) {
        self.palette = categories.to_vec();
    }
}
