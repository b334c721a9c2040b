//! Save-As dialog state and filename validation

use thiserror::Error;

/// Why the entered filename cannot be submitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FilenameError {
    #[error("EMPTY")]
    Empty,
    #[error("EXISTS")]
    Exists,
}

impl FilenameError {
    pub fn code(&self) -> &'static str {
        match self {
            FilenameError::Empty => "EMPTY",
            FilenameError::Exists => "EXISTS",
        }
    }
}

/// Turn a user-entered name into a sketch title: spaces become `_`, periods are dropped
pub fn sanitize(name: &str) -> String {
    name.replace(' ', "_").replace('.', "")
}

/// Validate a filename against the titles already used for this representation kind
pub fn validate(name: &str, existing: &[String]) -> Option<FilenameError> {
    let sanitized = sanitize(name);
    if name.trim().is_empty() || sanitized.is_empty() {
        return Some(FilenameError::Empty);
    }
    if existing.iter().any(|t| t == name || *t == sanitized) {
        return Some(FilenameError::Exists);
    }
    None
}

#[derive(Debug, Clone, Default)]
pub struct SaveDialogState {
    pub open: bool,
    pub filename: String,
    pub error: Option<FilenameError>,
    /// Titles of the current kind, as reported by the toolchain
    pub known_titles: Vec<String>,
    /// Waiting for the sketch list
    pub loading_titles: bool,
}

impl SaveDialogState {
    /// Open with an empty name. No effect if already open.
    pub fn open(&mut self) -> bool {
        if self.open {
            return false;
        }
        self.open = true;
        self.filename.clear();
        self.error = Some(FilenameError::Empty);
        self.known_titles.clear();
        self.loading_titles = true;
        true
    }

    pub fn close(&mut self) {
        self.open = false;
        self.loading_titles = false;
        self.filename.clear();
        self.error = None;
    }

    pub fn set_filename(&mut self, filename: impl Into<String>) {
        self.filename = filename.into();
        self.revalidate();
    }

    pub fn set_known_titles(&mut self, titles: Vec<String>) {
        self.known_titles = titles;
        self.loading_titles = false;
        self.revalidate();
    }

    pub fn revalidate(&mut self) {
        self.error = validate(&self.filename, &self.known_titles);
    }

    pub fn can_submit(&self) -> bool {
        self.open && self.error.is_none()
    }

    /// The title the current input would be saved under
    pub fn sanitized(&self) -> String {
        sanitize(&self.filename)
    }
}
