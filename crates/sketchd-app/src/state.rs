//! Editor session state (Model in TEA pattern)

use sketchd_core::{
    DetachedWorkspace, DeviceCatalog, Document, RepresentationKind, StringBuffer, TextBuffer,
    Workspace,
};
use sketchd_toolchain::JobTracker;

use crate::config::Settings;
use crate::exit_dialog::ExitDialogState;
use crate::notifications::Notifications;
use crate::save_dialog::SaveDialogState;

/// Complete session state
pub struct AppState {
    pub settings: Settings,

    /// Device id → name, palette and starter templates
    pub catalog: DeviceCatalog,

    pub editor_open: bool,

    /// The loaded document, if any
    pub document: Option<Document>,

    /// Block editing surface (Visual documents)
    pub workspace: Box<dyn Workspace>,

    /// Source editing surface (Textual documents)
    pub text_buffer: Box<dyn TextBuffer>,

    /// Single active run/export job
    pub job: JobTracker,

    pub unsaved_changes: bool,

    /// Leave the editor once the in-flight save succeeds
    pub exit_pending: bool,

    pub save_dialog: SaveDialogState,

    pub exit_dialog: ExitDialogState,

    pub notifications: Notifications,

    /// Last reported presence of the target device; `None` until the first report
    pub device_connected: Option<bool>,

    /// Read-only code preview, regenerated on every workspace change
    pub code_preview: String,

    pub minimal_compile: bool,

    /// Bumped on each load; grace timers carry the value they were started for
    pub load_generation: u64,

    /// Inside the post-load window where edits are programmatic population
    pub load_grace: bool,

    /// Stage label of the running job, for display
    pub running_stage: Option<String>,
}

impl AppState {
    pub fn new(
        settings: Settings,
        workspace: Box<dyn Workspace>,
        text_buffer: Box<dyn TextBuffer>,
    ) -> Self {
        let catalog = settings.device_catalog();
        let job = JobTracker::new(settings.toolchain.stage_sequence());
        let minimal_compile = settings.editor.minimal_compile;

        Self {
            settings,
            catalog,
            editor_open: false,
            document: None,
            workspace,
            text_buffer,
            job,
            unsaved_changes: false,
            exit_pending: false,
            save_dialog: SaveDialogState::default(),
            exit_dialog: ExitDialogState::default(),
            notifications: Notifications::new(),
            device_connected: None,
            code_preview: String::new(),
            minimal_compile,
            load_generation: 0,
            load_grace: false,
            running_stage: None,
        }
    }

    /// State without a block renderer; only textual sketches are editable
    pub fn headless(settings: Settings) -> Self {
        Self::new(
            settings,
            Box::new(DetachedWorkspace::new()),
            Box::new(StringBuffer::new()),
        )
    }

    pub fn kind(&self) -> Option<RepresentationKind> {
        self.document.as_ref().map(|d| d.kind())
    }

    pub fn title(&self) -> &str {
        self.document.as_ref().map(|d| d.title()).unwrap_or("")
    }

    /// Code to hand to the toolchain: generated from blocks, or the text buffer
    pub fn current_code(&self) -> String {
        match self.kind() {
            Some(RepresentationKind::Visual) => self.workspace.generate_code(),
            Some(RepresentationKind::Textual) => self.text_buffer.text(),
            None => String::new(),
        }
    }

    /// Copy the live surface contents into the document
    pub fn sync_document_payload(&mut self) {
        let payload = match self.kind() {
            Some(RepresentationKind::Visual) => self.workspace.serialize_markup(),
            Some(RepresentationKind::Textual) => self.text_buffer.text(),
            None => return,
        };
        if let Some(doc) = self.document.as_mut() {
            doc.set_payload(payload);
        }
    }

    /// Display name of the current document's device
    pub fn device_name(&self) -> Option<String> {
        self.document
            .as_ref()
            .map(|d| self.catalog.display_name(d.device_id()))
    }

    pub fn is_running(&self) -> bool {
        self.job.is_running()
    }

    pub fn any_dialog_open(&self) -> bool {
        self.save_dialog.open || self.exit_dialog.open
    }

    /// Reset everything tied to the open document
    pub fn close_editor(&mut self) {
        self.editor_open = false;
        self.document = None;
        self.unsaved_changes = false;
        self.exit_pending = false;
        self.save_dialog.close();
        self.exit_dialog.open = false;
        self.code_preview.clear();
        self.load_grace = false;
        self.running_stage = None;
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("editor_open", &self.editor_open)
            .field("document", &self.document)
            .field("job", &self.job.phase())
            .field("unsaved_changes", &self.unsaved_changes)
            .field("exit_pending", &self.exit_pending)
            .field("save_dialog_open", &self.save_dialog.open)
            .field("exit_dialog_open", &self.exit_dialog.open)
            .field("notifications", &self.notifications.len())
            .finish_non_exhaustive()
    }
}
