//! Tests for handler module

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use super::*;
use crate::config::Settings;
use crate::exit_dialog::ExitOption;
use crate::message::Message;
use crate::notifications::NotificationLevel;
use crate::save_dialog::FilenameError;
use crate::state::AppState;
use sketchd_core::test_utils::{test_device_id, MemoryTextBuffer, MemoryWorkspace};
use sketchd_core::{
    DeviceId, PersistedSketch, PortsChanged, RunProgress, SnapshotProvider, TextBuffer,
    ToolchainEvent, ToolchainMessage, Workspace,
};
use sketchd_toolchain::JobPhase;

const TWO_BLOCKS: &str = r#"<xml xmlns="http://www.w3.org/1999/xhtml"><block type="controls_if" id="a"></block><block type="math_number" id="b"></block></xml>"#;

// ─────────────────────────────────────────────────────────
// Fixtures
// ─────────────────────────────────────────────────────────

/// Workspace handle the test keeps a second reference to
#[derive(Clone, Default)]
struct SharedWorkspace(Arc<Mutex<MemoryWorkspace>>);

impl SharedWorkspace {
    fn edit(&self, markup: &str, blocks: usize, code: &str) {
        self.0.lock().unwrap().user_edit(markup, blocks, code);
    }

    fn inner(&self) -> MemoryWorkspace {
        self.0.lock().unwrap().clone()
    }
}

impl SnapshotProvider for SharedWorkspace {
    fn serialize_markup(&self) -> String {
        self.0.lock().unwrap().serialize_markup()
    }

    fn snapshot_markup(&self) -> Option<String> {
        self.0.lock().unwrap().snapshot_markup()
    }

    fn block_count(&self) -> usize {
        self.0.lock().unwrap().block_count()
    }
}

impl Workspace for SharedWorkspace {
    fn clear(&mut self) {
        self.0.lock().unwrap().clear()
    }

    fn load_markup(&mut self, markup: &str) -> sketchd_core::Result<()> {
        self.0.lock().unwrap().load_markup(markup)
    }

    fn generate_code(&self) -> String {
        self.0.lock().unwrap().generate_code()
    }

    fn set_palette(&mut self, categories: &[String]) {
        self.0.lock().unwrap().set_palette(categories)
    }
}

#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<MemoryTextBuffer>>);

impl SharedBuffer {
    fn type_text(&self, text: &str) {
        let mut buf = self.0.lock().unwrap();
        buf.text = text.to_string();
        buf.dirty = true;
    }
}

impl TextBuffer for SharedBuffer {
    fn text(&self) -> String {
        self.0.lock().unwrap().text()
    }

    fn set_text(&mut self, text: &str) {
        self.0.lock().unwrap().set_text(text)
    }

    fn is_dirty(&self) -> bool {
        self.0.lock().unwrap().is_dirty()
    }

    fn set_dirty(&mut self, dirty: bool) {
        self.0.lock().unwrap().set_dirty(dirty)
    }
}

struct Harness {
    state: AppState,
    ws: SharedWorkspace,
    buf: SharedBuffer,
}

fn harness_with(settings: Settings) -> Harness {
    let ws = SharedWorkspace::default();
    let buf = SharedBuffer::default();
    let state = AppState::new(settings, Box::new(ws.clone()), Box::new(buf.clone()));
    Harness { state, ws, buf }
}

fn harness() -> Harness {
    harness_with(Settings::default())
}

/// Run a message and its follow-ups, collecting every action
fn drive(state: &mut AppState, msg: Message) -> Vec<UpdateAction> {
    let mut actions = Vec::new();
    let mut next = Some(msg);
    while let Some(m) = next {
        let result = update(state, m);
        actions.extend(result.actions);
        next = result.message;
    }
    actions
}

fn load(
    h: &mut Harness,
    kind: RepresentationKind,
    payload: &str,
    title: &str,
) -> Vec<UpdateAction> {
    let sketch = PersistedSketch::new(test_device_id(), kind, payload);
    drive(
        &mut h.state,
        Message::LoadSketch {
            sketch,
            title: title.to_string(),
        },
    )
}

/// Load and let the grace window pass
fn load_settled(h: &mut Harness, kind: RepresentationKind, payload: &str, title: &str) {
    load(h, kind, payload, title);
    let generation = h.state.load_generation;
    drive(&mut h.state, Message::LoadGraceElapsed { generation });
}

fn dirty_visual(h: &mut Harness, title: &str) {
    load_settled(h, RepresentationKind::Visual, TWO_BLOCKS, title);
    h.ws.edit(TWO_BLOCKS, 2, "void loop() { x(); }");
    drive(&mut h.state, Message::WorkspaceChanged);
    assert!(h.state.unsaved_changes);
}

fn saves(actions: &[UpdateAction]) -> Vec<&UpdateAction> {
    actions
        .iter()
        .filter(|a| matches!(a, UpdateAction::SendSave { .. }))
        .collect()
}

/// Toolchain reply to a save of the currently loaded document
fn save_reply(state: &AppState, title: String, error: Option<String>) -> Message {
    Message::SaveCompleted {
        generation: state.load_generation,
        title,
        error,
    }
}

fn has_exit(actions: &[UpdateAction]) -> bool {
    actions.iter().any(|a| matches!(a, UpdateAction::ExitEditor))
}

fn texts(state: &AppState) -> Vec<String> {
    state.notifications.iter().map(|n| n.text.clone()).collect()
}

fn progress(stage: &str) -> Message {
    Message::Toolchain(ToolchainEvent::Message(ToolchainMessage::RunProgress(
        RunProgress::new(stage, true),
    )))
}

fn ports(port: Option<&str>) -> Message {
    Message::Toolchain(ToolchainEvent::Message(ToolchainMessage::Ports(
        PortsChanged {
            port: port.map(str::to_string),
        },
    )))
}

// ─────────────────────────────────────────────────────────
// Load
// ─────────────────────────────────────────────────────────

#[test]
fn test_load_empty_visual_uses_template_and_asks_for_name() {
    let mut h = harness();
    let actions = load(&mut h, RepresentationKind::Visual, "", "");

    let template = h
        .state
        .catalog
        .template_for(&test_device_id(), RepresentationKind::Visual)
        .unwrap()
        .to_string();
    assert!(h.state.editor_open);
    assert_eq!(h.state.document.as_ref().unwrap().payload(), template);
    assert_eq!(h.ws.inner().markup, template);
    assert!(h.state.save_dialog.open);
    assert!(actions.contains(&UpdateAction::FetchSketchNames {
        kind: RepresentationKind::Visual
    }));
}

#[test]
fn test_replacement_load_fetches_names_for_new_kind() {
    let mut h = harness();
    load(&mut h, RepresentationKind::Visual, "", "");
    drive(
        &mut h.state,
        Message::SketchNamesLoaded {
            kind: RepresentationKind::Visual,
            titles: vec!["lights".into()],
        },
    );

    let actions = load(&mut h, RepresentationKind::Textual, "", "");

    assert!(h.state.save_dialog.open);
    assert!(h.state.save_dialog.known_titles.is_empty());
    assert!(actions.contains(&UpdateAction::FetchSketchNames {
        kind: RepresentationKind::Textual
    }));
}

#[test]
fn test_replacement_load_closes_save_dialog() {
    let mut h = harness();
    load(&mut h, RepresentationKind::Visual, "", "");
    assert!(h.state.save_dialog.open);

    load_settled(&mut h, RepresentationKind::Textual, "int a;", "blink");
    assert!(!h.state.save_dialog.open);
    assert!(!saves(&drive(&mut h.state, Message::KeyboardSave)).is_empty());
}

#[test]
fn test_load_empty_textual_seeds_buffer() {
    let mut h = harness();
    load(&mut h, RepresentationKind::Textual, "", "");

    let template = h
        .state
        .catalog
        .template_for(&test_device_id(), RepresentationKind::Textual)
        .unwrap()
        .to_string();
    assert_eq!(h.buf.text(), template);
    assert_eq!(h.state.code_preview, template);
    assert!(h.state.save_dialog.open);
}

#[test]
fn test_load_titled_empty_sketch_skips_name_prompt() {
    let mut h = harness();
    load(&mut h, RepresentationKind::Textual, "", "blink");
    assert!(!h.state.save_dialog.open);
}

#[test]
fn test_load_populates_workspace_then_palette() {
    let mut h = harness();
    load(&mut h, RepresentationKind::Visual, TWO_BLOCKS, "lights");

    let ws = h.ws.inner();
    assert_eq!(ws.calls, vec!["clear", "load_markup", "set_palette"]);
    assert_eq!(ws.blocks, 2);
    assert_eq!(
        ws.palette,
        h.state.catalog.palette_for(&test_device_id()).to_vec()
    );
    assert!(!h.state.save_dialog.open);
}

mockall::mock! {
    Surface {}

    impl SnapshotProvider for Surface {
        fn serialize_markup(&self) -> String;
        fn snapshot_markup(&self) -> Option<String>;
        fn block_count(&self) -> usize;
    }

    impl Workspace for Surface {
        fn clear(&mut self);
        fn load_markup(&mut self, markup: &str) -> sketchd_core::Result<()>;
        fn generate_code(&self) -> String;
        fn set_palette(&mut self, categories: &[String]);
    }
}

#[test]
fn test_load_drives_workspace_in_order() {
    let mut seq = mockall::Sequence::new();
    let mut surface = MockSurface::new();
    surface
        .expect_clear()
        .times(1)
        .in_sequence(&mut seq)
        .return_const(());
    surface
        .expect_load_markup()
        .withf(|markup: &str| markup == TWO_BLOCKS)
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(()));
    surface
        .expect_set_palette()
        .withf(|categories: &[String]| categories.iter().any(|c| c == "Logic"))
        .times(1)
        .in_sequence(&mut seq)
        .return_const(());
    surface
        .expect_generate_code()
        .return_const("void loop() {}".to_string());

    let mut state = AppState::new(
        Settings::default(),
        Box::new(surface),
        Box::new(MemoryTextBuffer::new()),
    );
    drive(
        &mut state,
        Message::LoadSketch {
            sketch: PersistedSketch::new(test_device_id(), RepresentationKind::Visual, TWO_BLOCKS),
            title: "lights".into(),
        },
    );
    assert_eq!(state.code_preview, "void loop() {}");
}

#[test]
fn test_load_unknown_device_does_not_populate() {
    let mut h = harness();
    let sketch = PersistedSketch::new(
        DeviceId::new("cm:unknown:board").unwrap(),
        RepresentationKind::Visual,
        "",
    );
    drive(
        &mut h.state,
        Message::LoadSketch {
            sketch,
            title: String::new(),
        },
    );

    assert!(!h.state.editor_open);
    assert!(h.state.document.is_none());
    assert!(h.ws.inner().calls.is_empty());
    let last = h.state.notifications.last().unwrap();
    assert_eq!(last.level, NotificationLevel::Error);
    assert!(last.text.contains("cm:unknown:board"));
}

#[test]
fn test_load_schedules_grace_end() {
    let mut h = harness();
    let actions = load(&mut h, RepresentationKind::Textual, "int x;", "t");
    assert!(actions.contains(&UpdateAction::ScheduleLoadGraceEnd {
        generation: 1,
        after: Duration::from_millis(1250),
    }));
}

#[test]
fn test_population_inside_grace_is_not_an_edit() {
    let mut h = harness();
    load(&mut h, RepresentationKind::Visual, TWO_BLOCKS, "lights");

    h.ws.edit(TWO_BLOCKS, 2, "void loop() {}");
    drive(&mut h.state, Message::WorkspaceChanged);
    assert!(!h.state.unsaved_changes);
    assert_eq!(h.state.code_preview, "void loop() {}");

    let generation = h.state.load_generation;
    drive(&mut h.state, Message::LoadGraceElapsed { generation });
    assert!(!h.state.load_grace);

    drive(&mut h.state, Message::WorkspaceChanged);
    assert!(h.state.unsaved_changes);
    assert!(h.state.document.as_ref().unwrap().is_dirty());
}

#[test]
fn test_stale_grace_timer_is_ignored() {
    let mut h = harness();
    load(&mut h, RepresentationKind::Textual, "a", "first");
    load(&mut h, RepresentationKind::Textual, "b", "second");
    assert_eq!(h.state.load_generation, 2);

    drive(&mut h.state, Message::LoadGraceElapsed { generation: 1 });
    assert!(h.state.load_grace);

    h.buf.type_text("bb");
    drive(&mut h.state, Message::TextChanged);
    assert!(!h.state.unsaved_changes);
}

#[test]
fn test_text_edit_marks_unsaved() {
    let mut h = harness();
    load_settled(&mut h, RepresentationKind::Textual, "int a;", "blink");
    h.buf.type_text("int a = 1;");
    drive(&mut h.state, Message::TextChanged);
    assert!(h.state.unsaved_changes);
    assert_eq!(h.state.code_preview, "int a = 1;");
}

// ─────────────────────────────────────────────────────────
// Save
// ─────────────────────────────────────────────────────────

#[test]
fn test_save_titled_sends_exactly_one_request() {
    let mut h = harness();
    dirty_visual(&mut h, "lights");

    let actions = drive(&mut h.state, Message::Save);
    let sent = saves(&actions);
    assert_eq!(sent.len(), 1);

    let expected = PersistedSketch::new(test_device_id(), RepresentationKind::Visual, TWO_BLOCKS)
        .to_container()
        .unwrap();
    assert_eq!(
        sent[0],
        &UpdateAction::SendSave {
            generation: h.state.load_generation,
            title: "lights".into(),
            data: expected,
            kind: RepresentationKind::Visual,
            device: test_device_id(),
        }
    );

    let reply = save_reply(&h.state, "lights".into(), None);
    drive(&mut h.state, reply);
    assert!(!h.state.unsaved_changes);
    assert!(!h.state.document.as_ref().unwrap().is_dirty());
    assert_eq!(texts(&h.state), vec!["Sketch saved."]);
}

#[test]
fn test_save_textual_sends_buffer_text() {
    let mut h = harness();
    load_settled(&mut h, RepresentationKind::Textual, "int a;", "blink");
    h.buf.type_text("int b;");
    drive(&mut h.state, Message::TextChanged);

    let actions = drive(&mut h.state, Message::Save);
    match saves(&actions).as_slice() {
        [UpdateAction::SendSave { data, kind, .. }] => {
            assert_eq!(data, "int b;");
            assert_eq!(*kind, RepresentationKind::Textual);
        }
        other => panic!("expected one save, got {:?}", other),
    }
}

#[test]
fn test_stale_save_result_is_ignored_after_replacement_load() {
    let mut h = harness();
    dirty_visual(&mut h, "lights");
    drive(&mut h.state, Message::Save);
    let stale = save_reply(&h.state, "lights".into(), None);

    load_settled(&mut h, RepresentationKind::Textual, "int a;", "blink");
    h.buf.type_text("int b;");
    drive(&mut h.state, Message::TextChanged);

    let actions = drive(&mut h.state, stale);
    assert!(actions.is_empty());
    assert_eq!(h.state.title(), "blink");
    assert!(h.state.unsaved_changes);
    assert!(h.state.document.as_ref().unwrap().is_dirty());
    assert!(texts(&h.state).is_empty());
}

#[test]
fn test_save_failure_keeps_document_dirty() {
    let mut h = harness();
    dirty_visual(&mut h, "lights");
    drive(&mut h.state, Message::Save);

    let reply = save_reply(&h.state, "lights".into(), Some("disk full".into()));
    drive(&mut h.state, reply);
    assert!(h.state.unsaved_changes);
    assert!(h.state.document.as_ref().unwrap().is_dirty());
    let last = h.state.notifications.last().unwrap();
    assert_eq!(last.level, NotificationLevel::Error);
    assert_eq!(last.text, "disk full");
}

#[test]
fn test_save_untitled_opens_save_as() {
    let mut h = harness();
    dirty_visual(&mut h, "");
    let actions = drive(&mut h.state, Message::Save);
    assert!(saves(&actions).is_empty());
    assert!(h.state.save_dialog.open);
}

#[test]
fn test_save_empty_workspace_is_rejected_locally() {
    let mut h = harness();
    dirty_visual(&mut h, "lights");
    h.ws.edit("<xml></xml>", 0, "");

    let actions = drive(&mut h.state, Message::Save);
    assert!(saves(&actions).is_empty());
    assert_eq!(texts(&h.state), vec!["You can't save an empty sketch."]);
}

#[test]
fn test_save_as_rejected_for_empty_visual() {
    let mut h = harness();
    load_settled(&mut h, RepresentationKind::Visual, TWO_BLOCKS, "");
    h.ws.edit("<xml></xml>", 0, "");

    let actions = drive(&mut h.state, Message::OpenSaveModal);
    assert!(!h.state.save_dialog.open);
    assert!(!actions
        .iter()
        .any(|a| matches!(a, UpdateAction::FetchSketchNames { .. })));
    assert_eq!(texts(&h.state), vec!["You can't save an empty sketch."]);
}

#[test]
fn test_save_as_flow() {
    let mut h = harness();
    dirty_visual(&mut h, "");
    drive(&mut h.state, Message::OpenSaveModal);
    assert_eq!(h.state.save_dialog.error, Some(FilenameError::Empty));

    drive(
        &mut h.state,
        Message::SketchNamesLoaded {
            kind: RepresentationKind::Visual,
            titles: vec!["my_lights".into()],
        },
    );

    drive(
        &mut h.state,
        Message::SaveModalInput {
            filename: "my lights".into(),
        },
    );
    assert_eq!(h.state.save_dialog.error, Some(FilenameError::Exists));
    assert!(saves(&drive(&mut h.state, Message::SaveModalSubmit)).is_empty());

    drive(
        &mut h.state,
        Message::SaveModalInput {
            filename: "my lights v2.0".into(),
        },
    );
    assert_eq!(h.state.save_dialog.error, None);

    let actions = drive(&mut h.state, Message::SaveModalSubmit);
    match saves(&actions).as_slice() {
        [UpdateAction::SendSave { title, .. }] => assert_eq!(title, "my_lights_v20"),
        other => panic!("expected one save, got {:?}", other),
    }
    assert!(!h.state.save_dialog.open);

    let reply = save_reply(&h.state, "my_lights_v20".into(), None);
    drive(&mut h.state, reply);
    assert_eq!(h.state.title(), "my_lights_v20");
    assert!(!h.state.unsaved_changes);
}

#[test]
fn test_names_for_other_kind_are_ignored() {
    let mut h = harness();
    dirty_visual(&mut h, "");
    drive(&mut h.state, Message::OpenSaveModal);
    drive(
        &mut h.state,
        Message::SketchNamesLoaded {
            kind: RepresentationKind::Textual,
            titles: vec!["x".into()],
        },
    );
    assert!(h.state.save_dialog.known_titles.is_empty());
}

#[test]
fn test_open_save_modal_twice_is_noop() {
    let mut h = harness();
    dirty_visual(&mut h, "");
    drive(&mut h.state, Message::OpenSaveModal);
    drive(
        &mut h.state,
        Message::SaveModalInput {
            filename: "draft".into(),
        },
    );

    let actions = drive(&mut h.state, Message::OpenSaveModal);
    assert!(actions.is_empty());
    assert_eq!(h.state.save_dialog.filename, "draft");
}

#[test]
fn test_keyboard_save_ignored_with_dialog_open() {
    let mut h = harness();
    dirty_visual(&mut h, "lights");
    drive(&mut h.state, Message::RequestExit);
    assert!(h.state.exit_dialog.open);

    assert!(drive(&mut h.state, Message::KeyboardSave).is_empty());
}

// ─────────────────────────────────────────────────────────
// Exit
// ─────────────────────────────────────────────────────────

#[test]
fn test_exit_when_clean_is_immediate() {
    let mut h = harness();
    load_settled(&mut h, RepresentationKind::Textual, "int a;", "blink");
    let actions = drive(&mut h.state, Message::RequestExit);
    assert!(has_exit(&actions));
    assert!(!h.state.editor_open);
}

#[test]
fn test_exit_when_dirty_asks_first() {
    let mut h = harness();
    dirty_visual(&mut h, "lights");
    let actions = drive(&mut h.state, Message::RequestExit);
    assert!(!has_exit(&actions));
    assert!(h.state.exit_dialog.open);
}

#[test]
fn test_exit_cancel_returns_to_editing() {
    let mut h = harness();
    dirty_visual(&mut h, "lights");
    drive(&mut h.state, Message::RequestExit);

    let actions = drive(&mut h.state, Message::ExitChoice(ExitOption::Cancel));
    assert!(actions.is_empty());
    assert!(h.state.editor_open);
    assert!(h.state.unsaved_changes);
    assert!(!h.state.exit_pending);
    assert!(!h.state.exit_dialog.open);
}

#[test]
fn test_exit_cancel_when_clean_still_leaves() {
    let mut h = harness();
    load_settled(&mut h, RepresentationKind::Textual, "void loop() {}", "blink");

    let actions = drive(&mut h.state, Message::ExitChoice(ExitOption::Cancel));
    assert!(has_exit(&actions));
    assert!(!h.state.editor_open);
}

#[test]
fn test_exit_discard() {
    let mut h = harness();
    dirty_visual(&mut h, "lights");
    let actions = drive(&mut h.state, Message::ExitChoice(ExitOption::Exit));
    assert!(has_exit(&actions));
    assert!(saves(&actions).is_empty());
    assert!(!h.state.editor_open);
}

#[test]
fn test_save_and_exit_titled() {
    let mut h = harness();
    dirty_visual(&mut h, "lights");

    let actions = drive(&mut h.state, Message::ExitChoice(ExitOption::SaveAndExit));
    assert_eq!(saves(&actions).len(), 1);
    assert!(!has_exit(&actions));
    assert!(h.state.exit_pending);

    let reply = save_reply(&h.state, "lights".into(), None);
    let actions = drive(&mut h.state, reply);
    assert!(has_exit(&actions));
    assert!(!h.state.editor_open);
}

#[test]
fn test_save_and_exit_failed_save_stays_open() {
    let mut h = harness();
    dirty_visual(&mut h, "lights");
    drive(&mut h.state, Message::ExitChoice(ExitOption::SaveAndExit));

    let reply = save_reply(&h.state, "lights".into(), Some("no space".into()));
    let actions = drive(&mut h.state, reply);
    assert!(!has_exit(&actions));
    assert!(h.state.editor_open);
    assert!(h.state.unsaved_changes);
    assert!(!h.state.exit_pending);
}

#[test]
fn test_save_and_exit_untitled_goes_through_save_as() {
    let mut h = harness();
    dirty_visual(&mut h, "");

    let actions = drive(&mut h.state, Message::ExitChoice(ExitOption::SaveAndExit));
    assert!(saves(&actions).is_empty());
    assert!(h.state.save_dialog.open);

    drive(
        &mut h.state,
        Message::SaveModalInput {
            filename: "night light".into(),
        },
    );
    let actions = drive(&mut h.state, Message::SaveModalSubmit);
    assert_eq!(saves(&actions).len(), 1);

    let reply = save_reply(&h.state, "night_light".into(), None);
    let actions = drive(&mut h.state, reply);
    assert!(has_exit(&actions));
}

#[test]
fn test_save_as_cancel_abandons_exit() {
    let mut h = harness();
    dirty_visual(&mut h, "");
    drive(&mut h.state, Message::ExitChoice(ExitOption::SaveAndExit));
    drive(&mut h.state, Message::SaveModalCancel);

    assert!(!h.state.exit_pending);
    assert!(h.state.editor_open);
}

// ─────────────────────────────────────────────────────────
// Run / Stop / Export
// ─────────────────────────────────────────────────────────

#[test]
fn test_run_waits_for_acknowledgment() {
    let mut h = harness();
    load_settled(&mut h, RepresentationKind::Textual, "int a;", "blink");

    let actions = drive(&mut h.state, Message::RunToggle);
    let job_id = match actions.as_slice() {
        [UpdateAction::SendRun {
            job_id,
            code,
            device,
            minimal,
        }] => {
            assert_eq!(code, "int a;");
            assert_eq!(device, &test_device_id());
            assert!(*minimal);
            *job_id
        }
        other => panic!("expected run, got {:?}", other),
    };
    assert_eq!(h.state.job.phase(), JobPhase::Requested);
    assert_eq!(h.state.job.job_id(), Some(job_id));

    assert!(drive(&mut h.state, Message::RunToggle).is_empty());

    drive(&mut h.state, progress("COMPILE"));
    assert_eq!(h.state.job.phase(), JobPhase::Running);
    assert_eq!(h.state.running_stage.as_deref(), Some("COMPILE"));
}

#[test]
fn test_stage_advance_records_stage_and_reports_error() {
    let mut h = harness();
    load_settled(&mut h, RepresentationKind::Textual, "int a;", "blink");
    drive(&mut h.state, Message::RunToggle);
    drive(&mut h.state, progress("COMPILE"));

    drive(
        &mut h.state,
        Message::Toolchain(ToolchainEvent::Message(ToolchainMessage::RunProgress(
            RunProgress::new("UPLOAD", true).with_error("port busy"),
        ))),
    );
    assert_eq!(h.state.running_stage.as_deref(), Some("UPLOAD"));
    assert_eq!(texts(&h.state), vec!["port busy"]);

    // Repeats are ignored, error included
    drive(
        &mut h.state,
        Message::Toolchain(ToolchainEvent::Message(ToolchainMessage::RunProgress(
            RunProgress::new("UPLOAD", true).with_error("port busy"),
        ))),
    );
    assert_eq!(h.state.notifications.len(), 1);
}

#[test]
fn test_run_while_running_sends_stop() {
    let mut h = harness();
    load_settled(&mut h, RepresentationKind::Textual, "int a;", "blink");
    drive(&mut h.state, Message::RunToggle);
    drive(&mut h.state, progress("COMPILE"));

    let actions = drive(&mut h.state, Message::RunToggle);
    assert!(matches!(actions.as_slice(), [UpdateAction::SendStop { .. }]));
    assert!(!actions
        .iter()
        .any(|a| matches!(a, UpdateAction::SendRun { .. })));
    assert!(h.state.job.stop_requested());
}

#[test]
fn test_stop_then_cancelled_completion() {
    let mut h = harness();
    load_settled(&mut h, RepresentationKind::Textual, "int a;", "blink");
    drive(&mut h.state, Message::RunToggle);
    drive(&mut h.state, progress("COMPILE"));
    drive(&mut h.state, Message::RunToggle);

    drive(
        &mut h.state,
        Message::Toolchain(ToolchainEvent::Message(ToolchainMessage::RunProgress(
            RunProgress::new("DONE", true).cancelled(),
        ))),
    );
    assert_eq!(h.state.job.phase(), JobPhase::Cancelled);
    assert_eq!(texts(&h.state), vec!["Run operation cancelled."]);
}

#[test]
fn test_unrequested_cancel_flag_is_not_a_cancellation() {
    let mut h = harness();
    load_settled(&mut h, RepresentationKind::Textual, "int a;", "blink");
    drive(&mut h.state, Message::RunToggle);
    drive(&mut h.state, progress("COMPILE"));

    drive(
        &mut h.state,
        Message::Toolchain(ToolchainEvent::Message(ToolchainMessage::RunProgress(
            RunProgress::new("DONE", true).cancelled(),
        ))),
    );
    assert_eq!(h.state.job.phase(), JobPhase::Completed);
    assert!(h.state.running_stage.is_none());
    assert!(texts(&h.state).is_empty());
}

#[test]
fn test_duplicate_completion_notifies_once() {
    let mut h = harness();
    load_settled(&mut h, RepresentationKind::Textual, "int a;", "blink");
    drive(&mut h.state, Message::RunToggle);
    drive(&mut h.state, progress("COMPILE"));
    drive(&mut h.state, progress("UPLOAD"));
    drive(&mut h.state, progress("DONE"));
    drive(&mut h.state, progress("DONE"));

    assert_eq!(h.state.job.phase(), JobPhase::Completed);
    assert_eq!(h.state.notifications.len(), 1);
    assert_eq!(
        h.state.notifications.last().unwrap().level,
        NotificationLevel::Success
    );
}

#[test]
fn test_progress_from_stdout_line() {
    let mut h = harness();
    load_settled(&mut h, RepresentationKind::Textual, "int a;", "blink");
    drive(&mut h.state, Message::RunToggle);
    drive(
        &mut h.state,
        Message::Toolchain(ToolchainEvent::Stdout(
            r#"[{"event":"runprogress","params":{"stage":"COMPILE","running":true}}]"#.into(),
        )),
    );
    assert!(h.state.is_running());
}

#[test]
fn test_progress_error_is_reported() {
    let mut h = harness();
    load_settled(&mut h, RepresentationKind::Textual, "int a;", "blink");
    drive(&mut h.state, Message::RunToggle);
    drive(&mut h.state, progress("COMPILE"));
    drive(
        &mut h.state,
        Message::Toolchain(ToolchainEvent::Message(ToolchainMessage::RunProgress(
            RunProgress::new("DONE", true).with_error("compile failed"),
        ))),
    );

    assert!(!h.state.job.is_active());
    assert_eq!(texts(&h.state), vec!["compile failed"]);
}

#[test]
fn test_export_cancelled_aborts_silently() {
    let mut h = harness();
    load_settled(&mut h, RepresentationKind::Textual, "int a;", "blink");

    let actions = drive(&mut h.state, Message::Export);
    assert_eq!(
        actions,
        vec![UpdateAction::PromptExportPath {
            suggested_name: "blink.bin".into()
        }]
    );

    let actions = drive(&mut h.state, Message::ExportPathChosen { path: None });
    assert!(actions.is_empty());
    assert!(!h.state.job.is_active());
    assert!(h.state.notifications.is_empty());
}

#[test]
fn test_export_is_running_immediately() {
    let mut h = harness();
    load_settled(&mut h, RepresentationKind::Textual, "int a;", "blink");

    let actions = drive(
        &mut h.state,
        Message::ExportPathChosen {
            path: Some(PathBuf::from("/tmp/blink.bin")),
        },
    );
    assert!(matches!(
        actions.as_slice(),
        [UpdateAction::SendExport { path, .. }] if path == "/tmp/blink.bin"
    ));
    assert!(h.state.is_running());

    let actions = drive(&mut h.state, Message::RunToggle);
    assert!(matches!(actions.as_slice(), [UpdateAction::SendStop { .. }]));
}

#[test]
fn test_visual_run_uses_generated_code() {
    let mut h = harness();
    dirty_visual(&mut h, "lights");
    let actions = drive(&mut h.state, Message::RunToggle);
    assert!(matches!(
        actions.as_slice(),
        [UpdateAction::SendRun { code, .. }] if code == "void loop() { x(); }"
    ));
}

#[test]
fn test_toggle_minimal() {
    let mut h = harness();
    load_settled(&mut h, RepresentationKind::Textual, "int a;", "blink");
    drive(&mut h.state, Message::ToggleMinimal);
    let actions = drive(&mut h.state, Message::RunToggle);
    assert!(matches!(
        actions.as_slice(),
        [UpdateAction::SendRun { minimal: false, .. }]
    ));
}

#[test]
fn test_toolchain_exit_resets_active_job() {
    let mut h = harness();
    load_settled(&mut h, RepresentationKind::Textual, "int a;", "blink");
    drive(&mut h.state, Message::RunToggle);
    drive(&mut h.state, progress("COMPILE"));

    drive(
        &mut h.state,
        Message::Toolchain(ToolchainEvent::Exited { code: Some(1) }),
    );
    assert_eq!(h.state.job.phase(), JobPhase::Idle);
    assert_eq!(
        h.state.notifications.last().unwrap().level,
        NotificationLevel::Error
    );
}

#[test]
fn test_command_failed_resets_matching_job() {
    let mut h = harness();
    load_settled(&mut h, RepresentationKind::Textual, "int a;", "blink");
    drive(&mut h.state, Message::RunToggle);
    let job_id = h.state.job.job_id();

    drive(
        &mut h.state,
        Message::CommandFailed {
            job_id,
            error: "Toolchain is not running".into(),
        },
    );
    assert!(!h.state.job.is_active());
    assert_eq!(texts(&h.state), vec!["Toolchain is not running"]);
}

// ─────────────────────────────────────────────────────────
// Device presence
// ─────────────────────────────────────────────────────────

#[test]
fn test_presence_uses_device_name() {
    let mut h = harness();
    load_settled(&mut h, RepresentationKind::Textual, "int a;", "blink");
    drive(&mut h.state, ports(Some("/dev/ttyUSB0")));
    assert_eq!(texts(&h.state), vec!["Nibble connected"]);
    assert_eq!(h.state.device_connected, Some(true));

    drive(&mut h.state, ports(None));
    assert_eq!(texts(&h.state), vec!["Nibble disconnected"]);
}

#[test]
fn test_presence_flapping_is_bounded() {
    let mut h = harness();
    load_settled(&mut h, RepresentationKind::Textual, "int a;", "blink");
    for i in 0..50 {
        let port = if i % 2 == 0 { Some("/dev/ttyUSB0") } else { None };
        drive(&mut h.state, ports(port));
        drive(&mut h.state, ports(port));
    }
    assert_eq!(h.state.notifications.len(), 1);
}

#[test]
fn test_initial_absent_device_is_silent() {
    let mut h = harness();
    load_settled(&mut h, RepresentationKind::Textual, "int a;", "blink");
    drive(&mut h.state, ports(None));
    assert!(h.state.notifications.is_empty());
    assert_eq!(h.state.device_connected, Some(false));
}

#[test]
fn test_disconnect_does_not_cancel_job() {
    let mut h = harness();
    load_settled(&mut h, RepresentationKind::Textual, "int a;", "blink");
    drive(&mut h.state, ports(Some("/dev/ttyUSB0")));
    drive(&mut h.state, Message::RunToggle);
    drive(&mut h.state, progress("UPLOAD"));

    drive(&mut h.state, ports(None));
    assert!(h.state.is_running());
}

// ─────────────────────────────────────────────────────────
// Notifications
// ─────────────────────────────────────────────────────────

#[test]
fn test_notification_lifecycle() {
    let mut h = harness();
    load_settled(&mut h, RepresentationKind::Textual, "int a;", "blink");
    drive(&mut h.state, Message::Save);
    let reply = save_reply(&h.state, "blink".into(), None);
    let actions = drive(&mut h.state, reply);
    let id = h.state.notifications.last().unwrap().id;
    assert!(actions.contains(&UpdateAction::ScheduleNotificationDismiss {
        id,
        after: Duration::from_millis(2000),
    }));

    let actions = drive(&mut h.state, Message::NotificationTimeout { id });
    assert_eq!(
        actions,
        vec![UpdateAction::ScheduleNotificationRemoval {
            id,
            after: Duration::from_millis(500),
        }]
    );
    assert!(h.state.notifications.get(id).unwrap().closing);

    drive(&mut h.state, Message::NotificationRemove { id });
    assert!(h.state.notifications.is_empty());
}

#[test]
fn test_early_close_leaves_no_live_timer() {
    let mut h = harness();
    load_settled(&mut h, RepresentationKind::Textual, "int a;", "blink");
    let reply = save_reply(&h.state, "blink".into(), None);
    drive(&mut h.state, reply);
    let id = h.state.notifications.last().unwrap().id;

    drive(&mut h.state, Message::DismissNotification { id });
    drive(&mut h.state, Message::NotificationRemove { id });

    // The first auto-dismiss timer fires late
    let actions = drive(&mut h.state, Message::NotificationTimeout { id });
    assert!(actions.is_empty());
    assert!(h.state.notifications.is_empty());
}

#[test]
fn test_negative_timeout_disables_auto_dismiss() {
    let mut settings = Settings::default();
    settings.editor.notification_timeout_ms = -1;
    let mut h = harness_with(settings);
    load_settled(&mut h, RepresentationKind::Textual, "int a;", "blink");

    let reply = save_reply(&h.state, "blink".into(), None);
    let actions = drive(&mut h.state, reply);
    assert!(!actions
        .iter()
        .any(|a| matches!(a, UpdateAction::ScheduleNotificationDismiss { .. })));
    assert_eq!(h.state.notifications.len(), 1);
}
