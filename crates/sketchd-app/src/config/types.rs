//! Configuration types for sketchd
//!
//! Defines:
//! - `Settings` - Contents of `.sketchd/config.toml`
//! - `ToolchainSettings`, `EditorSettings` - Its sections

use serde::{Deserialize, Serialize};

use sketchd_core::{DeviceCatalog, DeviceOverride};
use sketchd_toolchain::{StageSequence, ToolchainSpawn};

/// Application settings (.sketchd/config.toml)
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub toolchain: ToolchainSettings,

    #[serde(default)]
    pub editor: EditorSettings,

    /// Extra or overridden device profiles
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub devices: Vec<DeviceOverride>,
}

impl Settings {
    /// Built-in catalog with `[[devices]]` applied
    pub fn device_catalog(&self) -> DeviceCatalog {
        let mut catalog = DeviceCatalog::builtin();
        catalog.merge(&self.devices);
        catalog
    }
}

/// `[toolchain]` section
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ToolchainSettings {
    /// Executable to launch (looked up on PATH)
    #[serde(default = "default_command")]
    pub command: String,

    #[serde(default)]
    pub args: Vec<String>,

    /// Stage that ends a job
    #[serde(default = "default_completion_stage")]
    pub completion_stage: String,

    /// Stage names in the order the toolchain reports them
    #[serde(default = "default_stages")]
    pub stages: Vec<String>,

    /// Timeout for requests that expect a response (save, sketches)
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for ToolchainSettings {
    fn default() -> Self {
        Self {
            command: default_command(),
            args: Vec::new(),
            completion_stage: default_completion_stage(),
            stages: default_stages(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl ToolchainSettings {
    pub fn stage_sequence(&self) -> StageSequence {
        StageSequence::new(self.stages.clone(), self.completion_stage.clone())
    }

    pub fn spawn_config(&self) -> ToolchainSpawn {
        ToolchainSpawn {
            command: self.command.clone(),
            args: self.args.clone(),
            working_dir: None,
        }
    }
}

fn default_command() -> String {
    "sketchd-toolchain".to_string()
}

fn default_completion_stage() -> String {
    "DONE".to_string()
}

fn default_stages() -> Vec<String> {
    vec!["COMPILE".into(), "UPLOAD".into(), "DONE".into()]
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

/// `[editor]` section
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EditorSettings {
    /// Ask the toolchain for a minimal (faster, smaller) compile
    #[serde(default = "default_true")]
    pub minimal_compile: bool,

    /// Window after a load in which edits are treated as population, not changes
    #[serde(default = "default_load_grace_ms")]
    pub load_grace_ms: u64,

    /// Auto-dismiss delay for notifications; negative disables auto-dismiss
    #[serde(default = "default_notification_timeout_ms")]
    pub notification_timeout_ms: i64,

    /// Delay between a notification starting to close and its removal
    #[serde(default = "default_notification_grace_ms")]
    pub notification_grace_ms: u64,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            minimal_compile: true,
            load_grace_ms: default_load_grace_ms(),
            notification_timeout_ms: default_notification_timeout_ms(),
            notification_grace_ms: default_notification_grace_ms(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_load_grace_ms() -> u64 {
    1250
}

fn default_notification_timeout_ms() -> i64 {
    2000
}

fn default_notification_grace_ms() -> u64 {
    500
}
