//! Settings parser for .sketchd/config.toml

use std::path::{Path, PathBuf};

use super::types::Settings;
use sketchd_core::prelude::*;

const CONFIG_FILENAME: &str = "config.toml";
const SKETCHD_DIR: &str = ".sketchd";

/// Default sketchbook location: `~/Documents/sketchd`, or `./sketchd` without a home
pub fn default_sketchbook() -> PathBuf {
    dirs::document_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sketchd")
}

/// Path of the config file inside a sketchbook
pub fn config_path(sketchbook: &Path) -> PathBuf {
    sketchbook.join(SKETCHD_DIR).join(CONFIG_FILENAME)
}

/// Load settings from `<sketchbook>/.sketchd/config.toml`.
///
/// Missing or unreadable files yield defaults; this never fails.
pub fn load_settings(sketchbook: &Path) -> Settings {
    let config_path = config_path(sketchbook);

    if !config_path.exists() {
        debug!("No config file at {:?}, using defaults", config_path);
        return Settings::default();
    }

    match std::fs::read_to_string(&config_path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(settings) => {
                debug!("Loaded settings from {:?}", config_path);
                settings
            }
            Err(e) => {
                warn!("Failed to parse {:?}: {}", config_path, e);
                Settings::default()
            }
        },
        Err(e) => {
            warn!("Failed to read {:?}: {}", config_path, e);
            Settings::default()
        }
    }
}

/// Create `.sketchd/config.toml` with commented defaults if it is missing
pub fn init_config_dir(sketchbook: &Path) -> Result<()> {
    let dir = sketchbook.join(SKETCHD_DIR);

    if !dir.exists() {
        std::fs::create_dir_all(&dir)
            .map_err(|e| Error::config(format!("Failed to create .sketchd dir: {}", e)))?;
        info!("Created .sketchd directory");
    }

    let config_path = dir.join(CONFIG_FILENAME);
    if !config_path.exists() {
        std::fs::write(&config_path, DEFAULT_CONFIG)
            .map_err(|e| Error::config(format!("Failed to write config.toml: {}", e)))?;
        info!("Created default config.toml");
    }

    Ok(())
}

/// Write settings back, replacing the file atomically
pub fn save_settings(sketchbook: &Path, settings: &Settings) -> Result<()> {
    let dir = sketchbook.join(SKETCHD_DIR);

    if !dir.exists() {
        std::fs::create_dir_all(&dir)
            .map_err(|e| Error::config(format!("Failed to create .sketchd dir: {}", e)))?;
    }

    let config_path = dir.join(CONFIG_FILENAME);
    let temp_path = dir.join(".config.toml.tmp");

    let content = toml::to_string_pretty(settings)
        .map_err(|e| Error::config(format!("Failed to serialize settings: {}", e)))?;

    std::fs::write(&temp_path, format!("{}{}", CONFIG_HEADER, content))
        .map_err(|e| Error::config(format!("Failed to write temp file: {}", e)))?;
    std::fs::rename(&temp_path, &config_path)
        .map_err(|e| Error::config(format!("Failed to rename temp file: {}", e)))?;

    info!("Saved settings to {:?}", config_path);
    Ok(())
}

const CONFIG_HEADER: &str = "# sketchd configuration\n\n";

const DEFAULT_CONFIG: &str = r#"# sketchd configuration

[toolchain]
# Executable that compiles, uploads and stores sketches
command = "sketchd-toolchain"
args = []
# Stage names in reporting order; completion_stage ends a job
stages = ["COMPILE", "UPLOAD", "DONE"]
completion_stage = "DONE"
request_timeout_ms = 30000

[editor]
minimal_compile = true
# Edits within this window after loading a sketch do not mark it unsaved
load_grace_ms = 1250
# Set to a negative value to keep notifications until dismissed
notification_timeout_ms = 2000
notification_grace_ms = 500

# Extra devices, or overrides of the built-in ones
# [[devices]]
# id = "cm:esp32:ringo"
# name = "MAKERphone"
# palette = ["Logic", "Loops", "Display"]
"#;
