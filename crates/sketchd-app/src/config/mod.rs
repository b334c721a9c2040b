//! Configuration file parsing for sketchd
//!
//! Supports `<sketchbook>/.sketchd/config.toml`.

pub mod settings;
pub mod types;

pub use settings::{config_path, default_sketchbook, init_config_dir, load_settings, save_settings};
pub use types::*;
