//! sketchd Library
//!
//! Headless host for the sketchd editor session controller: command-line
//! parsing and the NDJSON runner that drives the Engine.

pub mod cli;
pub mod headless;

pub use cli::{Cli, Command};
pub use headless::runner::{run_export, run_sketch, validate_name};
