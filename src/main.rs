//! sketchd - Editor session controller for embedded sketches
//!
//! This is the binary entry point. All logic lives in the library.

use clap::Parser;
use color_eyre::eyre::Result;
use tracing::{error, info};

use sketchd::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    if let Err(e) = sketchd_core::logging::init() {
        eprintln!("Logging disabled: {}", e);
    }

    let sketchbook = cli.sketchbook();
    info!("Sketchbook: {}", sketchbook.display());

    let result = match cli.command {
        Command::Run { file, device } => sketchd::run_sketch(&sketchbook, &file, &device).await,
        Command::Export { file, dest, device } => {
            sketchd::run_export(&sketchbook, &file, &dest, &device).await
        }
        Command::Validate { name, existing } => {
            sketchd::validate_name(&name, &existing);
            Ok(())
        }
    };

    if let Err(ref e) = result {
        error!("sketchd failed: {}", e);
    }
    info!("sketchd exiting");
    Ok(result?)
}
