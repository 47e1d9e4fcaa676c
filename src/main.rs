//! Firmware update tool for SIMCom cellular modules.
//!
//! Usage:
//!   lfota --port /dev/ttyUSB2 show
//!   lfota --port /dev/ttyUSB2 update delta.bin

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use indicatif::ProgressBar;

use lfota::{FotaUpdater, ProgressObserver, SerialOpener, UpdatePhase};

/// Command-line arguments.
#[derive(Parser)]
#[command(name = "lfota")]
#[command(about = "SIMCom module firmware updater over serial AT commands")]
struct Cli {
    /// Serial device for AT commands and firmware upload (e.g., /dev/ttyUSB2)
    #[arg(short, long)]
    port: String,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Show model and firmware information
    Show,

    /// Perform a FOTA update from a local delta file
    Update {
        /// Path to the firmware delta file
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

/// Renders phase transitions as banners and the upload as a progress bar.
#[derive(Default)]
struct ConsoleProgress {
    bar: Option<ProgressBar>,
}

impl ProgressObserver for ConsoleProgress {
    fn phase_changed(&mut self, phase: UpdatePhase) {
        match phase {
            UpdatePhase::TransferInitiated => println!("Transfer accepted by the module"),
            UpdatePhase::Uploading => println!("Sending update file..."),
            UpdatePhase::SettleWait => {
                if let Some(bar) = self.bar.take() {
                    bar.finish();
                }
                println!("Upload complete, waiting for the module to flash...");
            }
            UpdatePhase::StatusPolled => println!("Module reports a successful flash"),
            UpdatePhase::Reconnecting => {
                println!("Waiting for the module to reset and the TTY to reappear, this can take a while...");
            }
            _ => {}
        }
    }

    fn chunk_sent(&mut self, index: u64, total: u64) {
        let bar = self.bar.get_or_insert_with(|| ProgressBar::new(total));
        bar.set_position(index);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut updater = FotaUpdater::new(SerialOpener::new(&cli.port));

    match cli.command {
        Commands::Show => {
            let info = updater.show().await?;
            println!(
                "Model {} with HW revision {} and FW revision {} detected",
                info.model, info.hw_revision, info.fw_revision
            );
        }
        Commands::Update { file } => {
            let mut progress = ConsoleProgress::default();
            let outcome = updater.update(&file, &mut progress).await?;
            println!(
                "Firmware update succeeded, new version: {}",
                outcome.new_revision
            );
        }
    }

    Ok(())
}
