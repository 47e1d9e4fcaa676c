use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::fs;

use crate::error::{Error, Result};

/// Timing and transfer policy for an update session.
///
/// The delays mirror the module's documented requirements; they are plain
/// fields so callers can tighten or stretch individual windows.
#[derive(Debug, Clone)]
pub struct FotaConfig {
    /// Settle window after each AT command before its response is read.
    pub settle_time: Duration,
    /// Size of the blocks the firmware file is streamed in.
    pub chunk_size: usize,
    /// Pacing between blocks, a hard device requirement. Sending faster
    /// risks overrunning the module's receive buffer.
    pub inter_chunk_delay: Duration,
    /// Wait after the last block before the flash status is polled.
    pub flash_settle: Duration,
    /// Wait between the successful status poll and the reset command.
    pub pre_reset_delay: Duration,
    /// Wait after closing the port before reconnect attempts start.
    pub post_close_delay: Duration,
    /// How often reopening the vanished device node is attempted.
    pub reconnect_attempts: usize,
    /// Pause between reconnect attempts.
    pub reconnect_interval: Duration,
    /// Wait after reconnecting for the AT interface to come up post-boot.
    pub boot_settle: Duration,
}

/// Firmware delta file, validated for existence and measured once.
#[derive(Debug, Clone)]
pub struct FirmwareImage {
    pub path: PathBuf,
    pub len: u64,
}

impl FirmwareImage {
    pub async fn open(path: &Path) -> Result<Self> {
        let meta = fs::metadata(path).await.map_err(|source| Error::FileAccess {
            path: path.display().to_string(),
            source,
        })?;
        if !meta.is_file() {
            return Err(Error::FileAccess {
                path: path.display().to_string(),
                source: io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"),
            });
        }
        Ok(Self {
            path: path.to_path_buf(),
            len: meta.len(),
        })
    }

    pub fn chunk_count(&self, chunk_size: usize) -> u64 {
        self.len.div_ceil(chunk_size as u64)
    }
}

/// Phases of an update session, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePhase {
    Idle,
    VersionQueried,
    TransferInitiated,
    Uploading,
    SettleWait,
    StatusPolled,
    Resetting,
    Reconnecting,
    Verified,
    Failed,
}

/// Module identity as reported by `ATI` and the revision queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInfo {
    pub model: String,
    pub hw_revision: String,
    pub fw_revision: String,
}

/// Result of a verified update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub old_revision: String,
    pub new_revision: String,
}

/// Receives phase transitions and upload progress ticks.
///
/// Decouples the protocol flow from presentation; the CLI renders these as
/// banners and a progress bar, tests record them.
pub trait ProgressObserver {
    fn phase_changed(&mut self, _phase: UpdatePhase) {}

    /// `index` counts sent chunks starting at 1, out of `total`.
    fn chunk_sent(&mut self, _index: u64, _total: u64) {}
}

/// Observer that ignores every event.
pub struct NullObserver;

impl ProgressObserver for NullObserver {}
