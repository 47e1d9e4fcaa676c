//! Firmware update for SIMCom cellular modules over a serial AT-command link.
//!
//! The module's LFOTA dialect delivers a firmware delta file over the same
//! serial line that carries AT commands: the transfer is announced with
//! `AT+LFOTA=0,<len>`, the raw bytes follow `AT+LFOTA=1,<len>` in paced
//! blocks, and the flash result is polled with `AT+LFOTA?` before the module
//! is reset and the session re-established on the reappeared device node.
//!
//! # Examples
//!
//! ## Showing module information
//! ```no_run
//! #[tokio::main]
//! async fn main() -> lfota::Result<()> {
//!     let info = lfota::show_module_info("/dev/ttyUSB2").await?;
//!     println!("{} ({}) running {}", info.model, info.hw_revision, info.fw_revision);
//!     Ok(())
//! }
//! ```
//!
//! ## Updating firmware
//! ```no_run
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> lfota::Result<()> {
//!     let mut observer = lfota::NullObserver;
//!     let outcome =
//!         lfota::update_firmware("/dev/ttyUSB2", Path::new("delta.bin"), &mut observer).await?;
//!     println!("updated {} -> {}", outcome.old_revision, outcome.new_revision);
//!     Ok(())
//! }
//! ```

mod at;
mod error;
mod fota;
mod transport;

pub use at::{normalize_field, AtEngine, AtResponse, ResponseMode, DEFAULT_SETTLE_TIME};
pub use error::{Error, Result};
pub use fota::{
    FirmwareImage, FotaConfig, FotaUpdater, ModuleInfo, NullObserver, ProgressObserver,
    UpdateOutcome, UpdatePhase,
};
pub use transport::{reconnect, AtPort, PortOpener, SerialOpener, AT_BAUD_RATE};

use std::path::Path;

/// Query model, hardware revision and firmware revision of the module on
/// `device`.
pub async fn show_module_info(device: &str) -> Result<ModuleInfo> {
    FotaUpdater::new(SerialOpener::new(device)).show().await
}

/// Update the module on `device` with the delta file at `firmware`,
/// reporting progress to `observer`.
pub async fn update_firmware(
    device: &str,
    firmware: &Path,
    observer: &mut dyn ProgressObserver,
) -> Result<UpdateOutcome> {
    FotaUpdater::new(SerialOpener::new(device))
        .update(firmware, observer)
        .await
}
