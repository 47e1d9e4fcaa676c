//! Firmware update orchestration for SIMCom modules speaking the LFOTA
//! dialect.
//!
//! An update session runs strictly in sequence: query the current revision,
//! announce the transfer, stream the delta file with mandated pacing, poll
//! the flash status, reset the module, reattach to the reappeared device
//! node, and verify that the reported revision actually changed. Every error
//! is terminal to the session; only the reconnect loop retries internally.

use std::path::Path;

use log::{info, warn};
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::time::sleep;

use crate::at::{AtEngine, ResponseMode};
use crate::error::{Error, Result};
use crate::transport::{self, PortOpener};

mod config;
mod types;

pub use types::{
    FirmwareImage, FotaConfig, ModuleInfo, NullObserver, ProgressObserver, UpdateOutcome,
    UpdatePhase,
};

const CMD_IDENTIFY: &str = "ATI";
const CMD_REVISION_MAIN: &str = "AT+CGMR";
const CMD_REVISION_SUB: &str = "AT+CSUB";
const CMD_STATUS: &str = "AT+LFOTA?";
const CMD_RESET: &str = "AT+CRESET";

/// Status value meaning "flash succeeded, awaiting reset".
const STATUS_FLASH_OK: &str = "1";

/// Drives the show and update flows over ports minted by `O`.
pub struct FotaUpdater<O: PortOpener> {
    opener: O,
    config: FotaConfig,
}

impl<O: PortOpener> FotaUpdater<O> {
    pub fn new(opener: O) -> Self {
        Self::with_config(opener, FotaConfig::default())
    }

    pub fn with_config(opener: O, config: FotaConfig) -> Self {
        Self { opener, config }
    }

    async fn connect(&mut self) -> Result<AtEngine<O::Stream>> {
        let stream = self.opener.open().await?;
        Ok(AtEngine::with_settle_time(stream, self.config.settle_time))
    }

    /// Query module identity and firmware revision.
    pub async fn show(&mut self) -> Result<ModuleInfo> {
        let mut engine = self.connect().await?;
        let ati = engine
            .send(CMD_IDENTIFY, &["Model", "Revision"], ResponseMode::Normal)
            .await?;
        let fw_revision = query_revision(&mut engine).await?;
        Ok(ModuleInfo {
            model: ati.field("Model")?.to_string(),
            hw_revision: ati.field("Revision")?.to_string(),
            fw_revision,
        })
    }

    /// Run a full update session with the delta file at `firmware`.
    pub async fn update(
        &mut self,
        firmware: &Path,
        observer: &mut dyn ProgressObserver,
    ) -> Result<UpdateOutcome> {
        match self.run_update(firmware, observer).await {
            Ok(outcome) => {
                observer.phase_changed(UpdatePhase::Verified);
                Ok(outcome)
            }
            Err(e) => {
                observer.phase_changed(UpdatePhase::Failed);
                Err(e)
            }
        }
    }

    async fn run_update(
        &mut self,
        firmware: &Path,
        observer: &mut dyn ProgressObserver,
    ) -> Result<UpdateOutcome> {
        let image = FirmwareImage::open(firmware).await?;
        let mut engine = self.connect().await?;

        let old_revision = query_revision(&mut engine).await?;
        info!("firmware revision before update: {old_revision}");
        observer.phase_changed(UpdatePhase::VersionQueried);

        engine
            .send(
                &format!("AT+LFOTA=0,{}", image.len),
                &[],
                ResponseMode::Normal,
            )
            .await?;
        observer.phase_changed(UpdatePhase::TransferInitiated);

        // The module starts expecting raw bytes as soon as the upload command
        // lands, so no terminal OK can be awaited here.
        engine
            .send(
                &format!("AT+LFOTA=1,{}", image.len),
                &[],
                ResponseMode::Continuous,
            )
            .await?;

        observer.phase_changed(UpdatePhase::Uploading);
        let file = File::open(&image.path)
            .await
            .map_err(|source| Error::FileAccess {
                path: image.path.display().to_string(),
                source,
            })?;
        self.stream_image(&mut engine, file, image.len, observer)
            .await?;

        observer.phase_changed(UpdatePhase::SettleWait);
        sleep(self.config.flash_settle).await;

        let status = engine
            .send(CMD_STATUS, &["+LFOTA"], ResponseMode::Normal)
            .await?;
        let value = status.field("+LFOTA")?;
        if value != STATUS_FLASH_OK {
            warn!("status poll returned {value}");
            return Err(Error::UpdateRejected {
                status: value.to_string(),
            });
        }
        observer.phase_changed(UpdatePhase::StatusPolled);

        sleep(self.config.pre_reset_delay).await;
        // The module may already be rebooting and unable to answer, so the
        // reset goes out fire-and-forget.
        engine.send(CMD_RESET, &[], ResponseMode::NoParse).await?;
        observer.phase_changed(UpdatePhase::Resetting);

        drop(engine);
        sleep(self.config.post_close_delay).await;

        observer.phase_changed(UpdatePhase::Reconnecting);
        info!("waiting for the device node to reappear");
        let stream = transport::reconnect(
            &mut self.opener,
            self.config.reconnect_attempts,
            self.config.reconnect_interval,
        )
        .await?;
        let mut engine = AtEngine::with_settle_time(stream, self.config.settle_time);
        sleep(self.config.boot_settle).await;

        let new_revision = query_revision(&mut engine).await?;
        info!("firmware revision after update: {new_revision}");

        if new_revision == old_revision {
            return Err(Error::RevisionUnchanged {
                revision: new_revision,
            });
        }
        Ok(UpdateOutcome {
            old_revision,
            new_revision,
        })
    }

    /// Stream `len` bytes of `source` to the module in fixed-size blocks,
    /// observing the inter-block pacing the module requires.
    async fn stream_image<R>(
        &self,
        engine: &mut AtEngine<O::Stream>,
        mut source: R,
        len: u64,
        observer: &mut dyn ProgressObserver,
    ) -> Result<()>
    where
        R: AsyncRead + Unpin,
    {
        let chunk_size = self.config.chunk_size as u64;
        let total = len.div_ceil(chunk_size);
        let mut buf = vec![0u8; self.config.chunk_size];

        for index in 0..total {
            let take = if index + 1 == total {
                (len - index * chunk_size) as usize
            } else {
                self.config.chunk_size
            };
            let chunk = &mut buf[..take];
            source.read_exact(chunk).await.map_err(Error::TransferIo)?;
            engine
                .port_mut()
                .write_all(chunk)
                .await
                .map_err(Error::TransferIo)?;
            observer.chunk_sent(index + 1, total);
            sleep(self.config.inter_chunk_delay).await;
        }
        Ok(())
    }
}

async fn query_revision<T>(engine: &mut AtEngine<T>) -> Result<String>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    let main = engine
        .send(CMD_REVISION_MAIN, &["+CGMR"], ResponseMode::Normal)
        .await?;
    let sub = engine
        .send(CMD_REVISION_SUB, &["+CSUB"], ResponseMode::Normal)
        .await?;
    Ok(format!("{}/{}", main.field("+CGMR")?, sub.field("+CSUB")?))
}
