//! Serial line transport for AT command traffic.
//!
//! The modem speaks CR/LF terminated ASCII lines interleaved with raw binary
//! during firmware upload, so the transport exposes both a line reader and a
//! verbatim byte writer over one stream. Reopening after a module reset goes
//! through [`PortOpener`], because `AT+CRESET` makes the device node vanish
//! and reappear asynchronously.

use std::io;
use std::time::Duration;

use log::debug;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::time::{sleep, timeout};
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tokio_stream::StreamExt;
use tokio_util::codec::{FramedRead, LinesCodec};

use crate::error::{Error, Result};

/// Baud rate mandated for the AT interface.
pub const AT_BAUD_RATE: u32 = 9600;

/// Longest response line the framer will accept.
const MAX_LINE_LENGTH: usize = 1024;

/// Source of serial streams, abstracted so sessions can be re-established
/// after a device reset and so tests can substitute in-memory streams.
#[allow(async_fn_in_trait)]
pub trait PortOpener {
    type Stream: AsyncRead + AsyncWrite + Unpin;

    async fn open(&mut self) -> Result<Self::Stream>;
}

/// Opens a real serial device with the fixed AT interface settings.
#[derive(Debug, Clone)]
pub struct SerialOpener {
    device: String,
    baud: u32,
}

impl SerialOpener {
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            baud: AT_BAUD_RATE,
        }
    }

    pub fn with_baud(mut self, baud: u32) -> Self {
        self.baud = baud;
        self
    }

    pub fn device(&self) -> &str {
        &self.device
    }
}

impl PortOpener for SerialOpener {
    type Stream = SerialStream;

    async fn open(&mut self) -> Result<SerialStream> {
        tokio_serial::new(&self.device, self.baud)
            .open_native_async()
            .map_err(|source| Error::DeviceUnavailable {
                device: self.device.clone(),
                source,
            })
    }
}

/// Half-duplex view of one serial stream: raw writes out, framed lines in.
///
/// Closing is dropping; the OS handle is released when the port goes out of
/// scope.
pub struct AtPort<T> {
    writer: WriteHalf<T>,
    lines: FramedRead<ReadHalf<T>, LinesCodec>,
}

impl<T: AsyncRead + AsyncWrite + Unpin> AtPort<T> {
    pub fn new(stream: T) -> Self {
        let (reader, writer) = tokio::io::split(stream);
        Self {
            writer,
            lines: FramedRead::new(reader, LinesCodec::new_with_max_length(MAX_LINE_LENGTH)),
        }
    }

    /// Write `data` verbatim, with no framing added.
    pub async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.writer.write_all(data).await?;
        self.writer.flush().await
    }

    /// Read one line with its CR/LF terminator stripped, or `None` if no
    /// complete line arrives within `wait`.
    pub async fn read_line(&mut self, wait: Duration) -> io::Result<Option<String>> {
        match timeout(wait, self.lines.next()).await {
            Ok(Some(Ok(line))) => Ok(Some(line)),
            Ok(Some(Err(e))) => Err(io::Error::new(io::ErrorKind::InvalidData, e)),
            // Stream closed.
            Ok(None) => Ok(None),
            // Nothing arrived in time.
            Err(_) => Ok(None),
        }
    }
}

/// Repeatedly try to reopen the port until it comes back, sleeping `interval`
/// after each failed attempt. Gives up with [`Error::ReconnectTimeout`] after
/// `max_attempts` tries.
pub async fn reconnect<O: PortOpener>(
    opener: &mut O,
    max_attempts: usize,
    interval: Duration,
) -> Result<O::Stream> {
    for attempt in 1..=max_attempts {
        match opener.open().await {
            Ok(stream) => {
                debug!("port reopened on attempt {attempt}");
                return Ok(stream);
            }
            Err(e) => {
                debug!("reconnect attempt {attempt}/{max_attempts} failed: {e}");
                sleep(interval).await;
            }
        }
    }
    Err(Error::ReconnectTimeout {
        attempts: max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, AsyncWriteExt as _, DuplexStream};

    struct FailingOpener {
        attempts: usize,
    }

    impl PortOpener for FailingOpener {
        type Stream = DuplexStream;

        async fn open(&mut self) -> Result<DuplexStream> {
            self.attempts += 1;
            Err(Error::DeviceUnavailable {
                device: "/dev/ttyUSB9".into(),
                source: tokio_serial::Error::new(tokio_serial::ErrorKind::NoDevice, "gone"),
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn read_line_strips_terminator() {
        let (local, mut remote) = duplex(256);
        let mut port = AtPort::new(local);
        remote.write_all(b"+CGMR: LE11B04\r\nOK\r\n").await.unwrap();

        let line = port.read_line(Duration::from_secs(1)).await.unwrap();
        assert_eq!(line.as_deref(), Some("+CGMR: LE11B04"));
        let line = port.read_line(Duration::from_secs(1)).await.unwrap();
        assert_eq!(line.as_deref(), Some("OK"));
    }

    #[tokio::test(start_paused = true)]
    async fn read_line_times_out_without_data() {
        let (local, _remote) = duplex(256);
        let mut port = AtPort::<DuplexStream>::new(local);

        let line = port.read_line(Duration::from_millis(100)).await.unwrap();
        assert!(line.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_gives_up_after_max_attempts() {
        let mut opener = FailingOpener { attempts: 0 };
        let started = tokio::time::Instant::now();

        let result = reconnect(&mut opener, 100, Duration::from_secs(1)).await;

        assert!(matches!(
            result,
            Err(Error::ReconnectTimeout { attempts: 100 })
        ));
        assert_eq!(opener.attempts, 100);
        // One interval elapses after every failed attempt.
        assert_eq!(started.elapsed(), Duration::from_secs(100));
    }
}
