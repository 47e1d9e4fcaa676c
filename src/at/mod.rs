//! AT command request/response engine.
//!
//! The module gives no completion signal for buffered output: after a command
//! is written, data is only guaranteed present once a fixed settle window has
//! passed. The engine therefore writes, sleeps, then drains whatever lines
//! accumulated, instead of reading event-driven.

use std::time::Duration;

use log::{debug, trace};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::sleep;

use crate::error::{Error, Result};
use crate::transport::AtPort;

mod types;

pub use types::{normalize_field, AtResponse, ResponseMode};

/// Terminal line marking successful completion of a command.
const OK_MARKER: &str = "OK";

/// Default settle window between writing a command and reading its response.
pub const DEFAULT_SETTLE_TIME: Duration = Duration::from_secs(1);

/// How long to wait for a further line before the response is considered
/// fully drained.
const DRAIN_TIMEOUT: Duration = Duration::from_millis(100);

pub struct AtEngine<T> {
    port: AtPort<T>,
    settle_time: Duration,
}

impl<T: AsyncRead + AsyncWrite + Unpin> AtEngine<T> {
    pub fn new(stream: T) -> Self {
        Self::with_settle_time(stream, DEFAULT_SETTLE_TIME)
    }

    pub fn with_settle_time(stream: T, settle_time: Duration) -> Self {
        Self {
            port: AtPort::new(stream),
            settle_time,
        }
    }

    /// Raw access to the underlying port, for interleaving binary transfers
    /// with command traffic.
    pub fn port_mut(&mut self) -> &mut AtPort<T> {
        &mut self.port
    }

    /// Send `command` and collect its response.
    ///
    /// The command goes out with a trailing carriage return, followed by the
    /// fixed settle window. Collected lines beginning with `"<Field>: "` for
    /// a name in `fields` are stored in the response mapping under the
    /// normalized key; a bare `OK` line marks success. Whether a missing `OK`
    /// is an error depends on `mode`.
    pub async fn send(
        &mut self,
        command: &str,
        fields: &[&str],
        mode: ResponseMode,
    ) -> Result<AtResponse> {
        debug!("send: {command}");
        self.port.write_all(format!("{command}\r").as_bytes()).await?;
        sleep(self.settle_time).await;

        let mut response = AtResponse::default();
        if mode == ResponseMode::NoParse {
            return Ok(response);
        }

        while let Some(line) = self.port.read_line(DRAIN_TIMEOUT).await? {
            trace!("recv: {line:?}");
            for name in fields {
                if let Some(value) = line.strip_prefix(&format!("{name}: ")) {
                    response
                        .fields
                        .insert(normalize_field(name), value.to_string());
                }
            }
            if line == OK_MARKER {
                response.ok_seen = true;
            }
            response.lines.push(line);
        }

        if mode == ResponseMode::Normal && !response.ok_seen {
            debug!("command {command} completed without OK: {:?}", response.lines);
            return Err(Error::AtCommand {
                command: command.to_string(),
            });
        }
        Ok(response)
    }
}
