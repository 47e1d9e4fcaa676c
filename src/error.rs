use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("cannot open serial device {device}: {source}")]
    DeviceUnavailable {
        device: String,
        #[source]
        source: tokio_serial::Error,
    },

    #[error("AT command '{command}' returned error")]
    AtCommand { command: String },

    #[error("response is missing expected field '{field}'")]
    MissingField { field: String },

    #[error("cannot access firmware file {path}: {source}")]
    FileAccess {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("I/O failure during firmware transfer: {0}")]
    TransferIo(#[source] io::Error),

    #[error("module reported update status '{status}', expected '1'")]
    UpdateRejected { status: String },

    #[error("firmware revision unchanged after update: {revision}")]
    RevisionUnchanged { revision: String },

    #[error("serial device did not reappear within {attempts} reconnect attempts")]
    ReconnectTimeout { attempts: usize },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
