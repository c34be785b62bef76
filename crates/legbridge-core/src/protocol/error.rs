//! Protocol errors

use thiserror::Error;

use super::DeviceStatus;
use crate::registry::ParamError;

/// Errors that can occur while executing a command against the board
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Sync bytes, length or terminator are wrong
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// Checksum byte does not match the frame contents
    #[error("wrong checksum: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Checksum computed over the frame
        expected: u8,
        /// Checksum byte found in the frame
        actual: u8,
    },

    /// Intact response with a non-ok status
    #[error("device reported {0}")]
    DeviceError(DeviceStatus),

    /// No response within the configured timeout
    #[error("timeout when reading serial")]
    Timeout,

    /// Command name not in the registry
    #[error("unknown command")]
    UnknownCommand(String),

    /// A required parameter was not supplied
    #[error("missing param: {0}")]
    MissingParameter(String),

    /// A parameter value could not be converted
    #[error("invalid value for param {name}: {source}")]
    InvalidParameterValue {
        /// Parameter name
        name: String,
        /// Why the conversion failed
        #[source]
        source: ParamError,
    },

    /// Reading or writing the link failed
    #[error("I/O error: {0}")]
    LinkIo(#[from] std::io::Error),

    /// The reader saw the end of the stream
    #[error("serial link closed")]
    LinkClosed,

    /// The serial port could not be opened
    #[error("Serial port error: {0}")]
    SerialError(String),

    /// Invalid link configuration or command file
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The dispatcher task is gone
    #[error("command dispatcher is not running")]
    NotRunning,
}

impl From<tokio_serial::Error> for ProtocolError {
    fn from(e: tokio_serial::Error) -> Self {
        ProtocolError::SerialError(e.to_string())
    }
}
