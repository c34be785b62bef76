//! Frame encoding/validation
//!
//! Frame format (9 bytes):
//! - 2 bytes: sync (`33`, `42`)
//! - 1 byte: checksum (XOR of every other byte except the terminator)
//! - 1 byte: command register (requests) or status code (responses)
//! - 4 bytes: data
//! - 1 byte: terminator (`255`)
//!
//! Responses echo the register in the first data byte, so the usable return
//! data is the three bytes after it.

use std::fmt;

use super::{ProtocolError, DATA_LEN, FRAME_LEN, SYNC0, SYNC1, TERMINATOR};

/// Status code of a successful exchange
pub const STATUS_ACK_OK: u8 = 64;

/// Status byte reported by the board in every response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceStatus {
    /// Command accepted
    AckOk,
    /// Request frame did not end with the terminator
    BadTerminator,
    /// Command not allowed in the current state
    BadState,
    /// Request frame checksum did not match
    BadChecksum,
    /// Unknown command register
    BadCommand,
    /// Status code outside the documented set
    Unknown(u8),
}

impl DeviceStatus {
    /// Decode a raw status byte
    pub fn from_code(code: u8) -> Self {
        match code {
            STATUS_ACK_OK => DeviceStatus::AckOk,
            1 => DeviceStatus::BadTerminator,
            2 => DeviceStatus::BadState,
            3 => DeviceStatus::BadChecksum,
            255 => DeviceStatus::BadCommand,
            other => DeviceStatus::Unknown(other),
        }
    }

    /// Raw status byte as sent on the wire
    pub fn code(&self) -> u8 {
        match self {
            DeviceStatus::AckOk => STATUS_ACK_OK,
            DeviceStatus::BadTerminator => 1,
            DeviceStatus::BadState => 2,
            DeviceStatus::BadChecksum => 3,
            DeviceStatus::BadCommand => 255,
            DeviceStatus::Unknown(code) => *code,
        }
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DeviceStatus::AckOk => "ack",
            DeviceStatus::BadTerminator => "bad terminator",
            DeviceStatus::BadState => "bad state",
            DeviceStatus::BadChecksum => "bad checksum",
            DeviceStatus::BadCommand => "bad command",
            DeviceStatus::Unknown(_) => "unknown status",
        };
        write!(f, "{} (status {})", label, self.code())
    }
}

/// A complete protocol frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    bytes: [u8; FRAME_LEN],
}

impl Frame {
    /// Build a frame from a command byte and up to four data bytes.
    ///
    /// Missing data bytes are zero, extra bytes are dropped.
    pub fn encode(command: u8, data: &[u8]) -> Self {
        let mut bytes = [0u8; FRAME_LEN];
        bytes[0] = SYNC0;
        bytes[1] = SYNC1;
        bytes[3] = command;
        let len = data.len().min(DATA_LEN);
        bytes[4..4 + len].copy_from_slice(&data[..len]);
        bytes[FRAME_LEN - 1] = TERMINATOR;
        bytes[2] = checksum(&bytes);
        Self { bytes }
    }

    /// Build a frame from a payload whose first byte is the command byte
    pub fn from_payload(payload: &[u8]) -> Self {
        match payload.split_first() {
            Some((command, data)) => Self::encode(*command, data),
            None => Self::encode(0, &[]),
        }
    }

    /// Decode a frame from raw bytes, checking sync bytes, length,
    /// terminator and checksum. The status byte is not inspected.
    pub fn from_bytes(data: &[u8]) -> Result<Self, ProtocolError> {
        if data.first() != Some(&SYNC0) {
            return Err(ProtocolError::MalformedFrame(format!(
                "wrong sync byte 0: {:?}",
                data.first()
            )));
        }
        if data.get(1) != Some(&SYNC1) {
            return Err(ProtocolError::MalformedFrame(format!(
                "wrong sync byte 1: {:?}",
                data.get(1)
            )));
        }
        if data.len() != FRAME_LEN {
            return Err(ProtocolError::MalformedFrame(format!(
                "expected {} bytes, got {}",
                FRAME_LEN,
                data.len()
            )));
        }
        if data[FRAME_LEN - 1] != TERMINATOR {
            return Err(ProtocolError::MalformedFrame(format!(
                "wrong terminator: {}",
                data[FRAME_LEN - 1]
            )));
        }

        let expected = checksum(data);
        if data[2] != expected {
            return Err(ProtocolError::ChecksumMismatch {
                expected,
                actual: data[2],
            });
        }

        let mut bytes = [0u8; FRAME_LEN];
        bytes.copy_from_slice(data);
        Ok(Self { bytes })
    }

    /// Raw bytes as written to the wire
    pub fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.bytes
    }

    /// Command register of a request, or status code of a response
    pub fn command(&self) -> u8 {
        self.bytes[3]
    }

    /// The four data bytes
    pub fn data(&self) -> &[u8] {
        &self.bytes[4..4 + DATA_LEN]
    }

    /// Checksum byte as carried in the frame
    pub fn checksum(&self) -> u8 {
        self.bytes[2]
    }

    /// Status of a response frame
    pub fn status(&self) -> DeviceStatus {
        DeviceStatus::from_code(self.command())
    }

    /// Whether a sync0 or terminator byte appears between the sync bytes and
    /// the terminator. The scanner cannot frame such a frame correctly.
    pub fn has_reserved_inner_bytes(&self) -> bool {
        self.bytes[2..FRAME_LEN - 1]
            .iter()
            .any(|b| *b == SYNC0 || *b == TERMINATOR)
    }
}

/// Data returned by the board in a validated response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReturnData {
    bytes: [u8; DATA_LEN],
}

impl ReturnData {
    /// Wrap the four data bytes of a response
    pub fn new(bytes: [u8; DATA_LEN]) -> Self {
        Self { bytes }
    }

    /// Register echoed by the board
    pub fn register(&self) -> u8 {
        self.bytes[0]
    }

    /// Return values following the echoed register
    pub fn values(&self) -> &[u8] {
        &self.bytes[1..]
    }

    /// All four data bytes of the response
    pub fn as_bytes(&self) -> &[u8; DATA_LEN] {
        &self.bytes
    }
}

/// XOR checksum over every byte except the checksum slot and the terminator
pub fn checksum(bytes: &[u8]) -> u8 {
    let end = bytes.len().saturating_sub(1);
    bytes[..end]
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != 2)
        .fold(0, |crc, (_, b)| crc ^ b)
}

/// Validate a candidate response frame and extract its return data
pub fn validate(raw: &[u8]) -> Result<ReturnData, ProtocolError> {
    let frame = Frame::from_bytes(raw)?;
    match frame.status() {
        DeviceStatus::AckOk => {
            let mut bytes = [0u8; DATA_LEN];
            bytes.copy_from_slice(frame.data());
            Ok(ReturnData::new(bytes))
        }
        status => Err(ProtocolError::DeviceError(status)),
    }
}
