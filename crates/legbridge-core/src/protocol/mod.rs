//! Serial Protocol Communication
//!
//! Implements the fixed 9-byte frame protocol spoken by the controller board.
//!
//! Every exchange is a single request frame followed by a single response
//! frame. Frames carry no request ID, so the dispatcher never has more than
//! one request outstanding on the link.

mod config;
mod dispatcher;
mod error;
mod frame;
mod link;
pub mod scanner;
pub mod serial;

pub use config::LinkConfig;
pub use dispatcher::Gateway;
pub use error::ProtocolError;
pub use frame::{checksum, validate, DeviceStatus, Frame, ReturnData};
pub use scanner::{FrameScanner, ScanMode};
pub use serial::{list_ports, open_port, PortInfo};

/// First sync byte of every frame
pub const SYNC0: u8 = 33;

/// Second sync byte of every frame
pub const SYNC1: u8 = 42;

/// Last byte of every frame
pub const TERMINATOR: u8 = 255;

/// Total frame length on the wire
pub const FRAME_LEN: usize = 9;

/// Number of data bytes following the command byte
pub const DATA_LEN: usize = 4;

/// Default baud rate of the controller board
pub const DEFAULT_BAUD_RATE: u32 = 38400;

/// Default serial device
pub const DEFAULT_PORT: &str = "/dev/ttyAMA0";

/// Default time to wait for a response frame, in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;
