//! Simulated controller board
//!
//! Answers request frames the way the real board does, for testing the
//! gateway without hardware. Keeps track of power and walking state so
//! that state-dependent commands can be rejected, and reports a battery
//! charge with a little random jitter.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, DuplexStream};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::protocol::{DeviceStatus, Frame, ProtocolError, FRAME_LEN};
use crate::registry::register;

/// Nominal battery reading
const DEFAULT_CHARGE: u16 = 7400;

/// Walk data meaning "stand still"
const WALK_STOP: [u8; 3] = [128, 128, 128];

/// In-process stand-in for the controller board
pub struct SimulatedBoard {
    /// Nominal battery reading
    charge: u16,
    /// Maximum random deviation added to the battery reading
    jitter: u16,
    powered: bool,
    walking: bool,
    rng: StdRng,
}

impl Default for SimulatedBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedBoard {
    /// Unpowered board with the nominal battery reading and random jitter
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Reproducible board for tests
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            charge: DEFAULT_CHARGE,
            jitter: 50,
            powered: false,
            walking: false,
            rng,
        }
    }

    /// Report `charge` exactly, without jitter
    pub fn with_charge(mut self, charge: u16) -> Self {
        self.charge = charge;
        self.jitter = 0;
        self
    }

    /// Whether the servos are powered
    pub fn is_powered(&self) -> bool {
        self.powered
    }

    /// Whether the last walk command was not a stop
    pub fn is_walking(&self) -> bool {
        self.walking
    }

    /// Produce the response frame for one raw request frame
    pub fn respond(&mut self, request: &[u8]) -> Frame {
        let frame = match Frame::from_bytes(request) {
            Ok(frame) => frame,
            Err(ProtocolError::ChecksumMismatch { .. }) => return error(DeviceStatus::BadChecksum),
            Err(_) => return error(DeviceStatus::BadTerminator),
        };

        let data = frame.data();
        match frame.command() {
            register::POWER => {
                self.powered = data[0] != 0;
                if !self.powered {
                    self.walking = false;
                }
                ack(register::POWER, &[])
            }
            register::WALK => {
                if !self.powered {
                    return error(DeviceStatus::BadState);
                }
                self.walking = data[..3] != WALK_STOP;
                ack(register::WALK, &[])
            }
            register::RESET => {
                self.powered = false;
                self.walking = false;
                ack(register::RESET, &[])
            }
            register::BATTERY => {
                let charge = self.read_charge();
                ack(register::BATTERY, &charge.to_be_bytes())
            }
            register::IS_WALKING => ack(register::IS_WALKING, &[self.walking as u8]),
            register::IS_POWER_ON => ack(register::IS_POWER_ON, &[self.powered as u8]),
            register::SPEED
            | register::GAIT_MODE
            | register::BALANCE_MODE
            | register::BODY_HEIGHT
            | register::SOUND
            | register::STATUS_LED => ack(frame.command(), &[]),
            _ => error(DeviceStatus::BadCommand),
        }
    }

    /// Battery reading, nudged until it can be framed unambiguously
    fn read_charge(&mut self) -> u16 {
        loop {
            let offset = if self.jitter == 0 {
                0
            } else {
                self.rng.gen_range(0..=self.jitter)
            };
            let charge = self.charge.saturating_add(offset);
            if !ack(register::BATTERY, &charge.to_be_bytes()).has_reserved_inner_bytes() {
                return charge;
            }
            if self.jitter == 0 {
                // Exact reading requested; send it anyway.
                return charge;
            }
        }
    }

    /// Serve request frames from `link` until it closes
    pub async fn run<L>(mut self, mut link: L) -> std::io::Result<()>
    where
        L: AsyncRead + AsyncWrite + Unpin,
    {
        let mut request = [0u8; FRAME_LEN];
        loop {
            match link.read_exact(&mut request).await {
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(()),
                Err(e) => return Err(e),
            }
            let response = self.respond(&request);
            debug!(request = ?request, response = ?response.as_bytes(), "simulated exchange");
            link.write_all(response.as_bytes()).await?;
        }
    }

    /// Run the board on one end of an in-memory link and return the other end
    pub fn spawn(self) -> (DuplexStream, JoinHandle<std::io::Result<()>>) {
        let (host, board) = tokio::io::duplex(256);
        let task = tokio::spawn(self.run(board));
        (host, task)
    }
}

/// Ack response echoing `register`, followed by up to three return values.
///
/// The echo is left out when it would put a reserved byte inside the frame.
fn ack(register: u8, values: &[u8]) -> Frame {
    let mut data = [0u8; 4];
    data[0] = register;
    let len = values.len().min(3);
    data[1..1 + len].copy_from_slice(&values[..len]);

    let frame = Frame::encode(DeviceStatus::AckOk.code(), &data);
    if frame.has_reserved_inner_bytes() {
        data[0] = 0;
        return Frame::encode(DeviceStatus::AckOk.code(), &data);
    }
    frame
}

/// Error response carrying `status` and no data.
///
/// Bad command is status 255, the terminator value, so the host scanner
/// closes that frame early and drops it; the caller sees a timeout.
fn error(status: DeviceStatus) -> Frame {
    Frame::encode(status.code(), &[])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::validate;

    fn request(payload: &[u8]) -> Vec<u8> {
        Frame::from_payload(payload).as_bytes().to_vec()
    }

    #[test]
    fn test_power_cycle() {
        let mut board = SimulatedBoard::seeded(1);
        assert!(validate(board.respond(&request(&[5, 1])).as_bytes()).is_ok());
        assert!(board.is_powered());
        let data = validate(board.respond(&request(&[120])).as_bytes()).unwrap();
        assert_eq!(data.values()[0], 1);
    }

    #[test]
    fn test_walk_requires_power() {
        let mut board = SimulatedBoard::seeded(1);
        let response = board.respond(&request(&[40, 128, 0, 128]));
        assert_eq!(response.status(), DeviceStatus::BadState);

        board.respond(&request(&[5, 1]));
        let response = board.respond(&request(&[40, 128, 0, 128]));
        assert_eq!(response.status(), DeviceStatus::AckOk);
        assert!(board.is_walking());

        board.respond(&request(&[40, 128, 128, 128]));
        assert!(!board.is_walking());
    }

    #[test]
    fn test_battery_exact() {
        let mut board = SimulatedBoard::seeded(1).with_charge(7400);
        let data = validate(board.respond(&request(&[105])).as_bytes()).unwrap();
        assert_eq!(&data.values()[..2], &[0x1C, 0xE8]);
    }

    #[test]
    fn test_battery_jitter_is_frameable() {
        let mut board = SimulatedBoard::seeded(7);
        for _ in 0..100 {
            let response = board.respond(&request(&[105]));
            assert!(!response.has_reserved_inner_bytes());
            let data = validate(response.as_bytes()).unwrap();
            let charge = u16::from_be_bytes([data.values()[0], data.values()[1]]);
            assert!((7400..=7450).contains(&charge));
        }
    }

    #[test]
    fn test_bad_request_checksum() {
        let mut board = SimulatedBoard::seeded(1);
        let mut raw = request(&[5, 1]);
        raw[2] ^= 0xFF;
        assert_eq!(board.respond(&raw).status(), DeviceStatus::BadChecksum);
    }

    #[test]
    fn test_unknown_register() {
        let mut board = SimulatedBoard::seeded(1);
        assert_eq!(
            board.respond(&request(&[99])).status(),
            DeviceStatus::BadCommand
        );
    }

    #[test]
    fn test_reset_ack_is_frameable() {
        let mut board = SimulatedBoard::seeded(1);
        let response = board.respond(&request(&[255, 100, 100, 100]));
        assert!(!response.has_reserved_inner_bytes());
        assert!(validate(response.as_bytes()).is_ok());
    }
}
