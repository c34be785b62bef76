//! Link reader task
//!
//! Owns the read half of the serial link for its whole lifetime and hands
//! every intact response to the dispatcher. A response carrying an error
//! status is intact and is handed over as that error; frames with broken
//! sync bytes, length or checksum are dropped.

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use super::{FrameScanner, ProtocolError, ReturnData};

/// What the reader hands to the dispatcher
pub(crate) type Response = Result<ReturnData, ProtocolError>;

/// Size of a single read from the link
const READ_CHUNK: usize = 64;

/// Read from the link until it closes or the dispatcher goes away.
///
/// Invalid frames and read errors are logged and skipped.
pub(crate) async fn read_loop<R>(
    mut reader: R,
    mut scanner: FrameScanner,
    responses: mpsc::Sender<Response>,
) where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; READ_CHUNK];
    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => {
                warn!("serial link closed, reader exiting");
                return;
            }
            Ok(n) => n,
            Err(e) => {
                error!("error reading serial link: {e}");
                tokio::task::yield_now().await;
                continue;
            }
        };

        for result in scanner.push(&buf[..n]) {
            match &result {
                Ok(data) => {
                    debug!(register = data.register(), values = ?data.values(), "response received");
                }
                Err(ProtocolError::DeviceError(status)) => {
                    debug!(%status, "error response received");
                }
                Err(e) => {
                    warn!("dropping response frame: {e}");
                    continue;
                }
            }
            if responses.send(result).await.is_err() {
                debug!("dispatcher gone, reader exiting");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::frame::STATUS_ACK_OK;
    use crate::protocol::{DeviceStatus, Frame, ScanMode};
    use std::collections::VecDeque;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::{AsyncWriteExt, ReadBuf};

    /// Link that replays a fixed sequence of read outcomes, then reports EOF
    struct ScriptedLink {
        reads: VecDeque<io::Result<Vec<u8>>>,
    }

    impl AsyncRead for ScriptedLink {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            match self.reads.pop_front() {
                Some(Ok(bytes)) => {
                    buf.put_slice(&bytes);
                    Poll::Ready(Ok(()))
                }
                Some(Err(e)) => Poll::Ready(Err(e)),
                None => Poll::Ready(Ok(())),
            }
        }
    }

    #[tokio::test]
    async fn test_keeps_reading_after_io_error() {
        let ack = Frame::encode(STATUS_ACK_OK, &[30, 7]);
        let link = ScriptedLink {
            reads: VecDeque::from([
                Err(io::Error::new(io::ErrorKind::Other, "line noise")),
                Ok(ack.as_bytes()[..4].to_vec()),
                Err(io::Error::new(io::ErrorKind::Other, "line noise")),
                Ok(ack.as_bytes()[4..].to_vec()),
            ]),
        };
        let (tx, mut rx) = mpsc::channel(4);

        read_loop(link, FrameScanner::new(ScanMode::Continuous), tx).await;

        let data = rx.recv().await.expect("frame forwarded").expect("ack");
        assert_eq!(data.register(), 30);
        assert_eq!(data.values(), &[7, 0, 0]);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_forwards_intact_frames_only() {
        let (mut board, host) = tokio::io::duplex(64);
        let (tx, mut rx) = mpsc::channel(4);
        let reader = tokio::spawn(read_loop(host, FrameScanner::new(ScanMode::Continuous), tx));

        let mut bad = *Frame::encode(STATUS_ACK_OK, &[10]).as_bytes();
        bad[5] ^= 0x04;
        board.write_all(&bad).await.unwrap();
        board
            .write_all(Frame::encode(STATUS_ACK_OK, &[20]).as_bytes())
            .await
            .unwrap();

        board
            .write_all(Frame::encode(DeviceStatus::BadState.code(), &[]).as_bytes())
            .await
            .unwrap();

        let data = rx.recv().await.expect("valid frame").expect("ack");
        assert_eq!(data.register(), 20);
        assert!(matches!(
            rx.recv().await,
            Some(Err(ProtocolError::DeviceError(DeviceStatus::BadState)))
        ));

        drop(board);
        reader.await.unwrap();
        assert!(rx.recv().await.is_none());
    }
}
