//! Command dispatcher
//!
//! All callers funnel into one queue. A single task takes requests off the
//! queue and runs each one to completion (write, wait for the response or
//! the timeout, answer) before looking at the next. Responses carry no
//! request ID, so a response is paired with a request purely by the fact
//! that only one request is ever outstanding on the link.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::link::{read_loop, Response};
use super::serial::open_port;
use super::{FrameScanner, LinkConfig, ProtocolError};
use crate::registry::CommandRegistry;

/// A named command waiting for the dispatcher
struct CommandRequest {
    name: String,
    params: HashMap<String, String>,
    reply: oneshot::Sender<Result<String, ProtocolError>>,
}

/// Handle to a running link: the reader and dispatcher tasks plus the queue
/// feeding the dispatcher.
///
/// `Gateway` is `Send + Sync`; share it between callers behind an `Arc`.
pub struct Gateway {
    requests: mpsc::UnboundedSender<CommandRequest>,
    registry: Arc<CommandRegistry>,
    dispatcher: JoinHandle<()>,
    reader: JoinHandle<()>,
}

impl Gateway {
    /// Open the configured serial port and start serving commands
    pub fn open(config: &LinkConfig, registry: CommandRegistry) -> Result<Self, ProtocolError> {
        let port = open_port(config)?;
        Ok(Self::spawn(port, registry, config))
    }

    /// Start serving commands over an already open link.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<L>(link: L, registry: CommandRegistry, config: &LinkConfig) -> Self
    where
        L: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read_half, write_half) = tokio::io::split(link);
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        // Capacity 1: the reader hands a frame over and waits for it to be taken.
        let (response_tx, response_rx) = mpsc::channel(1);
        let registry = Arc::new(registry);

        let reader = tokio::spawn(read_loop(
            read_half,
            FrameScanner::new(config.scan_mode),
            response_tx,
        ));
        let dispatcher = tokio::spawn(dispatch_loop(
            write_half,
            registry.clone(),
            request_rx,
            response_rx,
            config.response_timeout(),
        ));

        info!(
            commands = registry.len(),
            timeout_ms = config.response_timeout_ms,
            "gateway started"
        );

        Self {
            requests: request_tx,
            registry,
            dispatcher,
            reader,
        }
    }

    /// The command table this gateway resolves names against
    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Run a command and return its decoded answer or the reason it failed
    pub async fn call(
        &self,
        name: &str,
        params: HashMap<String, String>,
    ) -> Result<String, ProtocolError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.requests
            .send(CommandRequest {
                name: name.to_string(),
                params,
                reply: reply_tx,
            })
            .map_err(|_| ProtocolError::NotRunning)?;

        reply_rx.await.map_err(|_| ProtocolError::NotRunning)?
    }

    /// Run a command and render the outcome as text.
    ///
    /// Never fails: errors come back as their message, e.g. `"unknown command"`
    /// or `"missing param: height"`.
    pub async fn invoke(&self, name: &str, params: HashMap<String, String>) -> String {
        match self.call(name, params).await {
            Ok(answer) => answer,
            Err(e) => e.to_string(),
        }
    }

    /// Stop accepting commands, let queued ones finish, then stop the reader
    pub async fn shutdown(self) {
        let Gateway {
            requests,
            dispatcher,
            reader,
            ..
        } = self;
        drop(requests);
        if let Err(e) = dispatcher.await {
            warn!("dispatcher task failed: {e}");
        }
        reader.abort();
        let _ = reader.await;
        info!("gateway stopped");
    }
}

async fn dispatch_loop<W>(
    mut writer: W,
    registry: Arc<CommandRegistry>,
    mut requests: mpsc::UnboundedReceiver<CommandRequest>,
    mut responses: mpsc::Receiver<Response>,
    timeout: Duration,
) where
    W: AsyncWrite + Unpin,
{
    while let Some(request) = requests.recv().await {
        let result = execute(
            &mut writer,
            &registry,
            &mut responses,
            timeout,
            &request.name,
            &request.params,
        )
        .await;

        match &result {
            Ok(answer) => debug!(command = %request.name, %answer, "command done"),
            Err(e) => debug!(command = %request.name, "command failed: {e}"),
        }
        // The caller may have stopped waiting; nothing to do then.
        let _ = request.reply.send(result);
    }
    debug!("command queue closed, dispatcher exiting");
}

/// One complete exchange. Returns only once the response arrived or the
/// timeout elapsed, so the next write cannot overlap this one.
async fn execute<W>(
    writer: &mut W,
    registry: &CommandRegistry,
    responses: &mut mpsc::Receiver<Response>,
    timeout: Duration,
    name: &str,
    params: &HashMap<String, String>,
) -> Result<String, ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    let definition = registry
        .get(name)
        .ok_or_else(|| ProtocolError::UnknownCommand(name.to_string()))?;
    let frame = definition.resolve(params)?;

    discard_stale(responses).await;

    writer.write_all(frame.as_bytes()).await?;
    writer.flush().await?;
    debug!(command = name, bytes = ?frame.as_bytes(), "frame written");

    match tokio::time::timeout(timeout, responses.recv()).await {
        Ok(Some(Ok(data))) => Ok(definition.decoder.decode(&data)),
        Ok(Some(Err(e))) => Err(e),
        Ok(None) => Err(ProtocolError::LinkClosed),
        Err(_) => {
            warn!(command = name, "no response within {:?}", timeout);
            Err(ProtocolError::Timeout)
        }
    }
}

/// Drop responses nobody waited for (a late answer to a timed-out command,
/// or noise) so none is taken as the answer to the next write.
///
/// Taking a response frees the handoff slot for a reader blocked on the
/// next one, so after each non-empty pass the reader gets a turn and the
/// channel is checked again. Returns once a pass after a yield finds nothing.
async fn discard_stale(responses: &mut mpsc::Receiver<Response>) {
    loop {
        let mut discarded = 0;
        while let Ok(stale) = responses.try_recv() {
            warn!(response = ?stale, "discarding unsolicited response");
            discarded += 1;
        }
        if discarded == 0 {
            return;
        }
        tokio::task::yield_now().await;
    }
}
