//! Session lifecycle for the companion-server link.
//!
//! A session is an actor task that owns the socket write half and
//! serializes every outbound operation in FIFO order; a separate listener
//! task sits in `read_line` and feeds parsed lines to the dispatcher
//! through a queue. Per session there is never more than one live listener
//! or more than one in-flight write.
//!
//! Reconnection is reactive: a dead connection is only repaired on the next
//! outbound send (`ensure_connected`), never by the listener itself.

use crate::collaborator::{Collaborator, Notice};
use crate::config::Endpoint;
use crate::dispatch::{Dispatcher, DispatcherConfig};
use crate::error::{LinkError, Result};
use crate::protocol::{self, ROLE_HANDSHAKE};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Connection state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    Disconnected,
    Connecting,
    Connected,
}

/// Grace period given to background tasks on teardown. Exceeding it is
/// best-effort cleanup, not an error.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// Command channel depth between the handle and the actor.
const CMD_CAPACITY: usize = 32;

enum SessionCmd {
    Open { ack: oneshot::Sender<bool> },
    Ensure { ack: oneshot::Sender<bool> },
    Send { text: String, ack: oneshot::Sender<bool> },
    Close { ack: oneshot::Sender<()> },
}

/// Handle to a running session actor.
///
/// Created with [`Session::start`] from inside a tokio runtime. All
/// operations funnel through the single actor task, so concurrent callers
/// can never interleave partial writes.
pub struct Session {
    cmd_tx: mpsc::Sender<SessionCmd>,
    state_rx: watch::Receiver<ConnState>,
    actor: JoinHandle<()>,
}

impl Session {
    /// Spawn the session actor. No connection is made until [`open`]
    /// (explicitly) or [`send`] (lazily) asks for one.
    ///
    /// [`open`]: Self::open
    /// [`send`]: Self::send
    #[must_use]
    pub fn start(
        endpoint: Endpoint,
        collaborator: Arc<dyn Collaborator>,
        dispatch: DispatcherConfig,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(CMD_CAPACITY);
        let (state_tx, state_rx) = watch::channel(ConnState::Disconnected);
        let dispatcher = Arc::new(Dispatcher::with_config(Arc::clone(&collaborator), dispatch));
        let actor = SessionActor {
            endpoint,
            collaborator,
            dispatcher,
            state_tx,
            conn: None,
        };
        let actor = tokio::spawn(actor.run(cmd_rx));
        Self {
            cmd_tx,
            state_rx,
            actor,
        }
    }

    /// Open the connection, tearing down any existing one first.
    ///
    /// Returns `true` if the session ended up connected. A failed attempt
    /// leaves the session disconnected and notifies the collaborator; it is
    /// not retried.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Channel`] if the actor has already stopped.
    pub async fn open(&self) -> Result<bool> {
        let (ack, rx) = oneshot::channel();
        self.submit(SessionCmd::Open { ack }, rx).await
    }

    /// Return `true` if the session is live, making a single [`open`]
    /// attempt first when it is not. This is the lazy repair used by
    /// [`send`]; it never loops.
    ///
    /// [`open`]: Self::open
    /// [`send`]: Self::send
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Channel`] if the actor has already stopped.
    pub async fn ensure_connected(&self) -> Result<bool> {
        let (ack, rx) = oneshot::channel();
        self.submit(SessionCmd::Ensure { ack }, rx).await
    }

    /// Queue one outbound line (embedded newlines are escaped on the wire).
    ///
    /// Sends are fire-and-forget: if no connection exists, exactly one
    /// reconnect attempt is made, and on failure the line is dropped and
    /// the collaborator notified. Returns `true` if the line was written.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Channel`] if the actor has already stopped.
    pub async fn send(&self, text: impl Into<String>) -> Result<bool> {
        let (ack, rx) = oneshot::channel();
        self.submit(
            SessionCmd::Send {
                text: text.into(),
                ack,
            },
            rx,
        )
        .await
    }

    /// Close the connection. Idempotent and safe to call repeatedly.
    ///
    /// Pending dispatch work is dropped, but a story narration already
    /// handed to the collaborator runs on its own task and completes
    /// independently of the connection that delivered it.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Channel`] if the actor has already stopped.
    pub async fn close(&self) -> Result<()> {
        let (ack, rx) = oneshot::channel();
        self.submit(SessionCmd::Close { ack }, rx).await
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnState {
        *self.state_rx.borrow()
    }

    /// Close the connection and stop the actor, giving background tasks a
    /// bounded grace period to exit.
    pub async fn stop(self) {
        let _ = self.close().await;
        drop(self.cmd_tx);
        if tokio::time::timeout(SHUTDOWN_GRACE, self.actor)
            .await
            .is_err()
        {
            tracing::debug!("session actor did not exit within the grace period; abandoning");
        }
    }

    async fn submit<T>(&self, cmd: SessionCmd, rx: oneshot::Receiver<T>) -> Result<T> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|_| LinkError::Channel("session actor is gone".to_owned()))?;
        rx.await
            .map_err(|_| LinkError::Channel("session actor dropped the ack".to_owned()))
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

/// One live connection: the write half plus its listener/dispatch tasks.
struct Conn {
    writer: OwnedWriteHalf,
    cancel: CancellationToken,
    listener: JoinHandle<()>,
    dispatch: JoinHandle<()>,
}

struct SessionActor {
    endpoint: Endpoint,
    collaborator: Arc<dyn Collaborator>,
    dispatcher: Arc<Dispatcher>,
    state_tx: watch::Sender<ConnState>,
    conn: Option<Conn>,
}

impl SessionActor {
    async fn run(mut self, mut cmd_rx: mpsc::Receiver<SessionCmd>) {
        while let Some(cmd) = cmd_rx.recv().await {
            match cmd {
                SessionCmd::Open { ack } => {
                    let connected = self.open().await;
                    let _ = ack.send(connected);
                }
                SessionCmd::Ensure { ack } => {
                    let live = self.ensure_connected().await;
                    let _ = ack.send(live);
                }
                SessionCmd::Send { text, ack } => {
                    let written = self.send(&text).await;
                    let _ = ack.send(written);
                }
                SessionCmd::Close { ack } => {
                    self.close().await;
                    let _ = ack.send(());
                }
            }
        }
        // Handle dropped: tear down before exiting.
        self.close().await;
    }

    async fn open(&mut self) -> bool {
        self.close().await;
        self.state_tx.send_replace(ConnState::Connecting);

        let addr = (self.endpoint.host.as_str(), self.endpoint.port);
        let stream = match TcpStream::connect(addr).await {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    endpoint = %self.endpoint.authority(),
                    "connect failed"
                );
                self.state_tx.send_replace(ConnState::Disconnected);
                self.collaborator.notify(Notice::ConnectFailed).await;
                return false;
            }
        };

        let (read_half, mut write_half) = stream.into_split();
        if let Err(e) = write_line(&mut write_half, ROLE_HANDSHAKE).await {
            tracing::warn!(error = %e, "role handshake failed");
            self.state_tx.send_replace(ConnState::Disconnected);
            self.collaborator.notify(Notice::ConnectFailed).await;
            return false;
        }

        self.state_tx.send_replace(ConnState::Connected);
        self.collaborator.notify(Notice::Connected).await;
        tracing::info!(endpoint = %self.endpoint.authority(), "connected to companion server");

        // Lines flow listener -> queue -> dispatcher, so the listener never
        // waits on collaborator work.
        let (line_tx, line_rx) = mpsc::unbounded_channel();
        let dispatch = tokio::spawn(dispatch_loop(line_rx, Arc::clone(&self.dispatcher)));
        let cancel = CancellationToken::new();
        let listener = tokio::spawn(listen_loop(
            BufReader::new(read_half),
            line_tx,
            Arc::clone(&self.collaborator),
            cancel.clone(),
        ));

        self.conn = Some(Conn {
            writer: write_half,
            cancel,
            listener,
            dispatch,
        });
        true
    }

    /// True while the current connection's listener is still parked in
    /// `read_line`. A listener that exited (EOF or error) marks the
    /// connection stale even though the state was never flipped.
    fn is_live(&self) -> bool {
        self.conn
            .as_ref()
            .is_some_and(|conn| !conn.listener.is_finished())
    }

    async fn ensure_connected(&mut self) -> bool {
        if self.is_live() {
            return true;
        }
        self.open().await
    }

    async fn send(&mut self, text: &str) -> bool {
        if !self.ensure_connected().await {
            self.collaborator.notify(Notice::Unavailable).await;
            return false;
        }
        let Some(conn) = self.conn.as_mut() else {
            self.collaborator.notify(Notice::Unavailable).await;
            return false;
        };
        let line = protocol::escape_newlines(text);
        if let Err(e) = write_line(&mut conn.writer, &line).await {
            tracing::warn!(error = %e, "send failed; dropping line");
            self.collaborator.notify(Notice::Unavailable).await;
            return false;
        }
        true
    }

    async fn close(&mut self) {
        if let Some(conn) = self.conn.take() {
            // Interrupt, don't drain: pending dispatch work is dropped.
            conn.cancel.cancel();
            conn.dispatch.abort();
            let mut writer = conn.writer;
            let _ = writer.shutdown().await;
            drop(writer);
            if tokio::time::timeout(SHUTDOWN_GRACE, conn.listener)
                .await
                .is_err()
            {
                tracing::debug!("listener did not exit within the grace period; abandoning");
            }
        }
        self.state_tx.send_replace(ConnState::Disconnected);
    }
}

// ---------------------------------------------------------------------------
// Background tasks
// ---------------------------------------------------------------------------

/// Read server lines until EOF, error, or cancellation.
async fn listen_loop(
    mut reader: BufReader<OwnedReadHalf>,
    line_tx: mpsc::UnboundedSender<String>,
    collaborator: Arc<dyn Collaborator>,
    cancel: CancellationToken,
) {
    let mut line = String::new();
    loop {
        line.clear();
        let read = tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            read = reader.read_line(&mut line) => read,
        };
        match read {
            Ok(0) => {
                tracing::info!("companion server closed the connection");
                return;
            }
            Ok(_) => {
                let text = line.trim_end_matches(['\r', '\n']);
                if text.is_empty() {
                    continue;
                }
                if line_tx.send(text.to_owned()).is_err() {
                    return;
                }
            }
            Err(e) => {
                if cancel.is_cancelled() {
                    return;
                }
                tracing::warn!(error = %e, "socket listen failed");
                collaborator
                    .notify(Notice::ListenError(e.to_string()))
                    .await;
                return;
            }
        }
    }
}

/// Drain the line queue sequentially so command effects keep arrival order.
async fn dispatch_loop(mut line_rx: mpsc::UnboundedReceiver<String>, dispatcher: Arc<Dispatcher>) {
    while let Some(line) = line_rx.recv().await {
        dispatcher.dispatch(&line).await;
    }
}

/// Write a single protocol line and flush so the peer sees it promptly.
async fn write_line(writer: &mut OwnedWriteHalf, text: &str) -> Result<()> {
    writer.write_all(text.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}
