//! Per-connection session handler.
//!
//! Each admitted connection runs one [`SessionHandler`] on its own task:
//!
//! ```text
//! Handshaking ──▶ Active ──(exit / EOF / I/O error)──▶ Terminating ──▶ Closed
//!                  ▲   │
//!                  └───┘ one line in, response line(s) out
//! ```

use super::RelayState;
use crate::protocol::{self, trim_line_ending, Command, Reply, GOODBYE};
use crate::session::AdmissionPermit;
use chrono::Local;
use std::io;
use tokio::io::{
    split, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
    ReadHalf, WriteHalf,
};
use tracing::{debug, error, info, warn};

/// Longest inbound line accepted, terminator excluded. A peer that sends more
/// without a newline is disconnected.
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

/// Lifecycle of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerState {
    Handshaking,
    Active,
    Terminating,
    Closed,
}

/// Control loop for a single admitted connection.
pub struct SessionHandler<S> {
    state: HandlerState,
    session_id: Option<String>,
    reader: BufReader<ReadHalf<S>>,
    writer: WriteHalf<S>,
    permit: Option<AdmissionPermit>,
    relay: RelayState,
}

impl<S> SessionHandler<S>
where
    S: AsyncRead + AsyncWrite + Send + Unpin,
{
    /// Create a handler that owns `permit` until it terminates.
    pub fn new(stream: S, permit: AdmissionPermit, relay: RelayState) -> Self {
        let (read_half, write_half) = split(stream);
        Self {
            state: HandlerState::Handshaking,
            session_id: None,
            reader: BufReader::new(read_half),
            writer: write_half,
            permit: Some(permit),
            relay,
        }
    }

    pub fn state(&self) -> HandlerState {
        self.state
    }

    /// Drive the connection until it is closed.
    ///
    /// Returns the assigned session name, if the handshake got that far.
    pub async fn run(mut self) -> Option<String> {
        loop {
            self.state = match self.state {
                HandlerState::Handshaking => self.handshake().await,
                HandlerState::Active => self.serve_line().await,
                HandlerState::Terminating => self.terminate().await,
                HandlerState::Closed => break,
            };
        }
        self.session_id.take()
    }

    async fn handshake(&mut self) -> HandlerState {
        let id = self.relay.names.next_name();
        let connected_at = Local::now();
        if let Err(e) = self.relay.registry.register(&id, connected_at) {
            error!(session = %id, error = %e, "Session registration failed");
            return HandlerState::Terminating;
        }
        self.session_id = Some(id.clone());

        info!(
            session = %id,
            connected_at = %connected_at.format(crate::session::TIMESTAMP_FORMAT),
            "Session connected"
        );
        info!("\n{}", self.relay.registry.snapshot());

        match self.write_line(&protocol::assigned_name_line(&id)).await {
            Ok(()) => HandlerState::Active,
            Err(e) => {
                debug!(session = %id, error = %e, "Handshake write failed");
                HandlerState::Terminating
            }
        }
    }

    async fn serve_line(&mut self) -> HandlerState {
        let line = match self.read_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                debug!(session = ?self.session_id, "Peer closed connection");
                return HandlerState::Terminating;
            }
            Err(e) => {
                debug!(session = ?self.session_id, error = %e, "Read failed");
                return HandlerState::Terminating;
            }
        };
        debug!(session = ?self.session_id, line = %line, "Received");

        let command = Command::decode(&line);
        if command == Command::Exit {
            if let Err(e) = self.write_line(GOODBYE).await {
                debug!(session = ?self.session_id, error = %e, "Goodbye write failed");
            }
            return HandlerState::Terminating;
        }

        let reply = protocol::dispatch(command, &self.relay.catalog).await;
        match self.send_reply(reply).await {
            Ok(()) => HandlerState::Active,
            Err(e) => {
                debug!(session = ?self.session_id, error = %e, "Write failed");
                HandlerState::Terminating
            }
        }
    }

    async fn send_reply(&mut self, reply: Reply) -> io::Result<()> {
        match reply {
            Reply::Line(line) => self.write_line(&line).await,
            Reply::File(mut lines) => loop {
                match lines.next_line().await {
                    Ok(Some(line)) => self.write_line(&line).await?,
                    Ok(None) => return Ok(()),
                    Err(e) => {
                        warn!(session = ?self.session_id, error = %e, "File transfer aborted");
                        return self.write_line(&e.to_response_line()).await;
                    }
                }
            },
        }
    }

    async fn terminate(&mut self) -> HandlerState {
        let disconnected_at = Local::now();
        if let Some(id) = &self.session_id {
            self.relay.registry.mark_disconnected(id, disconnected_at);
            info!(
                session = %id,
                disconnected_at = %disconnected_at.format(crate::session::TIMESTAMP_FORMAT),
                "Session disconnected"
            );
            info!("\n{}", self.relay.registry.snapshot());
        }
        let _ = self.writer.shutdown().await;
        // The record is stamped before the permit returns, so the registry
        // never shows more active sessions than there are permits.
        if let Some(permit) = self.permit.take() {
            permit.release();
        }
        HandlerState::Closed
    }

    /// Read one line without its terminator; `None` at end of stream.
    async fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut buf = Vec::new();
        // Room for a full-length line plus `\r\n`; anything longer is refused.
        let limit = MAX_LINE_LENGTH as u64 + 2;
        let mut reader = (&mut self.reader).take(limit);
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            return Ok(None);
        }
        trim_line_ending(&mut buf);
        if buf.len() > MAX_LINE_LENGTH {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("line exceeds {MAX_LINE_LENGTH} bytes"),
            ));
        }
        Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
    }

    async fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await
    }
}

impl<S> Drop for SessionHandler<S> {
    fn drop(&mut self) {
        // Reached without Terminating only if the task was aborted mid-session.
        if self.state != HandlerState::Closed {
            if let Some(id) = &self.session_id {
                self.relay.registry.mark_disconnected(id, Local::now());
            }
        }
    }
}
