//! Minimal protocol peer for talking to a relay server.
//!
//! Performs the handshake and classifies server lines; there is no console
//! front end here.

use crate::error::ClientError;
use crate::protocol::{ServerMessage, EXIT_KEYWORD, GET_FILE_PREFIX, LIST_KEYWORD};
use std::net::SocketAddr;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

/// A connected, named session on a relay server.
pub struct RelayClient {
    name: String,
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl RelayClient {
    /// Connect and wait for the assigned session name.
    ///
    /// A `SERVER_FULL` line, or a close before any line, is reported as
    /// [`ClientError::ServerFull`].
    pub async fn connect(addr: SocketAddr) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).await?;
        let (read_half, writer) = stream.into_split();
        let mut lines = BufReader::new(read_half).lines();

        let first = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => return Err(ClientError::ServerFull),
            // A rejected socket may be reset rather than closed cleanly.
            Err(e) if e.kind() == std::io::ErrorKind::ConnectionReset => {
                return Err(ClientError::ServerFull)
            }
            Err(e) => return Err(e.into()),
        };
        match ServerMessage::parse(&first) {
            ServerMessage::AssignedName(name) => Ok(Self {
                name,
                lines,
                writer,
            }),
            ServerMessage::ServerFull => Err(ClientError::ServerFull),
            _ => Err(ClientError::Handshake(first)),
        }
    }

    /// Session name assigned by the server.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Send one protocol line.
    pub async fn send(&mut self, line: &str) -> Result<(), ClientError> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    pub async fn request_list(&mut self) -> Result<(), ClientError> {
        self.send(LIST_KEYWORD).await
    }

    pub async fn request_file(&mut self, name: &str) -> Result<(), ClientError> {
        self.send(&format!("{GET_FILE_PREFIX}{name}")).await
    }

    /// Next raw line from the server.
    pub async fn recv_line(&mut self) -> Result<String, ClientError> {
        self.lines.next_line().await?.ok_or(ClientError::Closed)
    }

    /// Next classified line from the server.
    pub async fn recv(&mut self) -> Result<ServerMessage, ClientError> {
        let line = self.recv_line().await?;
        Ok(ServerMessage::parse(&line))
    }

    /// Send `exit` and wait for the goodbye acknowledgment.
    pub async fn exit(mut self) -> Result<ServerMessage, ClientError> {
        self.send(EXIT_KEYWORD).await?;
        loop {
            let message = self.recv().await?;
            if message.is_goodbye() {
                return Ok(message);
            }
        }
    }
}
