//! Multi-client line-protocol relay
//!
//! This library provides a TCP server that admits a bounded number of
//! concurrent sessions, names each one, tracks its lifecycle, and serves a
//! newline-delimited text protocol for chat echo, directory listing, and
//! whole-file transfer.
//!
//! # Architecture
//!
//! - **RelayServer**: single accept loop. Each connection must take an
//!   admission permit; connections beyond capacity receive `SERVER_FULL` and
//!   are closed without a session.
//!
//! - **SessionHandler**: one tokio task per admitted connection. Handshakes
//!   with `ASSIGNED_NAME:<id>`, then reads one line at a time and writes the
//!   response until `exit`, end of stream, or an I/O error.
//!
//! - **SessionRegistry / AdmissionController**: the only state shared
//!   between sessions. Both are internally synchronized.
//!
//! - **FileCatalog**: read-only view over the repository directory.
//!
//! # Protocol
//!
//! ## Peer → server
//! - `list`: list the repository files
//! - `GET_FILE:<name>`: stream a file line by line
//! - `exit`: end the session
//! - anything else: echoed back as `ACK: <text>`
//!
//! ## Server → peer
//! - `ASSIGNED_NAME:<id>`
//! - `SERVER_FULL: Maximum clients reached. Please try again later.`
//! - `ACK: <text>`, `ACK: Connection closing. Goodbye!`
//! - `FILE_LIST:<a,b,...>`, `FILE_LIST:No files available`
//! - `FILE_ERROR:<reason>`
//! - raw file lines

use std::path::PathBuf;

pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod protocol;
pub mod server;
pub mod session;

pub use catalog::{FileCatalog, FileLines};
pub use client::RelayClient;
pub use config::{ConfigOverrides, RelayConfig};
pub use error::{CatalogError, ClientError, ConfigError, RegistryError, ServerError};
pub use protocol::{Command, Reply, ServerMessage};
pub use server::{HandlerState, RelayServer, RelayState, SessionHandler};
pub use session::{
    AdmissionController, AdmissionPermit, NameGenerator, SessionRecord, SessionRegistry,
    SessionSnapshot, SessionStatus,
};

/// Expand `~/` prefix to the user's home directory.
pub fn expand_path(path: &str) -> PathBuf {
    path.strip_prefix("~/")
        .and_then(|stripped| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(stripped)))
        .unwrap_or_else(|| PathBuf::from(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_path_handles_home_prefix() {
        assert_eq!(expand_path("/srv/files"), PathBuf::from("/srv/files"));
        assert_eq!(expand_path("relative"), PathBuf::from("relative"));
        if let Some(home) = std::env::var_os("HOME") {
            assert_eq!(expand_path("~/files"), PathBuf::from(home).join("files"));
        }
    }
}
