//! Error types for the relay server.
//!
//! Catalog errors are reported to the requesting peer as `FILE_ERROR:` lines
//! and never end the session. Registry and server errors stay on the server
//! side; only a bind failure is fatal to the process.

use crate::protocol::{FILE_ERROR_NOT_FOUND, FILE_ERROR_READ};
use std::net::SocketAddr;
use thiserror::Error;

/// File catalog errors - returned to the peer as a `FILE_ERROR:` line.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Error reading file {name}: {source}")]
    Read {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

impl CatalogError {
    /// Convert to the wire line sent back to the requesting peer.
    pub fn to_response_line(&self) -> String {
        match self {
            CatalogError::NotFound(_) => FILE_ERROR_NOT_FOUND.to_string(),
            CatalogError::Read { .. } => FILE_ERROR_READ.to_string(),
        }
    }
}

/// Session registry errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Session already registered: {0}")]
    DuplicateSession(String),
}

/// Listener errors.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to read local address: {0}")]
    LocalAddr(#[source] std::io::Error),
}

/// Configuration loading errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Errors seen by a protocol peer.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Server is full")]
    ServerFull,

    #[error("Unexpected handshake line: {0}")]
    Handshake(String),

    #[error("Connection closed by server")]
    Closed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
