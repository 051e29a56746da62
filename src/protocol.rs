//! Wire protocol: line literals, inbound command decoding, and dispatch.
//!
//! Every protocol line is newline-terminated UTF-8. Keywords match
//! case-insensitively; payloads keep their casing.

use crate::catalog::{FileCatalog, FileLines};
use tracing::debug;

/// Handshake prefix, followed by the assigned session name.
pub const ASSIGNED_NAME_PREFIX: &str = "ASSIGNED_NAME:";
/// Sent to a connection rejected for capacity.
pub const SERVER_FULL: &str = "SERVER_FULL: Maximum clients reached. Please try again later.";
pub const ACK_PREFIX: &str = "ACK:";
pub const GOODBYE: &str = "ACK: Connection closing. Goodbye!";
pub const FILE_LIST_PREFIX: &str = "FILE_LIST:";
pub const FILE_LIST_EMPTY: &str = "No files available";
pub const FILE_ERROR_PREFIX: &str = "FILE_ERROR:";
pub const FILE_ERROR_NOT_FOUND: &str = "FILE_ERROR:File not found";
pub const FILE_ERROR_READ: &str = "FILE_ERROR:Error reading file";

pub const LIST_KEYWORD: &str = "list";
pub const EXIT_KEYWORD: &str = "exit";
pub const GET_FILE_PREFIX: &str = "GET_FILE:";

/// A decoded peer → server line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List the repository directory.
    List,
    /// Stream one file; the name is already trimmed.
    GetFile(String),
    /// End the session.
    Exit,
    /// Anything else, echoed back verbatim.
    Chat(String),
}

impl Command {
    /// Decode one inbound line (without its line terminator).
    pub fn decode(line: &str) -> Self {
        if line.eq_ignore_ascii_case(EXIT_KEYWORD) {
            Command::Exit
        } else if line.eq_ignore_ascii_case(LIST_KEYWORD) {
            Command::List
        } else if let Some(name) = strip_prefix_ignore_case(line, GET_FILE_PREFIX) {
            Command::GetFile(name.trim().to_string())
        } else {
            Command::Chat(line.to_string())
        }
    }
}

fn strip_prefix_ignore_case<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    let head = line.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        Some(&line[prefix.len()..])
    } else {
        None
    }
}

/// The response to one dispatched command.
pub enum Reply {
    /// A single response line.
    Line(String),
    /// An opened file whose lines are written verbatim, in order.
    File(FileLines),
}

impl std::fmt::Debug for Reply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reply::Line(line) => f.debug_tuple("Line").field(line).finish(),
            Reply::File(lines) => f.debug_tuple("File").field(&lines.name()).finish(),
        }
    }
}

/// Interpret a decoded command against the catalog.
///
/// `Exit` is normally intercepted by the session handler; it still maps to
/// the goodbye line here so the function is total.
pub async fn dispatch(command: Command, catalog: &FileCatalog) -> Reply {
    match command {
        Command::List => Reply::Line(file_list_line(catalog).await),
        Command::GetFile(name) => match catalog.open(&name).await {
            Ok(lines) => Reply::File(lines),
            Err(e) => {
                debug!(file = %name, error = %e, "File request failed");
                Reply::Line(e.to_response_line())
            }
        },
        Command::Exit => Reply::Line(GOODBYE.to_string()),
        Command::Chat(text) => Reply::Line(ack_line(&text)),
    }
}

async fn file_list_line(catalog: &FileCatalog) -> String {
    let names = catalog.list().await;
    if names.is_empty() {
        format!("{FILE_LIST_PREFIX}{FILE_LIST_EMPTY}")
    } else {
        format!("{FILE_LIST_PREFIX}{}", names.join(","))
    }
}

/// Drop a trailing `\n` or `\r\n` from a raw line.
pub(crate) fn trim_line_ending(buf: &mut Vec<u8>) {
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
}

/// Echo acknowledgment for a chat line.
pub fn ack_line(text: &str) -> String {
    format!("{ACK_PREFIX} {text}")
}

/// Handshake line carrying the assigned session name.
pub fn assigned_name_line(name: &str) -> String {
    format!("{ASSIGNED_NAME_PREFIX}{name}")
}

/// A classified server → peer line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    AssignedName(String),
    ServerFull,
    /// File names; empty when the server reports no files.
    FileList(Vec<String>),
    FileError(String),
    /// Acknowledgment text after the `ACK:` prefix.
    Ack(String),
    /// Raw file content.
    Content(String),
}

impl ServerMessage {
    pub fn parse(line: &str) -> Self {
        if let Some(name) = line.strip_prefix(ASSIGNED_NAME_PREFIX) {
            ServerMessage::AssignedName(name.to_string())
        } else if line == SERVER_FULL {
            ServerMessage::ServerFull
        } else if let Some(list) = line.strip_prefix(FILE_LIST_PREFIX) {
            if list == FILE_LIST_EMPTY || list.is_empty() {
                ServerMessage::FileList(Vec::new())
            } else {
                ServerMessage::FileList(list.split(',').map(str::to_string).collect())
            }
        } else if let Some(reason) = line.strip_prefix(FILE_ERROR_PREFIX) {
            ServerMessage::FileError(reason.to_string())
        } else if let Some(text) = line.strip_prefix(ACK_PREFIX) {
            ServerMessage::Ack(text.trim_start().to_string())
        } else {
            ServerMessage::Content(line.to_string())
        }
    }

    /// True for the acknowledgment that ends a session.
    pub fn is_goodbye(&self) -> bool {
        matches!(self, ServerMessage::Ack(text) if text.contains("Goodbye"))
    }
}
