//! Session record types.

use chrono::{DateTime, Local};

/// Display format for session timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Connection status of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Handler still running.
    Connected,
    /// Handler finished; the record is kept as history.
    Disconnected,
}

/// Lifecycle record of one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    /// Assigned session name, e.g. `Client01`.
    pub id: String,
    /// When the session was registered.
    pub connected_at: DateTime<Local>,
    /// When the handler finished; `None` while active.
    pub disconnected_at: Option<DateTime<Local>>,
}

impl SessionRecord {
    pub fn new(id: impl Into<String>, connected_at: DateTime<Local>) -> Self {
        Self {
            id: id.into(),
            connected_at,
            disconnected_at: None,
        }
    }

    pub fn status(&self) -> SessionStatus {
        if self.disconnected_at.is_some() {
            SessionStatus::Disconnected
        } else {
            SessionStatus::Connected
        }
    }

    pub fn is_active(&self) -> bool {
        self.status() == SessionStatus::Connected
    }
}

impl std::fmt::Display for SessionRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Client: {} | Connected: {} | Connection Status: ",
            self.id,
            self.connected_at.format(TIMESTAMP_FORMAT)
        )?;
        match self.disconnected_at {
            Some(at) => write!(f, "Disconnected at: {}", at.format(TIMESTAMP_FORMAT)),
            None => write!(f, "Still connected"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn record_display_tracks_status() {
        let connected = Local.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        let mut record = SessionRecord::new("Client01", connected);
        assert_eq!(record.status(), SessionStatus::Connected);
        assert_eq!(
            record.to_string(),
            "Client: Client01 | Connected: 2024-03-01 09:30:00 | Connection Status: Still connected"
        );

        record.disconnected_at = Some(Local.with_ymd_and_hms(2024, 3, 1, 9, 45, 5).unwrap());
        assert!(!record.is_active());
        assert_eq!(
            record.to_string(),
            "Client: Client01 | Connected: 2024-03-01 09:30:00 | Connection Status: Disconnected at: 2024-03-01 09:45:05"
        );
    }
}
