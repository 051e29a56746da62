//! In-process registry of session lifecycle records.
//!
//! Records are created at admission, stamped once at disconnect, and kept for
//! the life of the process.

use super::types::SessionRecord;
use crate::error::RegistryError;
use chrono::{DateTime, Local};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct RegistryInner {
    /// Records in registration order.
    records: Vec<SessionRecord>,
    /// Session id -> position in `records`.
    index: HashMap<String, usize>,
}

/// Thread-safe registry of sessions.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly connected session.
    pub fn register(&self, id: &str, connected_at: DateTime<Local>) -> Result<(), RegistryError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.index.contains_key(id) {
            return Err(RegistryError::DuplicateSession(id.to_string()));
        }
        let position = inner.records.len();
        inner.records.push(SessionRecord::new(id, connected_at));
        inner.index.insert(id.to_string(), position);
        Ok(())
    }

    /// Stamp the disconnect time. Unknown ids are ignored.
    ///
    /// Returns `true` if a record was updated.
    pub fn mark_disconnected(&self, id: &str, disconnected_at: DateTime<Local>) -> bool {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let Some(&position) = inner.index.get(id) else {
            return false;
        };
        inner.records[position].disconnected_at = Some(disconnected_at);
        true
    }

    /// Get a copy of one record.
    pub fn get(&self, id: &str) -> Option<SessionRecord> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.index.get(id).map(|&position| inner.records[position].clone())
    }

    /// Point-in-time copy of every record, in registration order.
    pub fn snapshot(&self) -> SessionSnapshot {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        SessionSnapshot {
            records: inner.records.clone(),
        }
    }

    /// Number of sessions without a disconnect time.
    pub fn active_count(&self) -> usize {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.records.iter().filter(|r| r.is_active()).count()
    }

    /// Number of sessions ever registered.
    pub fn len(&self) -> usize {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Immutable copy of the registry for diagnostics.
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    records: Vec<SessionRecord>,
}

impl SessionSnapshot {
    pub fn records(&self) -> &[SessionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl std::fmt::Display for SessionSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Client Cache ===")?;
        for record in &self.records {
            writeln!(f, "{record}")?;
        }
        write!(f, "====================")
    }
}

#[cfg(test)]
mod tests {
    use crate::error::RegistryError;
    use crate::session::registry::SessionRegistry;
    use crate::session::types::SessionStatus;
    use chrono::{Duration, Local};
    use std::thread;

    #[test]
    fn register_and_get() {
        let registry = SessionRegistry::new();
        let now = Local::now();
        registry.register("Client01", now).expect("should succeed");
        let record = registry.get("Client01").expect("session should exist");
        assert_eq!(record.connected_at, now);
        assert_eq!(record.status(), SessionStatus::Connected);
        assert_eq!(registry.active_count(), 1);
    }

    #[test]
    fn duplicate_register_fails() {
        let registry = SessionRegistry::new();
        let now = Local::now();
        registry.register("Client01", now).expect("should succeed");
        assert_eq!(
            registry.register("Client01", now),
            Err(RegistryError::DuplicateSession("Client01".to_string()))
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn mark_disconnected() {
        let registry = SessionRegistry::new();
        let connected = Local::now();
        registry.register("Client01", connected).expect("should succeed");
        let later = connected + Duration::seconds(5);
        assert!(registry.mark_disconnected("Client01", later));

        let record = registry.get("Client01").expect("session should exist");
        assert_eq!(record.disconnected_at, Some(later));
        assert_eq!(record.status(), SessionStatus::Disconnected);
        assert_eq!(registry.active_count(), 0);
        // Records are history; nothing is removed.
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn mark_unknown_is_noop() {
        let registry = SessionRegistry::new();
        assert!(!registry.mark_disconnected("Client99", Local::now()));
        assert!(registry.is_empty());
    }

    #[test]
    fn snapshot_keeps_registration_order() {
        let registry = SessionRegistry::new();
        for id in ["Client03", "Client01", "Client02"] {
            registry.register(id, Local::now()).expect("should succeed");
        }
        let snapshot = registry.snapshot();
        let ids: Vec<&str> = snapshot.records().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["Client03", "Client01", "Client02"]);
    }

    #[test]
    fn snapshot_is_point_in_time() {
        let registry = SessionRegistry::new();
        registry.register("Client01", Local::now()).expect("should succeed");
        let before = registry.snapshot();
        registry.mark_disconnected("Client01", Local::now());
        registry.register("Client02", Local::now()).expect("should succeed");

        assert_eq!(before.len(), 1);
        assert!(before.records()[0].is_active());
        assert_eq!(registry.snapshot().len(), 2);
    }

    #[test]
    fn snapshot_display() {
        let registry = SessionRegistry::new();
        registry.register("Client01", Local::now()).expect("should succeed");
        let rendered = registry.snapshot().to_string();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "=== Client Cache ===");
        assert!(lines[1].starts_with("Client: Client01 | Connected: "));
        assert!(lines[1].ends_with("Connection Status: Still connected"));
    }

    #[test]
    fn concurrent_registration() {
        let registry = SessionRegistry::new();
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let registry = registry.clone();
                thread::spawn(move || {
                    for i in 0..25 {
                        let id = format!("T{t}-{i}");
                        registry.register(&id, Local::now()).expect("unique id");
                        if i % 2 == 0 {
                            assert!(registry.mark_disconnected(&id, Local::now()));
                        }
                        let _ = registry.snapshot();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("thread");
        }
        assert_eq!(registry.len(), 200);
        assert_eq!(registry.active_count(), 96);
    }
}
