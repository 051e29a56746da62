//! Sequential session names.

use std::sync::Mutex;

/// Prefix of every assigned session name.
pub const NAME_PREFIX: &str = "Client";

/// Issues `Client01`, `Client02`, ... in strictly increasing order.
///
/// Names are never reused, even after the session disconnects.
#[derive(Debug, Default)]
pub struct NameGenerator {
    counter: Mutex<u64>,
}

impl NameGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next name.
    pub fn next_name(&self) -> String {
        let mut counter = self.counter.lock().unwrap_or_else(|e| e.into_inner());
        *counter += 1;
        format!("{NAME_PREFIX}{:02}", *counter)
    }

    /// Number of names issued so far.
    pub fn issued(&self) -> u64 {
        *self.counter.lock().unwrap_or_else(|e| e.into_inner())
    }
}
