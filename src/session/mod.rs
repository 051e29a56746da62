//! Session admission, naming, and lifecycle tracking.
//!
//! Every accepted connection holds exactly one [`AdmissionPermit`] and owns
//! one [`SessionRecord`] in the [`SessionRegistry`]:
//!
//! ```text
//!   accept ──▶ AdmissionController::try_acquire ──▶ None ──▶ SERVER_FULL, close
//!                          │
//!                          ▼ Some(permit)
//!              NameGenerator::next_name  ("Client01", "Client02", ...)
//!                          │
//!                          ▼
//!              SessionRegistry::register ──▶ handler loop
//!                                                 │
//!                                                 ▼
//!                        permit released, SessionRegistry::mark_disconnected
//! ```

mod admission;
mod naming;
mod registry;
mod types;

pub use admission::{AdmissionController, AdmissionPermit, DEFAULT_MAX_CLIENTS};
pub use naming::{NameGenerator, NAME_PREFIX};
pub use registry::{SessionRegistry, SessionSnapshot};
pub use types::{SessionRecord, SessionStatus, TIMESTAMP_FORMAT};
