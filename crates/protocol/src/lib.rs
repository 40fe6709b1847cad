//! Hazard Alert Wire Protocol
//!
//! Message-level contract for the bidirectional device channel and the
//! shared vocabulary types (roles, severity, identifiers) used by every
//! other crate in the workspace.

mod messages;
mod types;

pub use messages::{ClientMessage, LogEvent, RoleCounts, ServerMessage};
pub use types::{AlertId, DeviceRole, InvalidSeverity, Severity, UnknownRole};
