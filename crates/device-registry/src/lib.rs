//! Device Registry
//!
//! Tracks every currently-connected device, its role, and the hazard
//! zones it subscribes to. Entries live exactly as long as the
//! connection; nothing here is persisted.

mod registry;

pub use registry::{ConnectionId, Device, DeviceRegistry};
