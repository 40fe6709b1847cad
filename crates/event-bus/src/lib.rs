//! Event/Log Bus
//!
//! Pure fan-out, no buffering, no replay: a device that connects after an
//! event was published never sees it. Stale hazard traffic replayed to a
//! late subscriber would be actively harmful.

mod bus;

pub use bus::EventBus;
