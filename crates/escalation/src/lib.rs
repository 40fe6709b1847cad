//! Escalation Scheduler
//!
//! One single-shot timer per pending alert. Arming stores a cancellation
//! handle; disarming aborts the timer. A fire that was already queued when
//! its alert got acknowledged is resolved by the consumer re-checking the
//! alert state, so cancellation never has to win the race outright.

mod scheduler;

pub use scheduler::{EscalationScheduler, DEFAULT_ESCALATION_WINDOW_MS};
