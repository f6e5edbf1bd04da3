//! Fasting engine for honestfast
//!
//! This crate is the heart of honestfast, containing:
//! - Fast state machine (Idle -> Active -> Complete -> Idle)
//! - Reminder planning (completion and elapsed-hour milestones)
//! - Statistics (streaks, weekly totals, calendar heat-map)
//! - Cross-device sync relay and reconciliation
//! - History export

mod engine;
mod events;
mod export;
mod reminders;
mod session;
mod stats;
mod sync;

pub use engine::*;
pub use events::*;
pub use export::*;
pub use reminders::*;
pub use session::*;
pub use stats::*;
pub use sync::*;
