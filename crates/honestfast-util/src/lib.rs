//! Shared utilities for honestfast
//!
//! This crate provides:
//! - ID types (FastId, PlanId)
//! - Wall-clock helpers (day/week/month boundaries, epoch seconds)
//! - Error types
//! - Default paths for config, data, and the shared state blob

mod error;
mod ids;
mod paths;
mod time;

pub use error::*;
pub use ids::*;
pub use paths::*;
pub use time::*;
