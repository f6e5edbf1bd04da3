//! Shared data types for honestfast
//!
//! This crate defines the vocabulary every other crate speaks:
//! - Fast records and their derived readings
//! - The fasting plan catalog and stage bands
//! - The cross-device shared snapshot and its flat-map encoding
//! - User preferences

mod plan;
mod record;
mod snapshot;
mod stage;
mod types;

pub use plan::*;
pub use record::*;
pub use snapshot::*;
pub use stage::*;
pub use types::*;
