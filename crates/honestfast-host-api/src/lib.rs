//! Collaborator interfaces for honestfast
//!
//! This crate defines the seams between the fasting engine and the
//! platform it runs on: the local notification scheduler, the shared
//! key-value blob read by glanceable surfaces, and the message link to
//! the peer device. It contains no platform code itself, only the traits,
//! in-memory mocks, and an in-process loopback peer.

mod loopback;
mod mock;
mod traits;

pub use loopback::*;
pub use mock::*;
pub use traits::*;
