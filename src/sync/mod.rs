//! Delivery-side machinery: parking operations that arrived too early and,
//! with the `runtime` feature, sharing one document between tokio tasks.

pub mod pending;

#[cfg(feature = "runtime")]
pub mod shared;

pub use pending::PendingQueue;

#[cfg(feature = "runtime")]
pub use shared::{PendingSweeper, SharedDocument};
