//! Shared leaf types for the Riptide read path.
//!
//! This crate holds the value types every other Riptide crate agrees on:
//!
//! - [`Resources`]: the (slots, memory) pair debited by an admitted read.
//! - [`Timestamp`] / [`Clock`]: the shard's coarse millisecond clock, driven
//!   by the owning reactor and read by deadline checks.
//! - [`Cx`]: the cancellation context threaded through blocking operations.
//!
//! It deliberately has no dependencies on the rest of the workspace so that
//! leaf crates (I/O substrate, admission core) can share these types without
//! cycles.

pub mod clock;
pub mod cx;
pub mod resources;

pub use clock::{Clock, Timestamp};
pub use cx::Cx;
pub use resources::Resources;
