//! Read-admission control for the Riptide read path.
//!
//! Every read against a shard consumes two resources: a reader **slot** and
//! a **memory** budget. [`ReadSemaphore`] meters both. Admitted reads hold a
//! [`ReadPermit`] whose drop returns the reservation; incremental memory is
//! metered through [`MemoryUnits`]; idle readers can be parked in the
//! semaphore's inactive-read registry and reclaimed under pressure; and
//! [`TrackingFile`] ties bulk-read buffer memory to buffer lifetimes.
//!
//! # Shard confinement
//!
//! A semaphore and all handles derived from it are confined to the shard
//! that created them: state is mutated without locks, and the handle types
//! are deliberately `!Send`. Suspension happens only while queued for
//! admission and inside the I/O substrate.

pub mod config;
pub mod inactive;
pub mod permit;
pub mod semaphore;
pub mod tracking_file;

pub use config::SemaphoreConfig;
pub use inactive::{InactiveRead, InactiveReadHandle};
pub use permit::{MemoryUnits, ReadPermit};
pub use semaphore::{Admission, InactiveReadStats, ReadSemaphore};
pub use tracking_file::{make_tracked_file, TrackingFile};
