//! Per-key visit admission.
//!
//! [`AccessController`] maps each caller key to a slot in an arena of
//! [`WindowBuffer`](crate::WindowBuffer)s and answers "may this caller act
//! again right now?" with a plain boolean.
//!
//! # Key Characteristics
//!
//! - **Thread-safe:** keys are indexed with a [`DashMap`](dashmap::DashMap); the
//!   arena shape is guarded by a readers-writer lock and each slot by its own
//!   mutex
//! - **Slot recycling:** drained slots go to a free set and are reused for new
//!   keys instead of being deallocated
//! - **Compaction:** when free slots heavily outnumber active ones the arena is
//!   rebuilt, so memory follows the number of active keys rather than every key
//!   ever seen
//! - **Process-scoped:** state is in memory only and is lost on restart
//!
//! # Background sweep
//!
//! Construction starts one thread that, every sweep interval, drops expired
//! visits, reclaims empty slots and compacts the arena if needed. A tick that
//! fires while a sweep is still running is skipped.

mod access_controller;
pub use access_controller::*;

mod options;
pub use options::*;

pub(crate) mod slot_pool;
pub(crate) mod state;
mod sweeper;
