//! Runtime layer for the pellet dashboard.
//!
//! Owns the live charts, runs one cancellable refresh task per chart and
//! caches snapshots between refreshes.

pub mod refresher;
pub mod registry;
pub mod snapshot_cache;
pub mod source;

pub use pellet_core as core;
pub use pellet_data as data;
