//! Chart data preparation for Pellet Monitor.
//!
//! Turns raw record, session and user arrays into fixed-shape chart payloads:
//! day-aligned series, the pellet size histogram, per-user activity and
//! per-location rollups.

pub mod activity;
pub mod builder;
pub mod chart;
pub mod daily;
pub mod histogram;
pub mod locations;
pub mod reader;

pub use pellet_core as core;
