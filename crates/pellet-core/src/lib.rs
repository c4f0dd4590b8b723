//! Shared foundation for Pellet Monitor.
//!
//! Holds the error type, the coercion policy applied to every upstream value,
//! the domain models, time helpers and CLI settings.

pub mod coercion;
pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod time_utils;

pub use error::{PelletError, Result};
