//! Shared library for the Taiko Advisor backend
//!
//! Holds the pieces every service-side module needs: the error type,
//! runtime limits/configuration, the input sanitizer, and the data model
//! (user records, chat sessions, candidate songs).

pub mod config;
pub mod error;
pub mod sanitize;
pub mod types;

pub use error::{Error, Result};

/// Current UNIX time in fractional seconds.
///
/// User record timestamps are stored as float seconds so the on-disk
/// format stays interchangeable with stores written by earlier versions
/// of the backend.
pub fn now_secs() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}
