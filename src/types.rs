//! Re-exported types from external crates for convenience.
//!
//! These types appear in this SDK's public API and are re-exported here
//! so users don't need to add these dependencies to their `Cargo.toml`.

/// Date and time types for server timestamps and rate limit resets.
pub use chrono::{DateTime, TimeDelta, Utc};
/// Secret wrapper for the API access token.
pub use secrecy::SecretString;

pub use crate::polyline::{Map, Point, Polyline};
