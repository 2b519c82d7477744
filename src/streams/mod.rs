//! Streams API client and types.
//!
//! A stream is one time series recorded during an activity (or derived for a
//! segment or segment effort): timestamps, positions, heart rate and so on.
//! The API returns a list of stream descriptors, each tagged with its kind and
//! carrying a sparse `data` array that may contain `null` for missing samples.
//! [`types::StreamSet`] decodes that list into one typed, dense slot per kind.
//!
//! ## Available Endpoints
//!
//! | Endpoint | Method | Description |
//! |----------|--------|-------------|
//! | `/activities/{id}/streams/{types}` | GET | Streams of an activity |
//! | `/segments/{id}/streams/{types}` | GET | Streams of a segment |
//! | `/segment_efforts/{id}/streams/{types}` | GET | Streams of a segment effort |
//!
//! Decoding works on its own too, for payloads obtained elsewhere:
//!
//! ```
//! use strava_client_sdk::streams::types::StreamSet;
//!
//! # fn example() -> strava_client_sdk::Result<()> {
//! let body = br#"[{"type": "heartrate", "data": [120, null, 124], "original_size": 3}]"#;
//! let streams = StreamSet::from_slice(body)?;
//!
//! let heart_rate = streams.heart_rate.expect("heart rate present");
//! assert_eq!(heart_rate.data, vec![120, 0, 124]);
//! assert_eq!(heart_rate.get(1), None);
//! # Ok(())
//! # }
//! ```

mod client;
pub mod types;

pub use client::{Client, Config, DEFAULT_HOST};
