use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

pub mod request;
pub mod response;

pub use request::StreamsRequest;
pub use response::{
    BooleanStream, DecimalStream, IntegerStream, LocationStream, Stream, StreamMeta, StreamSet,
};

/// The kind of a time series, as named on the wire.
///
/// The set is closed: tags the API adds later decode to [`StreamType::Unknown`]
/// and are skipped when building a [`StreamSet`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum StreamType {
    /// Seconds from start.
    #[serde(rename = "time")]
    Time,
    /// `[lat, lng]` pairs.
    #[serde(rename = "latlng")]
    Location,
    /// Meters from start.
    #[serde(rename = "distance")]
    Distance,
    /// Meters above sea level.
    #[serde(rename = "altitude")]
    Elevation,
    /// Smoothed speed in meters per second.
    #[serde(rename = "velocity_smooth")]
    Speed,
    /// Beats per minute.
    #[serde(rename = "heartrate")]
    HeartRate,
    /// Revolutions (or steps) per minute.
    #[serde(rename = "cadence")]
    Cadence,
    /// Watts.
    #[serde(rename = "watts")]
    Power,
    /// Degrees Celsius.
    #[serde(rename = "temp")]
    Temperature,
    /// Whether the athlete was moving, derived from speed and time.
    #[serde(rename = "moving")]
    Moving,
    /// Smoothed road grade in percent.
    #[serde(rename = "grade_smooth")]
    Grade,
    /// Unknown stream type from the API (captures the raw value for debugging).
    #[serde(untagged)]
    Unknown(String),
}

impl StreamType {
    /// Every stream type the decoder has a slot for.
    pub const ALL: [StreamType; 11] = [
        StreamType::Time,
        StreamType::Location,
        StreamType::Distance,
        StreamType::Elevation,
        StreamType::Speed,
        StreamType::HeartRate,
        StreamType::Cadence,
        StreamType::Power,
        StreamType::Temperature,
        StreamType::Moving,
        StreamType::Grade,
    ];

    /// The wire name of this stream type.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            StreamType::Time => "time",
            StreamType::Location => "latlng",
            StreamType::Distance => "distance",
            StreamType::Elevation => "altitude",
            StreamType::Speed => "velocity_smooth",
            StreamType::HeartRate => "heartrate",
            StreamType::Cadence => "cadence",
            StreamType::Power => "watts",
            StreamType::Temperature => "temp",
            StreamType::Moving => "moving",
            StreamType::Grade => "grade_smooth",
            StreamType::Unknown(tag) => tag,
        }
    }
}

impl fmt::Display for StreamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The resource a set of streams belongs to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
#[non_exhaustive]
pub enum StreamParent {
    Activity,
    Segment,
    SegmentEffort,
}

impl StreamParent {
    /// The collection name used in request paths.
    #[must_use]
    pub fn collection(self) -> &'static str {
        match self {
            StreamParent::Activity => "activities",
            StreamParent::Segment => "segments",
            StreamParent::SegmentEffort => "segment_efforts",
        }
    }
}

impl FromStr for StreamParent {
    type Err = Error;

    /// Accepts both the singular and the collection name, e.g. `segment_effort`
    /// or `segment_efforts`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "activity" | "activities" => Ok(StreamParent::Activity),
            "segment" | "segments" => Ok(StreamParent::Segment),
            "segment_effort" | "segment_efforts" => Ok(StreamParent::SegmentEffort),
            _ => Err(Error::validation("invalid stream parent type")),
        }
    }
}

/// How much the API downsamples streams before returning them.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
#[non_exhaustive]
pub enum Resolution {
    /// About 100 samples.
    Low,
    /// About 1000 samples.
    Medium,
    /// About 10000 samples.
    High,
}

/// The axis used when downsampling.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
#[non_exhaustive]
pub enum SeriesType {
    Time,
    Distance,
}
