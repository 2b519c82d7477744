use bon::Builder;
use serde::Serialize;
use serde_with::skip_serializing_none;

use super::{Resolution, SeriesType, StreamParent, StreamType};
use crate::Result;
use crate::error::Error;

/// Request for the streams of an activity, segment or segment effort.
///
/// # Example
///
/// ```
/// use strava_client_sdk::streams::types::{Resolution, StreamParent, StreamType, StreamsRequest};
///
/// let request = StreamsRequest::builder()
///     .parent(StreamParent::Activity)
///     .id(103_221_154)
///     .types(vec![StreamType::Time, StreamType::HeartRate])
///     .resolution(Resolution::Medium)
///     .build();
/// ```
#[skip_serializing_none]
#[derive(Debug, Clone, Builder, Serialize)]
#[non_exhaustive]
pub struct StreamsRequest {
    /// The resource the streams belong to.
    #[serde(skip)]
    pub parent: StreamParent,
    /// Identifier of the parent resource.
    #[serde(skip)]
    pub id: i64,
    /// Stream types to fetch. Must not be empty.
    #[serde(skip)]
    pub types: Vec<StreamType>,
    /// Downsampling applied by the API. All samples are returned when unset.
    pub resolution: Option<Resolution>,
    /// Axis used for downsampling (default: distance).
    pub series_type: Option<SeriesType>,
}

impl StreamsRequest {
    /// Checks the request before anything is sent.
    pub fn validate(&self) -> Result<()> {
        if self.types.is_empty() {
            return Err(Error::validation("no stream types requested"));
        }

        Ok(())
    }

    /// Path relative to the API root, e.g. `activities/1/streams/time,latlng`.
    pub(crate) fn path(&self) -> String {
        let types = self
            .types
            .iter()
            .map(StreamType::as_str)
            .collect::<Vec<_>>()
            .join(",");

        format!("{}/{}/streams/{types}", self.parent.collection(), self.id)
    }
}
