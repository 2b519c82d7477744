use serde::Deserialize;
use serde_json::Value;
use serde_with::{DefaultOnError, serde_as};

use super::StreamType;
use crate::Result;
use crate::error::Error;
use crate::polyline::Point;
use crate::serde_helpers::{CountFromNumber, deserialize_with_warnings};

/// Metadata shared by every stream kind, copied verbatim from the response.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamMeta {
    pub kind: StreamType,
    /// What the index axis represents, e.g. `distance` or `time`.
    pub series_type: String,
    /// Number of samples before downsampling.
    pub original_size: usize,
    /// `low`, `medium` or `high`.
    pub resolution: String,
}

/// A numeric or location time series.
///
/// `data` holds a value for every sample, with absent samples collapsed to
/// zero (or `(0, 0)` for locations). `raw` is the same length and keeps
/// absent samples as `None`, so a real zero can be told apart from a gap.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
pub struct Stream<T> {
    pub meta: StreamMeta,
    pub data: Vec<T>,
    pub raw: Vec<Option<T>>,
}

/// Time, heart rate, cadence, power or temperature samples.
pub type IntegerStream = Stream<i64>;

/// Distance, elevation, speed or grade samples.
pub type DecimalStream = Stream<f64>;

/// `[lat, lng]` samples. A `(0, 0)` entry in `data` is only meaningful when
/// the matching `raw` entry is present.
pub type LocationStream = Stream<Point>;

impl<T: Copy> Stream<T> {
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The sample at `index`, or `None` when it is absent or out of range.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<T> {
        self.raw.get(index).copied().flatten()
    }

    /// Whether the response carried `original_size` samples.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.data.len() == self.meta.original_size
    }
}

/// The `moving` series. Booleans have no absent state.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BooleanStream {
    pub meta: StreamMeta,
    pub data: Vec<bool>,
}

impl BooleanStream {
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<bool> {
        self.data.get(index).copied()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.data.len() == self.meta.original_size
    }
}

/// The streams of one activity, segment or segment effort.
///
/// Slots are `None` when the stream was not requested or does not exist; for
/// example manually created activities have no streams at all. Index `i`
/// refers to the same instant in every present slot.
#[non_exhaustive]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamSet {
    pub time: Option<IntegerStream>,
    pub location: Option<LocationStream>,
    pub distance: Option<DecimalStream>,
    pub elevation: Option<DecimalStream>,
    pub speed: Option<DecimalStream>,
    pub heart_rate: Option<IntegerStream>,
    pub cadence: Option<IntegerStream>,
    pub power: Option<IntegerStream>,
    pub temperature: Option<IntegerStream>,
    pub moving: Option<BooleanStream>,
    pub grade: Option<DecimalStream>,
}

/// One element of the streams response array.
#[serde_as]
#[derive(Debug, Deserialize)]
///
/// Only `type` is required. Metadata that is null or of the wrong shape
/// decodes to its default so a known stream is never lost to it.
struct Descriptor {
    #[serde(rename = "type")]
    kind: StreamType,
    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    series_type: String,
    #[serde_as(as = "DefaultOnError<CountFromNumber>")]
    #[serde(default)]
    original_size: usize,
    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    resolution: String,
    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    data: Vec<Value>,
}

impl StreamSet {
    /// Decodes the raw JSON body of a streams response.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(bytes)?;
        Self::from_value(value)
    }

    /// Decodes an already parsed streams response, which must be a JSON array.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Array(descriptors) => Ok(Self::decode(descriptors)),
            other => Err(Error::decode(format!(
                "expected an array of streams, got {other}"
            ))),
        }
    }

    /// Decodes stream descriptors into their typed slots.
    ///
    /// Descriptors with an unknown `type`, or that are not objects with a
    /// `type`, are skipped. Malformed samples decode as absent.
    #[must_use]
    pub fn decode(descriptors: Vec<Value>) -> Self {
        let mut set = StreamSet::default();

        for value in descriptors {
            let descriptor: Descriptor = match deserialize_with_warnings(value) {
                Ok(descriptor) => descriptor,
                Err(e) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(error = %e, "skipping undecodable stream");
                    #[cfg(not(feature = "tracing"))]
                    let _: Error = e;
                    continue;
                }
            };

            set.insert(descriptor);
        }

        set
    }

    fn insert(&mut self, descriptor: Descriptor) {
        let Descriptor {
            kind,
            series_type,
            original_size,
            resolution,
            data,
        } = descriptor;

        let meta = StreamMeta {
            kind: kind.clone(),
            series_type,
            original_size,
            resolution,
        };

        match kind {
            StreamType::Time => self.time = Some(fill(meta, &data, integer_sample)),
            StreamType::Location => self.location = Some(fill(meta, &data, location_sample)),
            StreamType::Distance => self.distance = Some(fill(meta, &data, decimal_sample)),
            StreamType::Elevation => self.elevation = Some(fill(meta, &data, decimal_sample)),
            StreamType::Speed => self.speed = Some(fill(meta, &data, decimal_sample)),
            StreamType::HeartRate => self.heart_rate = Some(fill(meta, &data, integer_sample)),
            StreamType::Cadence => self.cadence = Some(fill(meta, &data, integer_sample)),
            StreamType::Power => self.power = Some(fill(meta, &data, integer_sample)),
            StreamType::Temperature => {
                self.temperature = Some(fill(meta, &data, integer_sample));
            }
            StreamType::Moving => {
                self.moving = Some(BooleanStream {
                    meta,
                    data: data.iter().map(|v| v.as_bool().unwrap_or(false)).collect(),
                });
            }
            StreamType::Grade => self.grade = Some(fill(meta, &data, decimal_sample)),
            StreamType::Unknown(tag) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(tag = %tag, "skipping unknown stream type");
                #[cfg(not(feature = "tracing"))]
                let _: String = tag;
            }
        }
    }

    /// The kinds of the present slots, in declaration order.
    #[must_use]
    pub fn kinds(&self) -> Vec<StreamType> {
        let present = [
            self.time.is_some(),
            self.location.is_some(),
            self.distance.is_some(),
            self.elevation.is_some(),
            self.speed.is_some(),
            self.heart_rate.is_some(),
            self.cadence.is_some(),
            self.power.is_some(),
            self.temperature.is_some(),
            self.moving.is_some(),
            self.grade.is_some(),
        ];

        StreamType::ALL
            .into_iter()
            .zip(present)
            .filter_map(|(kind, present)| present.then_some(kind))
            .collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kinds().is_empty()
    }
}

fn fill<T: Copy + Default>(
    meta: StreamMeta,
    data: &[Value],
    sample: fn(&Value) -> Option<T>,
) -> Stream<T> {
    let raw: Vec<Option<T>> = data.iter().map(sample).collect();
    let data = raw.iter().map(|v| v.unwrap_or_default()).collect();

    Stream { meta, data, raw }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "truncation toward zero is the intended rounding; out of range values saturate"
)]
fn integer_sample(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        _ => None,
    }
}

fn decimal_sample(value: &Value) -> Option<f64> {
    value.as_f64()
}

fn location_sample(value: &Value) -> Option<Point> {
    match value.as_array()?.as_slice() {
        [lat, lng] => Some(Point::new(lat.as_f64()?, lng.as_f64()?)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn descriptor(kind: &str, data: Value) -> Value {
        json!({
            "type": kind,
            "data": data,
            "series_type": "distance",
            "original_size": 5,
            "resolution": "high"
        })
    }

    #[test]
    fn time_with_null_should_track_absence() {
        let set = StreamSet::decode(vec![descriptor("time", json!([0, null, 8, 10, 13]))]);

        let time = set.time.expect("time stream");
        assert_eq!(time.data, vec![0, 0, 8, 10, 13]);
        assert_eq!(time.raw, vec![Some(0), None, Some(8), Some(10), Some(13)]);
        assert_eq!(time.get(0), Some(0));
        assert_eq!(time.get(1), None);
        assert_eq!(time.get(99), None);
        assert!(time.is_complete(), "five samples of five");
    }

    #[test]
    fn metadata_is_copied_verbatim() {
        let set = StreamSet::decode(vec![descriptor("heartrate", json!([120, 121, 122, 123, 124]))]);

        let heart_rate = set.heart_rate.expect("heart rate stream");
        assert_eq!(
            heart_rate.meta,
            StreamMeta {
                kind: StreamType::HeartRate,
                series_type: "distance".to_owned(),
                original_size: 5,
                resolution: "high".to_owned(),
            }
        );
    }

    #[test]
    fn unknown_type_is_dropped() {
        let set = StreamSet::decode(vec![
            descriptor("time", json!([0, 1, 2, 3, 4])),
            descriptor("power_balance", json!([50, 50, 49, 51, 50])),
            descriptor("altitude", json!([10.0, 10.5, 11.0, 11.5, 12.0])),
        ]);

        assert_eq!(set.kinds(), vec![StreamType::Time, StreamType::Elevation]);
    }

    #[test]
    fn integer_samples_truncate_toward_zero() {
        let set = StreamSet::decode(vec![descriptor("watts", json!([1.9, -1.9, 250, "x", null]))]);

        let power = set.power.expect("power stream");
        assert_eq!(power.data, vec![1, -1, 250, 0, 0]);
        assert_eq!(power.raw, vec![Some(1), Some(-1), Some(250), None, None]);
    }

    #[test]
    fn decimal_samples_track_absence() {
        let set = StreamSet::decode(vec![
            descriptor("distance", json!([0.0, 2.5, null, 7.25, 9])),
            descriptor("velocity_smooth", json!([0, 0, 1.5, 1.5, 2])),
            descriptor("grade_smooth", json!([null, -0.5, 0.0, 0.5, 1.0])),
        ]);

        let distance = set.distance.expect("distance stream");
        assert_eq!(distance.data, vec![0.0, 2.5, 0.0, 7.25, 9.0]);
        assert_eq!(distance.get(2), None);
        assert_eq!(distance.get(0), Some(0.0));

        let speed = set.speed.expect("speed stream");
        assert_eq!(speed.data, vec![0.0, 0.0, 1.5, 1.5, 2.0]);

        let grade = set.grade.expect("grade stream");
        assert_eq!(grade.raw[0], None);
        assert_eq!(grade.raw[1], Some(-0.5));
    }

    #[test]
    fn malformed_locations_decode_to_origin() {
        let set = StreamSet::decode(vec![descriptor(
            "latlng",
            json!([
                null,
                [38.546876, -121.817203],
                [38.546881],
                ["a", "b"],
                [38.546881, -121.817439]
            ]),
        )]);

        let location = set.location.expect("location stream");
        assert_eq!(
            location.data,
            vec![
                Point::default(),
                Point::new(38.546876, -121.817203),
                Point::default(),
                Point::default(),
                Point::new(38.546881, -121.817439),
            ]
        );
        assert_eq!(location.get(0), None);
        assert_eq!(location.get(1), Some(Point::new(38.546876, -121.817203)));
        assert_eq!(location.get(2), None);
        assert_eq!(location.get(3), None);
    }

    #[test]
    fn moving_decodes_booleans() {
        let set = StreamSet::decode(vec![descriptor("moving", json!([false, true, true, null, 1]))]);

        let moving = set.moving.expect("moving stream");
        assert_eq!(moving.data, vec![false, true, true, false, false]);
        assert_eq!(moving.get(1), Some(true));
    }

    #[test]
    fn truncated_data_is_reported_incomplete() {
        let set = StreamSet::decode(vec![descriptor("cadence", json!([80, 81]))]);

        let cadence = set.cadence.expect("cadence stream");
        assert_eq!(cadence.len(), 2);
        assert!(!cadence.is_complete(), "two samples of five");
        assert_eq!(cadence.get(4), None);
    }

    #[test]
    fn all_kinds_decode_into_their_slot() {
        let descriptors = StreamType::ALL
            .iter()
            .map(|kind| descriptor(kind.as_str(), json!([])))
            .collect();

        let set = StreamSet::decode(descriptors);

        assert_eq!(set.kinds(), StreamType::ALL.to_vec());
        assert!(set.temperature.is_some_and(|t| t.is_empty()), "empty temperature");
    }

    #[test]
    fn descriptors_without_type_are_skipped() {
        let set = StreamSet::decode(vec![
            json!({"data": [1, 2, 3]}),
            json!("time"),
            descriptor("temp", json!([20, 21, 21, 22, 22])),
        ]);

        assert_eq!(set.kinds(), vec![StreamType::Temperature]);
    }

    #[test]
    fn original_size_accepts_floats() {
        let set = StreamSet::decode(vec![json!({
            "type": "time",
            "data": [0, 1],
            "series_type": "time",
            "original_size": 2829.0,
            "resolution": "medium"
        })]);

        assert_eq!(set.time.expect("time stream").meta.original_size, 2829);
    }

    #[test]
    fn null_metadata_keeps_known_stream() {
        let set = StreamSet::decode(vec![
            json!({
                "type": "heartrate",
                "data": [120, 121],
                "series_type": "time",
                "original_size": 2,
                "resolution": null
            }),
            json!({
                "type": "time",
                "data": [0, 1],
                "series_type": null,
                "original_size": -1,
                "resolution": "high"
            }),
            json!({
                "type": "cadence",
                "data": null,
                "series_type": 7,
                "original_size": "many",
                "resolution": "low"
            }),
        ]);

        assert_eq!(
            set.kinds(),
            vec![StreamType::Time, StreamType::HeartRate, StreamType::Cadence]
        );

        let heart_rate = set.heart_rate.expect("heart rate stream");
        assert_eq!(heart_rate.data, vec![120, 121]);
        assert_eq!(heart_rate.meta.resolution, "");
        assert_eq!(heart_rate.meta.original_size, 2);

        let time = set.time.expect("time stream");
        assert_eq!(time.data, vec![0, 1]);
        assert_eq!(time.meta.series_type, "");
        assert_eq!(time.meta.original_size, 0);

        let cadence = set.cadence.expect("cadence stream");
        assert!(cadence.is_empty(), "null data decodes as no samples");
        assert_eq!(cadence.meta.series_type, "");
        assert_eq!(cadence.meta.original_size, 0);
        assert_eq!(cadence.meta.resolution, "low");
    }

    #[test]
    fn non_string_type_is_skipped() {
        let set = StreamSet::decode(vec![
            json!({"type": 5, "data": [1, 2]}),
            json!({"type": null, "data": [1, 2]}),
            descriptor("watts", json!([200, 210, 220, 230, 240])),
        ]);

        assert_eq!(set.kinds(), vec![StreamType::Power]);
    }

    #[test]
    fn duplicate_type_keeps_last_descriptor() {
        let set = StreamSet::decode(vec![
            descriptor("time", json!([0, 1, 2, 3, 4])),
            descriptor("time", json!([10, 20, 30])),
        ]);

        assert_eq!(set.kinds(), vec![StreamType::Time]);
        assert_eq!(set.time.expect("time stream").data, vec![10, 20, 30]);
    }

    #[test]
    fn empty_response_is_empty_set() -> anyhow::Result<()> {
        let set = StreamSet::from_slice(b"[]")?;

        assert!(set.is_empty(), "no streams");
        Ok(())
    }

    #[test]
    fn non_array_response_is_rejected() {
        let err = StreamSet::from_value(json!({"message": "nope"})).unwrap_err();

        assert_eq!(err.kind(), crate::error::Kind::Decode);
    }
}
