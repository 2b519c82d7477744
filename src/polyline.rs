//! Google encoded polyline support.
//!
//! Route geometry (activity maps, segments) is returned by the API as an
//! [encoded polyline](https://developers.google.com/maps/documentation/utilities/polylinealgorithm)
//! with a precision of five decimal places. [`Polyline`] keeps the encoded
//! form and decodes it on demand.
//!
//! # Malformed input
//!
//! Each value group is bounded to [`MAX_GROUP_CHARS`] characters. Decoding
//! stops at the first value group that is cut short, too long, or contains a
//! byte outside the encoding alphabet (`?` through `~`). [`Polyline::decode`]
//! returns the points completed before that group, dropping a latitude whose
//! longitude never arrived. [`Polyline::try_decode`] reports the failing
//! offset instead.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::MalformedPolyline;

/// Scale between degrees and the encoded integer representation.
const PRECISION: f64 = 1e5;

/// Offset added to every 5-bit chunk to land in printable ASCII.
const CHAR_OFFSET: u8 = 63;

/// Continuation flag of a 5-bit chunk.
const CONTINUATION: u8 = 0x20;

const CHUNK_MASK: u8 = 0x1f;

/// Upper bound on characters in a single value group. Twelve 5-bit chunks
/// carry 60 bits, which is more than any coordinate delta needs.
pub const MAX_GROUP_CHARS: usize = 12;

/// A geographic coordinate in degrees.
///
/// Serialized as a `[lat, lng]` pair, which is how the API represents
/// coordinates in both polylines and `latlng` streams.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Point {
    pub lat: f64,
    pub lng: f64,
}

impl Point {
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl From<[f64; 2]> for Point {
    fn from([lat, lng]: [f64; 2]) -> Self {
        Self { lat, lng }
    }
}

impl From<Point> for [f64; 2] {
    fn from(point: Point) -> Self {
        [point.lat, point.lng]
    }
}

/// An encoded polyline as returned by the API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Polyline(String);

impl Polyline {
    #[must_use]
    pub fn new<S: Into<String>>(encoded: S) -> Self {
        Self(encoded.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Decodes the polyline into its points.
    ///
    /// Malformed input never panics or loops: decoding stops at the first bad
    /// value group and the points completed before it are returned.
    #[must_use]
    pub fn decode(&self) -> Vec<Point> {
        let (points, _) = decode_points(self.0.as_bytes());
        points
    }

    /// Decodes the polyline, rejecting malformed input.
    pub fn try_decode(&self) -> Result<Vec<Point>, MalformedPolyline> {
        match decode_points(self.0.as_bytes()) {
            (points, None) => Ok(points),
            (_, Some(err)) => Err(err),
        }
    }

    /// Encodes `points` with the same precision the API uses.
    ///
    /// This is the inverse of [`Polyline::decode`] for any sequence it produced.
    #[must_use]
    pub fn encode(points: &[Point]) -> Self {
        let mut encoded = String::with_capacity(points.len() * 8);
        let (mut prev_lat, mut prev_lng) = (0_i64, 0_i64);

        for point in points {
            let lat = to_fixed(point.lat);
            let lng = to_fixed(point.lng);

            encode_value(lat - prev_lat, &mut encoded);
            encode_value(lng - prev_lng, &mut encoded);

            prev_lat = lat;
            prev_lng = lng;
        }

        Self(encoded)
    }
}

impl fmt::Display for Polyline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Polyline {
    fn from(encoded: String) -> Self {
        Self(encoded)
    }
}

impl From<&str> for Polyline {
    fn from(encoded: &str) -> Self {
        Self(encoded.to_owned())
    }
}

impl FromIterator<Point> for Polyline {
    fn from_iter<I: IntoIterator<Item = Point>>(iter: I) -> Self {
        let points: Vec<Point> = iter.into_iter().collect();
        Self::encode(&points)
    }
}

/// Geometry attached to an activity or route.
#[non_exhaustive]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Map {
    #[serde(default)]
    pub id: String,
    /// Full resolution geometry. Only present on detailed representations.
    #[serde(default)]
    pub polyline: Option<Polyline>,
    /// Simplified geometry suitable for thumbnails.
    #[serde(default)]
    pub summary_polyline: Option<Polyline>,
}

/// Reads value groups off an encoded byte string.
struct Groups<'bytes> {
    bytes: &'bytes [u8],
    pos: usize,
}

impl Iterator for Groups<'_> {
    type Item = Result<i64, MalformedPolyline>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.bytes.len() {
            return None;
        }

        let start = self.pos;
        let mut value = 0_u64;
        let mut shift = 0_u32;

        for &byte in self.bytes.iter().skip(start).take(MAX_GROUP_CHARS) {
            self.pos += 1;

            let Some(chunk) = byte
                .checked_sub(CHAR_OFFSET)
                .filter(|chunk| *chunk <= CONTINUATION | CHUNK_MASK)
            else {
                break;
            };

            value |= u64::from(chunk & CHUNK_MASK) << shift;
            shift += 5;

            if chunk & CONTINUATION == 0 {
                return Some(Ok(zigzag_decode(value)));
            }
        }

        // Stop for good: the remaining bytes cannot be framed reliably.
        self.pos = self.bytes.len();
        Some(Err(MalformedPolyline { offset: start }))
    }
}

fn decode_points(bytes: &[u8]) -> (Vec<Point>, Option<MalformedPolyline>) {
    let mut points = Vec::with_capacity(bytes.len() / 4);
    let mut groups = Groups { bytes, pos: 0 };
    let (mut lat, mut lng) = (0_i64, 0_i64);

    loop {
        let lat_delta = match groups.next() {
            None => return (points, None),
            Some(Ok(delta)) => delta,
            Some(Err(err)) => return (points, Some(err)),
        };
        let lng_delta = match groups.next() {
            None => {
                let offset = bytes.len();
                return (points, Some(MalformedPolyline { offset }));
            }
            Some(Ok(delta)) => delta,
            Some(Err(err)) => return (points, Some(err)),
        };

        lat = lat.wrapping_add(lat_delta);
        lng = lng.wrapping_add(lng_delta);

        points.push(Point::new(from_fixed(lat), from_fixed(lng)));
    }
}

#[expect(
    clippy::cast_possible_wrap,
    reason = "a group holds at most 60 bits, so the shifted value always fits in i64"
)]
fn zigzag_decode(value: u64) -> i64 {
    let half = (value >> 1) as i64;
    if value & 1 == 0 { half } else { !half }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "values are masked or shifted below 0x40 before narrowing"
)]
fn encode_value(delta: i64, out: &mut String) {
    let mut value = if delta < 0 {
        !(delta << 1)
    } else {
        delta << 1
    }
    .unsigned_abs();

    while value >= u64::from(CONTINUATION) {
        out.push(chunk_char((value & u64::from(CHUNK_MASK)) as u8 | CONTINUATION));
        value >>= 5;
    }
    out.push(chunk_char(value as u8));
}

fn chunk_char(chunk: u8) -> char {
    char::from(chunk + CHAR_OFFSET)
}

#[expect(
    clippy::cast_precision_loss,
    reason = "coordinates scaled by 1e5 stay well below 2^53"
)]
fn from_fixed(value: i64) -> f64 {
    value as f64 / PRECISION
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "coordinates are bounded to +-180 degrees before scaling"
)]
fn to_fixed(degrees: f64) -> i64 {
    (degrees * PRECISION).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    const CANONICAL: &str = "_p~iF~ps|U_ulLnnqC_mqNvxq`@";

    fn canonical_points() -> Vec<Point> {
        vec![
            Point::new(38.5, -120.2),
            Point::new(40.7, -120.95),
            Point::new(43.252, -126.453),
        ]
    }

    #[test]
    fn decode_canonical_should_succeed() {
        let points = Polyline::new(CANONICAL).decode();

        assert_eq!(points, canonical_points());
    }

    #[test]
    fn decode_empty_should_return_no_points() {
        assert!(Polyline::default().decode().is_empty(), "empty input");
        assert_eq!(Polyline::default().try_decode(), Ok(Vec::new()));
    }

    #[test]
    fn decode_is_deterministic() {
        let polyline = Polyline::new(CANONICAL);

        assert_eq!(polyline.decode(), polyline.decode());
    }

    #[test]
    fn decode_truncated_group_keeps_completed_points() {
        // Cut inside the longitude group of the second point.
        let polyline = Polyline::new("_p~iF~ps|U_ulLnnq");

        assert_eq!(polyline.decode(), vec![Point::new(38.5, -120.2)]);
        assert_eq!(polyline.try_decode(), Err(MalformedPolyline { offset: 14 }));
    }

    #[test]
    fn decode_dangling_latitude_is_dropped() {
        let polyline = Polyline::new("_p~iF~ps|U_ulL");

        assert_eq!(polyline.decode(), vec![Point::new(38.5, -120.2)]);
        assert_eq!(polyline.try_decode(), Err(MalformedPolyline { offset: 14 }));
    }

    #[test]
    fn decode_out_of_alphabet_byte_stops() {
        let polyline = Polyline::new("_p~iF~ps|U _ulLnnqC");

        assert_eq!(polyline.decode(), vec![Point::new(38.5, -120.2)]);
        assert_eq!(polyline.try_decode(), Err(MalformedPolyline { offset: 10 }));
    }

    #[test]
    fn decode_overlong_group_is_bounded() {
        let polyline = Polyline::new("~".repeat(1_000));

        assert!(polyline.decode().is_empty(), "no complete group");
        assert_eq!(polyline.try_decode(), Err(MalformedPolyline { offset: 0 }));
    }

    #[test]
    fn encode_canonical_should_succeed() {
        assert_eq!(Polyline::encode(&canonical_points()).as_str(), CANONICAL);
    }

    #[test]
    fn encode_inverts_decode() {
        let polyline = Polyline::new("_ugjFnlofV?n@YzAUV");
        let points = polyline.decode();

        assert_eq!(Polyline::encode(&points), polyline);
        assert_eq!(points.into_iter().collect::<Polyline>(), polyline);
    }

    #[test]
    fn map_deserializes_polylines() -> anyhow::Result<()> {
        let map: Map = serde_json::from_value(serde_json::json!({
            "id": "a1234",
            "polyline": null,
            "summary_polyline": CANONICAL,
            "resource_state": 2
        }))?;

        assert_eq!(map.id, "a1234");
        assert!(map.polyline.is_none(), "null polyline");
        let summary = map.summary_polyline.expect("summary polyline");
        assert_eq!(summary.decode(), canonical_points());

        Ok(())
    }

    #[test]
    fn point_serializes_as_pair() -> anyhow::Result<()> {
        let value = serde_json::to_value(Point::new(38.5, -120.2))?;

        assert_eq!(value, serde_json::json!([38.5, -120.2]));
        Ok(())
    }
}
