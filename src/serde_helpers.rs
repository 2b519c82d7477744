//! Serde helpers for lenient deserialization of API responses.
//!
//! When the `tracing` feature is enabled, [`deserialize_with_warnings`] also
//! logs any fields the target type does not capture, which is how new API
//! fields get noticed.

use serde::de::DeserializeOwned;
use serde_json::Value;

/// A `serde_as` type that reads a sample count from any JSON number.
///
/// The API reports counts such as `original_size` as integers, but some
/// payloads (and hand-built fixtures) carry them as floats like `2829.0`.
/// Fractions are truncated; negative numbers are rejected.
pub struct CountFromNumber;

impl<'de> serde_with::DeserializeAs<'de, usize> for CountFromNumber {
    fn deserialize_as<D>(deserializer: D) -> std::result::Result<usize, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use std::fmt;

        use serde::de::{self, Unexpected, Visitor};

        struct CountVisitor;

        impl Visitor<'_> for CountVisitor {
            type Value = usize;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a non-negative number")
            }

            fn visit_u64<E>(self, v: u64) -> std::result::Result<Self::Value, E>
            where
                E: de::Error,
            {
                usize::try_from(v).map_err(|_e| E::invalid_value(Unexpected::Unsigned(v), &self))
            }

            fn visit_i64<E>(self, v: i64) -> std::result::Result<Self::Value, E>
            where
                E: de::Error,
            {
                usize::try_from(v).map_err(|_e| E::invalid_value(Unexpected::Signed(v), &self))
            }

            #[expect(
                clippy::cast_possible_truncation,
                clippy::cast_sign_loss,
                reason = "the value is checked to be finite and non-negative; larger values saturate"
            )]
            fn visit_f64<E>(self, v: f64) -> std::result::Result<Self::Value, E>
            where
                E: de::Error,
            {
                if v.is_finite() && v >= 0.0 {
                    Ok(v.trunc() as usize)
                } else {
                    Err(E::invalid_value(Unexpected::Float(v), &self))
                }
            }
        }

        deserializer.deserialize_any(CountVisitor)
    }
}

/// Deserialize JSON with unknown field warnings.
///
/// Unknown fields are logged with their values but never cause the
/// deserialization to fail. On failure the offending path is logged before
/// the error is returned.
#[cfg(feature = "tracing")]
pub fn deserialize_with_warnings<T: DeserializeOwned>(value: Value) -> crate::Result<T> {
    use std::any::type_name;

    tracing::trace!(
        type_name = %type_name::<T>(),
        json = %value,
        "deserializing JSON"
    );

    // Kept so unknown field values can be looked up afterwards
    let original = value.clone();
    let mut unknown_paths: Vec<String> = Vec::new();

    let result: T = serde_ignored::deserialize(value, |path| {
        unknown_paths.push(path.to_string());
    })
    .inspect_err(|_| {
        let path_result: Result<T, _> = serde_path_to_error::deserialize(&original);
        if let Err(path_err) = path_result {
            let path = path_err.path().to_string();

            tracing::error!(
                type_name = %type_name::<T>(),
                path = %path,
                value = %format_value(lookup_value(&original, &path)),
                error = %path_err.inner(),
                "deserialization failed"
            );
        }
    })?;

    for path in unknown_paths {
        tracing::warn!(
            type_name = %type_name::<T>(),
            field = %path,
            value = %format_value(lookup_value(&original, &path)),
            "unknown field in API response"
        );
    }

    Ok(result)
}

/// Pass-through deserialization when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub fn deserialize_with_warnings<T: DeserializeOwned>(value: Value) -> crate::Result<T> {
    Ok(serde_json::from_value(value)?)
}

/// Look up a value by a `serde_ignored` / `serde_path_to_error` path such as
/// `data[15].type` or `map.?.summary_polyline`.
///
/// `?` segments mark `Option` wrappers and are skipped.
#[cfg(feature = "tracing")]
fn lookup_value<'value>(value: &'value Value, path: &str) -> Option<&'value Value> {
    path.split(['.', '[', ']'])
        .filter(|segment| !segment.is_empty() && *segment != "?")
        .try_fold(value, |current, segment| match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?),
            _ => None,
        })
}

#[cfg(feature = "tracing")]
fn format_value(value: Option<&Value>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "<unable to retrieve>".to_owned(),
    }
}
