use std::backtrace::Backtrace;
use std::error::Error as StdError;
use std::fmt;

use chrono::{DateTime, Utc};
/// HTTP method type, re-exported for use with error inspection.
pub use reqwest::Method;
/// HTTP status code type, re-exported for use with error inspection.
pub use reqwest::StatusCode;
use reqwest::header;
use serde::Deserialize;

#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// Error related to non-successful HTTP call
    Status,
    /// Error related to invalid input supplied by the caller
    Validation,
    /// The client refused to send a request because the API rate limit is exhausted
    RateLimited,
    /// Error related to undecodable data returned by the API
    Decode,
    /// Internal error from dependencies
    Internal,
}

#[derive(Debug)]
pub struct Error {
    kind: Kind,
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
    backtrace: Backtrace,
}

impl Error {
    pub fn with_source<S: StdError + Send + Sync + 'static>(kind: Kind, source: S) -> Self {
        Self {
            kind,
            source: Some(Box::new(source)),
            backtrace: Backtrace::capture(),
        }
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    pub fn inner(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.source.as_deref()
    }

    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        let e = self.source.as_deref()?;
        e.downcast_ref::<E>()
    }

    pub fn validation<S: Into<String>>(message: S) -> Self {
        Validation {
            reason: message.into(),
        }
        .into()
    }

    pub fn status<S: Into<String>>(
        status_code: StatusCode,
        method: Method,
        path: String,
        message: S,
    ) -> Self {
        let message = message.into();
        let fault = serde_json::from_str::<Fault>(&message).ok();

        Status {
            status_code,
            method,
            path,
            message,
            fault,
        }
        .into()
    }

    pub fn decode<S: Into<String>>(message: S) -> Self {
        Decode {
            reason: message.into(),
        }
        .into()
    }

    #[must_use]
    pub fn rate_limited(retry_at: DateTime<Utc>) -> Self {
        RateLimited { retry_at }.into()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(src) => write!(f, "{:?}: {}", self.kind, src),
            None => write!(f, "{:?}", self.kind),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn StdError + 'static))
    }
}

#[non_exhaustive]
#[derive(Debug)]
pub struct Status {
    pub status_code: StatusCode,
    pub method: Method,
    pub path: String,
    pub message: String,
    /// The structured error body, when the API returned one.
    pub fault: Option<Fault>,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "error({}) making {} call to {} with {}",
            self.status_code, self.method, self.path, self.message
        )
    }
}

impl StdError for Status {}

/// Error body returned by the API for rejected requests, e.g.
/// `{"message": "Record Not Found", "errors": [{"resource": "Activity", "field": "id", "code": "invalid"}]}`.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Fault {
    pub message: String,
    #[serde(default)]
    pub errors: Vec<FaultDetail>,
}

/// A single field-level entry of a [`Fault`].
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FaultDetail {
    #[serde(default)]
    pub resource: String,
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub code: String,
}

#[non_exhaustive]
#[derive(Debug)]
pub struct Validation {
    pub reason: String,
}

impl fmt::Display for Validation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid: {}", self.reason)
    }
}

impl StdError for Validation {}

/// A response body that does not have the expected shape.
#[non_exhaustive]
#[derive(Debug)]
pub struct Decode {
    pub reason: String,
}

impl fmt::Display for Decode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "undecodable response: {}", self.reason)
    }
}

impl StdError for Decode {}

impl From<Decode> for Error {
    fn from(err: Decode) -> Self {
        Error::with_source(Kind::Decode, err)
    }
}

#[non_exhaustive]
#[derive(Debug, Clone, Copy)]
pub struct RateLimited {
    /// Earliest instant, on the server clock, at which the next request may be sent.
    pub retry_at: DateTime<Utc>,
}

impl fmt::Display for RateLimited {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rate limit exhausted, retry at {}", self.retry_at)
    }
}

impl StdError for RateLimited {}

/// A polyline that ends inside a value group or contains characters outside the
/// encoding alphabet.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MalformedPolyline {
    /// Byte offset of the value group that could not be decoded.
    pub offset: usize,
}

impl fmt::Display for MalformedPolyline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed polyline at byte {}", self.offset)
    }
}

impl StdError for MalformedPolyline {}

impl From<MalformedPolyline> for Error {
    fn from(err: MalformedPolyline) -> Self {
        Error::with_source(Kind::Decode, err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::with_source(Kind::Internal, e)
    }
}

impl From<header::InvalidHeaderValue> for Error {
    fn from(e: header::InvalidHeaderValue) -> Self {
        Error::with_source(Kind::Internal, e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::with_source(Kind::Internal, e)
    }
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Error::with_source(Kind::Internal, e)
    }
}

impl From<Validation> for Error {
    fn from(err: Validation) -> Self {
        Error::with_source(Kind::Validation, err)
    }
}

impl From<Status> for Error {
    fn from(err: Status) -> Self {
        Error::with_source(Kind::Status, err)
    }
}

impl From<RateLimited> for Error {
    fn from(err: RateLimited) -> Self {
        Error::with_source(Kind::RateLimited, err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_with_fault_body_should_parse_fault() {
        let body = r#"{"message":"Record Not Found","errors":[{"resource":"Activity","field":"id","code":"invalid"}]}"#;
        let error = Error::status(
            StatusCode::NOT_FOUND,
            Method::GET,
            "/activities/1/streams/time".to_owned(),
            body,
        );

        assert_eq!(error.kind(), Kind::Status);
        let status = error.downcast_ref::<Status>().expect("status source");
        let fault = status.fault.as_ref().expect("fault parsed");
        assert_eq!(fault.message, "Record Not Found");
        assert_eq!(fault.errors.len(), 1);
        assert_eq!(fault.errors[0].resource, "Activity");
        assert_eq!(fault.errors[0].code, "invalid");
    }

    #[test]
    fn status_with_plain_body_has_no_fault() {
        let error = Error::status(
            StatusCode::BAD_GATEWAY,
            Method::GET,
            "/activities/1".to_owned(),
            "upstream unavailable",
        );

        let status = error.downcast_ref::<Status>().expect("status source");
        assert!(status.fault.is_none(), "plain text is not a fault");
        assert!(error.to_string().contains("upstream unavailable"));
    }

    #[test]
    fn validation_display_should_succeed() {
        let error = Error::validation("no stream types requested");

        assert_eq!(error.kind(), Kind::Validation);
        assert_eq!(
            error.to_string(),
            "Validation: invalid: no stream types requested"
        );
    }

    #[test]
    fn malformed_polyline_into_error_should_succeed() {
        let error: Error = MalformedPolyline { offset: 7 }.into();

        assert_eq!(error.kind(), Kind::Decode);
        assert_eq!(
            error.downcast_ref::<MalformedPolyline>(),
            Some(&MalformedPolyline { offset: 7 })
        );
    }
}
