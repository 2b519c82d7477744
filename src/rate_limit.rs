#![expect(
    clippy::module_name_repetitions,
    reason = "Rate limit types deliberately include the module name for clarity"
)]

//! Tracking of the API's two rate limit windows.
//!
//! Every response carries the configured limits and the current usage for a
//! short window (15 minutes, aligned to the top of the hour) and a long window
//! (one UTC day):
//!
//! ```text
//! X-Ratelimit-Limit: 600,30000
//! X-Ratelimit-Usage: 50,20000
//! Date: Mon, 19 Oct 2026 20:11:05 GMT
//! ```
//!
//! [`RateLimitTracker`] keeps the most recent reading. It only reports; what to
//! do when a window is exhausted is up to the caller.

use std::fmt;
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, TimeDelta, Timelike as _, Utc};
use reqwest::header::{DATE, HeaderMap};

/// Header carrying the `"<short>,<long>"` request limits.
pub const LIMIT_HEADER: &str = "x-ratelimit-limit";
/// Header carrying the `"<short>,<long>"` request usage.
pub const USAGE_HEADER: &str = "x-ratelimit-usage";

/// Length of the short window. Windows start at minutes 0, 15, 30 and 45.
const SHORT_WINDOW_SECS: i64 = 900;

/// Limit and usage of a single window.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    /// Always greater than zero.
    pub limit: u32,
    /// May exceed `limit`.
    pub usage: u32,
}

impl Window {
    #[must_use]
    pub fn exhausted(&self) -> bool {
        self.usage >= self.limit
    }

    #[must_use]
    pub fn fraction(&self) -> f64 {
        f64::from(self.usage) / f64::from(self.limit)
    }
}

/// One successfully parsed rate limit reading.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    /// The 15 minute window.
    pub short: Window,
    /// The daily window.
    pub long: Window,
    /// `Date` of the response that produced this reading, if it could be parsed.
    pub server_time: Option<DateTime<Utc>>,
    /// Earliest instant on the server clock at which an exhausted window
    /// resets. `None` when no window is exhausted or the server time is unknown.
    pub next_allowed_at: Option<DateTime<Utc>>,
}

impl RateLimit {
    /// Parses the rate limit and `Date` headers of a response.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, HeaderError> {
        let (limit_short, limit_long) = pair(headers, LIMIT_HEADER)?;
        let (usage_short, usage_long) = pair(headers, USAGE_HEADER)?;

        if limit_short == 0 || limit_long == 0 {
            return Err(HeaderError::Malformed(LIMIT_HEADER));
        }

        let short = Window {
            limit: limit_short,
            usage: usage_short,
        };
        let long = Window {
            limit: limit_long,
            usage: usage_long,
        };

        let server_time = headers
            .get(DATE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| DateTime::parse_from_rfc2822(value).ok())
            .map(|time| time.with_timezone(&Utc));

        Ok(Self {
            short,
            long,
            server_time,
            next_allowed_at: server_time.and_then(|time| next_allowed_at(short, long, time)),
        })
    }

    /// Whether either window's usage has reached its limit.
    #[must_use]
    pub fn exceeded(&self) -> bool {
        self.short.exhausted() || self.long.exhausted()
    }

    /// The larger of the two windows' usage fractions.
    #[must_use]
    pub fn fraction_reached(&self) -> f64 {
        self.short.fraction().max(self.long.fraction())
    }
}

/// Why a response's headers could not be turned into a [`RateLimit`].
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderError {
    Missing(&'static str),
    Malformed(&'static str),
}

impl fmt::Display for HeaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderError::Missing(name) => write!(f, "missing header {name}"),
            HeaderError::Malformed(name) => write!(f, "malformed header {name}"),
        }
    }
}

impl std::error::Error for HeaderError {}

/// The tracker's view of the API's rate limits.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RateLimitState {
    /// No usable reading yet, or the last response's headers were unusable.
    #[default]
    Unknown,
    Known(RateLimit),
}

impl RateLimitState {
    #[must_use]
    pub fn known(&self) -> Option<&RateLimit> {
        match self {
            RateLimitState::Known(rate_limit) => Some(rate_limit),
            RateLimitState::Unknown => None,
        }
    }
}

/// Shared, thread-safe record of the latest rate limit reading.
///
/// Readers take a shared lock and never block one another; [`update`](Self::update)
/// replaces the whole state under the exclusive lock. Each [`Client`](crate::streams::Client)
/// owns its own tracker.
#[derive(Debug, Default)]
pub struct RateLimitTracker {
    state: RwLock<RateLimitState>,
}

impl RateLimitTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the rate limit headers of a response.
    ///
    /// Missing or malformed headers reset the tracker to
    /// [`RateLimitState::Unknown`] so that no stale reading survives.
    pub fn update(&self, headers: &HeaderMap) {
        let next = match RateLimit::from_headers(headers) {
            Ok(rate_limit) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(
                    short_usage = rate_limit.short.usage,
                    short_limit = rate_limit.short.limit,
                    long_usage = rate_limit.long.usage,
                    long_limit = rate_limit.long.limit,
                    next_allowed_at = ?rate_limit.next_allowed_at,
                    "rate limit updated"
                );
                RateLimitState::Known(rate_limit)
            }
            Err(err) => {
                #[cfg(feature = "tracing")]
                match err {
                    HeaderError::Missing(_) => tracing::debug!(%err, "rate limit reset"),
                    HeaderError::Malformed(_) => tracing::warn!(%err, "rate limit reset"),
                }
                #[cfg(not(feature = "tracing"))]
                let _: HeaderError = err;
                RateLimitState::Unknown
            }
        };

        // The state is a plain value, so a poisoned lock holds nothing half-written.
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = next;
    }

    /// Forgets the current reading.
    pub fn reset(&self) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = RateLimitState::Unknown;
    }

    /// A consistent copy of the current state.
    #[must_use]
    pub fn state(&self) -> RateLimitState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether either window is exhausted. `false` while the state is unknown.
    #[must_use]
    pub fn exceeded(&self) -> bool {
        self.state().known().is_some_and(RateLimit::exceeded)
    }

    /// The larger usage fraction of the two windows, `0.0` while unknown.
    ///
    /// Useful for throttling before the hard limit is hit.
    #[must_use]
    pub fn fraction_reached(&self) -> f64 {
        self.state()
            .known()
            .map_or(0.0, RateLimit::fraction_reached)
    }

    /// When the next request may be sent, if a window is exhausted.
    #[must_use]
    pub fn next_allowed_at(&self) -> Option<DateTime<Utc>> {
        self.state().known().and_then(|rate_limit| rate_limit.next_allowed_at)
    }

    /// Whether a request sent at `now` would fall before the next allowed time.
    #[must_use]
    pub fn is_blocked_at(&self, now: DateTime<Utc>) -> bool {
        self.next_allowed_at().is_some_and(|allowed| now < allowed)
    }

    /// Whether a limit was reached by a response received within `window` of `now`.
    #[must_use]
    pub fn reached_during_last(&self, window: TimeDelta, now: DateTime<Utc>) -> bool {
        let state = self.state();
        let Some(rate_limit) = state.known() else {
            return false;
        };

        match rate_limit.server_time {
            Some(received) => rate_limit.exceeded() && received >= now - window,
            None => false,
        }
    }
}

fn pair(headers: &HeaderMap, name: &'static str) -> Result<(u32, u32), HeaderError> {
    let value = headers
        .get(name)
        .ok_or(HeaderError::Missing(name))?
        .to_str()
        .map_err(|_e| HeaderError::Malformed(name))?;

    let mut parts = value.split(',').map(|part| part.trim().parse::<u32>());
    match (parts.next(), parts.next(), parts.next()) {
        (Some(Ok(short)), Some(Ok(long)), None) => Ok((short, long)),
        _ => Err(HeaderError::Malformed(name)),
    }
}

fn next_allowed_at(short: Window, long: Window, server_time: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let time = server_time.with_nanosecond(0)?;

    let short_reset = short.exhausted().then(|| next_short_boundary(time));
    let long_reset = if long.exhausted() {
        Some(next_midnight(time)?)
    } else {
        None
    };

    short_reset.max(long_reset)
}

fn next_short_boundary(time: DateTime<Utc>) -> DateTime<Utc> {
    let into_window = i64::from(time.minute() * 60 + time.second()) % SHORT_WINDOW_SECS;
    time + TimeDelta::seconds(SHORT_WINDOW_SECS - into_window)
}

fn next_midnight(time: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let tomorrow = time.date_naive().succ_opt()?;
    Some(tomorrow.and_hms_opt(0, 0, 0)?.and_utc())
}
