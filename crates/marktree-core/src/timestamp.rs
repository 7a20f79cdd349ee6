//! Timestamp conversion
//!
//! Converts between the integer epochs used by browsers and the ISO-8601
//! strings stored in the bookmark tree.
//!
//! Supported epochs (case-insensitive names):
//! - `unix`: seconds since 1970-01-01
//! - `javascript`: milliseconds since 1970-01-01
//! - `google`: microseconds since 1601-01-01 (Chrome bookmarks)
//! - `windows`: 100ns intervals since 1601-01-01 (FILETIME)

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, Offset, Utc};
use thiserror::Error;

/// Seconds between 1601-01-01 and 1970-01-01
pub const WINDOWS_EPOCH_DELTA: i64 = 11_644_473_600;

/// Format of every date string kept in the tree (seconds precision, 19 chars)
pub const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Errors from timestamp conversion
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimeError {
    #[error("Unknown epoch type \"{0}\" at the time conversion")]
    BadEpochType(String),

    #[error("Timestamp {stamp} is out of range for the {kind} epoch")]
    OutOfRange { stamp: i64, kind: EpochKind },
}

/// Epoch base and unit of an integer timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpochKind {
    Unix,
    Windows,
    Google,
    JavaScript,
}

impl EpochKind {
    /// Ticks per second and the offset (in seconds) of the epoch base from Unix
    fn scale(self) -> (i64, i64) {
        match self {
            EpochKind::Unix => (1, 0),
            EpochKind::JavaScript => (1_000, 0),
            EpochKind::Google => (1_000_000, WINDOWS_EPOCH_DELTA),
            EpochKind::Windows => (10_000_000, WINDOWS_EPOCH_DELTA),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EpochKind::Unix => "unix",
            EpochKind::Windows => "windows",
            EpochKind::Google => "google",
            EpochKind::JavaScript => "javascript",
        }
    }
}

impl fmt::Display for EpochKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EpochKind {
    type Err = TimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "unix" => Ok(EpochKind::Unix),
            "windows" => Ok(EpochKind::Windows),
            "google" => Ok(EpochKind::Google),
            "javascript" => Ok(EpochKind::JavaScript),
            _ => Err(TimeError::BadEpochType(s.to_string())),
        }
    }
}

/// Convert an integer timestamp into a UTC datetime, keeping sub-second precision
pub fn stamp_to_datetime(stamp: i64, kind: EpochKind) -> Result<DateTime<Utc>, TimeError> {
    let (ticks, delta) = kind.scale();
    let out_of_range = || TimeError::OutOfRange { stamp, kind };

    let secs = stamp
        .div_euclid(ticks)
        .checked_sub(delta)
        .ok_or_else(out_of_range)?;
    let nanos = stamp.rem_euclid(ticks) * (1_000_000_000 / ticks);

    DateTime::<Utc>::from_timestamp(secs, nanos as u32).ok_or_else(out_of_range)
}

/// Convert a datetime back into an integer timestamp of the given epoch
///
/// Exact inverse of [`stamp_to_datetime`] at the epoch's native precision.
pub fn datetime_to_stamp(datetime: &DateTime<Utc>, kind: EpochKind) -> Result<i64, TimeError> {
    let (ticks, delta) = kind.scale();
    let subsec = i64::from(datetime.timestamp_subsec_nanos()) / (1_000_000_000 / ticks);

    datetime
        .timestamp()
        .checked_add(delta)
        .and_then(|secs| secs.checked_mul(ticks))
        .and_then(|base| base.checked_add(subsec))
        .ok_or(TimeError::OutOfRange {
            stamp: datetime.timestamp(),
            kind,
        })
}

/// Render an integer timestamp as an ISO-8601 string in the given offset
///
/// Sub-second precision is dropped.
pub fn stamp_to_string(
    stamp: i64,
    kind: EpochKind,
    offset: &FixedOffset,
) -> Result<String, TimeError> {
    let datetime = stamp_to_datetime(stamp, kind)?;
    Ok(format_datetime(&datetime, offset))
}

/// Render an integer timestamp as a UTC ISO-8601 string, epoch given by name
pub fn epoch_to_iso_string(stamp: i64, format_name: &str) -> Result<String, TimeError> {
    let kind = format_name.parse()?;
    stamp_to_string(stamp, kind, &utc())
}

/// Current time in the given offset, truncated to seconds
pub fn now_string(offset: &FixedOffset) -> String {
    format_datetime(&Utc::now(), offset)
}

fn format_datetime(datetime: &DateTime<Utc>, offset: &FixedOffset) -> String {
    datetime.with_timezone(offset).format(ISO_FORMAT).to_string()
}

/// The zero offset
pub fn utc() -> FixedOffset {
    Utc.fix()
}

/// Build a fixed offset from minutes east of UTC, falling back to UTC when out of range
pub fn offset_from_minutes(minutes: i32) -> FixedOffset {
    minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .unwrap_or_else(|| {
            tracing::warn!(minutes, "UTC offset out of range, using UTC");
            utc()
        })
}
