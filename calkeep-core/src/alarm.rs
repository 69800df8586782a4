//! Alarm inputs and the alarms attached to event records.
//!
//! Callers describe alarms with [`AlarmSpec`], either a fixed point in time
//! or an offset in seconds relative to the event start. The offset `-1` is
//! reserved as the "no alarm" sentinel and never produces an [`Alarm`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CalKeepError, CalKeepResult};

/// How an alarm should be attached to an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlarmSpec {
    /// Fire at a fixed instant.
    Absolute(DateTime<Utc>),
    /// Fire `n` seconds relative to the start (negative = before).
    RelativeOffset(i64),
}

impl AlarmSpec {
    /// Offset value meaning "no alarm".
    pub const NONE_OFFSET: i64 = -1;

    pub const NONE: AlarmSpec = AlarmSpec::RelativeOffset(Self::NONE_OFFSET);

    /// Canonical offsets offered to users, in seconds.
    pub const PRESETS: [i64; 9] = [
        Self::NONE_OFFSET,
        0,
        -5 * 60,
        -15 * 60,
        -30 * 60,
        -60 * 60,
        -2 * 60 * 60,
        -24 * 60 * 60,
        -2 * 24 * 60 * 60,
    ];

    pub fn minutes_before(minutes: i64) -> Self {
        AlarmSpec::RelativeOffset(-minutes * 60)
    }

    /// True for the "no alarm" sentinel.
    pub fn is_none(&self) -> bool {
        matches!(self, AlarmSpec::RelativeOffset(Self::NONE_OFFSET))
    }

    /// The alarm this spec produces, or `None` for the sentinel.
    pub fn to_alarm(&self) -> Option<Alarm> {
        match *self {
            AlarmSpec::Absolute(at) => Some(Alarm::Absolute(at)),
            AlarmSpec::RelativeOffset(Self::NONE_OFFSET) => None,
            AlarmSpec::RelativeOffset(offset_seconds) => Some(Alarm::Relative { offset_seconds }),
        }
    }
}

/// Accepted forms:
/// - `none`
/// - an integer number of seconds (`-900`, `0`)
/// - an RFC 3339 timestamp (absolute)
/// - a humantime duration (`15m`, `1day`), meaning that long before the start
impl FromStr for AlarmSpec {
    type Err = CalKeepError;

    fn from_str(s: &str) -> CalKeepResult<Self> {
        let s = s.trim();

        if s.eq_ignore_ascii_case("none") {
            return Ok(AlarmSpec::NONE);
        }

        if let Ok(seconds) = s.parse::<i64>() {
            return Ok(AlarmSpec::RelativeOffset(seconds));
        }

        if let Ok(at) = DateTime::parse_from_rfc3339(s) {
            return Ok(AlarmSpec::Absolute(at.with_timezone(&Utc)));
        }

        if let Ok(duration) = humantime::parse_duration(s) {
            let seconds = i64::try_from(duration.as_secs()).map_err(|_| {
                CalKeepError::InvalidInput(format!("Alarm offset '{}' is too large", s))
            })?;
            return Ok(AlarmSpec::RelativeOffset(-seconds));
        }

        Err(CalKeepError::InvalidInput(format!(
            "Unrecognized alarm '{}'. Expected 'none', seconds, a duration like '15m', or an RFC 3339 time",
            s
        )))
    }
}

/// An alarm attached to a stored event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alarm {
    Absolute(DateTime<Utc>),
    Relative { offset_seconds: i64 },
}

impl fmt::Display for Alarm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Alarm::Absolute(at) => write!(f, "at {}", at.to_rfc3339()),
            Alarm::Relative { offset_seconds: 0 } => write!(f, "at start"),
            Alarm::Relative { offset_seconds } if *offset_seconds < 0 => {
                let before = std::time::Duration::from_secs(offset_seconds.unsigned_abs());
                write!(f, "{} before", humantime::format_duration(before))
            }
            Alarm::Relative { offset_seconds } => {
                let after = std::time::Duration::from_secs(offset_seconds.unsigned_abs());
                write!(f, "{} after", humantime::format_duration(after))
            }
        }
    }
}
