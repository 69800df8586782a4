//! Recurrence descriptions and the RRULE values stored with events.
//!
//! Recurrences are only described and persisted here. Expanding a rule into
//! occurrences is left to whatever reads the stored events.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{CalKeepError, CalKeepResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    /// RFC 5545 FREQ value, `None` for non-recurring.
    pub fn to_rfc5545(self) -> Option<&'static str> {
        match self {
            Frequency::None => None,
            Frequency::Daily => Some("DAILY"),
            Frequency::Weekly => Some("WEEKLY"),
            Frequency::Monthly => Some("MONTHLY"),
            Frequency::Yearly => Some("YEARLY"),
        }
    }

    fn from_rfc5545(value: &str) -> Option<Self> {
        match value {
            "DAILY" => Some(Frequency::Daily),
            "WEEKLY" => Some(Frequency::Weekly),
            "MONTHLY" => Some(Frequency::Monthly),
            "YEARLY" => Some(Frequency::Yearly),
            _ => None,
        }
    }
}

impl FromStr for Frequency {
    type Err = CalKeepError;

    fn from_str(s: &str) -> CalKeepResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Frequency::None),
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            "yearly" => Ok(Frequency::Yearly),
            other => Err(CalKeepError::InvalidInput(format!(
                "Unknown recurrence '{}'. Expected none, daily, weekly, monthly or yearly",
                other
            ))),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Frequency::None => "none",
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
            Frequency::Yearly => "yearly",
        };
        f.write_str(name)
    }
}

/// Requested recurrence for a new event.
///
/// When `end` is `None` the series ends with the event's own end date, or
/// never if the event has none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RecurrenceSpec {
    pub frequency: Frequency,
    pub end: Option<DateTime<Utc>>,
}

impl RecurrenceSpec {
    pub fn new(frequency: Frequency) -> Self {
        RecurrenceSpec {
            frequency,
            end: None,
        }
    }

    pub fn until(mut self, end: DateTime<Utc>) -> Self {
        self.end = Some(end);
        self
    }

    pub fn is_recurring(&self) -> bool {
        self.frequency != Frequency::None
    }
}

/// A recurrence rule attached to a stored event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    pub interval: u32,
    /// Last possible occurrence; `None` recurs forever.
    pub end: Option<DateTime<Utc>>,
}

impl RecurrenceRule {
    /// Render the RRULE value, e.g. `FREQ=WEEKLY;INTERVAL=1;UNTIL=20240108T100000Z`.
    ///
    /// `None` when the frequency is [`Frequency::None`]; such a rule has no
    /// RRULE form.
    pub fn to_rrule(&self) -> Option<String> {
        self.render(None)
    }

    /// Like [`to_rrule`](Self::to_rrule), with UNTIL as a DATE in `zone`.
    /// Rules on all-day events must use this form.
    pub fn to_date_rrule(&self, zone: Tz) -> Option<String> {
        self.render(Some(zone))
    }

    fn render(&self, date_zone: Option<Tz>) -> Option<String> {
        let mut parts = vec![
            format!("FREQ={}", self.frequency.to_rfc5545()?),
            format!("INTERVAL={}", self.interval),
        ];
        if let Some(end) = self.end {
            let until = match date_zone {
                Some(zone) => end.with_timezone(&zone).date_naive().format("%Y%m%d").to_string(),
                None => end.format("%Y%m%dT%H%M%SZ").to_string(),
            };
            parts.push(format!("UNTIL={}", until));
        }
        Some(parts.join(";"))
    }

    /// Parse an RRULE value. A DATE-form UNTIL is read as midnight in `zone`.
    pub fn from_rrule(value: &str, zone: Tz) -> CalKeepResult<Self> {
        let mut frequency = None;
        let mut interval = 1;
        let mut end = None;

        for part in value.split(';') {
            let Some((key, val)) = part.split_once('=') else {
                continue;
            };
            match key {
                "FREQ" => frequency = Frequency::from_rfc5545(val),
                "INTERVAL" => {
                    interval = val.parse().map_err(|_| {
                        CalKeepError::IcsParse(format!("Invalid INTERVAL in RRULE '{}'", value))
                    })?
                }
                "UNTIL" => {
                    end = Some(parse_until(val, zone).ok_or_else(|| {
                        CalKeepError::IcsParse(format!("Invalid UNTIL in RRULE '{}'", value))
                    })?);
                }
                _ => {}
            }
        }

        let frequency = frequency
            .ok_or_else(|| CalKeepError::IcsParse(format!("Missing FREQ in RRULE '{}'", value)))?;

        Ok(RecurrenceRule {
            frequency,
            interval,
            end,
        })
    }
}

fn parse_until(value: &str, zone: Tz) -> Option<DateTime<Utc>> {
    if value.contains('T') {
        let naive = NaiveDateTime::parse_from_str(value.trim_end_matches('Z'), "%Y%m%dT%H%M%S").ok()?;
        return Some(naive.and_utc());
    }
    let midnight = NaiveDate::parse_from_str(value, "%Y%m%d").ok()?.and_hms_opt(0, 0, 0)?;
    zone.from_local_datetime(&midnight)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn rrule_with_until() {
        let rule = RecurrenceRule {
            frequency: Frequency::Weekly,
            interval: 1,
            end: Some(Utc.with_ymd_and_hms(2024, 1, 8, 10, 0, 0).unwrap()),
        };
        assert_eq!(
            rule.to_rrule().as_deref(),
            Some("FREQ=WEEKLY;INTERVAL=1;UNTIL=20240108T100000Z")
        );
    }

    #[test]
    fn rrule_without_until_recurs_forever() {
        let rule = RecurrenceRule {
            frequency: Frequency::Monthly,
            interval: 1,
            end: None,
        };
        assert_eq!(rule.to_rrule().as_deref(), Some("FREQ=MONTHLY;INTERVAL=1"));
    }

    #[test]
    fn date_rrule_writes_until_as_local_date() {
        let rule = RecurrenceRule {
            frequency: Frequency::Daily,
            interval: 1,
            end: Some(Utc.with_ymd_and_hms(2024, 2, 29, 23, 0, 0).unwrap()),
        };
        assert_eq!(
            rule.to_date_rrule(chrono_tz::Europe::Berlin).as_deref(),
            Some("FREQ=DAILY;INTERVAL=1;UNTIL=20240301")
        );
    }

    #[test]
    fn date_until_is_midnight_in_zone() {
        let rule =
            RecurrenceRule::from_rrule("FREQ=DAILY;UNTIL=20240301", chrono_tz::Europe::Berlin).unwrap();
        assert_eq!(rule.end, Some(Utc.with_ymd_and_hms(2024, 2, 29, 23, 0, 0).unwrap()));
    }

    #[test]
    fn rule_without_frequency_has_no_rrule() {
        let rule = RecurrenceRule {
            frequency: Frequency::None,
            interval: 1,
            end: None,
        };
        assert_eq!(rule.to_rrule(), None);
        assert_eq!(rule.to_date_rrule(chrono_tz::UTC), None);
    }

    #[test]
    fn parse_rrule_from_other_writers() {
        let rule = RecurrenceRule::from_rrule("FREQ=DAILY;COUNT=5", chrono_tz::UTC).unwrap();
        assert_eq!(rule.frequency, Frequency::Daily);
        assert_eq!(rule.interval, 1);
        assert_eq!(rule.end, None);
    }

    #[test]
    fn parse_rrule_requires_freq() {
        assert!(RecurrenceRule::from_rrule("INTERVAL=2", chrono_tz::UTC).is_err());
    }

    #[test]
    fn frequency_names() {
        assert_eq!("Weekly".parse::<Frequency>().unwrap(), Frequency::Weekly);
        assert_eq!(Frequency::Yearly.to_string(), "yearly");
        assert!("fortnightly".parse::<Frequency>().is_err());
        assert!(!RecurrenceSpec::default().is_recurring());
    }
}
