//! Event requests and the normalized records handed to a store.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::alarm::{Alarm, AlarmSpec};
use crate::recurrence::{RecurrenceRule, RecurrenceSpec};

/// Which occurrences of a recurring series a save or remove affects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Span {
    ThisEvent,
    FutureEvents,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
}

/// A place with an optional coordinate and geofence radius (meters).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StructuredLocation {
    pub title: String,
    pub geo: Option<GeoLocation>,
    pub radius: Option<f64>,
}

impl StructuredLocation {
    pub fn titled(title: &str) -> Self {
        StructuredLocation {
            title: title.to_string(),
            ..Default::default()
        }
    }
}

/// Everything a caller can say about an event it wants created.
///
/// Only what is set is used; the scheduler fills in the rest.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventRequest {
    pub title: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    /// Overrides where a recurring series stops.
    pub recurrence_end: Option<DateTime<Utc>>,
    pub alarms: Vec<AlarmSpec>,
    pub recurrence: RecurrenceSpec,
    pub all_day: Option<bool>,
    pub notes: Option<String>,
    pub location: Option<StructuredLocation>,
    pub time_zone: Option<Tz>,
}

impl EventRequest {
    pub fn new(title: &str, start: DateTime<Utc>) -> Self {
        EventRequest {
            title: Some(title.to_string()),
            start: Some(start),
            ..Default::default()
        }
    }

    pub fn with_end(mut self, end: DateTime<Utc>) -> Self {
        self.end = Some(end);
        self
    }

    pub fn with_alarm(mut self, alarm: AlarmSpec) -> Self {
        self.alarms.push(alarm);
        self
    }

    pub fn with_recurrence(mut self, recurrence: RecurrenceSpec) -> Self {
        self.recurrence_end = recurrence.end.or(self.recurrence_end);
        self.recurrence = recurrence;
        self
    }

    pub fn with_all_day(mut self, all_day: bool) -> Self {
        self.all_day = Some(all_day);
        self
    }

    pub fn with_notes(mut self, notes: &str) -> Self {
        self.notes = Some(notes.to_string());
        self
    }

    pub fn with_location(mut self, location: StructuredLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_time_zone(mut self, time_zone: Tz) -> Self {
        self.time_zone = Some(time_zone);
        self
    }
}

/// A fully composed event, ready to be saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Assigned by the store on save; empty before that.
    pub identifier: String,
    pub title: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub all_day: bool,
    pub time_zone: Tz,
    pub recurrence: Option<RecurrenceRule>,
    pub alarms: Vec<Alarm>,
    pub notes: Option<String>,
    pub location: Option<StructuredLocation>,
    /// Identifier of the owning calendar; `None` leaves the choice to the store.
    pub calendar: Option<String>,
}

impl EventRecord {
    pub fn new(time_zone: Tz) -> Self {
        EventRecord {
            identifier: String::new(),
            title: None,
            start: None,
            end: None,
            all_day: false,
            time_zone,
            recurrence: None,
            alarms: Vec::new(),
            notes: None,
            location: None,
            calendar: None,
        }
    }

    pub fn is_recurring(&self) -> bool {
        self.recurrence.is_some()
    }

    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("(No title)")
    }
}
