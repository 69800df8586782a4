//! ICS file generation.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use icalendar::{Alarm, Calendar, CalendarDateTime, Component, EventLike, Property, Trigger, ValueType};

use crate::alarm::Alarm as EventAlarm;
use crate::error::CalKeepResult;
use crate::event::EventRecord;

use super::{RADIUS_PROPERTY, TZID_PROPERTY};

/// Generate .ics content for an event record
pub fn generate_ics(event: &EventRecord) -> CalKeepResult<String> {
    let mut cal = Calendar::new();

    let mut ics_event = icalendar::Event::new();
    ics_event.uid(&event.identifier);
    if let Some(ref title) = event.title {
        ics_event.summary(title);
    }

    ics_event.add_property("DTSTAMP", Utc::now().format("%Y%m%dT%H%M%SZ").to_string());
    ics_event.add_property(TZID_PROPERTY, event.time_zone.name());

    if let Some(start) = event.start {
        add_time_property(&mut ics_event, "DTSTART", start, event);
    }
    if let Some(end) = all_day_end(event).or(event.end) {
        add_time_property(&mut ics_event, "DTEND", end, event);
    }

    if let Some(ref notes) = event.notes {
        ics_event.description(notes);
    }

    if let Some(ref location) = event.location {
        ics_event.location(&location.title);
        if let Some(geo) = location.geo {
            ics_event.add_property("GEO", format!("{};{}", geo.latitude, geo.longitude));
        }
        if let Some(radius) = location.radius {
            ics_event.add_property(RADIUS_PROPERTY, radius.to_string());
        }
    }

    let rrule = event.recurrence.as_ref().and_then(|rule| {
        if event.all_day {
            rule.to_date_rrule(event.time_zone)
        } else {
            rule.to_rrule()
        }
    });
    if let Some(rrule) = rrule {
        ics_event.add_property("RRULE", rrule);
    }

    for alarm in &event.alarms {
        let trigger = match *alarm {
            EventAlarm::Absolute(at) => Trigger::DateTime(CalendarDateTime::Utc(at)),
            EventAlarm::Relative { offset_seconds } if offset_seconds < 0 => {
                Trigger::before_start(Duration::seconds(-offset_seconds))
            }
            EventAlarm::Relative { offset_seconds } => {
                Trigger::after_start(Duration::seconds(offset_seconds))
            }
        };
        ics_event.alarm(Alarm::display("Reminder", trigger));
    }

    let ics_event = ics_event.done();
    cal.push(ics_event);
    let cal = cal.done();

    Ok(strip_ics_bloat(&cal.to_string()))
}

/// All-day events end on the following day at the earliest (DTEND is exclusive).
fn all_day_end(event: &EventRecord) -> Option<DateTime<Utc>> {
    if !event.all_day {
        return None;
    }
    let start = event.start?;
    let start_day = start.with_timezone(&event.time_zone).date_naive();
    match event.end {
        Some(end) if end.with_timezone(&event.time_zone).date_naive() > start_day => Some(end),
        _ => Some(start + Duration::days(1)),
    }
}

/// Clean up ICS output from the icalendar crate
/// - Replace PRODID
/// - Remove CALSCALE:GREGORIAN (it's the default)
/// - Remove DTSTAMP and UID inside VALARM sections (not required by RFC 5545)
fn strip_ics_bloat(ics: &str) -> String {
    let mut result = String::with_capacity(ics.len());
    let mut in_valarm = false;

    for line in ics.lines() {
        if line.starts_with("PRODID:") {
            result.push_str("PRODID:CALKEEP\r\n");
            continue;
        }

        if line == "CALSCALE:GREGORIAN" {
            continue;
        }

        if line == "BEGIN:VALARM" {
            in_valarm = true;
        } else if line == "END:VALARM" {
            in_valarm = false;
        }

        if in_valarm && (line.starts_with("DTSTAMP:") || line.starts_with("UID:")) {
            continue;
        }

        result.push_str(line);
        result.push_str("\r\n");
    }

    result
}

/// Add a DATE value for all-day events, otherwise a local time with TZID.
fn add_time_property(
    ics_event: &mut icalendar::Event,
    name: &str,
    time: DateTime<Utc>,
    event: &EventRecord,
) {
    let local = time.with_timezone(&event.time_zone);

    if event.all_day {
        let mut prop = Property::new(name, local.date_naive().format("%Y%m%d").to_string());
        prop.append_parameter(ValueType::Date);
        ics_event.append_property(prop);
    } else if event.time_zone == Tz::UTC {
        ics_event.add_property(name, time.format("%Y%m%dT%H%M%SZ").to_string());
    } else {
        let mut prop = Property::new(name, local.naive_local().format("%Y%m%dT%H%M%S").to_string());
        prop.add_parameter("TZID", event.time_zone.name());
        ics_event.append_property(prop);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{GeoLocation, StructuredLocation};
    use crate::recurrence::{Frequency, RecurrenceRule};
    use chrono::TimeZone;

    fn make_test_event() -> EventRecord {
        let mut event = EventRecord::new(chrono_tz::Europe::Berlin);
        event.identifier = "test-event-123".to_string();
        event.title = Some("Test Event".to_string());
        event.start = Some(Utc.with_ymd_and_hms(2025, 3, 20, 15, 0, 0).unwrap());
        event.end = Some(Utc.with_ymd_and_hms(2025, 3, 20, 16, 0, 0).unwrap());
        event
    }

    #[test]
    fn test_generate_ics_uses_local_time_with_tzid() {
        let ics = generate_ics(&make_test_event()).unwrap();

        assert!(
            ics.contains("DTSTART;TZID=Europe/Berlin:20250320T160000"),
            "DTSTART should be Berlin local time. ICS:\n{}",
            ics
        );
        assert!(ics.contains("X-CALKEEP-TZID:Europe/Berlin"));
    }

    #[test]
    fn test_generate_ics_all_day_event_has_value_date() {
        let mut event = make_test_event();
        event.all_day = true;

        let ics = generate_ics(&event).unwrap();

        assert!(
            ics.contains("DTSTART;VALUE=DATE:20250320"),
            "DTSTART should have VALUE=DATE parameter. ICS:\n{}",
            ics
        );
        assert!(
            ics.contains("DTEND;VALUE=DATE:20250321"),
            "All-day DTEND should be the next day. ICS:\n{}",
            ics
        );
    }

    #[test]
    fn test_generate_ics_alarms_and_rule() {
        let mut event = make_test_event();
        event.alarms = vec![
            EventAlarm::Relative {
                offset_seconds: -900,
            },
            EventAlarm::Absolute(Utc.with_ymd_and_hms(2025, 3, 20, 14, 0, 0).unwrap()),
        ];
        event.recurrence = Some(RecurrenceRule {
            frequency: Frequency::Weekly,
            interval: 1,
            end: None,
        });

        let ics = generate_ics(&event).unwrap();

        assert_eq!(ics.matches("BEGIN:VALARM").count(), 2, "ICS:\n{}", ics);
        assert!(ics.contains("RRULE:FREQ=WEEKLY;INTERVAL=1"));

        let valarm_section: String = ics
            .split("BEGIN:VALARM")
            .nth(1)
            .unwrap()
            .split("END:VALARM")
            .next()
            .unwrap()
            .to_string();
        assert!(
            !valarm_section.contains("UID:"),
            "VALARM should not have UID. Got:\n{}",
            valarm_section
        );
    }

    #[test]
    fn test_generate_ics_all_day_rule_uses_date_until() {
        let mut event = make_test_event();
        event.all_day = true;
        event.recurrence = Some(RecurrenceRule {
            frequency: Frequency::Daily,
            interval: 1,
            end: Some(Utc.with_ymd_and_hms(2025, 3, 27, 15, 0, 0).unwrap()),
        });

        let ics = generate_ics(&event).unwrap();

        assert!(
            ics.contains("RRULE:FREQ=DAILY;INTERVAL=1;UNTIL=20250327\r\n"),
            "UNTIL should be a DATE like DTSTART. ICS:\n{}",
            ics
        );
    }

    #[test]
    fn test_generate_ics_skips_rule_without_frequency() {
        let mut event = make_test_event();
        event.recurrence = Some(RecurrenceRule {
            frequency: Frequency::None,
            interval: 1,
            end: None,
        });

        let ics = generate_ics(&event).unwrap();

        assert!(!ics.contains("RRULE"), "ICS:\n{}", ics);
    }

    #[test]
    fn test_generate_ics_structured_location() {
        let mut event = make_test_event();
        event.location = Some(StructuredLocation {
            title: "Office".to_string(),
            geo: Some(GeoLocation {
                latitude: 52.5,
                longitude: 13.4,
            }),
            radius: Some(150.0),
        });

        let ics = generate_ics(&event).unwrap();

        assert!(ics.contains("LOCATION:Office"));
        assert!(ics.contains("GEO:52.5;13.4"));
        assert!(ics.contains("X-CALKEEP-RADIUS:150"));
    }
}
