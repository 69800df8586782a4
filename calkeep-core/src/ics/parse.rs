//! ICS file parsing using the icalendar crate's parser.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use icalendar::{
    CalendarDateTime, DatePerhapsTime,
    parser::{Component, Property, read_calendar, unfold},
};

use crate::alarm::Alarm;
use crate::error::{CalKeepError, CalKeepResult};
use crate::event::{EventRecord, GeoLocation, StructuredLocation};
use crate::recurrence::RecurrenceRule;

use super::{RADIUS_PROPERTY, TZID_PROPERTY};

/// Parse ICS content into an EventRecord.
///
/// `fallback_zone` is used when the file carries no zone of its own.
pub fn parse_event(content: &str, fallback_zone: Tz) -> CalKeepResult<EventRecord> {
    let unfolded = unfold(content);
    let calendar = read_calendar(&unfolded).map_err(|e| CalKeepError::IcsParse(e.to_string()))?;
    let vevent = calendar
        .components
        .iter()
        .find(|c| c.name == "VEVENT")
        .ok_or_else(|| CalKeepError::IcsParse("No VEVENT in calendar file".into()))?;

    let identifier = vevent
        .find_prop("UID")
        .map(|p| p.val.to_string())
        .ok_or_else(|| CalKeepError::IcsParse("Event has no UID".into()))?;

    let time_zone = vevent
        .find_prop(TZID_PROPERTY)
        .and_then(|p| p.val.as_ref().parse::<Tz>().ok())
        .unwrap_or(fallback_zone);

    let mut event = EventRecord::new(time_zone);
    event.identifier = identifier;
    event.title = vevent.find_prop("SUMMARY").map(|p| p.val.to_string());
    event.notes = vevent.find_prop("DESCRIPTION").map(|p| p.val.to_string());

    if let Some(prop) = vevent.find_prop("DTSTART") {
        let dpt = DatePerhapsTime::try_from(prop)
            .map_err(|_| CalKeepError::IcsParse("Invalid DTSTART".into()))?;
        event.all_day = matches!(dpt, DatePerhapsTime::Date(_));
        event.start = to_utc(dpt, time_zone);
    }
    if let Some(prop) = vevent.find_prop("DTEND") {
        let dpt = DatePerhapsTime::try_from(prop)
            .map_err(|_| CalKeepError::IcsParse("Invalid DTEND".into()))?;
        event.end = to_utc(dpt, time_zone);
    }

    event.recurrence = vevent
        .find_prop("RRULE")
        .map(|p| RecurrenceRule::from_rrule(p.val.as_ref(), time_zone))
        .transpose()?;

    event.location = vevent.find_prop("LOCATION").map(|p| StructuredLocation {
        title: p.val.to_string(),
        geo: vevent.find_prop("GEO").and_then(|g| parse_geo(g.val.as_ref())),
        radius: vevent
            .find_prop(RADIUS_PROPERTY)
            .and_then(|r| r.val.as_ref().parse().ok()),
    });

    event.alarms = vevent
        .components
        .iter()
        .filter(|c| c.name == "VALARM")
        .filter_map(parse_alarm)
        .collect();

    Ok(event)
}

/// Convert icalendar's DatePerhapsTime to an instant, reading dates and
/// floating times in the event's zone.
fn to_utc(dpt: DatePerhapsTime, zone: Tz) -> Option<DateTime<Utc>> {
    match dpt {
        DatePerhapsTime::Date(d) => local_to_utc(d.and_hms_opt(0, 0, 0)?, zone),
        DatePerhapsTime::DateTime(cal_dt) => match cal_dt {
            CalendarDateTime::Utc(dt) => Some(dt),
            CalendarDateTime::Floating(naive) => local_to_utc(naive, zone),
            CalendarDateTime::WithTimezone { date_time, tzid } => {
                let tz = tzid.parse::<Tz>().unwrap_or(zone);
                local_to_utc(date_time, tz)
            }
        },
    }
}

fn local_to_utc(naive: NaiveDateTime, zone: Tz) -> Option<DateTime<Utc>> {
    zone.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_geo(value: &str) -> Option<GeoLocation> {
    let (latitude, longitude) = value.split_once(';')?;
    Some(GeoLocation {
        latitude: latitude.trim().parse().ok()?,
        longitude: longitude.trim().parse().ok()?,
    })
}

/// Parse a VALARM's TRIGGER: either a DATE-TIME or a signed duration (-PT15M, P1D, ...)
fn parse_alarm(alarm: &Component) -> Option<Alarm> {
    let trigger: &Property = alarm.find_prop("TRIGGER")?;
    let value = trigger.val.as_ref();

    let is_date_time = trigger
        .params
        .iter()
        .any(|p| p.key == "VALUE" && p.val.as_ref().map(|v| v.as_ref()) == Some("DATE-TIME"));

    if is_date_time || !value.trim_start_matches(['-', '+']).starts_with('P') {
        let naive = NaiveDateTime::parse_from_str(value.trim_end_matches('Z'), "%Y%m%dT%H%M%S")
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(value, "%Y%m%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })?;
        return Some(Alarm::Absolute(naive.and_utc()));
    }

    let is_before = value.starts_with('-');
    let duration_str = value.trim_start_matches(['-', '+']);
    let duration = iso8601::duration(duration_str).ok()?;
    let std_duration: std::time::Duration = duration.into();
    let seconds = i64::try_from(std_duration.as_secs()).ok()?;

    Some(Alarm::Relative {
        offset_seconds: if is_before { -seconds } else { seconds },
    })
}
