//! ICS generation and parsing for stored events.
//!
//! Each event record is kept as a single-VEVENT calendar file (RFC 5545).

mod generate;
mod parse;

pub use generate::generate_ics;
pub use parse::parse_event;

/// Non-standard property carrying the record's time zone name.
const TZID_PROPERTY: &str = "X-CALKEEP-TZID";
/// Non-standard property carrying the geofence radius in meters.
const RADIUS_PROPERTY: &str = "X-CALKEEP-RADIUS";
