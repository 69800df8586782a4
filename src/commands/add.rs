use anyhow::{Context, Result};
use calkeep_core::alarm::AlarmSpec;
use calkeep_core::config::SchedulerConfig;
use calkeep_core::event::{EventRequest, StructuredLocation};
use calkeep_core::recurrence::{Frequency, RecurrenceSpec};
use calkeep_core::scheduler::EventScheduler;
use calkeep_core::store::{CalendarStore, DirStore};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use clap::Args;
use owo_colors::OwoColorize;

#[derive(Args)]
pub struct AddArgs {
    title: String,

    /// Start (e.g. "2025-03-20T15:00:00Z", "2025-03-20T15:00", "2025-03-20")
    #[arg(short, long)]
    start: String,

    /// End, same formats as --start (defaults to one hour after the start)
    #[arg(short, long)]
    end: Option<String>,

    /// daily, weekly, monthly or yearly
    #[arg(long)]
    repeat: Option<Frequency>,

    /// Last possible occurrence of a repeating event
    #[arg(long)]
    repeat_until: Option<String>,

    /// "none", seconds ("-900"), a duration before the start ("15m") or a time
    #[arg(long = "alarm", allow_hyphen_values = true)]
    alarms: Vec<AlarmSpec>,

    #[arg(long)]
    all_day: bool,

    #[arg(long)]
    notes: Option<String>,

    #[arg(long)]
    location: Option<String>,

    /// IANA time zone, e.g. "Europe/Berlin" (defaults to the configured one)
    #[arg(long)]
    tz: Option<Tz>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

pub fn run(store: DirStore, config: SchedulerConfig, args: AddArgs) -> Result<()> {
    let zone = args.tz.unwrap_or_else(|| config.effective_time_zone());
    let request = build_request(&args, zone)?;

    let mut scheduler = EventScheduler::new(store, config);
    let alarms = alarm_labels(&scheduler, &request);
    let identifier = scheduler
        .add_event(request)
        .with_context(|| format!("Failed to add \"{}\"", args.title))?;

    if args.json {
        let output = serde_json::json!({
            "identifier": identifier,
            "title": args.title,
            "calendar": scheduler.config().calendar_name,
            "alarms": alarms,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{}", format!("  Created: {}", args.title).green());
        for alarm in &alarms {
            println!("  Alarm {}", alarm);
        }
        println!("  {}", identifier.dimmed());
    }

    Ok(())
}

/// Human-readable alarms the event will carry, e.g. "15m before".
fn alarm_labels<S: CalendarStore>(scheduler: &EventScheduler<S>, request: &EventRequest) -> Vec<String> {
    scheduler
        .compose(request)
        .alarms
        .iter()
        .map(ToString::to_string)
        .collect()
}

fn build_request(args: &AddArgs, zone: Tz) -> Result<EventRequest> {
    let start = parse_datetime(&args.start, zone)?;
    let mut request = EventRequest::new(&args.title, start).with_time_zone(zone);

    if let Some(end) = &args.end {
        request = request.with_end(parse_datetime(end, zone)?);
    }

    if let Some(frequency) = args.repeat {
        let mut recurrence = RecurrenceSpec::new(frequency);
        if let Some(until) = &args.repeat_until {
            recurrence = recurrence.until(parse_datetime(until, zone)?);
        }
        request = request.with_recurrence(recurrence);
    } else if args.repeat_until.is_some() {
        anyhow::bail!("--repeat-until needs --repeat");
    }

    for alarm in &args.alarms {
        request = request.with_alarm(*alarm);
    }
    if args.all_day {
        request = request.with_all_day(true);
    }
    if let Some(notes) = &args.notes {
        request = request.with_notes(notes);
    }
    if let Some(location) = args.location.as_deref().filter(|l| !l.is_empty()) {
        request = request.with_location(StructuredLocation::titled(location));
    }

    Ok(request)
}

/// Parse an RFC 3339 time, or a local date/time in `zone`.
fn parse_datetime(input: &str, zone: Tz) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }

    let naive = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(input, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(|| anyhow::anyhow!("Could not parse date/time: \"{}\"", input))?;

    zone.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| anyhow::anyhow!("\"{}\" does not exist in {}", input, zone))
}
