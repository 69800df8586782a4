use anyhow::{Context, Result};
use calkeep_core::calendar::EntityKind;
use calkeep_core::config::SchedulerConfig;
use calkeep_core::store::{CalendarStore, DirStore};
use owo_colors::OwoColorize;

pub fn run(store: &DirStore, config: &SchedulerConfig) -> Result<()> {
    let calendars = store
        .list_calendars(EntityKind::Event)
        .context("Failed to list calendars")?;

    if calendars.is_empty() {
        println!("{}", "No calendars yet".dimmed());
        println!(
            "{}",
            format!("  \"{}\" is created with the first event", config.calendar_name).dimmed()
        );
        return Ok(());
    }

    let default_id = store
        .default_calendar_for_new_events()?
        .map(|c| c.identifier);

    for calendar in &calendars {
        let marker = if default_id.as_deref() == Some(calendar.identifier.as_str()) {
            "*"
        } else {
            " "
        };
        let name = if calendar.title == config.calendar_name {
            calendar.to_string().bold().to_string()
        } else {
            calendar.to_string()
        };
        println!("{} {} {}", marker, name, calendar.color.to_string().dimmed());
    }

    Ok(())
}
