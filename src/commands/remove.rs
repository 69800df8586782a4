use anyhow::Result;
use calkeep_core::config::SchedulerConfig;
use calkeep_core::scheduler::EventScheduler;
use calkeep_core::store::{CalendarStore, DirStore};
use owo_colors::OwoColorize;

/// Best-effort removal: unknown or failing identifiers are skipped.
pub fn run(store: DirStore, config: SchedulerConfig, ids: Vec<String>) -> Result<()> {
    if ids.is_empty() {
        println!("{}", "Nothing to remove".dimmed());
        return Ok(());
    }

    let mut scheduler = EventScheduler::new(store, config);
    scheduler.remove_events(ids.iter().map(Some));

    for id in &ids {
        // find_event errors count as gone; removal already logged them
        let still_there = matches!(scheduler.store().find_event(id), Ok(Some(_)));
        if still_there {
            println!("{} {}", "!".yellow(), id);
        } else {
            println!("{} {}", "-".red(), id.dimmed());
        }
    }

    Ok(())
}
