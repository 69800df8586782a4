//! Finding (or creating) the calendar new events are filed under.

use log::{debug, info, warn};

use crate::calendar::{CalendarHandle, EntityKind, RgbColor, Source};
use crate::error::CalKeepResult;
use crate::store::CalendarStore;

/// Resolves a calendar by name, creating it when it doesn't exist yet.
///
/// Holds no state of its own: every call looks the calendar up again, so a
/// calendar created by one call is found by the next.
pub struct CalendarResolver;

impl CalendarResolver {
    /// Return the calendar called `name`, creating it if needed.
    ///
    /// Lookup order:
    /// 1. a calendar whose identifier equals `name`
    /// 2. the first event calendar titled `name`
    /// 3. a new calendar on the default source, then on the first local source
    /// 4. the store's default calendar for new events
    ///
    /// Failing to save a new calendar is never an error; `Ok(None)` means the
    /// store has no usable calendar and should pick one itself. Errors come
    /// only from store queries (e.g. the store being unavailable).
    pub fn resolve<S: CalendarStore + ?Sized>(
        store: &mut S,
        name: &str,
        color: RgbColor,
    ) -> CalKeepResult<Option<CalendarHandle>> {
        if let Some(calendar) = store.find_calendar(name)? {
            debug!("Calendar '{}' found by identifier", name);
            return Ok(Some(calendar));
        }

        if let Some(calendar) = store
            .list_calendars(EntityKind::Event)?
            .into_iter()
            .find(|c| c.title == name)
        {
            debug!("Calendar '{}' found by title", name);
            return Ok(Some(calendar));
        }

        let default_calendar = store.default_calendar_for_new_events()?;
        let candidates = Self::candidate_sources(store, default_calendar.as_ref())?;

        for (attempt, source) in candidates.into_iter().enumerate() {
            let mut calendar = CalendarHandle::new(name, color, source);
            match store.save_calendar(&mut calendar, true) {
                Ok(()) => {
                    info!("Created calendar '{}' on source '{}'", name, calendar.source.title);
                    return Ok(Some(calendar));
                }
                Err(e) => warn!(
                    "Saving calendar '{}' on source '{}' failed (attempt {}): {}",
                    name,
                    calendar.source.title,
                    attempt + 1,
                    e
                ),
            }
        }

        match &default_calendar {
            Some(calendar) => warn!(
                "Falling back to default calendar '{}' for new events",
                calendar.title
            ),
            None => warn!("No calendar available for '{}'; leaving the choice to the store", name),
        }
        Ok(default_calendar)
    }

    /// Sources to try when creating a calendar: the default calendar's source,
    /// then the first local source. At most two, never the same one twice.
    fn candidate_sources<S: CalendarStore + ?Sized>(
        store: &S,
        default_calendar: Option<&CalendarHandle>,
    ) -> CalKeepResult<Vec<Source>> {
        let mut candidates: Vec<Source> = default_calendar
            .map(|c| c.source.clone())
            .into_iter()
            .collect();

        let first_local = store
            .list_sources()?
            .into_iter()
            .find(|s| s.kind.is_local());

        if let Some(local) = first_local {
            if !candidates.iter().any(|s| s.identifier == local.identifier) {
                candidates.push(local);
            }
        }

        Ok(candidates)
    }
}
