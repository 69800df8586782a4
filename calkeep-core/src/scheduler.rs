//! Composing event requests into records and persisting them.

use std::collections::HashSet;

use chrono::Duration;
use log::{debug, info};

use crate::config::SchedulerConfig;
use crate::error::CalKeepResult;
use crate::event::{EventRecord, EventRequest, Span};
use crate::recurrence::RecurrenceRule;
use crate::resolver::CalendarResolver;
use crate::store::{CalendarStore, ChangeHandler};

/// Length in seconds given to events that specify neither an end nor a recurrence end.
pub const DEFAULT_EVENT_SECONDS: i64 = 3600;

/// Adds and removes events in the configured calendar of a store.
pub struct EventScheduler<S: CalendarStore> {
    store: S,
    config: SchedulerConfig,
}

impl<S: CalendarStore> EventScheduler<S> {
    pub fn new(store: S, config: SchedulerConfig) -> Self {
        EventScheduler { store, config }
    }

    /// Like [`new`](Self::new), registering `on_change` with the store first.
    pub fn with_change_handler(mut store: S, config: SchedulerConfig, on_change: ChangeHandler) -> Self {
        store.subscribe(on_change);
        Self::new(store, config)
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Create an event and return the identifier the store gave it.
    ///
    /// The calendar is resolved (and created if needed) first. Failing to
    /// create it is not an error, but an unavailable store or a rejected
    /// event save is.
    pub fn add_event(&mut self, request: EventRequest) -> CalKeepResult<String> {
        let mut record = self.compose(&request);

        let calendar = CalendarResolver::resolve(
            &mut self.store,
            &self.config.calendar_name,
            self.config.color,
        )?;
        record.calendar = calendar.map(|c| c.identifier);

        self.store.save_event(&mut record, Span::ThisEvent)?;
        info!(
            "Saved event '{}' as {}",
            record.display_title(),
            record.identifier
        );
        Ok(record.identifier)
    }

    /// [`add_event`](Self::add_event), handing the outcome to `on_complete`.
    pub fn add_event_then<F>(&mut self, request: EventRequest, on_complete: F)
    where
        F: FnOnce(CalKeepResult<String>),
    {
        on_complete(self.add_event(request));
    }

    /// Build the record for `request` without touching the store.
    ///
    /// The calendar is left unset.
    pub fn compose(&self, request: &EventRequest) -> EventRecord {
        let time_zone = request
            .time_zone
            .unwrap_or_else(|| self.config.effective_time_zone());

        let mut record = EventRecord::new(time_zone);
        record.title = request.title.clone();
        record.start = request.start;
        let recurrence_end = request.recurrence_end.or(request.recurrence.end);
        record.end = match (request.end, recurrence_end) {
            (Some(end), _) => Some(end),
            (None, None) => request
                .start
                .map(|start| start + Duration::seconds(DEFAULT_EVENT_SECONDS)),
            (None, Some(_)) => None,
        };
        record.all_day = request.all_day.unwrap_or(false);
        record.notes = request.notes.clone();
        record.location = request.location.clone();

        if request.recurrence.is_recurring() {
            record.recurrence = Some(RecurrenceRule {
                frequency: request.recurrence.frequency,
                interval: 1,
                end: recurrence_end.or(request.end),
            });
        }

        record.alarms = request
            .alarms
            .iter()
            .filter_map(|spec| spec.to_alarm())
            .collect();

        debug!(
            "Composed '{}': start={:?} end={:?} all_day={} zone={} alarms={} rule={:?}",
            record.display_title(),
            record.start,
            record.end,
            record.all_day,
            record.time_zone,
            record.alarms.len(),
            record.recurrence.as_ref().and_then(RecurrenceRule::to_rrule)
        );
        record
    }

    /// Remove every listed event that exists, including future occurrences.
    ///
    /// Missing and empty identifiers are ignored, as are duplicates. Failures
    /// are logged and skipped; nothing is reported back.
    pub fn remove_events<I, T>(&mut self, identifiers: I)
    where
        I: IntoIterator<Item = Option<T>>,
        T: AsRef<str>,
    {
        let unique: HashSet<String> = identifiers
            .into_iter()
            .flatten()
            .map(|id| id.as_ref().to_string())
            .filter(|id| !id.is_empty())
            .collect();

        for identifier in unique {
            let event = match self.store.find_event(&identifier) {
                Ok(Some(event)) => event,
                Ok(None) => {
                    debug!("Event {} not found, nothing to remove", identifier);
                    continue;
                }
                Err(e) => {
                    debug!("Looking up event {} failed: {}", identifier, e);
                    continue;
                }
            };

            match self.store.remove_event(&event, Span::FutureEvents) {
                Ok(()) => info!("Removed event {}", identifier),
                Err(e) => debug!("Removing event {} failed: {}", identifier, e),
            }
        }
    }
}
