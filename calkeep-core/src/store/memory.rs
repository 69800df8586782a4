//! In-process store with switchable failures.
//!
//! Used by tests and by embedders that want calkeep's composition logic
//! without any persistence behind it.

use std::collections::{HashMap, HashSet};

use log::debug;
use uuid::Uuid;

use crate::calendar::{CalendarHandle, EntityKind, Source, SourceKind};
use crate::error::{CalKeepError, CalKeepResult};
use crate::event::{EventRecord, Span};
use crate::store::{CalendarStore, ChangeHandler, notify};

#[derive(Default)]
pub struct MemoryStore {
    sources: Vec<Source>,
    calendars: Vec<CalendarHandle>,
    default_calendar: Option<String>,
    events: HashMap<String, EventRecord>,

    failing_source_kinds: HashSet<SourceKind>,
    fail_event_saves: bool,
    fail_removals: bool,
    unavailable: bool,

    calendar_save_attempts: Vec<CalendarHandle>,
    removals: Vec<(String, Span)>,
    subscribers: Vec<ChangeHandler>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, source: Source) -> Self {
        self.sources.push(source);
        self
    }

    /// Register an existing calendar and return its identifier.
    pub fn add_calendar(&mut self, mut calendar: CalendarHandle) -> String {
        if calendar.identifier.is_empty() {
            calendar.identifier = Uuid::new_v4().to_string();
        }
        let identifier = calendar.identifier.clone();
        self.calendars.push(calendar);
        identifier
    }

    pub fn set_default_calendar(&mut self, identifier: &str) {
        self.default_calendar = Some(identifier.to_string());
    }

    /// Place an event in the store directly, bypassing failure switches.
    pub fn insert_event(&mut self, mut event: EventRecord) -> String {
        if event.identifier.is_empty() {
            event.identifier = Uuid::new_v4().to_string();
        }
        let identifier = event.identifier.clone();
        self.events.insert(identifier.clone(), event);
        identifier
    }

    /// Reject every calendar save whose source is of `kind`.
    pub fn fail_calendar_saves_for(&mut self, kind: SourceKind) {
        self.failing_source_kinds.insert(kind);
    }

    pub fn fail_event_saves(&mut self, fail: bool) {
        self.fail_event_saves = fail;
    }

    pub fn fail_removals(&mut self, fail: bool) {
        self.fail_removals = fail;
    }

    /// Make every operation fail with `StoreUnavailable`.
    pub fn set_unavailable(&mut self, unavailable: bool) {
        self.unavailable = unavailable;
    }

    /// Every calendar passed to `save_calendar`, successful or not, in order.
    pub fn calendar_save_attempts(&self) -> &[CalendarHandle] {
        &self.calendar_save_attempts
    }

    /// Every `remove_event` call as (identifier, span), successful or not.
    pub fn removals(&self) -> &[(String, Span)] {
        &self.removals
    }

    pub fn calendars(&self) -> &[CalendarHandle] {
        &self.calendars
    }

    pub fn event(&self, identifier: &str) -> Option<&EventRecord> {
        self.events.get(identifier)
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    fn ensure_available(&self) -> CalKeepResult<()> {
        if self.unavailable {
            return Err(CalKeepError::StoreUnavailable(
                "access to the calendar store was denied".into(),
            ));
        }
        Ok(())
    }
}

impl CalendarStore for MemoryStore {
    fn find_calendar(&self, identifier: &str) -> CalKeepResult<Option<CalendarHandle>> {
        self.ensure_available()?;
        Ok(self
            .calendars
            .iter()
            .find(|c| c.identifier == identifier)
            .cloned())
    }

    fn list_calendars(&self, kind: EntityKind) -> CalKeepResult<Vec<CalendarHandle>> {
        self.ensure_available()?;
        Ok(self
            .calendars
            .iter()
            .filter(|c| c.kind == kind)
            .cloned()
            .collect())
    }

    fn default_calendar_for_new_events(&self) -> CalKeepResult<Option<CalendarHandle>> {
        self.ensure_available()?;
        let Some(identifier) = &self.default_calendar else {
            return Ok(None);
        };
        self.find_calendar(identifier)
    }

    fn list_sources(&self) -> CalKeepResult<Vec<Source>> {
        self.ensure_available()?;
        Ok(self.sources.clone())
    }

    fn save_calendar(&mut self, calendar: &mut CalendarHandle, _commit: bool) -> CalKeepResult<()> {
        self.calendar_save_attempts.push(calendar.clone());
        self.ensure_available()?;

        if self.failing_source_kinds.contains(&calendar.source.kind) {
            return Err(CalKeepError::PersistenceFailed(format!(
                "source '{}' does not allow new calendars",
                calendar.source.title
            )));
        }

        if calendar.identifier.is_empty() {
            calendar.identifier = Uuid::new_v4().to_string();
        }

        match self
            .calendars
            .iter_mut()
            .find(|c| c.identifier == calendar.identifier)
        {
            Some(existing) => *existing = calendar.clone(),
            None => self.calendars.push(calendar.clone()),
        }

        notify(&self.subscribers);
        Ok(())
    }

    fn save_event(&mut self, event: &mut EventRecord, _span: Span) -> CalKeepResult<()> {
        self.ensure_available()?;

        if self.fail_event_saves {
            return Err(CalKeepError::PersistenceFailed(
                "the store rejected the event".into(),
            ));
        }
        if event.start.is_none() {
            return Err(CalKeepError::PersistenceFailed(
                "event has no start date".into(),
            ));
        }

        let calendar = match &event.calendar {
            Some(identifier) => Some(identifier.clone()),
            None => self.default_calendar.clone(),
        };
        if let Some(identifier) = &calendar {
            if !self.calendars.iter().any(|c| &c.identifier == identifier) {
                return Err(CalKeepError::PersistenceFailed(format!(
                    "calendar '{}' does not exist",
                    identifier
                )));
            }
        }

        let mut stored = event.clone();
        stored.calendar = calendar;
        if stored.identifier.is_empty() {
            stored.identifier = Uuid::new_v4().to_string();
        }
        debug!("Stored event '{}' in memory", stored.identifier);

        *event = stored.clone();
        self.events.insert(stored.identifier.clone(), stored);

        notify(&self.subscribers);
        Ok(())
    }

    fn find_event(&self, identifier: &str) -> CalKeepResult<Option<EventRecord>> {
        self.ensure_available()?;
        Ok(self.events.get(identifier).cloned())
    }

    fn remove_event(&mut self, event: &EventRecord, span: Span) -> CalKeepResult<()> {
        self.removals.push((event.identifier.clone(), span));
        self.ensure_available()?;

        if self.fail_removals {
            return Err(CalKeepError::PersistenceFailed(
                "the store rejected the removal".into(),
            ));
        }

        self.events
            .remove(&event.identifier)
            .ok_or_else(|| CalKeepError::NotFound(event.identifier.clone()))?;

        notify(&self.subscribers);
        Ok(())
    }

    fn subscribe(&mut self, on_change: ChangeHandler) {
        self.subscribers.push(on_change);
    }
}
