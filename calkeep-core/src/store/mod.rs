//! The calendar store contract and the stores shipped with calkeep.
//!
//! A store is the persistence/sync provider that actually keeps calendars and
//! events. The resolver and scheduler only talk to it through
//! [`CalendarStore`], so they work the same against the in-memory store used
//! in tests and the directory-backed store used by the CLI.

mod dir;
mod memory;

pub use dir::DirStore;
pub use memory::MemoryStore;

use crate::calendar::{CalendarHandle, EntityKind, Source};
use crate::error::CalKeepResult;
use crate::event::{EventRecord, Span};

/// Callback fired once per batch of changes committed to a store.
pub type ChangeHandler = Box<dyn Fn() + Send>;

/// Operations calkeep needs from a calendar store.
///
/// Query methods fail only when the store itself cannot be reached
/// ([`CalKeepError::StoreUnavailable`](crate::error::CalKeepError::StoreUnavailable)).
/// Mutations report rejections as
/// [`CalKeepError::PersistenceFailed`](crate::error::CalKeepError::PersistenceFailed).
pub trait CalendarStore {
    fn find_calendar(&self, identifier: &str) -> CalKeepResult<Option<CalendarHandle>>;

    fn list_calendars(&self, kind: EntityKind) -> CalKeepResult<Vec<CalendarHandle>>;

    fn default_calendar_for_new_events(&self) -> CalKeepResult<Option<CalendarHandle>>;

    fn list_sources(&self) -> CalKeepResult<Vec<Source>>;

    /// Persist a calendar. On success an unsaved handle gets its identifier.
    fn save_calendar(&mut self, calendar: &mut CalendarHandle, commit: bool) -> CalKeepResult<()>;

    /// Persist an event. On success `event.identifier` is set.
    fn save_event(&mut self, event: &mut EventRecord, span: Span) -> CalKeepResult<()>;

    fn find_event(&self, identifier: &str) -> CalKeepResult<Option<EventRecord>>;

    fn remove_event(&mut self, event: &EventRecord, span: Span) -> CalKeepResult<()>;

    fn subscribe(&mut self, on_change: ChangeHandler);
}

/// Invoke every registered handler once.
pub(crate) fn notify(handlers: &[ChangeHandler]) {
    for handler in handlers {
        handler();
    }
}
