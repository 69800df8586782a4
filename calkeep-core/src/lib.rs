//! Core library for calkeep.
//!
//! calkeep files events into a dedicated, named calendar of an abstract
//! calendar store:
//! - [`resolver`] finds or creates that calendar, falling back to a local
//!   source and then to the store's default calendar
//! - [`scheduler`] composes requests into normalized [`EventRecord`]s and
//!   saves or removes them
//! - [`store`] defines the [`CalendarStore`] contract plus an in-memory and a
//!   directory-backed (`.ics` files) implementation

pub mod alarm;
pub mod calendar;
pub mod config;
pub mod error;
pub mod event;
pub mod ics;
pub mod recurrence;
pub mod resolver;
pub mod scheduler;
pub mod store;

pub use alarm::{Alarm, AlarmSpec};
pub use calendar::{CalendarHandle, EntityKind, RgbColor, Source, SourceKind};
pub use config::SchedulerConfig;
pub use error::{CalKeepError, CalKeepResult};
pub use event::{EventRecord, EventRequest, Span, StructuredLocation};
pub use recurrence::{Frequency, RecurrenceRule, RecurrenceSpec};
pub use resolver::CalendarResolver;
pub use scheduler::EventScheduler;
pub use store::{CalendarStore, ChangeHandler, DirStore, MemoryStore};
