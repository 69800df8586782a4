//! Directory-backed store.
//!
//! Layout under the store root:
//!
//! ```text
//! sources.toml                    accounts calendars can belong to
//! <calendar-slug>/
//!     .calkeep/calendar.toml      identifier, title, color, source, default flag
//!     <event-identifier>.ics      one file per event (series stored once)
//! ```

use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::calendar::{CalendarHandle, EntityKind, RgbColor, Source, SourceKind};
use crate::error::{CalKeepError, CalKeepResult};
use crate::event::{EventRecord, Span};
use crate::ics::{generate_ics, parse_event};
use crate::store::{CalendarStore, ChangeHandler, notify};

const SOURCES_FILE: &str = "sources.toml";
const CALENDAR_META_DIR: &str = ".calkeep";
const CALENDAR_FILE: &str = "calendar.toml";
/// Title of the calendar created when an event arrives before any calendar exists.
const FALLBACK_CALENDAR_TITLE: &str = "Calendar";

#[derive(Serialize, Deserialize, Default)]
struct SourcesFile {
    #[serde(default)]
    sources: Vec<Source>,
}

/// Contents of `<calendar>/.calkeep/calendar.toml`
#[derive(Serialize, Deserialize)]
struct CalendarFile {
    identifier: String,
    title: String,
    color: RgbColor,
    source: String,
    #[serde(default)]
    kind: EntityKind,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    default: bool,
}

/// A calendar directory found on disk.
struct StoredCalendar {
    path: PathBuf,
    handle: CalendarHandle,
    default: bool,
}

pub struct DirStore {
    root: PathBuf,
    subscribers: Vec<ChangeHandler>,
}

impl DirStore {
    /// Open an existing store directory.
    pub fn open(root: impl Into<PathBuf>) -> CalKeepResult<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(CalKeepError::StoreUnavailable(format!(
                "store directory {} does not exist",
                root.display()
            )));
        }
        Ok(DirStore {
            root,
            subscribers: Vec::new(),
        })
    }

    /// Open a store directory, creating it first if needed.
    pub fn create(root: impl Into<PathBuf>) -> CalKeepResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Self::open(root)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Replace the source list in `sources.toml`.
    pub fn write_sources(&self, sources: &[Source]) -> CalKeepResult<()> {
        let file = SourcesFile {
            sources: sources.to_vec(),
        };
        let content =
            toml::to_string_pretty(&file).map_err(|e| CalKeepError::Serialization(e.to_string()))?;
        std::fs::write(self.root.join(SOURCES_FILE), content)?;
        Ok(())
    }

    fn ensure_available(&self) -> CalKeepResult<()> {
        if !self.root.is_dir() {
            return Err(CalKeepError::StoreUnavailable(format!(
                "store directory {} is gone",
                self.root.display()
            )));
        }
        Ok(())
    }

    fn sources(&self) -> CalKeepResult<Vec<Source>> {
        let path = self.root.join(SOURCES_FILE);
        if !path.exists() {
            return Ok(vec![Source::new("local", "On My Computer", SourceKind::Local)]);
        }
        let content = std::fs::read_to_string(&path)?;
        let file: SourcesFile = toml::from_str(&content)
            .map_err(|e| CalKeepError::Config(format!("{}: {}", path.display(), e)))?;
        Ok(file.sources)
    }

    /// Scan the root for calendar directories, sorted by directory name.
    fn stored_calendars(&self) -> CalKeepResult<Vec<StoredCalendar>> {
        self.ensure_available()?;
        let sources = self.sources()?;

        let mut calendars: Vec<StoredCalendar> = std::fs::read_dir(&self.root)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.join(CALENDAR_META_DIR).join(CALENDAR_FILE).exists())
            .filter_map(|path| match Self::load_calendar(&path, &sources) {
                Ok(calendar) => Some(calendar),
                Err(e) => {
                    debug!("Skipping calendar at {}: {}", path.display(), e);
                    None
                }
            })
            .collect();

        calendars.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(calendars)
    }

    fn load_calendar(path: &Path, sources: &[Source]) -> CalKeepResult<StoredCalendar> {
        let content = std::fs::read_to_string(path.join(CALENDAR_META_DIR).join(CALENDAR_FILE))?;
        let file: CalendarFile =
            toml::from_str(&content).map_err(|e| CalKeepError::Config(e.to_string()))?;

        let source = sources
            .iter()
            .find(|s| s.identifier == file.source)
            .cloned()
            .ok_or_else(|| CalKeepError::Config(format!("unknown source '{}'", file.source)))?;

        Ok(StoredCalendar {
            path: path.to_path_buf(),
            handle: CalendarHandle {
                identifier: file.identifier,
                title: file.title,
                color: file.color,
                source,
                kind: file.kind,
            },
            default: file.default,
        })
    }

    fn write_calendar(path: &Path, calendar: &CalendarHandle, default: bool) -> CalKeepResult<()> {
        let meta_dir = path.join(CALENDAR_META_DIR);
        std::fs::create_dir_all(&meta_dir)?;

        let file = CalendarFile {
            identifier: calendar.identifier.clone(),
            title: calendar.title.clone(),
            color: calendar.color,
            source: calendar.source.identifier.clone(),
            kind: calendar.kind,
            default,
        };
        let content =
            toml::to_string_pretty(&file).map_err(|e| CalKeepError::Serialization(e.to_string()))?;
        std::fs::write(meta_dir.join(CALENDAR_FILE), content)?;
        Ok(())
    }

    /// Generate a directory name that doesn't conflict with existing calendars.
    /// If the base slug exists, tries slug-2, slug-3, etc.
    fn unique_dir_for(&self, title: &str) -> CalKeepResult<PathBuf> {
        let base = match slug::slugify(title) {
            s if s.is_empty() => "calendar".to_string(),
            s => s,
        };

        if !self.root.join(&base).exists() {
            return Ok(self.root.join(base));
        }

        for n in 2..=100 {
            let suffixed = self.root.join(format!("{}-{}", base, n));
            if !suffixed.exists() {
                return Ok(suffixed);
            }
        }

        Err(CalKeepError::PersistenceFailed(format!(
            "Too many calendar name collisions for '{}'",
            base
        )))
    }

    /// The calendar an event without an explicit calendar is filed under,
    /// created on first use.
    fn calendar_for_uncalendared_event(&mut self) -> CalKeepResult<StoredCalendar> {
        let calendars = self.stored_calendars()?;
        if let Some(default) = calendars.into_iter().find(|c| c.default) {
            return Ok(default);
        }

        let source = self
            .sources()?
            .into_iter()
            .next()
            .ok_or_else(|| CalKeepError::PersistenceFailed("store has no sources".into()))?;
        let mut calendar = CalendarHandle::new(FALLBACK_CALENDAR_TITLE, RgbColor::default(), source);
        self.save_calendar(&mut calendar, true)?;

        self.stored_calendars()?
            .into_iter()
            .find(|c| c.handle.identifier == calendar.identifier)
            .ok_or_else(|| CalKeepError::PersistenceFailed("default calendar vanished".into()))
    }

    /// Locate an event file; identifiers with path syntax never match.
    fn event_path(&self, identifier: &str) -> CalKeepResult<Option<(PathBuf, CalendarHandle)>> {
        if identifier.is_empty() || identifier.contains(['/', '\\']) || identifier.starts_with('.') {
            return Ok(None);
        }

        Ok(self.stored_calendars()?.into_iter().find_map(|c| {
            let path = c.path.join(format!("{}.ics", identifier));
            path.exists().then_some((path, c.handle))
        }))
    }
}

impl CalendarStore for DirStore {
    fn find_calendar(&self, identifier: &str) -> CalKeepResult<Option<CalendarHandle>> {
        Ok(self
            .stored_calendars()?
            .into_iter()
            .map(|c| c.handle)
            .find(|c| c.identifier == identifier))
    }

    fn list_calendars(&self, kind: EntityKind) -> CalKeepResult<Vec<CalendarHandle>> {
        Ok(self
            .stored_calendars()?
            .into_iter()
            .map(|c| c.handle)
            .filter(|c| c.kind == kind)
            .collect())
    }

    fn default_calendar_for_new_events(&self) -> CalKeepResult<Option<CalendarHandle>> {
        Ok(self
            .stored_calendars()?
            .into_iter()
            .find(|c| c.default)
            .map(|c| c.handle))
    }

    fn list_sources(&self) -> CalKeepResult<Vec<Source>> {
        self.ensure_available()?;
        self.sources()
    }

    fn save_calendar(&mut self, calendar: &mut CalendarHandle, commit: bool) -> CalKeepResult<()> {
        self.ensure_available()?;

        let sources = self.sources()?;
        let Some(source) = sources
            .iter()
            .find(|s| s.identifier == calendar.source.identifier)
        else {
            return Err(CalKeepError::PersistenceFailed(format!(
                "source '{}' is not part of this store",
                calendar.source.identifier
            )));
        };
        if matches!(source.kind, SourceKind::Subscribed | SourceKind::Birthdays) {
            return Err(CalKeepError::PersistenceFailed(format!(
                "source '{}' is read-only",
                source.title
            )));
        }

        if !commit {
            return Ok(());
        }

        let existing = self.stored_calendars()?;
        let (path, default) = match existing
            .iter()
            .find(|c| c.handle.identifier == calendar.identifier && calendar.is_saved())
        {
            Some(stored) => (stored.path.clone(), stored.default),
            None => {
                calendar.identifier = Uuid::new_v4().to_string();
                let no_default_yet = !existing.iter().any(|c| c.default);
                (self.unique_dir_for(&calendar.title)?, no_default_yet)
            }
        };

        Self::write_calendar(&path, calendar, default)?;
        info!("Saved calendar '{}' at {}", calendar.title, path.display());

        notify(&self.subscribers);
        Ok(())
    }

    fn save_event(&mut self, event: &mut EventRecord, _span: Span) -> CalKeepResult<()> {
        self.ensure_available()?;

        if event.start.is_none() {
            return Err(CalKeepError::PersistenceFailed(
                "event has no start date".into(),
            ));
        }

        let calendar = match &event.calendar {
            Some(identifier) => self
                .stored_calendars()?
                .into_iter()
                .find(|c| &c.handle.identifier == identifier)
                .ok_or_else(|| {
                    CalKeepError::PersistenceFailed(format!(
                        "calendar '{}' does not exist",
                        identifier
                    ))
                })?,
            None => self.calendar_for_uncalendared_event()?,
        };

        let mut stored = event.clone();
        stored.calendar = Some(calendar.handle.identifier.clone());
        let previous = if stored.identifier.is_empty() {
            stored.identifier = Uuid::new_v4().to_string();
            None
        } else {
            self.event_path(&stored.identifier)?.map(|(old_path, _)| old_path)
        };

        let ics = generate_ics(&stored)?;
        let path = calendar.path.join(format!("{}.ics", stored.identifier));
        std::fs::write(&path, ics)?;
        debug!("Wrote event to {}", path.display());

        // the event moved to another calendar
        if let Some(old_path) = previous.filter(|old| *old != path) {
            std::fs::remove_file(&old_path)?;
            debug!("Removed previous copy at {}", old_path.display());
        }

        *event = stored;
        notify(&self.subscribers);
        Ok(())
    }

    fn find_event(&self, identifier: &str) -> CalKeepResult<Option<EventRecord>> {
        let Some((path, calendar)) = self.event_path(identifier)? else {
            return Ok(None);
        };

        let content = std::fs::read_to_string(&path)?;
        let mut event = parse_event(&content, chrono_tz::UTC)?;
        event.calendar = Some(calendar.identifier);
        Ok(Some(event))
    }

    fn remove_event(&mut self, event: &EventRecord, span: Span) -> CalKeepResult<()> {
        let (path, _) = self
            .event_path(&event.identifier)?
            .ok_or_else(|| CalKeepError::NotFound(event.identifier.clone()))?;

        if event.is_recurring() && span == Span::ThisEvent {
            return Err(CalKeepError::PersistenceFailed(
                "removing a single occurrence of a series is not supported".into(),
            ));
        }

        std::fs::remove_file(&path)?;
        debug!("Removed {}", path.display());

        notify(&self.subscribers);
        Ok(())
    }

    fn subscribe(&mut self, on_change: ChangeHandler) {
        self.subscribers.push(on_change);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::Alarm;
    use crate::event::StructuredLocation;
    use crate::recurrence::{Frequency, RecurrenceRule};
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    fn make_event() -> EventRecord {
        let mut event = EventRecord::new(chrono_tz::Europe::Berlin);
        event.title = Some("Dentist".to_string());
        event.start = Some(Utc.with_ymd_and_hms(2024, 5, 2, 8, 0, 0).unwrap());
        event.end = Some(Utc.with_ymd_and_hms(2024, 5, 2, 9, 0, 0).unwrap());
        event
    }

    #[test]
    fn open_missing_directory_is_unavailable() {
        let dir = tempdir().unwrap();
        let result = DirStore::open(dir.path().join("nope"));
        assert!(matches!(result, Err(CalKeepError::StoreUnavailable(_))));
    }

    #[test]
    fn default_sources_contain_one_local_source() {
        let dir = tempdir().unwrap();
        let store = DirStore::open(dir.path()).unwrap();

        let sources = store.list_sources().unwrap();
        assert_eq!(sources.len(), 1);
        assert!(sources[0].kind.is_local());
    }

    #[test]
    fn first_saved_calendar_becomes_default() {
        let dir = tempdir().unwrap();
        let mut store = DirStore::open(dir.path()).unwrap();
        let source = store.list_sources().unwrap().remove(0);

        let mut first = CalendarHandle::new("Work Stuff", RgbColor::MAGENTA, source.clone());
        let mut second = CalendarHandle::new("Work Stuff", RgbColor::new(0, 0, 255), source);
        store.save_calendar(&mut first, true).unwrap();
        store.save_calendar(&mut second, true).unwrap();

        assert!(dir.path().join("work-stuff/.calkeep/calendar.toml").exists());
        assert!(dir.path().join("work-stuff-2/.calkeep/calendar.toml").exists());
        assert_eq!(
            store.default_calendar_for_new_events().unwrap(),
            Some(first.clone())
        );
        assert_eq!(store.find_calendar(&second.identifier).unwrap(), Some(second));
    }

    #[test]
    fn read_only_sources_reject_new_calendars() {
        let dir = tempdir().unwrap();
        let mut store = DirStore::open(dir.path()).unwrap();
        let holidays = Source::new("holidays", "Holidays", SourceKind::Subscribed);
        store.write_sources(&[holidays.clone()]).unwrap();

        let mut calendar = CalendarHandle::new("Mine", RgbColor::MAGENTA, holidays);
        let result = store.save_calendar(&mut calendar, true);

        assert!(matches!(result, Err(CalKeepError::PersistenceFailed(_))));
        assert!(store.list_calendars(EntityKind::Event).unwrap().is_empty());
    }

    #[test]
    fn uncommitted_calendar_save_writes_nothing() {
        let dir = tempdir().unwrap();
        let mut store = DirStore::open(dir.path()).unwrap();
        let source = store.list_sources().unwrap().remove(0);

        let mut calendar = CalendarHandle::new("Draft", RgbColor::MAGENTA, source);
        store.save_calendar(&mut calendar, false).unwrap();

        assert!(store.list_calendars(EntityKind::Event).unwrap().is_empty());
    }

    #[test]
    fn event_round_trips_through_disk() {
        let dir = tempdir().unwrap();
        let mut store = DirStore::open(dir.path()).unwrap();

        let mut event = make_event();
        event.alarms = vec![Alarm::Relative {
            offset_seconds: -300,
        }];
        event.location = Some(StructuredLocation::titled("Clinic"));
        event.recurrence = Some(RecurrenceRule {
            frequency: Frequency::Yearly,
            interval: 1,
            end: None,
        });
        store.save_event(&mut event, Span::ThisEvent).unwrap();

        assert!(!event.identifier.is_empty());
        let found = store.find_event(&event.identifier).unwrap().expect("stored");
        assert_eq!(found, event);
    }

    #[test]
    fn uncalendared_event_creates_default_calendar() {
        let dir = tempdir().unwrap();
        let mut store = DirStore::open(dir.path()).unwrap();

        let mut event = make_event();
        store.save_event(&mut event, Span::ThisEvent).unwrap();

        let default = store
            .default_calendar_for_new_events()
            .unwrap()
            .expect("created on demand");
        assert_eq!(default.title, "Calendar");
        assert_eq!(event.calendar, Some(default.identifier));
    }

    #[test]
    fn all_day_flag_survives_disk() {
        let dir = tempdir().unwrap();
        let mut store = DirStore::open(dir.path()).unwrap();

        let mut event = make_event();
        event.all_day = true;
        store.save_event(&mut event, Span::ThisEvent).unwrap();

        let found = store.find_event(&event.identifier).unwrap().expect("stored");
        assert!(found.all_day);
        assert_eq!(found.time_zone, chrono_tz::Europe::Berlin);
    }

    #[test]
    fn resave_into_other_calendar_moves_the_file() {
        let dir = tempdir().unwrap();
        let mut store = DirStore::open(dir.path()).unwrap();
        let local = Source::new("local", "On My Computer", SourceKind::Local);
        let mut home = CalendarHandle::new("Home", RgbColor::MAGENTA, local.clone());
        let mut work = CalendarHandle::new("Work", RgbColor::MAGENTA, local);
        store.save_calendar(&mut home, true).unwrap();
        store.save_calendar(&mut work, true).unwrap();

        let mut event = make_event();
        event.calendar = Some(home.identifier.clone());
        store.save_event(&mut event, Span::ThisEvent).unwrap();
        let file = format!("{}.ics", event.identifier);

        event.calendar = Some(work.identifier.clone());
        event.title = Some("Dentist (moved)".to_string());
        store.save_event(&mut event, Span::ThisEvent).unwrap();

        assert!(!dir.path().join("home").join(&file).exists());
        assert!(dir.path().join("work").join(&file).exists());
        let found = store.find_event(&event.identifier).unwrap().expect("stored");
        assert_eq!(found.title.as_deref(), Some("Dentist (moved)"));
        assert_eq!(found.calendar, Some(work.identifier));
    }

    #[test]
    fn resave_in_place_keeps_the_file() {
        let dir = tempdir().unwrap();
        let mut store = DirStore::open(dir.path()).unwrap();

        let mut event = make_event();
        store.save_event(&mut event, Span::ThisEvent).unwrap();
        event.notes = Some("Bring card".to_string());
        store.save_event(&mut event, Span::ThisEvent).unwrap();

        let found = store.find_event(&event.identifier).unwrap().expect("still stored");
        assert_eq!(found.notes.as_deref(), Some("Bring card"));
    }

    #[test]
    fn single_occurrence_removal_of_series_is_rejected() {
        let dir = tempdir().unwrap();
        let mut store = DirStore::open(dir.path()).unwrap();

        let mut event = make_event();
        event.recurrence = Some(RecurrenceRule {
            frequency: Frequency::Daily,
            interval: 1,
            end: None,
        });
        store.save_event(&mut event, Span::ThisEvent).unwrap();

        assert!(store.remove_event(&event, Span::ThisEvent).is_err());
        store.remove_event(&event, Span::FutureEvents).unwrap();
        assert_eq!(store.find_event(&event.identifier).unwrap(), None);
    }

    #[test]
    fn path_like_identifiers_never_match() {
        let dir = tempdir().unwrap();
        let store = DirStore::open(dir.path()).unwrap();
        assert_eq!(store.find_event("../sources").unwrap(), None);
        assert_eq!(store.find_event("").unwrap(), None);
    }
}
