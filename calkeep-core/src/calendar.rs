//! Calendars, the sources (accounts) that own them, and display colors.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CalKeepError, CalKeepResult};

/// What kind of items a calendar holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    #[default]
    Event,
    Reminder,
}

/// The account type behind a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Stored on this machine only, never synced.
    Local,
    Exchange,
    CalDav,
    MobileMe,
    Subscribed,
    Birthdays,
}

impl SourceKind {
    pub fn is_local(self) -> bool {
        self == SourceKind::Local
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            SourceKind::Local => "local",
            SourceKind::Exchange => "exchange",
            SourceKind::CalDav => "caldav",
            SourceKind::MobileMe => "mobileme",
            SourceKind::Subscribed => "subscribed",
            SourceKind::Birthdays => "birthdays",
        };
        f.write_str(name)
    }
}

/// An account or provider that owns calendars.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub identifier: String,
    pub title: String,
    pub kind: SourceKind,
}

impl Source {
    pub fn new(identifier: &str, title: &str, kind: SourceKind) -> Self {
        Source {
            identifier: identifier.to_string(),
            title: title.to_string(),
            kind,
        }
    }
}

/// A 24-bit display color, written as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RgbColor {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl RgbColor {
    pub const MAGENTA: RgbColor = RgbColor::new(0xff, 0x00, 0xff);

    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        RgbColor { red, green, blue }
    }
}

impl Default for RgbColor {
    fn default() -> Self {
        RgbColor::MAGENTA
    }
}

impl FromStr for RgbColor {
    type Err = CalKeepError;

    fn from_str(s: &str) -> CalKeepResult<Self> {
        let invalid = || CalKeepError::InvalidInput(format!("Invalid color '{}'. Expected #rrggbb", s));

        let hex = s.trim().strip_prefix('#').unwrap_or(s.trim());
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(invalid());
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|_| invalid())
        };

        Ok(RgbColor {
            red: channel(0..2)?,
            green: channel(2..4)?,
            blue: channel(4..6)?,
        })
    }
}

impl fmt::Display for RgbColor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.red, self.green, self.blue)
    }
}

impl TryFrom<String> for RgbColor {
    type Error = CalKeepError;

    fn try_from(value: String) -> CalKeepResult<Self> {
        value.parse()
    }
}

impl From<RgbColor> for String {
    fn from(color: RgbColor) -> Self {
        color.to_string()
    }
}

/// A writable calendar inside a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarHandle {
    /// Stable identifier, empty until the store has saved the calendar.
    pub identifier: String,
    pub title: String,
    pub color: RgbColor,
    pub source: Source,
    #[serde(default)]
    pub kind: EntityKind,
}

impl CalendarHandle {
    /// A calendar not yet known to any store.
    pub fn new(title: &str, color: RgbColor, source: Source) -> Self {
        CalendarHandle {
            identifier: String::new(),
            title: title.to_string(),
            color,
            source,
            kind: EntityKind::Event,
        }
    }

    pub fn is_saved(&self) -> bool {
        !self.identifier.is_empty()
    }
}

impl fmt::Display for CalendarHandle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({})", self.title, self.source.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_color_is_magenta() {
        assert_eq!(RgbColor::default().to_string(), "#ff00ff");
    }

    #[test]
    fn parse_color_with_and_without_hash() {
        assert_eq!("#1a2B3c".parse::<RgbColor>().unwrap(), RgbColor::new(0x1a, 0x2b, 0x3c));
        assert_eq!("00ff00".parse::<RgbColor>().unwrap(), RgbColor::new(0, 0xff, 0));
    }

    #[test]
    fn parse_color_rejects_bad_input() {
        assert!("#fff".parse::<RgbColor>().is_err());
        assert!("#gg0000".parse::<RgbColor>().is_err());
        assert!("#ff00ÿ".parse::<RgbColor>().is_err());
    }

    #[test]
    fn new_handle_is_unsaved() {
        let source = Source::new("local", "On My Computer", SourceKind::Local);
        let handle = CalendarHandle::new("Work", RgbColor::MAGENTA, source);
        assert!(!handle.is_saved());
        assert_eq!(handle.kind, EntityKind::Event);
        assert_eq!(handle.to_string(), "Work (local)");
    }
}
