//! Scheduler configuration.

use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use config::{Config, Environment, File, FileFormat, Map};
use serde::{Deserialize, Serialize};

use crate::calendar::RgbColor;
use crate::error::{CalKeepError, CalKeepResult};

pub const DEFAULT_CALENDAR_NAME: &str = "MyCalendar";
const DEFAULT_STORE_DIR: &str = "~/calkeep";

/// Settings for an [`EventScheduler`](crate::scheduler::EventScheduler).
///
/// Loaded from `~/.config/calkeep/config.toml` (all keys optional), then
/// overridden by `CALKEEP_*` variables (`CALKEEP_CALENDAR_NAME`,
/// `CALKEEP_TIME_ZONE`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Title of the calendar events are filed under.
    pub calendar_name: String,
    /// IANA zone for new events; `None` follows the host.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<Tz>,
    /// Color given to the calendar if it has to be created.
    pub color: RgbColor,
    /// Root of the [`DirStore`](crate::store::DirStore); `~` is expanded.
    pub store_dir: PathBuf,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            calendar_name: DEFAULT_CALENDAR_NAME.to_string(),
            time_zone: None,
            color: RgbColor::MAGENTA,
            store_dir: PathBuf::from(DEFAULT_STORE_DIR),
        }
    }
}

impl SchedulerConfig {
    pub fn config_path() -> CalKeepResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| CalKeepError::Config("Could not determine config directory".into()))?
            .join("calkeep");

        Ok(config_dir.join("config.toml"))
    }

    pub fn load() -> CalKeepResult<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load from a TOML file (missing is fine) plus `CALKEEP_*` variables.
    pub fn load_from(path: &Path) -> CalKeepResult<Self> {
        Self::load_layers(path, None)
    }

    /// `env` replaces the process environment when given.
    fn load_layers(path: &Path, env: Option<Map<String, String>>) -> CalKeepResult<Self> {
        Config::builder()
            .add_source(File::new(&path.to_string_lossy(), FileFormat::Toml).required(false))
            .add_source(Environment::with_prefix("CALKEEP").source(env))
            .build()
            .map_err(|e| CalKeepError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| CalKeepError::Config(e.to_string()))
    }

    pub fn store_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.store_dir.to_string_lossy()).into_owned())
    }

    /// The configured zone, or the host's.
    pub fn effective_time_zone(&self) -> Tz {
        self.time_zone.unwrap_or_else(host_time_zone)
    }
}

/// The host's current zone, UTC when it cannot be determined.
pub fn host_time_zone() -> Tz {
    iana_time_zone::get_timezone()
        .ok()
        .and_then(|name| name.parse::<Tz>().ok())
        .unwrap_or(Tz::UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_config_default() {
        let config = SchedulerConfig::default();
        assert_eq!(config.calendar_name, "MyCalendar");
        assert_eq!(config.time_zone, None);
        assert_eq!(config.color, RgbColor::MAGENTA);
        assert_eq!(config.store_dir, PathBuf::from("~/calkeep"));
    }

    #[test]
    fn test_store_path_expands_tilde() {
        let config = SchedulerConfig {
            store_dir: PathBuf::from("/tmp/calkeep"),
            ..Default::default()
        };
        assert_eq!(config.store_path(), PathBuf::from("/tmp/calkeep"));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let config = SchedulerConfig::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.calendar_name, DEFAULT_CALENDAR_NAME);
    }

    #[test]
    fn test_load_from_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "calendar_name = \"Team\"\ntime_zone = \"Asia/Tokyo\"\ncolor = \"#00aa00\"\nstore_dir = \"/srv/cal\"\n",
        )
        .unwrap();

        let config = SchedulerConfig::load_from(&path).unwrap();

        assert_eq!(config.calendar_name, "Team");
        assert_eq!(config.time_zone, Some(chrono_tz::Asia::Tokyo));
        assert_eq!(config.effective_time_zone(), chrono_tz::Asia::Tokyo);
        assert_eq!(config.color, RgbColor::new(0, 0xaa, 0));
        assert_eq!(config.store_path(), PathBuf::from("/srv/cal"));
    }

    #[test]
    fn test_environment_overrides_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "calendar_name = \"Team\"\ncolor = \"#00aa00\"\n").unwrap();
        let env = Map::from([
            ("CALKEEP_CALENDAR_NAME".to_string(), "Family".to_string()),
            ("CALKEEP_TIME_ZONE".to_string(), "Europe/Lisbon".to_string()),
            ("OTHER_CALENDAR_NAME".to_string(), "Ignored".to_string()),
        ]);

        let config = SchedulerConfig::load_layers(&path, Some(env)).unwrap();

        assert_eq!(config.calendar_name, "Family");
        assert_eq!(config.time_zone, Some(chrono_tz::Europe::Lisbon));
        assert_eq!(config.color, RgbColor::new(0, 0xaa, 0));
    }

    #[test]
    fn test_load_rejects_unknown_zone() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "time_zone = \"Mars/Olympus_Mons\"\n").unwrap();

        assert!(matches!(
            SchedulerConfig::load_from(&path),
            Err(CalKeepError::Config(_))
        ));
    }
}
