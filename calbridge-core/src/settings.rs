//! Bridge settings.

use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::accessor::{AccessorOptions, PlatformCapabilities, PROVIDER_API_LEVEL};
use crate::error::{CalendarError, CalendarResult};

static DEFAULT_STORE_PATH: &str = "~/.local/share/calbridge/store.json";
static DEFAULT_EDITOR: &str = "calbridge-editor";

fn default_api_level() -> u32 {
    PROVIDER_API_LEVEL
}

fn default_store_path() -> PathBuf {
    PathBuf::from(DEFAULT_STORE_PATH)
}

fn default_editor() -> String {
    DEFAULT_EDITOR.to_string()
}

/// Settings at ~/.config/calbridge/config.toml, overridable with
/// `CALBRIDGE_*` environment variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Platform API level; decides which accessor variant is used.
    #[serde(default = "default_api_level")]
    pub api_level: u32,

    /// IANA zone for local-day boundaries. Defaults to the host zone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,

    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,

    /// Executable launched for interactive creates.
    #[serde(default = "default_editor")]
    pub editor: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_calendar_id: Option<i64>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            api_level: default_api_level(),
            timezone: None,
            store_path: default_store_path(),
            editor: default_editor(),
            default_calendar_id: None,
        }
    }
}

impl Settings {
    pub fn config_path() -> CalendarResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| CalendarError::Config("Could not determine config directory".into()))?
            .join("calbridge");

        Ok(config_dir.join("config.toml"))
    }

    /// Load from the default location, creating it on first run.
    pub fn load() -> CalendarResult<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> CalendarResult<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "Creating default config");
            Self::create_default_config(path)?;
        }

        Config::builder()
            .add_source(File::from(path.to_path_buf()).required(false))
            .add_source(Environment::with_prefix("CALBRIDGE").try_parsing(true))
            .build()
            .map_err(|e| CalendarError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| CalendarError::Config(e.to_string()))
    }

    pub fn save_to(&self, path: &Path) -> CalendarResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| CalendarError::Config(e.to_string()))?;

        std::fs::write(path, content)
            .map_err(|e| CalendarError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }

    /// Create a config file with every option commented out.
    pub fn create_default_config(path: &Path) -> CalendarResult<()> {
        let contents = format!(
            "\
# calbridge configuration

# Platform API level. {PROVIDER_API_LEVEL} and above use the calendar provider store:
# api_level = {PROVIDER_API_LEVEL}

# Time zone for all-day detection (defaults to the system zone):
# timezone = \"Europe/Amsterdam\"

# Where events are stored:
# store_path = \"{DEFAULT_STORE_PATH}\"

# Editor launched for interactive creates:
# editor = \"{DEFAULT_EDITOR}\"

# Calendar new events are written to (defaults to the first active one):
# default_calendar_id = 1
"
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| CalendarError::Config(format!("Could not create config directory: {e}")))?;
        }

        std::fs::write(path, contents)
            .map_err(|e| CalendarError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }

    /// Store path with `~` expanded.
    pub fn store_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.store_path.to_string_lossy()).into_owned())
    }

    pub fn time_zone(&self) -> CalendarResult<Tz> {
        if let Some(name) = &self.timezone {
            return name
                .parse::<Tz>()
                .map_err(|e| CalendarError::Config(format!("Unknown timezone '{name}': {e}")));
        }

        match iana_time_zone::get_timezone() {
            Ok(name) => Ok(name.parse::<Tz>().unwrap_or_else(|_| {
                warn!(zone = %name, "Unrecognized system timezone, using UTC");
                Tz::UTC
            })),
            Err(e) => {
                warn!(error = %e, "Could not determine system timezone, using UTC");
                Ok(Tz::UTC)
            }
        }
    }

    pub fn capabilities(&self) -> PlatformCapabilities {
        PlatformCapabilities {
            api_level: self.api_level,
        }
    }

    pub fn accessor_options(&self) -> CalendarResult<AccessorOptions> {
        Ok(AccessorOptions {
            tz: self.time_zone()?,
            default_calendar_id: self.default_calendar_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_first_load_writes_commented_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let settings = Settings::load_from(&path).unwrap();

        assert!(path.exists());
        assert_eq!(settings.api_level, PROVIDER_API_LEVEL);
        assert_eq!(settings.editor, DEFAULT_EDITOR);
        assert_eq!(settings.default_calendar_id, None);
    }

    #[test]
    fn test_load_reads_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "api_level = 10\ntimezone = \"Europe/Amsterdam\"\ndefault_calendar_id = 3\n",
        )
        .unwrap();

        let settings = Settings::load_from(&path).unwrap();

        assert_eq!(settings.api_level, 10);
        assert_eq!(settings.time_zone().unwrap(), chrono_tz::Europe::Amsterdam);
        assert_eq!(settings.accessor_options().unwrap().default_calendar_id, Some(3));
        assert_eq!(settings.capabilities(), PlatformCapabilities { api_level: 10 });
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let settings = Settings {
            api_level: 21,
            timezone: Some("UTC".to_string()),
            store_path: PathBuf::from("/tmp/events.json"),
            editor: "my-editor".to_string(),
            default_calendar_id: Some(2),
        };

        settings.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path).unwrap(), settings);
    }

    #[test]
    fn test_unknown_timezone_is_config_error() {
        let settings = Settings {
            timezone: Some("Mars/Olympus".to_string()),
            ..Default::default()
        };
        assert!(matches!(settings.time_zone(), Err(CalendarError::Config(_))));
    }

    #[test]
    fn test_store_path_expands_tilde() {
        let settings = Settings::default();
        let expanded = settings.store_path();
        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.ends_with(".local/share/calbridge/store.json"));
    }
}
