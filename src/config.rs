use chrono::Weekday;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_ROOT: &str = "GTD";
pub const DEFAULT_TICKLER_HOUR: u32 = 7;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),
    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
    #[error("{0} requires {1} to be set as well")]
    Incomplete(&'static str, &'static str),
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("gtd-bot").join("config.json"))
}

/// Settings read from the optional JSON config file. Environment variables
/// override every field.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FileConfig {
    pub telegram_token: Option<String>,
    pub allowed_chat: Option<i64>,
    pub base_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub root: Option<String>,
    pub tickler_run_hour: Option<u32>,
    pub weekly_push_dow: Option<String>,
    pub weekly_push_hour: Option<u32>,
    pub debug_logging: Option<bool>,
}

impl FileConfig {
    /// A missing file is an empty config; an unreadable or malformed one is
    /// an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// When to push the weekly review to the allowed chat.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WeeklyPush {
    pub weekday: Weekday,
    pub hour: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BotConfig {
    pub telegram_token: String,
    /// The only chat allowed to issue commands; `None` means open mode.
    pub allowed_chat: Option<i64>,
    pub base_url: String,
    pub username: String,
    pub password: String,
    pub root: String,
    pub tickler_run_hour: u32,
    pub weekly_push: Option<WeeklyPush>,
    pub debug_logging: bool,
}

impl BotConfig {
    /// Load the config file (from `GTD_BOT_CONFIG` or the user config dir)
    /// and apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var_os("GTD_BOT_CONFIG")
            .map(PathBuf::from)
            .or_else(default_config_path);
        let file = match path {
            Some(path) => FileConfig::load(&path)?,
            None => FileConfig::default(),
        };
        Self::from_sources(file, |var| std::env::var(var).ok())
    }

    /// Merge `file` with variables looked up through `env`. Blank values
    /// count as unset.
    pub fn from_sources<F>(file: FileConfig, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            env(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let telegram_token = var("TELEGRAM_TOKEN")
            .or(file.telegram_token)
            .ok_or(ConfigError::Missing("TELEGRAM_TOKEN"))?;

        let allowed_chat = match var("TELEGRAM_ALLOWED_CHAT") {
            Some(raw) => Some(parse_number::<i64>("TELEGRAM_ALLOWED_CHAT", &raw)?),
            None => file.allowed_chat,
        };

        let base_url = var("NEXTCLOUD_BASE_URL")
            .or(file.base_url)
            .map(|url| url.trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .ok_or(ConfigError::Missing("NEXTCLOUD_BASE_URL"))?;
        let username = var("NEXTCLOUD_USER")
            .or(file.username)
            .ok_or(ConfigError::Missing("NEXTCLOUD_USER"))?;
        let password = var("NEXTCLOUD_PASSWORD")
            .or(file.password)
            .ok_or(ConfigError::Missing("NEXTCLOUD_PASSWORD"))?;
        let root = var("NEXTCLOUD_GTD_ROOT")
            .or(file.root)
            .unwrap_or_else(|| DEFAULT_ROOT.to_string());

        let tickler_run_hour = match var("TICKLER_RUN_HOUR") {
            Some(raw) => parse_hour("TICKLER_RUN_HOUR", &raw)?,
            None => match file.tickler_run_hour {
                Some(hour) => check_hour("TICKLER_RUN_HOUR", hour)?,
                None => DEFAULT_TICKLER_HOUR,
            },
        };

        let weekly_dow = match var("WEEKLY_PUSH_DOW").or(file.weekly_push_dow) {
            Some(raw) => Some(parse_weekday("WEEKLY_PUSH_DOW", &raw)?),
            None => None,
        };
        let weekly_hour = match var("WEEKLY_PUSH_HOUR") {
            Some(raw) => Some(parse_hour("WEEKLY_PUSH_HOUR", &raw)?),
            None => file
                .weekly_push_hour
                .map(|hour| check_hour("WEEKLY_PUSH_HOUR", hour))
                .transpose()?,
        };
        let weekly_push = match (weekly_dow, weekly_hour) {
            (Some(weekday), Some(hour)) => Some(WeeklyPush { weekday, hour }),
            (None, None) => None,
            (Some(_), None) => {
                return Err(ConfigError::Incomplete("WEEKLY_PUSH_DOW", "WEEKLY_PUSH_HOUR"));
            }
            (None, Some(_)) => {
                return Err(ConfigError::Incomplete("WEEKLY_PUSH_HOUR", "WEEKLY_PUSH_DOW"));
            }
        };

        let debug_logging = match var("GTD_BOT_DEBUG") {
            Some(raw) => matches!(raw.to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
            None => file.debug_logging.unwrap_or(false),
        };

        Ok(Self {
            telegram_token,
            allowed_chat,
            base_url,
            username,
            password,
            root,
            tickler_run_hour,
            weekly_push,
            debug_logging,
        })
    }

    /// WebDAV files endpoint for the configured user.
    pub fn dav_base(&self) -> String {
        format!("{}/remote.php/dav/files/{}", self.base_url, self.username)
    }

    pub fn gtd_root_url(&self) -> String {
        format!("{}/{}", self.dav_base(), self.root.trim_matches('/'))
    }
}

fn parse_number<T: std::str::FromStr>(var: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.parse().map_err(|_| ConfigError::Invalid {
        var,
        value: raw.to_string(),
    })
}

fn check_hour(var: &'static str, hour: u32) -> Result<u32, ConfigError> {
    if hour < 24 {
        Ok(hour)
    } else {
        Err(ConfigError::Invalid {
            var,
            value: hour.to_string(),
        })
    }
}

fn parse_hour(var: &'static str, raw: &str) -> Result<u32, ConfigError> {
    check_hour(var, parse_number(var, raw)?)
}

/// `0` (Monday) through `6` (Sunday), or an English day name.
fn parse_weekday(var: &'static str, raw: &str) -> Result<Weekday, ConfigError> {
    let invalid = || ConfigError::Invalid {
        var,
        value: raw.to_string(),
    };
    if let Ok(n) = raw.parse::<u8>() {
        return Weekday::try_from(n).map_err(|_| invalid());
    }
    raw.parse::<Weekday>().map_err(|_| invalid())
}
