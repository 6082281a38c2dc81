//! User settings, read once per run from a JSON file.

use crate::error::StampError;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_SETTINGS_FILE: &str = "user_settings.json";

pub const DEFAULT_YOUTUBE_API_BASE: &str = "https://www.googleapis.com/youtube/v3";

const DEFAULT_OBS_TIMEOUT: Duration = Duration::from_secs(10);

/// Keys that must appear in the settings file.
///
/// The password and the manual video id may be empty strings, meaning "not configured".
const REQUIRED_KEYS: [&str; 6] = [
    "channel_id",
    "token_path",
    "client_secret_path",
    "obs_websocket_url",
    "obs_websocket_password",
    "manual_video_id",
];

#[derive(Deserialize)]
struct RawSettings {
    channel_id: Option<String>,
    token_path: Option<PathBuf>,
    client_secret_path: Option<PathBuf>,
    obs_websocket_url: Option<String>,
    obs_websocket_password: Option<String>,
    manual_video_id: Option<String>,
    #[serde(default)]
    obs_websocket_timeout_secs: Option<u64>,
    #[serde(default)]
    youtube_api_base: Option<String>,
}

#[derive(Clone)]
pub struct Settings {
    pub channel_id: String,
    pub token_path: PathBuf,
    pub client_secret_path: PathBuf,
    pub obs_websocket_url: String,
    pub obs_websocket_password: Option<String>,
    /// Used when no active broadcast can be found (e.g. for unlisted streams).
    pub manual_video_id: Option<String>,
    pub obs_websocket_timeout: Duration,
    pub youtube_api_base: String,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("channel_id", &self.channel_id)
            .field("token_path", &self.token_path)
            .field("client_secret_path", &self.client_secret_path)
            .field("obs_websocket_url", &self.obs_websocket_url)
            .field(
                "obs_websocket_password",
                &self.obs_websocket_password.as_ref().map(|_| "<redacted>"),
            )
            .field("manual_video_id", &self.manual_video_id)
            .field("obs_websocket_timeout", &self.obs_websocket_timeout)
            .field("youtube_api_base", &self.youtube_api_base)
            .finish()
    }
}

impl Settings {
    pub fn load(path: &Path) -> eyre::Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| StampError::Settings {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        let settings = Self::from_json(&raw).map_err(|e| match e {
            SettingsError::Parse(e) => StampError::Settings {
                path: path.to_path_buf(),
                source: e.into(),
            },
            SettingsError::Missing(key) => StampError::MissingSetting(key),
        })?;
        tracing::debug!(?settings, "loaded settings");
        Ok(settings)
    }

    fn from_json(raw: &str) -> Result<Self, SettingsError> {
        let value: serde_json::Value = serde_json::from_str(raw).map_err(SettingsError::Parse)?;
        for key in REQUIRED_KEYS {
            if value.get(key).is_none() {
                return Err(SettingsError::Missing(key));
            }
        }
        let raw: RawSettings = serde_json::from_value(value).map_err(SettingsError::Parse)?;

        fn required<T: AsRef<std::ffi::OsStr>>(
            key: &'static str,
            v: Option<T>,
        ) -> Result<T, SettingsError> {
            v.filter(|v| !v.as_ref().is_empty())
                .ok_or(SettingsError::Missing(key))
        }
        fn optional(v: Option<String>) -> Option<String> {
            v.filter(|v| !v.is_empty())
        }

        Ok(Self {
            channel_id: required("channel_id", raw.channel_id)?,
            token_path: required("token_path", raw.token_path)?,
            client_secret_path: required("client_secret_path", raw.client_secret_path)?,
            obs_websocket_url: required("obs_websocket_url", raw.obs_websocket_url)?,
            obs_websocket_password: optional(raw.obs_websocket_password),
            manual_video_id: optional(raw.manual_video_id),
            obs_websocket_timeout: raw
                .obs_websocket_timeout_secs
                .map_or(DEFAULT_OBS_TIMEOUT, Duration::from_secs),
            youtube_api_base: optional(raw.youtube_api_base)
                .unwrap_or_else(|| DEFAULT_YOUTUBE_API_BASE.to_string()),
        })
    }
}

enum SettingsError {
    Parse(serde_json::Error),
    Missing(&'static str),
}
