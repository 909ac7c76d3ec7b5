//! Configuration for Reiseplan.
//!
//! This module provides the [`Config`] struct which stores the active
//! storage key and remote transport settings. Configuration is persisted
//! as TOML (typically at `~/.config/reiseplan/config.toml` on Unix
//! systems).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{ReiseplanError, Result};
use crate::transport::Session;

/// Homeserver used when none is configured.
pub const DEFAULT_HOMESERVER: &str = "https://matrix.org";

/// Storage key used when none is configured.
pub const DEFAULT_STORAGE_KEY: &str = "default";

/// User-configurable settings and the persisted remote session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Storage key naming the active collection in the durable mirror
    #[serde(default = "default_storage_key")]
    pub storage_key: String,

    /// Matrix homeserver base URL (defaults to matrix.org)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub homeserver_url: Option<String>,

    /// Matrix room used as the remote log
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,

    /// User id of the stored session
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_user_id: Option<String>,

    /// Access token of the stored session
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_access_token: Option<String>,
}

fn default_storage_key() -> String {
    DEFAULT_STORAGE_KEY.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_key: default_storage_key(),
            homeserver_url: None,
            room_id: None,
            session_user_id: None,
            session_access_token: None,
        }
    }
}

impl Config {
    /// The homeserver to talk to, configured or default.
    pub fn homeserver(&self) -> &str {
        self.homeserver_url.as_deref().unwrap_or(DEFAULT_HOMESERVER)
    }

    /// The stored session, if both of its halves are present.
    pub fn session(&self) -> Option<Session> {
        match (&self.session_access_token, &self.session_user_id) {
            (Some(token), Some(user_id)) => Some(Session::new(token, user_id)),
            _ => None,
        }
    }

    /// Store a session for later runs.
    pub fn set_session(&mut self, session: &Session) {
        self.session_access_token = Some(session.access_token().to_string());
        self.session_user_id = Some(session.user_id().to_string());
    }

    /// Get the config file path (~/.config/reiseplan/config.toml)
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("reiseplan").join("config.toml"))
    }

    /// Load config from the default location, or return defaults if the
    /// file doesn't exist.
    pub fn load() -> Result<Self> {
        if let Some(path) = Self::config_path()
            && path.exists()
        {
            return Self::load_from(&path);
        }
        Ok(Config::default())
    }

    /// Load config from a specific path.
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save config to the default location.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path().ok_or(ReiseplanError::NoConfigDir)?;
        self.save_to(&path)
    }

    /// Save config to a specific path, creating parent directories.
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}
