//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Calendar color and API endpoint
//! - OAuth endpoints and loopback redirect port
//! - Event listing window size
//!
//! Configuration is stored at `~/.config/liftlog/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::storage::config_file;

/// Calendar preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
    /// Palette color applied to created events ("1".."11").
    #[serde(default = "default_color_id")]
    pub color_id: String,
    #[serde(default = "default_calendar_base_url")]
    pub base_url: String,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            color_id: default_color_id(),
            base_url: default_calendar_base_url(),
        }
    }
}

/// Identity-provider endpoints. Overridable mainly for development.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthConfig {
    #[serde(default = "default_auth_url")]
    pub auth_url: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
    #[serde(default = "default_userinfo_url")]
    pub userinfo_url: String,
    #[serde(default = "default_redirect_port")]
    pub redirect_port: u16,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            auth_url: default_auth_url(),
            token_url: default_token_url(),
            userinfo_url: default_userinfo_url(),
            redirect_port: default_redirect_port(),
        }
    }
}

/// Sync tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Page size for event listing.
    #[serde(default = "default_max_results")]
    pub max_results: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
        }
    }
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/liftlog/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub calendar: CalendarConfig,
    #[serde(default)]
    pub oauth: OAuthConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

impl Config {
    /// Load from the default location; missing or unreadable files yield
    /// defaults.
    pub fn load() -> Self {
        match config_file() {
            Ok(path) => Self::load_from(&path),
            Err(_) => Self::default(),
        }
    }

    /// Load from a specific path, falling back to defaults.
    pub fn load_from(path: &Path) -> Self {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|content| toml::from_str(&content).ok())
            .unwrap_or_default()
    }

    /// Save to the default location.
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.save_to(&config_file()?)
    }

    /// Save to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

fn default_color_id() -> String {
    "9".to_string()
}

fn default_calendar_base_url() -> String {
    "https://www.googleapis.com/calendar/v3".to_string()
}

fn default_auth_url() -> String {
    "https://accounts.google.com/o/oauth2/v2/auth".to_string()
}

fn default_token_url() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

fn default_userinfo_url() -> String {
    "https://openidconnect.googleapis.com/v1/userinfo".to_string()
}

fn default_redirect_port() -> u16 {
    19824
}

fn default_max_results() -> u32 {
    20
}
