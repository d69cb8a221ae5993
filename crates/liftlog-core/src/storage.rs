//! Filesystem locations for configuration and linking state.

use std::path::PathBuf;

/// Returns `~/.config/liftlog[-dev]/` based on LIFTLOG_ENV.
///
/// Set LIFTLOG_ENV=dev to use the development data directory.
///
/// # Errors
/// Returns an error if the home directory cannot be determined or if
/// creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, Box<dyn std::error::Error>> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("LIFTLOG_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("liftlog-dev")
    } else {
        base_dir.join("liftlog")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Path of the persisted linking flag file.
pub fn linking_file() -> Result<PathBuf, Box<dyn std::error::Error>> {
    Ok(data_dir()?.join("linking.json"))
}

/// Path of the TOML configuration file.
pub fn config_file() -> Result<PathBuf, Box<dyn std::error::Error>> {
    Ok(data_dir()?.join("config.toml"))
}
