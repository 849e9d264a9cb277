//! Application settings storage
//!
//! Stores configuration in a JSON file in the app data directory. Environment
//! variables take precedence over stored values.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Global settings instance
static SETTINGS: RwLock<Option<Settings>> = RwLock::new(None);

/// Path to config file (set during init)
static CONFIG_PATH: RwLock<Option<PathBuf>> = RwLock::new(None);

pub const ENV_DB: &str = "HYPHAE_DB";
pub const ENV_BIND: &str = "HYPHAE_BIND";
pub const ENV_SERVER_URL: &str = "HYPHAE_SERVER_URL";
pub const ENV_LOG: &str = "HYPHAE_LOG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Base URL of the graph server the CLI fetches from
    #[serde(default = "default_server_url")]
    pub server_url: String,
    /// Address the server binds to
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Row store location (None = app data dir)
    #[serde(default)]
    pub db_path: Option<String>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// tracing-subscriber filter directive
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    /// Graph served when a request names none
    #[serde(default = "default_graph_name")]
    pub graph_name: String,
}

fn default_server_url() -> String {
    "http://127.0.0.1:3741".to_string()
}

fn default_bind_addr() -> String {
    "127.0.0.1:3741".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_log_filter() -> String {
    "info".to_string()
}

fn default_graph_name() -> String {
    "default".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            bind_addr: default_bind_addr(),
            db_path: None,
            request_timeout_secs: default_request_timeout(),
            log_filter: default_log_filter(),
            graph_name: default_graph_name(),
        }
    }
}

impl Settings {
    /// Load settings from disk or create default
    fn load(path: &Path) -> Self {
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                    eprintln!("[Settings] Ignoring unreadable {}: {}", path.display(), e);
                    Settings::default()
                }),
                Err(_) => Settings::default(),
            }
        } else {
            Settings::default()
        }
    }

    /// Save settings to disk
    fn save(&self, path: &Path) -> Result<(), String> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize settings: {}", e))?;

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        fs::write(path, content)
            .map_err(|e| format!("Failed to write settings: {}", e))?;

        Ok(())
    }
}

/// Default app data directory
pub fn app_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|p| p.join("com.hyphae.app"))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Initialize settings with the app data directory
pub fn init(app_data_dir: PathBuf) {
    let config_path = app_data_dir.join("settings.json");
    let settings = Settings::load(&config_path);

    if let Ok(mut guard) = CONFIG_PATH.write() {
        *guard = Some(config_path);
    }
    if let Ok(mut guard) = SETTINGS.write() {
        *guard = Some(settings);
    }
}

/// Snapshot of the stored settings (defaults if not initialized)
pub fn current() -> Settings {
    SETTINGS
        .read()
        .ok()
        .and_then(|guard| guard.clone())
        .unwrap_or_default()
}

/// Apply a change and save it
pub fn update(change: impl FnOnce(&mut Settings)) -> Result<(), String> {
    let mut settings_guard = SETTINGS.write()
        .map_err(|_| "Failed to acquire settings lock")?;

    let settings = settings_guard.get_or_insert_with(Settings::default);
    change(settings);

    let config_path = CONFIG_PATH.read()
        .map_err(|_| "Failed to acquire config path lock")?
        .clone()
        .ok_or("Settings not initialized")?;

    settings.save(&config_path)
}

/// Set one field by its JSON name, as used by `hyphae-cli config --set`
pub fn set_field(settings: &mut Settings, key: &str, value: &str) -> Result<(), String> {
    match key {
        "server_url" => settings.server_url = value.to_string(),
        "bind_addr" => settings.bind_addr = value.to_string(),
        "db_path" => settings.db_path = if value.is_empty() { None } else { Some(value.to_string()) },
        "request_timeout_secs" => {
            settings.request_timeout_secs = value.parse()
                .map_err(|_| format!("request_timeout_secs must be a whole number, got '{}'", value))?;
        }
        "log_filter" => settings.log_filter = value.to_string(),
        "graph_name" => {
            if value.is_empty() {
                return Err("graph_name cannot be empty".to_string());
            }
            settings.graph_name = value.to_string();
        }
        other => return Err(format!("Unknown setting '{}'", other)),
    }
    Ok(())
}

/// Set one field and save. A rejected value leaves both the stored settings
/// and the file untouched.
pub fn set(key: &str, value: &str) -> Result<(), String> {
    let mut changed = current();
    set_field(&mut changed, key, value)?;
    update(|s| *s = changed)
}

fn env_override(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Row store path: env var, then stored setting, then app data dir
pub fn db_path() -> PathBuf {
    env_override(ENV_DB)
        .or_else(|| current().db_path)
        .map(PathBuf::from)
        .unwrap_or_else(|| app_data_dir().join("hyphae.db"))
}

pub fn bind_addr() -> String {
    env_override(ENV_BIND).unwrap_or_else(|| current().bind_addr)
}

pub fn server_url() -> String {
    env_override(ENV_SERVER_URL).unwrap_or_else(|| current().server_url)
}

pub fn log_filter() -> String {
    env_override(ENV_LOG).unwrap_or_else(|| current().log_filter)
}

pub fn graph_name() -> String {
    current().graph_name
}

pub fn request_timeout() -> std::time::Duration {
    std::time::Duration::from_secs(current().request_timeout_secs.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_uses_field_defaults() {
        let s: Settings = serde_json::from_str(r#"{"graph_name":"claims"}"#).unwrap();
        assert_eq!(s.graph_name, "claims");
        assert_eq!(s.request_timeout_secs, 30);
        assert_eq!(s.bind_addr, "127.0.0.1:3741");
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let mut s = Settings::default();
        s.db_path = Some("/tmp/rows.db".into());
        s.save(&path).unwrap();
        assert_eq!(Settings::load(&path), s);
    }

    #[test]
    fn test_set_field() {
        let mut s = Settings::default();
        set_field(&mut s, "request_timeout_secs", "5").unwrap();
        set_field(&mut s, "db_path", "").unwrap();
        set_field(&mut s, "graph_name", "claims").unwrap();
        assert_eq!(s.request_timeout_secs, 5);
        assert_eq!(s.db_path, None);
        assert_eq!(s.graph_name, "claims");
        assert!(set_field(&mut s, "request_timeout_secs", "soon").is_err());
        assert!(set_field(&mut s, "graph_name", "").is_err());
        assert!(set_field(&mut s, "colour", "blue").is_err());
    }

    #[test]
    fn test_rejected_set_does_not_save() {
        let dir = tempfile::tempdir().unwrap();
        init(dir.path().to_path_buf());
        let path = dir.path().join("settings.json");

        assert!(set("graph_name", "").is_err());
        assert!(set("colour", "blue").is_err());
        assert!(!path.exists());

        set("graph_name", "claims").unwrap();
        assert_eq!(Settings::load(&path).graph_name, "claims");
        assert_eq!(graph_name(), "claims");
    }

    #[test]
    fn test_unreadable_file_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{not json").unwrap();
        assert_eq!(Settings::load(&path), Settings::default());
    }
}
