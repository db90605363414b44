//! Game configuration.
//!
//! A JSON file deep-merged over built-in defaults. Values can be read with
//! dotted paths (`game.max_size`) or as typed [`Settings`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use crate::game::{GameError, DEFAULT_TARGET};

pub const DEFAULT_CONFIG_FILE: &str = "game_config.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cannot set '{0}': a parent key is not an object")]
    NotAnObject(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSettings {
    pub min_size: usize,
    pub max_size: usize,
    pub mobile_max_size: usize,
    pub target_score: u32,
    pub default_size: usize,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            min_size: 4,
            max_size: 10,
            mobile_max_size: 8,
            target_score: DEFAULT_TARGET,
            default_size: 4,
        }
    }
}

impl GameSettings {
    /// Resolves a requested board size for a client. Mobile-class clients are
    /// capped at `mobile_max_size`, then the size must fall in
    /// `[min_size, max_size]`.
    pub fn resolve_size(&self, requested: i64, mobile: bool) -> Result<usize, GameError> {
        let size = usize::try_from(requested)
            .ok()
            .filter(|&s| s > 0)
            .ok_or(GameError::InvalidSize(requested))?;
        let size = if mobile {
            size.min(self.mobile_max_size)
        } else {
            size
        };
        if size < self.min_size || size > self.max_size {
            return Err(GameError::InvalidSize(size as i64));
        }
        Ok(size)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub room_port: u16,
    pub session_ttl_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            room_port: 5001,
            session_ttl_secs: 3600,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaderboardSettings {
    pub path: String,
    pub capacity: usize,
    pub top_limit: usize,
}

impl Default for LeaderboardSettings {
    fn default() -> Self {
        Self {
            path: "leaderboard.db".to_string(),
            capacity: 100,
            top_limit: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    /// Rotating log files are written here when set.
    pub directory: Option<String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub game: GameSettings,
    pub server: ServerSettings,
    pub leaderboard: LeaderboardSettings,
    pub logging: LoggingSettings,
}

/// Key-value view of the configuration, optionally backed by a file.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: Option<PathBuf>,
    value: Value,
}

impl ConfigStore {
    /// Built-in defaults, not backed by any file.
    pub fn defaults() -> Self {
        Self {
            path: None,
            value: default_value(),
        }
    }

    /// Loads `path` merged over the defaults. A missing file is created with
    /// the defaults; an unreadable one is reported and ignored.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_path_buf();
        let mut store = Self {
            path: Some(path.clone()),
            value: default_value(),
        };

        if !path.exists() {
            store.save()?;
            log::info!("Created default config at {}", path.display());
            return Ok(store);
        }

        let parsed = std::fs::read_to_string(&path)
            .map_err(ConfigError::from)
            .and_then(|raw| serde_json::from_str::<Value>(&raw).map_err(ConfigError::from));
        match parsed {
            Ok(overrides) => deep_merge(&mut store.value, overrides),
            Err(e) => log::warn!(
                "Failed to load config {} ({}), using defaults",
                path.display(),
                e
            ),
        }
        Ok(store)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Same values, but later `set` calls no longer write to disk.
    pub fn detached(mut self) -> Self {
        self.path = None;
        self
    }

    /// Looks up a dotted key path such as `server.port`.
    pub fn get(&self, key_path: &str) -> Option<&Value> {
        key_path
            .split('.')
            .try_fold(&self.value, |node, key| node.as_object()?.get(key))
    }

    pub fn get_or<T: DeserializeOwned>(&self, key_path: &str, default: T) -> T {
        self.get(key_path)
            .and_then(|v| T::deserialize(v).ok())
            .unwrap_or(default)
    }

    /// Sets a dotted key path, creating intermediate objects, then persists.
    pub fn set(&mut self, key_path: &str, value: Value) -> Result<(), ConfigError> {
        let mut keys: Vec<&str> = key_path.split('.').collect();
        let last = keys.pop().unwrap_or_default();

        let mut node = &mut self.value;
        for key in keys {
            node = node
                .as_object_mut()
                .ok_or_else(|| ConfigError::NotAnObject(key_path.to_string()))?
                .entry(key)
                .or_insert_with(|| Value::Object(Map::new()));
        }
        node.as_object_mut()
            .ok_or_else(|| ConfigError::NotAnObject(key_path.to_string()))?
            .insert(last.to_string(), value);

        self.save()
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.path {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, serde_json::to_string_pretty(&self.value)?)?;
        }
        Ok(())
    }

    pub fn settings(&self) -> Result<Settings, ConfigError> {
        Ok(Settings::deserialize(&self.value)?)
    }
}

fn default_value() -> Value {
    serde_json::to_value(Settings::default()).unwrap_or_else(|_| Value::Object(Map::new()))
}

fn deep_merge(base: &mut Value, update: Value) {
    match (base, update) {
        (Value::Object(base_map), Value::Object(update_map)) => {
            for (key, value) in update_map {
                let nested = value.is_object() && base_map.get(&key).is_some_and(Value::is_object);
                match base_map.get_mut(&key) {
                    Some(existing) if nested => deep_merge(existing, value),
                    _ => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, update) => *base = update,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let store = ConfigStore::defaults();
        let settings = store.settings().unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(store.get("game.target_score"), Some(&json!(2048)));
        assert_eq!(store.get("server.port"), Some(&json!(5000)));
        assert_eq!(store.get("server.missing"), None);
        assert_eq!(store.get("game.max_size.deeper"), None);
        assert_eq!(store.get_or("game.max_size", 0usize), 10);
        assert_eq!(store.get_or("nope.nothing", 7u32), 7);
    }

    #[test]
    fn test_missing_file_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("game_config.json");

        let store = ConfigStore::load(&path).unwrap();
        assert!(path.exists());
        assert_eq!(store.path(), Some(path.as_path()));

        let written: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["game"]["mobile_max_size"], 8);
    }

    #[test]
    fn test_file_is_deep_merged_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("game_config.json");
        std::fs::write(&path, r#"{"game": {"max_size": 6}, "extra": {"flag": true}}"#).unwrap();

        let store = ConfigStore::load(&path).unwrap();
        let settings = store.settings().unwrap();
        assert_eq!(settings.game.max_size, 6);
        assert_eq!(settings.game.min_size, 4);
        assert_eq!(settings.server.port, 5000);
        assert_eq!(store.get("extra.flag"), Some(&json!(true)));
    }

    #[test]
    fn test_corrupt_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("game_config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = ConfigStore::load(&path).unwrap();
        assert_eq!(store.settings().unwrap(), Settings::default());
    }

    #[test]
    fn test_set_persists_and_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("game_config.json");

        let mut store = ConfigStore::load(&path).unwrap();
        store.set("server.port", json!(8080)).unwrap();
        store.set("ui.theme.background", json!("#faf8ef")).unwrap();

        let reloaded = ConfigStore::load(&path).unwrap();
        assert_eq!(reloaded.settings().unwrap().server.port, 8080);
        assert_eq!(reloaded.get("ui.theme.background"), Some(&json!("#faf8ef")));
    }

    #[test]
    fn test_detached_store_does_not_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("game_config.json");

        let mut store = ConfigStore::load(&path).unwrap().detached();
        assert_eq!(store.path(), None);
        store.set("logging.directory", json!("logs")).unwrap();
        assert_eq!(store.settings().unwrap().logging.directory.as_deref(), Some("logs"));

        let reloaded = ConfigStore::load(&path).unwrap();
        assert_eq!(reloaded.settings().unwrap().logging.directory, None);
    }

    #[test]
    fn test_set_through_scalar_fails() {
        let mut store = ConfigStore::defaults();
        assert!(matches!(
            store.set("server.port.inner", json!(1)),
            Err(ConfigError::NotAnObject(_))
        ));
    }

    #[test]
    fn test_resolve_size() {
        let game = GameSettings::default();
        assert_eq!(game.resolve_size(4, false).unwrap(), 4);
        assert_eq!(game.resolve_size(10, false).unwrap(), 10);
        assert_eq!(game.resolve_size(10, true).unwrap(), 8);
        assert_eq!(game.resolve_size(0, false), Err(GameError::InvalidSize(0)));
        assert_eq!(game.resolve_size(-3, false), Err(GameError::InvalidSize(-3)));
        assert_eq!(game.resolve_size(3, false), Err(GameError::InvalidSize(3)));
        assert_eq!(game.resolve_size(11, false), Err(GameError::InvalidSize(11)));
    }
}
