//! Persisted user preferences (last folder, strategy, toggles).
//!
//! Stored as a flat JSON object. Keys this crate does not know about are
//! kept on save so other front ends can share the file.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::Config;

const APP_DIR: &str = "video-sub-renamer";
const SETTINGS_FILE: &str = "settings.json";

/// Known preference keys
pub const LAST_FOLDER: &str = "last_folder";
pub const STRATEGY: &str = "strategy";
pub const SKIP_PREFIXED: &str = "skip_prefixed";
pub const MARKER_ENABLED: &str = "marker_enabled";

/// Prefix used when skipping is switched on without an explicit prefix
pub const DEFAULT_SKIP_PREFIX: &str = "x";

/// User preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Folder scanned most recently
    #[serde(default)]
    pub last_folder: Option<String>,

    /// Strategy id chosen most recently
    #[serde(default)]
    pub strategy: Option<String>,

    /// Leave videos with the skip prefix out of matching
    #[serde(default)]
    pub skip_prefixed: bool,

    /// Mark unmatched videos on disk
    #[serde(default = "default_true")]
    pub marker_enabled: bool,

    /// Keys written by something else
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            last_folder: None,
            strategy: None,
            skip_prefixed: false,
            marker_enabled: true,
            extra: Map::new(),
        }
    }
}

impl Settings {
    /// Layer these preferences over a loaded configuration
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(strategy) = &self.strategy {
            config.matching.strategy = strategy.clone();
        }
        if !self.marker_enabled {
            config.markers.enabled = false;
        }
        if self.skip_prefixed && config.discovery.skip_prefix.is_none() {
            config.discovery.skip_prefix = Some(DEFAULT_SKIP_PREFIX.to_string());
        }
    }
}

/// Values given explicitly on the command line
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub strategy: Option<String>,
    pub threshold: Option<f64>,
    pub skip_prefix: Option<String>,
    pub recursive: bool,
    pub extended: bool,
    pub no_markers: bool,
    pub parallel: bool,
}

impl Overrides {
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(strategy) = &self.strategy {
            config.matching.strategy = strategy.clone();
        }
        if let Some(threshold) = self.threshold {
            config.matching.threshold = threshold;
        }
        if let Some(prefix) = &self.skip_prefix {
            config.discovery.skip_prefix = Some(prefix.clone());
        }
        if self.recursive {
            config.discovery.recursive = true;
        }
        if self.extended {
            config.discovery.extended_extensions = true;
        }
        if self.no_markers {
            config.markers.enabled = false;
        }
        if self.parallel {
            config.performance.parallel_scoring = true;
        }
    }
}

/// Merge in precedence order: overrides > saved settings > `config` as loaded
pub fn resolve(mut config: Config, saved: &Settings, overrides: &Overrides) -> Result<Config> {
    saved.apply_to(&mut config);
    overrides.apply_to(&mut config);
    config.validate()?;
    Ok(config)
}

/// Save the folder used and, when one was given on the command line, the
/// strategy. A strategy coming from the config file is never persisted.
pub fn remember(store: &dyn SettingsStore, folder: &Path, overrides: &Overrides) -> Result<()> {
    store.save(LAST_FOLDER, json!(folder.display().to_string()))?;
    if let Some(strategy) = &overrides.strategy {
        store.save(STRATEGY, json!(strategy))?;
    }
    Ok(())
}

/// `load()/save(key, value)` access to wherever preferences live
pub trait SettingsStore {
    /// Current preferences; defaults when nothing usable is stored
    fn load(&self) -> Settings;

    /// Persist a single key
    fn save(&self, key: &str, value: Value) -> Result<()>;
}

/// Settings kept in a JSON file
#[derive(Debug, Clone)]
pub struct JsonSettingsStore {
    path: PathBuf,
}

impl JsonSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/video-sub-renamer/settings.json`
    pub fn default_location() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR).join(SETTINGS_FILE))
    }

    pub fn open_default() -> Result<Self> {
        Self::default_location()
            .map(Self::new)
            .ok_or_else(|| anyhow!("Could not determine config directory"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw JSON object on disk; empty when missing or unreadable
    fn read_object(&self) -> Map<String, Value> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                debug!("No settings at {}: {}", self.path.display(), e);
                return Map::new();
            }
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(object)) => object,
            Ok(_) => {
                warn!("Settings file {} is not a JSON object, ignoring it", self.path.display());
                Map::new()
            }
            Err(e) => {
                warn!("Failed to parse settings file {}: {}", self.path.display(), e);
                Map::new()
            }
        }
    }
}

impl SettingsStore for JsonSettingsStore {
    fn load(&self) -> Settings {
        let object = self.read_object();
        match serde_json::from_value(Value::Object(object)) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Invalid settings in {}, using defaults: {}", self.path.display(), e);
                Settings::default()
            }
        }
    }

    fn save(&self, key: &str, value: Value) -> Result<()> {
        let mut object = self.read_object();
        object.insert(key.to_string(), value);

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create settings folder {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(&Value::Object(object))?;
        fs::write(&self.path, content)
            .with_context(|| format!("Cannot write settings to {}", self.path.display()))?;

        info!("💾 Saved setting '{}' to {}", key, self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigBuilder;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_loads_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonSettingsStore::new(temp_dir.path().join("settings.json"));
        assert_eq!(store.load(), Settings::default());
        assert!(store.load().marker_enabled);
    }

    #[test]
    fn test_corrupt_file_loads_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(JsonSettingsStore::new(&path).load(), Settings::default());

        fs::write(&path, r#"{"last_folder": 42}"#).unwrap();
        assert_eq!(JsonSettingsStore::new(&path).load(), Settings::default());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonSettingsStore::new(temp_dir.path().join("nested/settings.json"));

        store.save(LAST_FOLDER, json!("/media/shows")).unwrap();
        store.save(STRATEGY, json!("hybrid")).unwrap();
        store.save(MARKER_ENABLED, json!(false)).unwrap();

        let settings = store.load();
        assert_eq!(settings.last_folder.as_deref(), Some("/media/shows"));
        assert_eq!(settings.strategy.as_deref(), Some("hybrid"));
        assert!(!settings.marker_enabled);
        assert!(!settings.skip_prefixed);
    }

    #[test]
    fn test_unknown_keys_survive_save() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.json");
        fs::write(&path, r#"{"dark_theme": true, "skip_prefixed": true}"#).unwrap();

        let store = JsonSettingsStore::new(&path);
        assert!(store.load().skip_prefixed);

        store.save(LAST_FOLDER, json!("/tmp")).unwrap();
        let raw: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["dark_theme"], json!(true));
        assert_eq!(raw["last_folder"], json!("/tmp"));
        assert_eq!(store.load().extra.get("dark_theme"), Some(&json!(true)));
    }

    #[test]
    fn test_skip_prefixed_defaults_to_x() {
        let saved = Settings { skip_prefixed: true, ..Settings::default() };
        let config = resolve(Config::default(), &saved, &Overrides::default()).unwrap();
        assert_eq!(config.discovery.skip_prefix.as_deref(), Some(DEFAULT_SKIP_PREFIX));

        let config = ConfigBuilder::new().with_skip_prefix("sample").build();
        let config = resolve(config, &saved, &Overrides::default()).unwrap();
        assert_eq!(config.discovery.skip_prefix.as_deref(), Some("sample"));
    }

    #[test]
    fn test_saved_marker_toggle_overrides_config() {
        let saved = Settings { marker_enabled: false, ..Settings::default() };
        let config = ConfigBuilder::new().enable_markers(true).build();
        let config = resolve(config, &saved, &Overrides::default()).unwrap();
        assert!(!config.markers.enabled);
    }

    #[test]
    fn test_precedence_flag_over_saved_over_config() {
        let config = ConfigBuilder::new().with_strategy("sequence").build();
        let saved = Settings { strategy: Some("hybrid".to_string()), ..Settings::default() };

        let merged = resolve(config.clone(), &Settings::default(), &Overrides::default()).unwrap();
        assert_eq!(merged.matching.strategy, "sequence");

        let merged = resolve(config.clone(), &saved, &Overrides::default()).unwrap();
        assert_eq!(merged.matching.strategy, "hybrid");

        let overrides = Overrides {
            strategy: Some("levenshtein".to_string()),
            threshold: Some(0.7),
            no_markers: true,
            ..Overrides::default()
        };
        let merged = resolve(config, &saved, &overrides).unwrap();
        assert_eq!(merged.matching.strategy, "levenshtein");
        assert_eq!(merged.matching.threshold, 0.7);
        assert!(!merged.markers.enabled);
    }

    #[test]
    fn test_resolve_rejects_invalid_threshold() {
        let overrides = Overrides { threshold: Some(1.5), ..Overrides::default() };
        assert!(resolve(Config::default(), &Settings::default(), &overrides).is_err());
    }

    #[test]
    fn test_remember_keeps_config_strategy_in_charge() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonSettingsStore::new(temp_dir.path().join("settings.json"));

        remember(&store, Path::new("/media/shows"), &Overrides::default()).unwrap();
        let saved = store.load();
        assert_eq!(saved.last_folder.as_deref(), Some("/media/shows"));
        assert_eq!(saved.strategy, None);

        let config = ConfigBuilder::new().with_strategy("year_word").build();
        let merged = resolve(config, &saved, &Overrides::default()).unwrap();
        assert_eq!(merged.matching.strategy, "year_word");

        let overrides = Overrides { strategy: Some("hybrid".to_string()), ..Overrides::default() };
        remember(&store, Path::new("/media/shows"), &overrides).unwrap();
        assert_eq!(store.load().strategy.as_deref(), Some("hybrid"));
    }
}
