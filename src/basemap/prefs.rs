use std::path::{Path, PathBuf};

use ahash::AHashMap;
use anyhow::{Context, Result};
use serde_json::{Map, Value};

/// Preference keys shared with the rest of the application.
pub mod keys {
    /// Map type of the selected base map.
    pub const TILE_SOURCE: &str = "tilesource";
    /// Database path of the selected base map.
    pub const TILE_SOURCE_FILE: &str = "tilesource_file";
    /// Title of the selected base map.
    pub const TILE_SOURCE_TITLE: &str = "tilesource_title";
    /// JSON list of known base maps.
    pub const BASEMAPS: &str = "basemaps";
    /// One-shot request to recompute vector metadata from the data.
    pub const RECOVERY_MODE: &str = "spatialite_recovery_mode";
}

/// Process-level key/value preferences.
pub trait PreferenceStore {
    fn get(&self, key: &str) -> Option<&Value>;
    fn set(&mut self, key: &str, value: Value) -> Result<()>;

    fn get_string(&self, key: &str) -> Option<String> {
        self.get(key).and_then(Value::as_str).map(str::to_string)
    }

    fn get_bool(&self, key: &str) -> bool {
        self.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    fn set_string(&mut self, key: &str, value: &str) -> Result<()> {
        self.set(key, Value::String(value.to_string()))
    }

    fn set_bool(&mut self, key: &str, value: bool) -> Result<()> {
        self.set(key, Value::Bool(value))
    }
}

/// Preferences kept in one JSON object file, written through on every change.
#[derive(Debug)]
pub struct JsonFilePreferences {
    path: PathBuf,
    values: Map<String, Value>,
}

impl JsonFilePreferences {
    /// Load preferences from `path`; a missing file starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("[basemap::prefs] Failed to read {}", path.display()))?;
            if text.trim().is_empty() {
                Map::new()
            } else {
                serde_json::from_str(&text)
                    .with_context(|| format!("[basemap::prefs] {} is not a JSON object", path.display()))?
            }
        } else {
            Map::new()
        };
        Ok(Self { path, values })
    }

    #[inline] pub fn path(&self) -> &Path { &self.path }

    fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(&self.values)?;
        std::fs::write(&self.path, text)
            .with_context(|| format!("[basemap::prefs] Failed to write {}", self.path.display()))
    }
}

impl PreferenceStore for JsonFilePreferences {
    fn get(&self, key: &str) -> Option<&Value> { self.values.get(key) }

    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        self.values.insert(key.to_string(), value);
        self.flush()
    }
}

/// In-memory preferences.
#[derive(Debug, Default, Clone)]
pub struct MemoryPreferences {
    values: AHashMap<String, Value>,
}

impl MemoryPreferences {
    pub fn new() -> Self { Self::default() }
}

impl PreferenceStore for MemoryPreferences {
    fn get(&self, key: &str) -> Option<&Value> { self.values.get(key) }

    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }
}
