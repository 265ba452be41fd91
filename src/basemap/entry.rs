use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::catalog::{MapType, RasterTable};

/// A base-map source: one tile set in one database file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseMapEntry {
    pub database_path: PathBuf,
    pub title: String,
    pub map_type: MapType,
}

impl BaseMapEntry {
    pub fn new(database_path: impl Into<PathBuf>, title: impl Into<String>, map_type: MapType) -> Self {
        Self { database_path: database_path.into(), title: title.into(), map_type }
    }

    /// The entry a cataloged raster table is listed under.
    pub fn from_table(table: &RasterTable) -> Self {
        Self::new(&table.database_path, &table.title, table.map_type)
    }

    /// Parse the persisted list; an empty string is an empty list.
    pub fn list_from_json(json: &str) -> Result<Vec<Self>> {
        if json.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(json).context("[basemap::entry] Failed to parse base map list")
    }

    pub fn list_to_json(entries: &[Self]) -> Result<String> {
        serde_json::to_string(entries).context("[basemap::entry] Failed to serialize base map list")
    }
}

impl std::fmt::Display for BaseMapEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}] {}", self.title, self.map_type, self.database_path.display())
    }
}
