use std::path::Path;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// Source format of a base map or raster table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapType {
    /// GeoPackage raster tiles (`raster_columns` + `tile_matrix_metadata`)
    Gpkg,
    /// MBTiles tile store (`metadata` + `tiles`)
    Mbtiles,
    /// Rasterlite2 coverage
    Rasterlite2,
    /// Spatialite vector database used as a base layer
    Sqlite,
    /// Mapsforge vector map file
    Map,
    /// Online tile source description
    Mapurl,
}

impl MapType {
    pub fn to_str(&self) -> &'static str {
        match self {
            Self::Gpkg => "gpkg",
            Self::Mbtiles => "mbtiles",
            Self::Rasterlite2 => "rasterlite2",
            Self::Sqlite => "sqlite",
            Self::Map => "map",
            Self::Mapurl => "mapurl",
        }
    }

    /// Guess the map type from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "gpkg" => Some(Self::Gpkg),
            "mbtiles" => Some(Self::Mbtiles),
            "sqlite" | "db" => Some(Self::Sqlite),
            "map" => Some(Self::Map),
            "mapurl" => Some(Self::Mapurl),
            _ => None,
        }
    }
}

impl FromStr for MapType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "gpkg" => Ok(Self::Gpkg),
            "mbtiles" => Ok(Self::Mbtiles),
            "rasterlite2" => Ok(Self::Rasterlite2),
            "sqlite" => Ok(Self::Sqlite),
            "map" => Ok(Self::Map),
            "mapurl" => Ok(Self::Mapurl),
            _ => Err(anyhow!("[catalog::format] unknown map type: {s}")),
        }
    }
}

impl std::fmt::Display for MapType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_str())
    }
}
