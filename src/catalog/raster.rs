use std::path::{Path, PathBuf};
use std::sync::Arc;

use ahash::{AHashMap, AHashSet};
use anyhow::{Context, Result};
use geo::Coord;
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::catalog::contents::{contents_extent, ContentsRow};
use crate::catalog::vector::srid;
use crate::catalog::MapType;
use crate::db::{table_exists, value_real as real, value_text as text, SpatialDatabase};
use crate::geom::Bounds;
use crate::srs::{normalize_extent, DatabaseSrs, ProjLookup, WGS84};

const DEFAULT_MIN_ZOOM: u32 = 0;
const DEFAULT_MAX_ZOOM: u32 = 18;
const MBTILES_SRID: i32 = 3857;

/// A tiled raster layer discovered in a spatial database.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RasterTable {
    pub database_path: PathBuf,
    pub table_name: String,
    pub raster_column: String,
    pub title: String,
    pub srid: i32,
    pub min_zoom: u32,
    pub max_zoom: u32,
    pub default_zoom: u32,
    /// WGS84 center of the coverage.
    pub center: Coord<f64>,
    /// WGS84 coverage.
    pub bounds: Bounds,
    pub map_type: MapType,
}

/// Order a zoom range and clamp the default zoom into it.
fn zoom_range(min: u32, max: u32, default: Option<u32>) -> (u32, u32, u32) {
    let (min, max) = if min <= max { (min, max) } else { (max, min) };
    (min, max, default.unwrap_or(min).clamp(min, max))
}

fn zoom_levels(conn: &Connection, table: &str) -> (u32, u32) {
    let mut stmt = match conn.prepare(
        "SELECT min(zoom_level), max(zoom_level) FROM tile_matrix_metadata WHERE t_table_name = ?1",
    ) {
        Ok(stmt) => stmt,
        Err(e) => {
            debug!(table, error = %e, "no tile matrix metadata, using default zoom range");
            return (DEFAULT_MIN_ZOOM, DEFAULT_MAX_ZOOM);
        }
    };
    let levels = stmt.query_row([table], |r| Ok((r.get::<_, Option<i64>>(0)?, r.get::<_, Option<i64>>(1)?)));
    match levels {
        Ok((Some(min), Some(max))) if min >= 0 && max >= 0 => (min as u32, max as u32),
        _ => (DEFAULT_MIN_ZOOM, DEFAULT_MAX_ZOOM),
    }
}

/// Raster layers listed in `raster_columns`.
fn listed_rasters(conn: &Connection, path: &Path, lookup: &dyn ProjLookup) -> Result<Vec<RasterTable>> {
    let mut stmt = match conn.prepare("SELECT r_table_name, r_raster_column, srid FROM raster_columns") {
        Ok(stmt) => stmt,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "no raster_columns table");
            return Ok(Vec::new());
        }
    };
    let rows = stmt.query_map([], |r| {
        Ok((text(r.get_ref(0)?), text(r.get_ref(1)?), srid(r.get_ref(2)?)))
    })
    .with_context(|| format!("[catalog::raster] Failed to list rasters of {}", path.display()))?
    .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut tables = Vec::new();
    for (table_name, column, raster_srid) in rows {
        let Some(table_name) = table_name else { continue };
        let (min, max) = zoom_levels(conn, &table_name);
        let (min_zoom, max_zoom, default_zoom) = zoom_range(min, max, None);

        let contents = match contents_extent(conn, ContentsRow::Table(&table_name))? {
            Some(c) => Some(c),
            None => contents_extent(conn, ContentsRow::Features)?,
        };
        let (native, extent_srid) = match contents {
            Some(c) => (c.bounds, c.srid.unwrap_or(raster_srid)),
            None => (Bounds::world(), WGS84),
        };
        let Some(extent) = normalize_extent(lookup, extent_srid, &native) else {
            warn!(path = %path.display(), table = %table_name, "dropping raster without a usable extent");
            continue;
        };

        tables.push(RasterTable {
            database_path: path.to_path_buf(),
            title: table_name.clone(),
            table_name,
            raster_column: column.unwrap_or_default(),
            srid: raster_srid,
            min_zoom,
            max_zoom,
            default_zoom,
            center: extent.center,
            bounds: extent.bounds,
            map_type: MapType::Gpkg,
        });
    }
    Ok(tables)
}

fn parse_numbers(value: &str) -> Vec<f64> {
    value.split(',').filter_map(|v| v.trim().parse().ok()).collect()
}

/// The single tile set of an MBTiles file.
fn mbtiles_raster(conn: &Connection, path: &Path) -> Result<Option<RasterTable>> {
    if !(table_exists(conn, "metadata")? && table_exists(conn, "tiles")?) {
        return Ok(None);
    }
    let mut stmt = conn.prepare("SELECT name, value FROM metadata")
        .context("[catalog::raster] Failed to read MBTiles metadata")?;
    let metadata = stmt.query_map([], |r| Ok((text(r.get_ref(0)?), text(r.get_ref(1)?))))?
        .filter_map(|row| match row {
            Ok((Some(k), Some(v))) => Some(Ok((k.to_lowercase(), v))),
            Ok(_) => None,
            Err(e) => Some(Err(e)),
        })
        .collect::<rusqlite::Result<AHashMap<String, String>>>()?;

    let zoom = |key: &str| metadata.get(key).and_then(|v| v.trim().parse::<u32>().ok());
    let (min, max) = match (zoom("minzoom"), zoom("maxzoom")) {
        (Some(min), Some(max)) => (min, max),
        _ => conn.query_row("SELECT min(zoom_level), max(zoom_level) FROM tiles", [], |r| {
                Ok((real(r.get_ref(0)?), real(r.get_ref(1)?)))
            })
            .optional()?
            .and_then(|(min, max)| Some((min? as u32, max? as u32)))
            .unwrap_or((DEFAULT_MIN_ZOOM, DEFAULT_MAX_ZOOM)),
    };

    let bounds = metadata.get("bounds")
        .map(|v| parse_numbers(v))
        .filter(|n| n.len() == 4)
        .map(|n| Bounds::new(n[0], n[1], n[2], n[3]))
        .filter(Bounds::is_geographic)
        .unwrap_or_else(Bounds::world);
    let center_values = metadata.get("center").map(|v| parse_numbers(v)).unwrap_or_default();
    let (center, default_zoom) = match center_values.as_slice() {
        [x, y, z, ..] => (Coord { x: *x, y: *y }, Some(*z as u32)),
        [x, y] => (Coord { x: *x, y: *y }, None),
        _ => (bounds.center(), None),
    };
    let (min_zoom, max_zoom, default_zoom) = zoom_range(min, max, default_zoom);

    let title = metadata.get("name").cloned()
        .unwrap_or_else(|| path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default());

    Ok(Some(RasterTable {
        database_path: path.to_path_buf(),
        table_name: "tiles".to_string(),
        raster_column: "tile_data".to_string(),
        title,
        srid: MBTILES_SRID,
        min_zoom,
        max_zoom,
        default_zoom,
        center,
        bounds,
        map_type: MapType::Mbtiles,
    }))
}

/// Build the raster catalog of a database. The first descriptor of a table wins.
pub(crate) fn load_raster_tables(conn: &Connection, path: &Path) -> Result<Vec<RasterTable>> {
    let lookup = DatabaseSrs::new(conn);
    let mut found = listed_rasters(conn, path, &lookup)?;
    found.extend(mbtiles_raster(conn, path)?);

    let mut seen = AHashSet::new();
    let mut tables = Vec::with_capacity(found.len());
    for table in found {
        if seen.insert(table.table_name.clone()) {
            tables.push(table);
        } else {
            warn!(path = %path.display(), table = %table.table_name, "discarding duplicate raster metadata");
        }
    }

    info!(path = %path.display(), count = tables.len(), "cataloged raster tables");
    Ok(tables)
}

impl SpatialDatabase {
    /// List the raster layers of the database in discovery order.
    ///
    /// The list is built once and cached; `force` rebuilds it.
    pub fn raster_tables(&mut self, force: bool) -> Result<Arc<Vec<RasterTable>>> {
        let conn = &self.conn;
        let path = self.path().to_path_buf();
        self.rasters.get_or_try_load(force, || load_raster_tables(conn, &path))
    }
}
