use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use geo::Coord;
use rusqlite::{types::ValueRef, Connection, Row};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::catalog::contents::{contents_extent, ContentsRow};
use crate::catalog::style::{ensure_style_table, read_style, seed_default_styles, Style};
use crate::db::{
    resolve_dialect, value_real as real, value_text as text, ColumnMap, Dialect, SpatialDatabase, SpatialIndex,
    VectorQueryMode,
};
use crate::geom::{dimension_suffix, Bounds, Dimension, GeometryType};
use crate::query::scan_extent;
use crate::srs::{normalize_extent, DatabaseSrs, ProjLookup, WGS84};

/// A vector layer discovered in a spatial database.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VectorTable {
    pub database_path: PathBuf,
    pub table_name: String,
    pub geometry_column: String,
    pub geometry_type: GeometryType,
    pub dimension: Dimension,
    /// Native SRID as published by the layer metadata.
    pub srid: i32,
    /// WGS84 center of the layer extent.
    pub center: Coord<f64>,
    /// WGS84 layer extent.
    pub bounds: Bounds,
    pub layer_type: String,
    /// Number of rows, when published (or recomputed in corrective mode).
    pub row_count: Option<i64>,
    pub spatial_index: bool,
    pub last_verified: Option<String>,
    pub dialect: Dialect,
    pub style: Style,
}

impl VectorTable {
    #[inline] pub fn is_point(&self) -> bool { self.geometry_type.is_point() }

    #[inline] pub fn is_line(&self) -> bool { self.geometry_type.is_line() }

    #[inline] pub fn is_polygon(&self) -> bool { self.geometry_type.is_polygon() }

    /// Qualified `table.column` label.
    pub fn label(&self) -> String { format!("{}.{}", self.table_name, self.geometry_column) }
}

/// One metadata row before extents are resolved.
#[derive(Debug)]
struct LayerRow {
    table_name: String,
    geometry_column: String,
    geometry_type: GeometryType,
    dimension: Dimension,
    srid: i32,
    stats: Option<LayerStats>,
}

#[derive(Debug, Default)]
struct LayerStats {
    layer_type: Option<String>,
    row_count: Option<i64>,
    extent: Option<Bounds>,
    spatial_index: bool,
    last_verified: Option<String>,
}

/// Geometry types arrive as integer codes in newer layouts and as words in older ones.
fn geometry_type(value: ValueRef<'_>) -> Result<(GeometryType, Dimension)> {
    match value {
        ValueRef::Integer(code) => GeometryType::from_code(code),
        ValueRef::Text(bytes) => {
            let s = std::str::from_utf8(bytes).context("[catalog::vector] geometry type is not UTF-8")?;
            match s.trim().parse::<i64>() {
                Ok(code) => GeometryType::from_code(code),
                Err(_) => Ok((s.parse()?, dimension_suffix(s))),
            }
        }
        other => bail!("[catalog::vector] unreadable geometry type of kind {}", other.data_type()),
    }
}

/// Missing or non-numeric SRIDs read as 0, which later counts as unset.
pub(super) fn srid(value: ValueRef<'_>) -> i32 {
    real(value).map_or(0, |v| v as i32)
}

fn read_layer(row: &Row<'_>, columns: &ColumnMap) -> Result<LayerRow> {
    let table_name = text(row.get_ref(columns.table)?)
        .ok_or_else(|| anyhow!("[catalog::vector] layer row without table name"))?;
    let geometry_column = text(row.get_ref(columns.geometry_column)?)
        .ok_or_else(|| anyhow!("[catalog::vector] layer {table_name} without geometry column"))?;
    let (geometry_type, mut dimension) = geometry_type(row.get_ref(columns.geometry_type)?)
        .with_context(|| format!("[catalog::vector] layer {table_name}.{geometry_column}"))?;
    let srid = srid(row.get_ref(columns.srid)?);

    let stats = match columns.stats {
        None => None,
        Some(s) => {
            if let Some(d) = text(row.get_ref(s.coord_dimension)?).and_then(|l| Dimension::from_label(&l).ok()) {
                dimension = d;
            }
            let extent = match (
                real(row.get_ref(s.min_x)?),
                real(row.get_ref(s.min_y)?),
                real(row.get_ref(s.max_x)?),
                real(row.get_ref(s.max_y)?),
            ) {
                (Some(w), Some(so), Some(e), Some(n)) => Some(Bounds::new(w, so, e, n)),
                _ => None,
            };
            Some(LayerStats {
                layer_type: text(row.get_ref(s.layer_type)?),
                row_count: real(row.get_ref(s.row_count)?).map(|v| v as i64),
                extent,
                spatial_index: real(row.get_ref(s.spatial_index)?).is_some_and(|v| v != 0.0),
                last_verified: text(row.get_ref(s.last_verified)?),
            })
        }
    };

    Ok(LayerRow { table_name, geometry_column, geometry_type, dimension, srid, stats })
}

/// Read every layer row the resolved dialect lists, skipping rows that cannot be decoded.
fn layer_rows(conn: &Connection, path: &Path) -> Result<Option<(Dialect, Vec<LayerRow>)>> {
    let Some(mut resolved) = resolve_dialect(conn) else {
        debug!(path = %path.display(), "no vector layer metadata");
        return Ok(None);
    };

    let mut layers = Vec::new();
    let mut rows = resolved.statement.query([])
        .with_context(|| format!("[catalog::vector] Failed to list layers of {}", path.display()))?;
    while let Some(row) = rows.next()
        .with_context(|| format!("[catalog::vector] Failed to read layers of {}", path.display()))?
    {
        match read_layer(row, &resolved.columns) {
            Ok(layer) => layers.push(layer),
            Err(e) => warn!(path = %path.display(), error = %e, "skipping layer with undecodable metadata"),
        }
    }
    Ok(Some((resolved.dialect, layers)))
}

/// Resolve extent, row count and index flag of one layer.
/// Returns None when the extent cannot be expressed in WGS84.
fn describe(
    conn: &Connection,
    lookup: &dyn ProjLookup,
    path: &Path,
    dialect: Dialect,
    mode: VectorQueryMode,
    layer: LayerRow,
) -> Result<Option<VectorTable>> {
    let LayerRow { table_name, geometry_column, geometry_type, dimension, srid, stats } = layer;

    let spatial_index = match &stats {
        Some(s) => s.spatial_index,
        None => SpatialIndex::detect(conn, &table_name, &geometry_column)?.is_some(),
    };
    let stats = stats.unwrap_or_default();

    let (row_count, scanned) = match mode {
        VectorQueryMode::Corrective => {
            let (count, extent) = scan_extent(conn, &table_name, &geometry_column)?;
            (Some(count), extent)
        }
        VectorQueryMode::Strict => (stats.row_count, stats.extent),
    };

    let (native, extent_srid) = match scanned {
        Some(b) => (b, srid),
        None => match contents_extent(conn, ContentsRow::Table(&table_name))? {
            Some(c) => (c.bounds, c.srid.unwrap_or(srid)),
            None => (Bounds::world(), WGS84),
        },
    };

    let Some(extent) = normalize_extent(lookup, extent_srid, &native) else {
        warn!(path = %path.display(), table = %table_name, srid, "dropping layer without a usable extent");
        return Ok(None);
    };

    Ok(Some(VectorTable {
        database_path: path.to_path_buf(),
        style: Style::new(&table_name),
        table_name,
        geometry_column,
        geometry_type,
        dimension,
        srid,
        center: extent.center,
        bounds: extent.bounds,
        layer_type: stats.layer_type.unwrap_or_else(|| "geometry".to_string()),
        row_count,
        spatial_index,
        last_verified: stats.last_verified,
        dialect,
    }))
}

/// Build the vector catalog of a database, seeding default styles for new layers.
pub(crate) fn load_vector_tables(conn: &Connection, path: &Path, mode: VectorQueryMode) -> Result<Vec<VectorTable>> {
    let Some((dialect, layers)) = layer_rows(conn, path)? else {
        return Ok(Vec::new());
    };

    let lookup = DatabaseSrs::new(conn);
    let mut tables = Vec::with_capacity(layers.len());
    for layer in layers {
        let table = layer.table_name.clone();
        match describe(conn, &lookup, path, dialect, mode, layer) {
            Ok(Some(t)) => tables.push(t),
            Ok(None) => {}
            Err(e) => warn!(path = %path.display(), table = %table, error = %e, "skipping layer"),
        }
    }

    ensure_style_table(conn)?;
    seed_default_styles(conn, tables.iter().map(|t| t.table_name.as_str()))?;
    for table in &mut tables {
        if let Some(style) = read_style(conn, &table.table_name)? {
            table.style = style;
        }
    }
    tables.sort_by_key(|t| t.style.order);

    info!(path = %path.display(), ?dialect, count = tables.len(), "cataloged vector tables");
    Ok(tables)
}

impl SpatialDatabase {
    /// List the vector layers of the database, ordered by style draw order.
    ///
    /// The list is built once and cached; `force` rebuilds it.
    pub fn vector_tables(&mut self, force: bool) -> Result<Arc<Vec<VectorTable>>> {
        let conn = &self.conn;
        let path = self.path().to_path_buf();
        let mode = self.options().query_mode;
        self.vectors.get_or_try_load(force, || load_vector_tables(conn, &path, mode))
    }

    /// Find a cataloged vector layer by table name (case-insensitive).
    pub fn vector_table(&mut self, table: &str) -> Result<Option<VectorTable>> {
        Ok(self.vector_tables(false)?
            .iter()
            .find(|t| t.table_name.eq_ignore_ascii_case(table))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geometry_type_from_either_form() {
        let (ty, dim) = geometry_type(ValueRef::Integer(1006)).unwrap();
        assert_eq!((ty, dim), (GeometryType::MultiPolygon, Dimension::Xyz));
        let (ty, dim) = geometry_type(ValueRef::Text(b"LINESTRING")).unwrap();
        assert_eq!((ty, dim), (GeometryType::LineString, Dimension::Xy));
        let (ty, _) = geometry_type(ValueRef::Text(b"3")).unwrap();
        assert_eq!(ty, GeometryType::Polygon);
        assert!(geometry_type(ValueRef::Text(b"CIRCLE")).is_err());
        assert!(geometry_type(ValueRef::Null).is_err());
    }

    #[test]
    fn srid_reads_loosely() {
        assert_eq!(srid(ValueRef::Integer(3857)), 3857);
        assert_eq!(srid(ValueRef::Text(b" 4326 ")), 4326);
        assert_eq!(srid(ValueRef::Null), 0);
    }
}
