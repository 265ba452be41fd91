use anyhow::{Context, Result};
use rusqlite::{types::ValueRef, Connection, OptionalExtension};

/// Quote an SQL identifier, doubling embedded quotes.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Look up the stored spelling of a table or view name (case-insensitive).
pub(crate) fn find_table(conn: &Connection, name: &str) -> Result<Option<String>> {
    conn.query_row(
        "SELECT name FROM sqlite_master WHERE type IN ('table', 'view') AND lower(name) = lower(?1)",
        [name],
        |row| row.get(0),
    )
    .optional()
    .with_context(|| format!("[db::sql] Failed to look up table {name}"))
}

#[inline]
pub(crate) fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    Ok(find_table(conn, name)?.is_some())
}

/// Names of the columns of a table, in declaration order.
pub(crate) fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_ident(table)))
        .with_context(|| format!("[db::sql] Failed to read columns of {table}"))?;
    let names = stmt.query_map([], |row| row.get::<_, String>(1))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(names)
}

/// Read a loosely typed column as text.
pub(crate) fn value_text(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Text(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Null | ValueRef::Blob(_) => None,
    }
}

/// Read a loosely typed column as a number.
pub(crate) fn value_real(value: ValueRef<'_>) -> Option<f64> {
    match value {
        ValueRef::Real(f) => Some(f),
        ValueRef::Integer(i) => Some(i as f64),
        ValueRef::Text(bytes) => std::str::from_utf8(bytes).ok()?.trim().parse().ok(),
        ValueRef::Null | ValueRef::Blob(_) => None,
    }
}

/// An R*Tree table indexing one geometry column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SpatialIndex {
    /// `idx_<table>_<column>`: pkid, xmin, xmax, ymin, ymax
    Spatialite(String),
    /// `rtree_<table>_<column>`: id, minx, maxx, miny, maxy
    GeoPackage(String),
}

/// Column names of an R*Tree table: id, min x, max x, min y, max y.
pub(crate) struct RtreeColumns {
    pub id: &'static str,
    pub min_x: &'static str,
    pub max_x: &'static str,
    pub min_y: &'static str,
    pub max_y: &'static str,
}

impl SpatialIndex {
    /// Find the R*Tree table for a geometry column, Spatialite layout first.
    pub(crate) fn detect(conn: &Connection, table: &str, column: &str) -> Result<Option<Self>> {
        if let Some(name) = find_table(conn, &format!("idx_{table}_{column}"))? {
            return Ok(Some(Self::Spatialite(name)));
        }
        if let Some(name) = find_table(conn, &format!("rtree_{table}_{column}"))? {
            return Ok(Some(Self::GeoPackage(name)));
        }
        Ok(None)
    }

    #[inline]
    pub(crate) fn table(&self) -> &str {
        match self {
            Self::Spatialite(name) | Self::GeoPackage(name) => name,
        }
    }

    pub(crate) fn columns(&self) -> RtreeColumns {
        match self {
            Self::Spatialite(_) => RtreeColumns { id: "pkid", min_x: "xmin", max_x: "xmax", min_y: "ymin", max_y: "ymax" },
            Self::GeoPackage(_) => RtreeColumns { id: "id", min_x: "minx", max_x: "maxx", min_y: "miny", max_y: "maxy" },
        }
    }
}
