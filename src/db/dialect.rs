//! Resolution of the spatial-metadata layout a database publishes its
//! vector layers in.
//!
//! Candidates are tried newest first. Only a failure to prepare a candidate
//! moves on to the next one; execution errors belong to the caller.

use rusqlite::{Connection, Statement};
use serde::Serialize;
use tracing::debug;

/// Known layouts of vector-layer metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    /// `vector_layers` joined with `vector_layers_statistics` (Spatialite 4+).
    LayerStatistics,
    /// `geometry_columns` with a text `type` column (Spatialite 2/3).
    GeometryColumnsText,
    /// `geometry_columns` with an integer `geometry_type` column.
    GeometryColumnsCode,
}

/// Result-column positions of the per-layer statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct StatsColumns {
    pub layer_type: usize,
    pub row_count: usize,
    pub min_x: usize,
    pub min_y: usize,
    pub max_x: usize,
    pub max_y: usize,
    pub coord_dimension: usize,
    pub spatial_index: usize,
    pub last_verified: usize,
}

/// Result-column positions for a resolved candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ColumnMap {
    pub table: usize,
    pub geometry_column: usize,
    pub geometry_type: usize,
    pub srid: usize,
    pub stats: Option<StatsColumns>,
}

struct Candidate {
    dialect: Dialect,
    sql: &'static str,
    columns: ColumnMap,
}

const BASIC_COLUMNS: ColumnMap = ColumnMap { table: 0, geometry_column: 1, geometry_type: 2, srid: 3, stats: None };

const CANDIDATES: [Candidate; 3] = [
    Candidate {
        dialect: Dialect::LayerStatistics,
        sql: "SELECT s.table_name, s.geometry_column, v.geometry_type, v.srid, \
                     s.layer_type, s.row_count, \
                     s.extent_min_x, s.extent_min_y, s.extent_max_x, s.extent_max_y, \
                     v.coord_dimension, v.spatial_index_enabled, s.last_verified \
              FROM vector_layers_statistics s \
              JOIN vector_layers v \
                ON lower(s.table_name) = lower(v.table_name) \
               AND lower(s.geometry_column) = lower(v.geometry_column)",
        columns: ColumnMap {
            stats: Some(StatsColumns {
                layer_type: 4,
                row_count: 5,
                min_x: 6,
                min_y: 7,
                max_x: 8,
                max_y: 9,
                coord_dimension: 10,
                spatial_index: 11,
                last_verified: 12,
            }),
            ..BASIC_COLUMNS
        },
    },
    Candidate {
        dialect: Dialect::GeometryColumnsText,
        sql: "SELECT f_table_name, f_geometry_column, type, srid FROM geometry_columns",
        columns: BASIC_COLUMNS,
    },
    Candidate {
        dialect: Dialect::GeometryColumnsCode,
        sql: "SELECT f_table_name, f_geometry_column, geometry_type, srid FROM geometry_columns",
        columns: BASIC_COLUMNS,
    },
];

/// A prepared layer-listing statement and how to read it.
pub(crate) struct Resolved<'conn> {
    pub dialect: Dialect,
    pub columns: ColumnMap,
    pub statement: Statement<'conn>,
}

/// Prepare the first candidate the database accepts, or None when it
/// publishes no vector-layer metadata at all.
pub(crate) fn resolve(conn: &Connection) -> Option<Resolved<'_>> {
    for candidate in &CANDIDATES {
        match conn.prepare(candidate.sql) {
            Ok(statement) => {
                debug!(dialect = ?candidate.dialect, "resolved metadata dialect");
                return Some(Resolved { dialect: candidate.dialect, columns: candidate.columns, statement });
            }
            Err(e) => debug!(dialect = ?candidate.dialect, error = %e, "dialect probe failed, trying next"),
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dialect_of(ddl: &str) -> Option<Dialect> {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(ddl).unwrap();
        resolve(&conn).map(|r| r.dialect)
    }

    #[test]
    fn statistics_dialect_wins_when_present() {
        let ddl = "
            CREATE TABLE geometry_columns (f_table_name TEXT, f_geometry_column TEXT, geometry_type INTEGER, srid INTEGER);
            CREATE TABLE vector_layers (layer_type TEXT, table_name TEXT, geometry_column TEXT, geometry_type INTEGER,
                coord_dimension TEXT, srid INTEGER, spatial_index_enabled INTEGER);
            CREATE TABLE vector_layers_statistics (layer_type TEXT, table_name TEXT, geometry_column TEXT, row_count INTEGER,
                extent_min_x REAL, extent_min_y REAL, extent_max_x REAL, extent_max_y REAL, last_verified TEXT);";
        assert_eq!(dialect_of(ddl), Some(Dialect::LayerStatistics));
    }

    #[test]
    fn text_type_column() {
        let ddl = "CREATE TABLE geometry_columns (f_table_name TEXT, f_geometry_column TEXT, type TEXT, coord_dimension TEXT, srid INTEGER);";
        assert_eq!(dialect_of(ddl), Some(Dialect::GeometryColumnsText));
    }

    #[test]
    fn integer_type_column() {
        let ddl = "CREATE TABLE geometry_columns (f_table_name TEXT, f_geometry_column TEXT, geometry_type INTEGER, coord_dimension INTEGER, srid INTEGER);";
        assert_eq!(dialect_of(ddl), Some(Dialect::GeometryColumnsCode));
    }

    #[test]
    fn no_metadata_resolves_nothing() {
        assert_eq!(dialect_of("CREATE TABLE towns (id INTEGER);"), None);
    }

    #[test]
    fn statistics_column_map_is_complete() {
        let stats = CANDIDATES[0].columns.stats.unwrap();
        assert_eq!(stats.last_verified, 12);
        assert!(CANDIDATES[1].columns.stats.is_none());
    }
}
