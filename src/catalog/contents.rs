use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension};

use crate::db::{find_table, quote_ident, table_columns};
use crate::geom::Bounds;

/// Contents tables in lookup order: the legacy name first, then the OGC one.
const CONTENTS_TABLES: [&str; 2] = ["geopackage_contents", "gpkg_contents"];

/// Which contents row to read.
#[derive(Debug, Clone, Copy)]
pub(crate) enum ContentsRow<'a> {
    /// The row describing one table.
    Table(&'a str),
    /// The first row with `data_type = 'features'`.
    Features,
}

/// A native extent published in a contents table, with the SRID of the row when it carries one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ContentsExtent {
    pub bounds: Bounds,
    pub srid: Option<i32>,
}

/// Read the extent of a contents row, if any contents table carries one.
pub(crate) fn contents_extent(conn: &Connection, row: ContentsRow<'_>) -> Result<Option<ContentsExtent>> {
    for name in CONTENTS_TABLES {
        let Some(table) = find_table(conn, name)? else { continue };
        let columns = table_columns(conn, &table)?;
        let srid_column = columns.iter()
            .find(|c| c.eq_ignore_ascii_case("srid") || c.eq_ignore_ascii_case("srs_id"))
            .map(|c| quote_ident(c))
            .unwrap_or_else(|| "NULL".to_string());

        let (filter, param) = match row {
            ContentsRow::Table(t) => ("lower(table_name) = lower(?1)", t),
            ContentsRow::Features => ("data_type = ?1", "features"),
        };
        let sql = format!(
            "SELECT min_x, min_y, max_x, max_y, {srid_column} FROM {} WHERE {filter} LIMIT 1",
            quote_ident(&table)
        );
        let found = conn.query_row(&sql, [param], |r| {
            Ok((
                r.get::<_, Option<f64>>(0)?,
                r.get::<_, Option<f64>>(1)?,
                r.get::<_, Option<f64>>(2)?,
                r.get::<_, Option<f64>>(3)?,
                r.get::<_, Option<i32>>(4)?,
            ))
        })
        .optional()
        .with_context(|| format!("[catalog::contents] Failed to read {table}"))?;

        if let Some((Some(min_x), Some(min_y), Some(max_x), Some(max_y), srid)) = found {
            return Ok(Some(ContentsExtent { bounds: Bounds::new(min_x, min_y, max_x, max_y), srid }));
        }
    }
    Ok(None)
}
