use anyhow::{Context, Result};
use geo::{BoundingRect, Geometry};
use rusqlite::{params, types::ValueRef, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::catalog::VectorTable;
use crate::db::{quote_ident, table_columns, value_real, SpatialDatabase, SpatialIndex};
use crate::geom::{decode_blob, encode_blob, geometry_to_wkb, BlobFormat, Bounds};
use crate::query::builder::{native_srid, BoundsQuery};
use crate::query::cursor::{next_match, BoundsStatement, GeometryCursor};
use crate::srs::{DatabaseSrs, Reprojection};

/// Attribute values of one feature as (column, text) pairs; NULL reads as empty text.
pub type Attributes = Vec<(String, String)>;

/// Row count and MBR of a geometry column, computed from the stored blobs.
pub(crate) fn scan_extent(conn: &Connection, table: &str, column: &str) -> Result<(i64, Option<Bounds>)> {
    let sql = format!("SELECT {} FROM {}", quote_ident(column), quote_ident(table));
    let mut stmt = conn.prepare(&sql)
        .with_context(|| format!("[query::scan_extent] Failed to scan {table}.{column}"))?;
    let mut rows = stmt.query([])?;

    let mut count = 0;
    let mut extent: Option<Bounds> = None;
    while let Some(row) = rows.next()? {
        count += 1;
        let ValueRef::Blob(blob) = row.get_ref(0)? else { continue };
        match decode_blob(blob) {
            Ok(decoded) => if let Some(rect) = decoded.geometry.bounding_rect() {
                let b = Bounds::from(rect);
                extent = Some(extent.map_or(b, |e| e.union(&b)));
            },
            Err(e) => debug!(table, error = %e, "ignoring malformed geometry in extent scan"),
        }
    }
    Ok((count, extent))
}

/// MBR of a geometry column read from its R*Tree index.
fn index_extent(conn: &Connection, index: &SpatialIndex) -> Result<Option<Bounds>> {
    let c = index.columns();
    let sql = format!(
        "SELECT min({}), min({}), max({}), max({}) FROM {}",
        c.min_x, c.min_y, c.max_x, c.max_y, quote_ident(index.table())
    );
    let values = conn.query_row(&sql, [], |r| {
        Ok([value_real(r.get_ref(0)?), value_real(r.get_ref(1)?), value_real(r.get_ref(2)?), value_real(r.get_ref(3)?)])
    })
    .with_context(|| format!("[query::index_extent] Failed to read {}", index.table()))?;
    Ok(match values {
        [Some(w), Some(s), Some(e), Some(n)] => Some(Bounds::new(w, s, e, n)),
        _ => None,
    })
}

impl SpatialDatabase {
    /// Prepare a bounding-box query on a layer.
    ///
    /// `bounds` is given in `target_srid`, and matching geometries are returned in it.
    pub fn prepare_bounds_query(&self, query: &BoundsQuery<'_>) -> Result<BoundsStatement<'_>> {
        let lookup = DatabaseSrs::new(&self.conn);
        let planned = query.plan(&self.conn, &lookup)?;
        let stmt = self.conn.prepare(&planned.sql)
            .with_context(|| format!("[query::prepare] Failed to prepare query on {}", query.table().table_name))?;
        Ok(BoundsStatement::new(stmt, planned, &query.table().table_name))
    }

    /// Run a lazy bounding-box query, handing the cursor to `f`.
    ///
    /// The cursor is closed when `f` returns, however much of it was consumed.
    pub fn with_geometries_in_bounds<R>(
        &self,
        table: &VectorTable,
        target_srid: i32,
        bounds: Bounds,
        f: impl FnOnce(&mut GeometryCursor<'_>) -> R,
    ) -> Result<R> {
        let mut statement = self.prepare_bounds_query(&BoundsQuery::new(table, target_srid, bounds))?;
        let mut cursor = statement.cursor()?;
        let out = f(&mut cursor);
        cursor.close();
        Ok(out)
    }

    /// Collect every geometry of a layer intersecting `bounds`.
    pub fn query_in_bounds(&self, table: &VectorTable, target_srid: i32, bounds: Bounds) -> Result<Vec<Geometry<f64>>> {
        self.with_geometries_in_bounds(table, target_srid, bounds, |cursor| cursor.collect::<Result<Vec<_>>>())?
    }

    /// Collect every geometry of a layer intersecting `bounds`, encoded as WKB.
    pub fn query_wkb_in_bounds(&self, table: &VectorTable, target_srid: i32, bounds: Bounds) -> Result<Vec<Vec<u8>>> {
        Ok(self.query_in_bounds(table, target_srid, bounds)?
            .iter()
            .map(geometry_to_wkb)
            .collect())
    }

    /// Get the extent of a layer's geometries expressed in `srid`, or None for an empty layer.
    pub fn table_bounds_in_srid(&self, table: &VectorTable, srid: i32) -> Result<Option<Bounds>> {
        let lookup = DatabaseSrs::new(&self.conn);
        let native = native_srid(&lookup, table);

        let indexed = match SpatialIndex::detect(&self.conn, &table.table_name, &table.geometry_column)? {
            Some(index) => index_extent(&self.conn, &index)?,
            None => None,
        };
        let extent = match indexed {
            Some(b) => Some(b),
            None => scan_extent(&self.conn, &table.table_name, &table.geometry_column)?.1,
        };
        let Some(extent) = extent else { return Ok(None) };

        match Reprojection::between(&lookup, native, srid)? {
            Some(p) => p.bounds(&extent).map(Some),
            None => Ok(Some(extent)),
        }
    }

    /// Hit-test a layer: the non-geometry columns of every feature intersecting `bounds`.
    ///
    /// A point query is a zero-area box.
    pub fn attributes_in_bounds(&self, table: &VectorTable, target_srid: i32, bounds: Bounds) -> Result<Vec<Attributes>> {
        let columns = table_columns(&self.conn, &table.table_name)?
            .into_iter()
            .filter(|c| !c.eq_ignore_ascii_case(&table.geometry_column))
            .collect::<Vec<_>>();
        let query = BoundsQuery::new(table, target_srid, bounds).with_attributes(columns.iter().cloned());
        let mut statement = self.prepare_bounds_query(&query)?;
        let (mut rows, filter, name) = statement.execute()?;

        let mut features = Vec::new();
        while let Some(found) = next_match(&mut rows, filter, name, columns.len())
            .with_context(|| format!("[query::attributes_in_bounds] query on {name} failed"))?
        {
            features.push(columns.iter()
                .cloned()
                .zip(found.attributes.into_iter().map(Option::unwrap_or_default))
                .collect());
        }
        Ok(features)
    }

    /// Insert a geometry given in `srid` into a layer and its spatial index.
    ///
    /// Returns the row id of the new feature.
    pub fn insert_geometry(&self, table: &VectorTable, geometry: &Geometry<f64>, srid: i32) -> Result<i64> {
        let lookup = DatabaseSrs::new(&self.conn);
        let native = native_srid(&lookup, table);
        let geometry = match Reprojection::between(&lookup, srid, native)? {
            Some(p) => p.geometry(geometry)
                .with_context(|| format!("[query::insert_geometry] Failed to reproject into SRID {native}"))?,
            None => geometry.clone(),
        };

        let table_name = quote_ident(&table.table_name);
        let column = quote_ident(&table.geometry_column);
        let index = SpatialIndex::detect(&self.conn, &table.table_name, &table.geometry_column)?;

        let existing: Option<Vec<u8>> = self.conn.query_row(
            &format!("SELECT {column} FROM {table_name} WHERE {column} IS NOT NULL LIMIT 1"),
            [],
            |r| r.get(0),
        )
        .optional()
        .with_context(|| format!("[query::insert_geometry] Failed to sample {}", table.table_name))?;
        let format = existing.as_deref()
            .and_then(BlobFormat::detect)
            .unwrap_or(match index {
                Some(SpatialIndex::GeoPackage(_)) => BlobFormat::GeoPackage,
                _ => BlobFormat::Spatialite,
            });
        let blob_srid = if table.srid > 0 { table.srid } else { native };
        let blob = encode_blob(&geometry, blob_srid, format);

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(&format!("INSERT INTO {table_name} ({column}) VALUES (?1)"), params![blob])
            .with_context(|| format!("[query::insert_geometry] Failed to insert into {}", table.table_name))?;
        let rowid = tx.last_insert_rowid();

        if let (Some(index), Some(rect)) = (&index, geometry.bounding_rect()) {
            let c = index.columns();
            tx.execute(
                &format!(
                    "INSERT OR REPLACE INTO {} ({}, {}, {}, {}, {}) VALUES (?1, ?2, ?3, ?4, ?5)",
                    quote_ident(index.table()), c.id, c.min_x, c.max_x, c.min_y, c.max_y
                ),
                params![rowid, rect.min().x, rect.max().x, rect.min().y, rect.max().y],
            )
            .with_context(|| format!("[query::insert_geometry] Failed to index row {rowid} of {}", table.table_name))?;
        }
        tx.commit().context("[query::insert_geometry] Failed to commit")?;

        info!(table = %table.table_name, rowid, ?format, "inserted geometry");
        Ok(rowid)
    }
}
