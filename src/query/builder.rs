use anyhow::{Context, Result};
use geo::{Geometry, Intersects, Point};
use rusqlite::Connection;
use tracing::debug;

use crate::catalog::VectorTable;
use crate::db::{quote_ident, SpatialIndex};
use crate::geom::{decode_blob, Bounds};
use crate::srs::{is_unset_srid, ProjLookup, Reprojection, WGS84};

/// The SRID geometries of a layer are actually stored in.
/// Unset or unknown reference systems are read as WGS84.
pub(crate) fn native_srid(lookup: &dyn ProjLookup, table: &VectorTable) -> i32 {
    if is_unset_srid(table.srid) || lookup.proj_string(table.srid).is_none() {
        debug!(table = %table.table_name, srid = table.srid, "unresolved layer SRID, reading geometries as WGS84");
        return WGS84;
    }
    table.srid
}

/// A zero-area box is tested as a point.
fn query_area(bounds: &Bounds) -> Geometry<f64> {
    if bounds.west == bounds.east && bounds.south == bounds.north {
        Geometry::Point(Point::from(bounds.south_west()))
    } else {
        Geometry::Polygon(bounds.to_rect().to_polygon())
    }
}

/// Post-filter applied to every candidate row.
///
/// The area is the query box in the target system.
pub(crate) struct BoundsFilter {
    area: Geometry<f64>,
    to_target: Option<Reprojection>,
}

impl BoundsFilter {
    /// Decode a blob, reproject it into the target system and keep it when
    /// it truly intersects the query area.
    pub(crate) fn accept(&self, blob: &[u8]) -> Result<Option<Geometry<f64>>> {
        let decoded = decode_blob(blob)?;
        let geometry = match &self.to_target {
            Some(p) => p.geometry(&decoded.geometry)?,
            None => decoded.geometry,
        };
        Ok(geometry.intersects(&self.area).then_some(geometry))
    }
}

/// A bounding-box query against one vector layer.
///
/// The query box is given in `target_srid`; results come back in it too.
#[derive(Debug, Clone)]
pub struct BoundsQuery<'t> {
    table: &'t VectorTable,
    target_srid: i32,
    bounds: Bounds,
    attributes: Vec<String>,
}

/// SQL text, its box parameters and the filter to apply to its rows.
pub(crate) struct PlannedQuery {
    pub sql: String,
    pub params: Option<[f64; 4]>,
    pub filter: BoundsFilter,
}

impl<'t> BoundsQuery<'t> {
    pub fn new(table: &'t VectorTable, target_srid: i32, bounds: Bounds) -> Self {
        Self { table, target_srid, bounds, attributes: Vec::new() }
    }

    /// Also select these columns after the geometry column.
    pub fn with_attributes(mut self, columns: impl IntoIterator<Item = String>) -> Self {
        self.attributes.extend(columns);
        self
    }

    #[inline] pub fn table(&self) -> &VectorTable { self.table }

    #[inline] pub fn bounds(&self) -> &Bounds { &self.bounds }

    #[inline] pub fn target_srid(&self) -> i32 { self.target_srid }

    /// Resolve reprojections and the spatial index, and build the SQL.
    pub(crate) fn plan(&self, conn: &Connection, lookup: &dyn ProjLookup) -> Result<PlannedQuery> {
        let table = self.table;
        let native = native_srid(lookup, table);

        // Validates the target system even when no reprojection is needed.
        Reprojection::new(lookup, self.target_srid, WGS84)
            .with_context(|| format!("[query::plan] unusable target SRID {}", self.target_srid))?;

        let native_bounds = match Reprojection::between(lookup, self.target_srid, native)? {
            Some(p) => p.bounds(&self.bounds)
                .with_context(|| format!("[query::plan] Failed to reproject query box {}", self.bounds))?,
            None => self.bounds,
        };
        let to_target = Reprojection::between(lookup, native, self.target_srid)?;

        let geometry = quote_ident(&table.geometry_column);
        let mut select = vec![geometry.clone()];
        select.extend(self.attributes.iter().map(|c| quote_ident(c)));
        let select = select.join(", ");
        let from = quote_ident(&table.table_name);

        let (sql, params) = match SpatialIndex::detect(conn, &table.table_name, &table.geometry_column)? {
            Some(index) => {
                let c = index.columns();
                let sql = format!(
                    "SELECT {select} FROM {from} WHERE ROWID IN (\
                       SELECT {id} FROM {idx} WHERE {max_x} >= ?1 AND {min_x} <= ?2 AND {max_y} >= ?3 AND {min_y} <= ?4\
                     ) AND {geometry} IS NOT NULL",
                    id = c.id, idx = quote_ident(index.table()),
                    min_x = c.min_x, max_x = c.max_x, min_y = c.min_y, max_y = c.max_y,
                );
                let b = native_bounds;
                (sql, Some([b.west, b.east, b.south, b.north]))
            }
            None => {
                debug!(table = %table.table_name, "no spatial index, scanning whole table");
                (format!("SELECT {select} FROM {from} WHERE {geometry} IS NOT NULL"), None)
            }
        };

        Ok(PlannedQuery {
            sql,
            params,
            filter: BoundsFilter { area: query_area(&self.bounds), to_target },
        })
    }
}
