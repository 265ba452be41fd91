use anyhow::Result;
use geo::Geometry;

use crate::basemap::BaseMapEntry;
use crate::catalog::{RasterTable, VectorTable};
use crate::db::SpatialDatabase;

/// A map view that renders tiles from a base-map source.
pub trait TileSurface {
    /// Switch the tile source. `table` is None when the entry has no cataloged raster table.
    fn set_tile_source(&mut self, entry: &BaseMapEntry, table: Option<&RasterTable>) -> Result<()>;

    fn clear_tile_cache(&mut self);

    /// Ask the surface to re-read its data, e.g. after a geometry was committed.
    fn request_reread(&mut self);
}

impl SpatialDatabase {
    /// Insert a geometry and ask `surface` to re-read once it is committed.
    pub fn commit_geometry(
        &self,
        table: &VectorTable,
        geometry: &Geometry<f64>,
        srid: i32,
        surface: &mut dyn TileSurface,
    ) -> Result<i64> {
        let rowid = self.insert_geometry(table, geometry, srid)?;
        surface.request_reread();
        Ok(rowid)
    }
}
