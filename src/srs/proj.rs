use anyhow::{anyhow, bail, Context, Result};
use geo::{Coord, Geometry, MapCoords};
use proj4rs::{proj::Proj as Proj4, transform::transform};

use crate::geom::{Bounds, MERCATOR_MAX_LAT};
use crate::srs::lookup::{is_latlong, ProjLookup};

/// A resolved transformation between two reference systems.
///
/// Geographic systems are fed and read in degrees; the conversion to the
/// radians proj4rs works in happens here. Latitudes headed into a Mercator
/// system are clamped to what Mercator can represent.
pub struct Reprojection {
    from: Proj4,
    to: Proj4,
    from_latlong: bool,
    to_latlong: bool,
    to_mercator: bool,
    from_srid: i32,
    to_srid: i32,
}

/// Points per box edge when reprojecting a box.
const EDGE_SEGMENTS: usize = 16;

fn build(lookup: &dyn ProjLookup, srid: i32) -> Result<(Proj4, String)> {
    let proj_string = lookup.proj_string(srid)
        .ok_or_else(|| anyhow!("[srs::proj] no PROJ.4 definition for SRID {srid}"))?;
    let proj = Proj4::from_proj_string(&proj_string)
        .with_context(|| anyhow!("[srs::proj] failed to build PROJ.4 for SRID {srid}: {proj_string}"))?;
    Ok((proj, proj_string))
}

impl Reprojection {
    /// Resolve both ends of the transformation.
    pub fn new(lookup: &dyn ProjLookup, from_srid: i32, to_srid: i32) -> Result<Self> {
        let (from, from_def) = build(lookup, from_srid)?;
        let (to, to_def) = build(lookup, to_srid)?;
        Ok(Self {
            from,
            to,
            from_latlong: is_latlong(&from_def),
            to_latlong: is_latlong(&to_def),
            to_mercator: to_def.contains("+proj=merc"),
            from_srid,
            to_srid,
        })
    }

    /// Resolve a transformation, or None when both ends are the same system.
    pub fn between(lookup: &dyn ProjLookup, from_srid: i32, to_srid: i32) -> Result<Option<Self>> {
        if from_srid == to_srid { return Ok(None) }
        Self::new(lookup, from_srid, to_srid).map(Some)
    }

    #[inline] pub fn from_srid(&self) -> i32 { self.from_srid }

    #[inline] pub fn to_srid(&self) -> i32 { self.to_srid }

    /// Transform one coordinate.
    pub fn coord(&self, coord: Coord<f64>) -> Result<Coord<f64>> {
        let mut point = if self.from_latlong {
            let lat = if self.to_mercator {
                coord.y.clamp(-MERCATOR_MAX_LAT, MERCATOR_MAX_LAT)
            } else {
                coord.y
            };
            (coord.x.to_radians(), lat.to_radians(), 0.0)
        } else {
            (coord.x, coord.y, 0.0)
        };
        transform(&self.from, &self.to, &mut point)
            .with_context(|| anyhow!("[srs::proj] transform {} -> {} failed at ({}, {})",
                self.from_srid, self.to_srid, coord.x, coord.y))?;

        let out = if self.to_latlong {
            Coord { x: point.0.to_degrees(), y: point.1.to_degrees() }
        } else {
            Coord { x: point.0, y: point.1 }
        };
        if !(out.x.is_finite() && out.y.is_finite()) {
            bail!("[srs::proj] transform {} -> {} produced a non-finite coordinate", self.from_srid, self.to_srid);
        }
        Ok(out)
    }

    /// Transform every coordinate of a geometry.
    pub fn geometry(&self, geometry: &Geometry<f64>) -> Result<Geometry<f64>> {
        geometry.try_map_coords(|c| self.coord(c))
    }

    /// Transform a box by sampling its outline and taking the envelope of the result.
    pub fn bounds(&self, bounds: &Bounds) -> Result<Bounds> {
        let points = bounds.outline_points(EDGE_SEGMENTS)
            .into_iter()
            .map(|c| self.coord(c))
            .collect::<Result<Vec<_>>>()?;
        Bounds::enclosing(points)
            .ok_or_else(|| anyhow!("[srs::proj] empty sample set for {bounds}"))
    }
}
