use geo::Coord;
use serde::Serialize;
use tracing::warn;

use crate::geom::Bounds;
use crate::srs::{is_unset_srid, ProjLookup, Reprojection, WGS84};

/// A layer extent carried into WGS84.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Wgs84Extent {
    pub center: Coord<f64>,
    pub bounds: Bounds,
    /// The native SRID could not be used and the coordinates were taken as WGS84.
    pub recovered: bool,
}

/// Transform the midpoint and the two corners of `native` into WGS84.
fn three_points(projection: &Reprojection, native: &Bounds) -> anyhow::Result<(Coord<f64>, Bounds)> {
    let center = projection.coord(native.center())?;
    let sw = projection.coord(native.south_west())?;
    let ne = projection.coord(native.north_east())?;
    Ok((center, Bounds::new(sw.x, sw.y, ne.x, ne.y)))
}

/// Normalize a native extent into a WGS84 center and box.
///
/// Unset, unresolvable or failing SRIDs fall back to reading the coordinates
/// as WGS84. Returns None when even that yields no valid geographic box.
pub fn normalize_extent(lookup: &dyn ProjLookup, srid: i32, native: &Bounds) -> Option<Wgs84Extent> {
    if srid == WGS84 {
        return native.is_geographic()
            .then(|| Wgs84Extent { center: native.center(), bounds: *native, recovered: false });
    }

    if !is_unset_srid(srid) {
        let projected = Reprojection::new(lookup, srid, WGS84)
            .and_then(|p| three_points(&p, native));
        match projected {
            Ok((center, bounds)) if bounds.is_geographic() => {
                return Some(Wgs84Extent { center, bounds, recovered: false });
            }
            Ok((_, bounds)) => warn!(srid, %bounds, "reprojected extent outside WGS84 range"),
            Err(e) => warn!(srid, error = %e, "unresolved SRID, reading extent as WGS84"),
        }
    } else {
        warn!(srid, "unset SRID, reading extent as WGS84");
    }

    if !native.is_geographic() {
        warn!(srid, bounds = %native, "extent is not usable as WGS84, rejecting");
        return None;
    }
    Some(Wgs84Extent { center: native.center(), bounds: *native, recovered: true })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::srs::BuiltinSrs;

    const R: f64 = 6378137.0;

    fn merc_to_deg(x: f64, y: f64) -> (f64, f64) {
        ((x / R).to_degrees(), (y / R).sinh().atan().to_degrees())
    }

    #[test]
    fn wgs84_is_identity() {
        let b = Bounds::new(-10.5, 35.0, 20.25, 60.0);
        let e = normalize_extent(&BuiltinSrs, 4326, &b).unwrap();
        assert_eq!(e.bounds, b);
        assert_eq!(e.center, b.center());
        assert!(!e.recovered);
    }

    #[test]
    fn mercator_extent_is_reprojected() {
        let b = Bounds::new(10.0, 40.0, 12.0, 42.0);
        let e = normalize_extent(&BuiltinSrs, 3857, &b).unwrap();
        let (cx, cy) = merc_to_deg(11.0, 41.0);
        assert!((e.center.x - cx).abs() < 1e-9 && (e.center.y - cy).abs() < 1e-9);
        assert_ne!((e.center.x, e.center.y), (11.0, 41.0));
        assert!(!e.recovered);
    }

    #[test]
    fn unset_srid_reads_as_wgs84() {
        let b = Bounds::new(10.0, 40.0, 12.0, 42.0);
        for srid in [0, 1, 2, 3] {
            let e = normalize_extent(&BuiltinSrs, srid, &b).unwrap();
            assert_eq!(e.bounds, b);
            assert!(e.recovered);
        }
    }

    #[test]
    fn unknown_srid_reads_as_wgs84() {
        let b = Bounds::new(10.0, 40.0, 12.0, 42.0);
        let e = normalize_extent(&BuiltinSrs, 123_456, &b).unwrap();
        assert_eq!(e.center, b.center());
        assert!(e.recovered);
    }

    #[test]
    fn unusable_extent_is_rejected() {
        let b = Bounds::new(500_000.0, 4_000_000.0, 600_000.0, 4_100_000.0);
        assert!(normalize_extent(&BuiltinSrs, 123_456, &b).is_none());
        assert!(normalize_extent(&BuiltinSrs, 4326, &Bounds::new(0.0, f64::NAN, 1.0, 1.0)).is_none());
    }
}
