use rusqlite::{Connection, OptionalExtension};
use tracing::debug;

/// EPSG code of WGS84 longitude/latitude, the canonical catalog reference system.
pub const WGS84: i32 = 4326;

const MERCATOR: &str = "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +no_defs";

/// Resolves an SRID to a PROJ.4 definition string.
pub trait ProjLookup {
    fn proj_string(&self, srid: i32) -> Option<String>;
}

/// Lookup over the built-in table of common reference systems.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinSrs;

impl ProjLookup for BuiltinSrs {
    fn proj_string(&self, srid: i32) -> Option<String> { builtin_proj4(srid) }
}

/// Lookup that falls back to the database's own `spatial_ref_sys` table
/// for codes missing from the built-in table.
pub struct DatabaseSrs<'a> {
    conn: &'a Connection,
}

impl<'a> DatabaseSrs<'a> {
    pub fn new(conn: &'a Connection) -> Self { Self { conn } }

    fn stored_proj4(&self, srid: i32) -> Option<String> {
        let mut stmt = match self.conn.prepare_cached("SELECT proj4text FROM spatial_ref_sys WHERE srid = ?1") {
            Ok(stmt) => stmt,
            Err(e) => {
                debug!(srid, error = %e, "no spatial_ref_sys table to resolve srid");
                return None;
            }
        };
        stmt.query_row([srid], |row| row.get::<_, Option<String>>(0))
            .optional()
            .ok()
            .flatten()
            .flatten()
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
    }
}

impl ProjLookup for DatabaseSrs<'_> {
    fn proj_string(&self, srid: i32) -> Option<String> {
        builtin_proj4(srid).or_else(|| self.stored_proj4(srid))
    }
}

/// SRIDs 3 and below are what some writers leave behind when the reference
/// system was never set.
#[inline]
pub fn is_unset_srid(srid: i32) -> bool { srid <= 3 }

/// Check whether a PROJ.4 definition describes a geographic (degree-based) system.
pub(crate) fn is_latlong(proj: &str) -> bool {
    ["+proj=longlat", "+proj=latlong", "+proj=lonlat", "+proj=latlon"]
        .iter()
        .any(|p| proj.contains(p))
}

fn utm(zone: i32, south: bool, datum: &str) -> String {
    let south = if south { " +south" } else { "" };
    format!("+proj=utm +zone={zone}{south} {datum} +units=m +no_defs")
}

/// PROJ.4 strings for the reference systems field data most often arrives in.
pub(crate) fn builtin_proj4(srid: i32) -> Option<String> {
    const ETRS89: &str = "+ellps=GRS80 +towgs84=0,0,0,0,0,0,0";
    Some(match srid {
        4326 => "+proj=longlat +datum=WGS84 +no_defs".to_string(),
        4258 => format!("+proj=longlat {ETRS89} +no_defs"),
        4269 => "+proj=longlat +datum=NAD83 +no_defs".to_string(),
        3857 | 3785 | 900913 => MERCATOR.to_string(),
        32601..=32660 => utm(srid - 32600, false, "+datum=WGS84"),
        32701..=32760 => utm(srid - 32700, true, "+datum=WGS84"),
        25828..=25838 => utm(srid - 25800, false, ETRS89),
        26901..=26923 => utm(srid - 26900, false, "+datum=NAD83"),
        _ => return None,
    })
}
