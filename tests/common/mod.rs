#![allow(dead_code)]

use std::path::{Path, PathBuf};

use fieldmap::{encode_blob, BlobFormat};
use geo::{Geometry, Point};
use rusqlite::{params, Connection};

pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Where a fixture keeps its R*Tree index, if it has one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Index {
    None,
    Spatialite,
    GeoPackage,
}

pub fn point(x: f64, y: f64) -> Geometry<f64> {
    Geometry::Point(Point::new(x, y))
}

/// A data table `name (id INTEGER PRIMARY KEY, name TEXT, geom BLOB)` with the given points.
pub fn create_points(conn: &Connection, table: &str, points: &[(f64, f64)], srid: i32, format: BlobFormat, index: Index) {
    conn.execute_batch(&format!("CREATE TABLE {table} (id INTEGER PRIMARY KEY, name TEXT, geom BLOB);")).unwrap();
    match index {
        Index::None => {}
        Index::Spatialite => conn.execute_batch(&format!(
            "CREATE VIRTUAL TABLE idx_{table}_geom USING rtree(pkid, xmin, xmax, ymin, ymax);"
        )).unwrap(),
        Index::GeoPackage => conn.execute_batch(&format!(
            "CREATE VIRTUAL TABLE rtree_{table}_geom USING rtree(id, minx, maxx, miny, maxy);"
        )).unwrap(),
    }
    for (i, (x, y)) in points.iter().enumerate() {
        let blob = encode_blob(&point(*x, *y), srid, format);
        conn.execute(
            &format!("INSERT INTO {table} (name, geom) VALUES (?1, ?2)"),
            params![format!("{table}-{i}"), blob],
        ).unwrap();
        let rowid = conn.last_insert_rowid();
        let sql = match index {
            Index::None => continue,
            Index::Spatialite => format!("INSERT INTO idx_{table}_geom VALUES (?1, ?2, ?3, ?4, ?5)"),
            Index::GeoPackage => format!("INSERT INTO rtree_{table}_geom VALUES (?1, ?2, ?3, ?4, ?5)"),
        };
        conn.execute(&sql, params![rowid, x, x, y, y]).unwrap();
    }
}

/// Spatialite 4 layout: `vector_layers` plus `vector_layers_statistics`.
pub fn spatialite_v4(dir: &Path, points: &[(f64, f64)]) -> PathBuf {
    let path = dir.join("survey_v4.sqlite");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        "CREATE TABLE spatial_ref_sys (srid INTEGER PRIMARY KEY, auth_name TEXT, proj4text TEXT);
         INSERT INTO spatial_ref_sys VALUES (4326, 'epsg', '+proj=longlat +datum=WGS84 +no_defs');
         CREATE TABLE geometry_columns (f_table_name TEXT, f_geometry_column TEXT, geometry_type INTEGER,
             coord_dimension INTEGER, srid INTEGER, spatial_index_enabled INTEGER);
         CREATE TABLE vector_layers (layer_type TEXT, table_name TEXT, geometry_column TEXT, geometry_type INTEGER,
             coord_dimension TEXT, srid INTEGER, spatial_index_enabled INTEGER);
         CREATE TABLE vector_layers_statistics (layer_type TEXT, table_name TEXT, geometry_column TEXT, row_count INTEGER,
             extent_min_x REAL, extent_min_y REAL, extent_max_x REAL, extent_max_y REAL, last_verified TEXT);
         INSERT INTO geometry_columns VALUES ('towns', 'geom', 1, 2, 4326, 1);
         INSERT INTO vector_layers VALUES ('SpatialTable', 'towns', 'geom', 1, 'XY', 4326, 1);",
    ).unwrap();
    create_points(&conn, "towns", points, 4326, BlobFormat::Spatialite, Index::Spatialite);
    let [west, south, east, north] = extent(points);
    conn.execute(
        "INSERT INTO vector_layers_statistics VALUES ('SpatialTable', 'towns', 'geom', ?1, ?2, ?3, ?4, ?5, '2024-01-01T00:00:00Z')",
        params![points.len() as i64, west, south, east, north],
    ).unwrap();
    path
}

/// Spatialite 2/3 layout: `geometry_columns` with a text `type` column.
pub fn spatialite_v3(dir: &Path, points: &[(f64, f64)]) -> PathBuf {
    let path = dir.join("survey_v3.sqlite");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        "CREATE TABLE geometry_columns (f_table_name TEXT, f_geometry_column TEXT, type TEXT,
             coord_dimension TEXT, srid INTEGER, spatial_index_enabled INTEGER);
         INSERT INTO geometry_columns VALUES ('towns', 'geom', 'POINT', 'XY', 4326, 1);",
    ).unwrap();
    create_points(&conn, "towns", points, 4326, BlobFormat::Spatialite, Index::Spatialite);
    path
}

/// Spatialite 2/3 layout holding an empty `towns` layer stored in `srid`.
pub fn projected_layer(dir: &Path, srid: i32) -> PathBuf {
    let path = dir.join(format!("survey_{srid}.sqlite"));
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        "CREATE TABLE geometry_columns (f_table_name TEXT, f_geometry_column TEXT, type TEXT,
             coord_dimension TEXT, srid INTEGER, spatial_index_enabled INTEGER);",
    ).unwrap();
    conn.execute(
        "INSERT INTO geometry_columns VALUES ('towns', 'geom', 'POINT', 'XY', ?1, 1)",
        params![srid],
    ).unwrap();
    create_points(&conn, "towns", &[], srid, BlobFormat::Spatialite, Index::Spatialite);
    path
}

/// GeoPackage-style layout: integer `geometry_type`, contents table and `rtree_` index.
pub fn geopackage(dir: &Path, points: &[(f64, f64)]) -> PathBuf {
    let path = dir.join("survey.gpkg");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        "CREATE TABLE geometry_columns (f_table_name TEXT, f_geometry_column TEXT, geometry_type INTEGER,
             coord_dimension INTEGER, srid INTEGER);
         INSERT INTO geometry_columns VALUES ('towns', 'geom', 1, 2, 4326);
         CREATE TABLE geopackage_contents (table_name TEXT, data_type TEXT, min_x REAL, min_y REAL,
             max_x REAL, max_y REAL, srid INTEGER);",
    ).unwrap();
    create_points(&conn, "towns", points, 4326, BlobFormat::GeoPackage, Index::GeoPackage);
    let [west, south, east, north] = extent(points);
    conn.execute(
        "INSERT INTO geopackage_contents VALUES ('towns', 'features', ?1, ?2, ?3, ?4, 4326)",
        params![west, south, east, north],
    ).unwrap();
    path
}

/// MBTiles file with the given metadata pairs and no tiles.
pub fn mbtiles(dir: &Path, name: &str, metadata: &[(&str, &str)]) -> PathBuf {
    let path = dir.join(format!("{name}.mbtiles"));
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        "CREATE TABLE metadata (name TEXT, value TEXT);
         CREATE TABLE tiles (zoom_level INTEGER, tile_column INTEGER, tile_row INTEGER, tile_data BLOB);",
    ).unwrap();
    for (key, value) in metadata {
        conn.execute("INSERT INTO metadata VALUES (?1, ?2)", params![key, value]).unwrap();
    }
    path
}

/// Extent of the points as stored metadata; NULL for an empty layer.
fn extent(points: &[(f64, f64)]) -> [Option<f64>; 4] {
    if points.is_empty() {
        return [None; 4];
    }
    let (w, s, e, n) = points.iter().fold(
        (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        |(w, s, e, n), (x, y)| (w.min(*x), s.min(*y), e.max(*x), n.max(*y)),
    );
    [Some(w), Some(s), Some(e), Some(n)]
}

/// Grid of `n` points inside (10..12, 44..46).
pub fn grid(n: usize) -> Vec<(f64, f64)> {
    (0..n).map(|i| (10.1 + (i % 10) as f64 * 0.15, 44.1 + (i / 10) as f64 * 0.15)).collect()
}
