mod common;

use std::collections::BTreeSet;

use common::{create_points, geopackage, grid, point, projected_layer, spatialite_v3, spatialite_v4, Index, EARTH_RADIUS};
use fieldmap::{geometry_to_wkb, BlobFormat, Bounds, BoundsQuery, OpenOptions, SpatialDatabase, VectorTable};
use geo::Geometry;
use rusqlite::Connection;

fn open_towns(path: &std::path::Path) -> (SpatialDatabase, VectorTable) {
    let mut db = SpatialDatabase::open(path, &OpenOptions::default()).unwrap();
    let towns = db.vector_table("towns").unwrap().unwrap();
    (db, towns)
}

fn xy(geometry: &Geometry<f64>) -> (f64, f64) {
    match geometry {
        Geometry::Point(p) => (p.x(), p.y()),
        other => panic!("expected a point, got {other:?}"),
    }
}

fn wkb_set(blobs: impl IntoIterator<Item = Vec<u8>>) -> BTreeSet<Vec<u8>> {
    blobs.into_iter().collect()
}

#[test]
fn inserted_geometries_are_found_in_every_layout() {
    let dir = tempfile::tempdir().unwrap();
    let builders: [fn(&std::path::Path, &[(f64, f64)]) -> std::path::PathBuf; 3] =
        [spatialite_v4, spatialite_v3, geopackage];

    for build in builders {
        let path = build(dir.path(), &[]);
        let (db, towns) = open_towns(&path);
        let points = grid(25);
        for (x, y) in &points {
            db.insert_geometry(&towns, &point(*x, *y), 4326).unwrap();
        }

        let found = db.query_in_bounds(&towns, 4326, Bounds::new(10.0, 44.0, 12.0, 46.0)).unwrap();
        assert_eq!(found.len(), points.len(), "{}", path.display());

        let disjoint = db.query_in_bounds(&towns, 4326, Bounds::new(-80.0, -10.0, -70.0, 0.0)).unwrap();
        assert!(disjoint.is_empty());
    }
}

#[test]
fn box_edges_are_inclusive_and_exact() {
    let dir = tempfile::tempdir().unwrap();
    let (db, towns) = open_towns(&spatialite_v3(dir.path(), &[(10.0, 44.0), (11.0, 45.0), (12.5, 45.0)]));

    let found = db.query_in_bounds(&towns, 4326, Bounds::new(10.0, 44.0, 11.0, 45.0)).unwrap();
    let mut coords = found.iter().map(xy).collect::<Vec<_>>();
    coords.sort_by(|a, b| a.partial_cmp(b).unwrap());
    assert_eq!(coords, vec![(10.0, 44.0), (11.0, 45.0)]);
}

#[test]
fn lazy_and_eager_results_agree() {
    let dir = tempfile::tempdir().unwrap();
    let (db, towns) = open_towns(&spatialite_v4(dir.path(), &grid(40)));
    let bounds = Bounds::new(10.3, 44.2, 11.0, 44.9);

    let eager = wkb_set(db.query_wkb_in_bounds(&towns, 4326, bounds).unwrap());
    let lazy = db.with_geometries_in_bounds(&towns, 4326, bounds, |cursor| {
        cursor.map(|g| geometry_to_wkb(&g.unwrap())).collect::<Vec<_>>()
    }).unwrap();
    assert!(!eager.is_empty());
    assert_eq!(wkb_set(lazy), eager);
}

#[test]
fn results_come_back_in_the_target_srid() {
    let dir = tempfile::tempdir().unwrap();
    let (db, towns) = open_towns(&geopackage(dir.path(), &[(11.0, 45.0)]));

    let x = 11f64.to_radians() * EARTH_RADIUS;
    let y = (std::f64::consts::FRAC_PI_4 + 45f64.to_radians() / 2.0).tan().ln() * EARTH_RADIUS;
    let query = Bounds::new(x - 1000.0, y - 1000.0, x + 1000.0, y + 1000.0);

    let found = db.query_in_bounds(&towns, 3857, query).unwrap();
    assert_eq!(found.len(), 1);
    let (fx, fy) = xy(&found[0]);
    assert!((fx - x).abs() < 1e-3, "{fx} vs {x}");
    assert!((fy - y).abs() < 1e-3, "{fy} vs {y}");
}

#[test]
fn unknown_target_srid_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let (db, towns) = open_towns(&spatialite_v3(dir.path(), &grid(3)));
    assert!(db.query_in_bounds(&towns, 999_999, Bounds::new(10.0, 44.0, 12.0, 46.0)).is_err());
}

#[test]
fn layers_without_index_are_scanned() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plain.sqlite");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        "CREATE TABLE geometry_columns (f_table_name TEXT, f_geometry_column TEXT, type TEXT, srid INTEGER);
         INSERT INTO geometry_columns VALUES ('towns', 'geom', 'POINT', 4326);",
    ).unwrap();
    create_points(&conn, "towns", &grid(10), 4326, BlobFormat::Wkb, Index::None);
    drop(conn);

    let (db, towns) = open_towns(&path);
    assert!(!towns.spatial_index);
    let found = db.query_in_bounds(&towns, 4326, Bounds::new(10.0, 44.0, 10.5, 45.0)).unwrap();
    assert_eq!(found.len(), 3);
}

#[test]
fn malformed_blobs_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let path = spatialite_v3(dir.path(), &grid(4));
    let conn = Connection::open(&path).unwrap();
    conn.execute("INSERT INTO towns (name, geom) VALUES ('broken', x'00010203')", []).unwrap();
    let rowid = conn.last_insert_rowid();
    conn.execute("INSERT INTO idx_towns_geom VALUES (?1, 10.2, 10.2, 44.1, 44.1)", [rowid]).unwrap();
    drop(conn);

    let (db, towns) = open_towns(&path);
    let found = db.query_in_bounds(&towns, 4326, Bounds::new(10.0, 44.0, 12.0, 46.0)).unwrap();
    assert_eq!(found.len(), 4);
}

#[test]
fn cursor_can_stop_early_and_statement_runs_once() {
    let dir = tempfile::tempdir().unwrap();
    let (db, towns) = open_towns(&spatialite_v4(dir.path(), &grid(20)));
    let query = BoundsQuery::new(&towns, 4326, Bounds::new(10.0, 44.0, 12.0, 46.0));
    let mut statement = db.prepare_bounds_query(&query).unwrap();

    {
        let mut cursor = statement.cursor().unwrap();
        assert!(cursor.next().unwrap().is_ok());
        cursor.close();
        assert!(cursor.is_closed());
        assert!(cursor.next().is_none());
    }
    assert!(statement.cursor().is_err());
}

#[test]
fn table_bounds_follow_the_requested_srid() {
    let dir = tempfile::tempdir().unwrap();
    let (db, towns) = open_towns(&spatialite_v4(dir.path(), &[(10.0, 44.0), (12.0, 46.0)]));

    let native = db.table_bounds_in_srid(&towns, 4326).unwrap().unwrap();
    assert_eq!((native.west, native.south, native.east, native.north), (10.0, 44.0, 12.0, 46.0));

    let mercator = db.table_bounds_in_srid(&towns, 3857).unwrap().unwrap();
    assert!((mercator.west - 10f64.to_radians() * EARTH_RADIUS).abs() < 1e-3);
    assert!((mercator.east - 12f64.to_radians() * EARTH_RADIUS).abs() < 1e-3);

    let empty = spatialite_v3(dir.path(), &[]);
    let (db, towns) = open_towns(&empty);
    assert!(db.table_bounds_in_srid(&towns, 4326).unwrap().is_none());
}

#[test]
fn point_hit_test_returns_attributes() {
    let dir = tempfile::tempdir().unwrap();
    let (db, towns) = open_towns(&geopackage(dir.path(), &[(10.5, 44.5), (11.5, 45.5)]));

    let hits = db.attributes_in_bounds(&towns, 4326, Bounds::point(11.5, 45.5)).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0], vec![("id".to_string(), "2".to_string()), ("name".to_string(), "towns-1".to_string())]);

    assert!(db.attributes_in_bounds(&towns, 4326, Bounds::point(0.0, 0.0)).unwrap().is_empty());
}

#[test]
fn inserts_are_reprojected_into_the_layer_srid() {
    let dir = tempfile::tempdir().unwrap();
    let (db, towns) = open_towns(&spatialite_v3(dir.path(), &[]));

    let x = 11f64.to_radians() * EARTH_RADIUS;
    let y = (std::f64::consts::FRAC_PI_4 + 45f64.to_radians() / 2.0).tan().ln() * EARTH_RADIUS;
    let rowid = db.insert_geometry(&towns, &point(x, y), 3857).unwrap();
    assert_eq!(rowid, 1);

    let found = db.query_in_bounds(&towns, 4326, Bounds::new(10.9, 44.9, 11.1, 45.1)).unwrap();
    assert_eq!(found.len(), 1);
    let (fx, fy) = xy(&found[0]);
    assert!((fx - 11.0).abs() < 1e-7 && (fy - 45.0).abs() < 1e-7);
}

#[test]
fn projected_layers_are_filtered_against_the_requested_box() {
    let dir = tempfile::tempdir().unwrap();
    let (db, towns) = open_towns(&projected_layer(dir.path(), 32632));
    assert_eq!(towns.srid, 32632);

    // Just west of the box, but inside its UTM envelope.
    db.insert_geometry(&towns, &point(11.912, 60.003), 4326).unwrap();

    let found = db.query_in_bounds(&towns, 4326, Bounds::new(12.0, 60.0, 13.0, 61.0)).unwrap();
    assert!(found.is_empty(), "{found:?}");

    let found = db.query_in_bounds(&towns, 4326, Bounds::new(11.9, 60.0, 12.0, 60.01)).unwrap();
    assert_eq!(found.len(), 1);
    let (x, y) = xy(&found[0]);
    assert!((x - 11.912).abs() < 1e-6 && (y - 60.003).abs() < 1e-6);
}

#[test]
fn whole_world_box_works_on_mercator_layers() {
    let dir = tempfile::tempdir().unwrap();
    let (db, towns) = open_towns(&projected_layer(dir.path(), 3857));
    db.insert_geometry(&towns, &point(11.0, 45.0), 4326).unwrap();
    db.insert_geometry(&towns, &point(-70.0, -30.0), 4326).unwrap();

    let found = db.query_in_bounds(&towns, 4326, Bounds::new(-180.0, -90.0, 180.0, 90.0)).unwrap();
    assert_eq!(found.len(), 2);

    let polar = db.query_in_bounds(&towns, 4326, Bounds::new(-180.0, 86.0, 180.0, 90.0)).unwrap();
    assert!(polar.is_empty());
}

#[test]
fn polar_points_clamp_into_mercator_layers() {
    let dir = tempfile::tempdir().unwrap();
    let (db, towns) = open_towns(&projected_layer(dir.path(), 3857));
    db.insert_geometry(&towns, &point(20.0, 89.0), 4326).unwrap();

    let bounds = db.table_bounds_in_srid(&towns, 4326).unwrap().unwrap();
    assert!((bounds.north - fieldmap::MERCATOR_MAX_LAT).abs() < 1e-4);

    let (db, towns) = open_towns(&spatialite_v3(dir.path(), &[(10.0, -89.5), (11.0, 89.5)]));
    let bounds = db.table_bounds_in_srid(&towns, 3857).unwrap().unwrap();
    assert!(bounds.north.is_finite() && bounds.north > 19_000_000.0);
    assert!((bounds.south + bounds.north).abs() < 1e-3);
}
