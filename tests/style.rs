mod common;

use common::{create_points, geopackage, grid, spatialite_v3, Index};
use fieldmap::{BlobFormat, OpenOptions, SpatialDatabase, Style};
use rusqlite::Connection;

fn style_rows(path: &std::path::Path) -> i64 {
    let conn = Connection::open(path).unwrap();
    conn.query_row("SELECT count(*) FROM dataproperties", [], |r| r.get(0)).unwrap()
}

#[test]
fn cataloged_layers_get_a_default_style() {
    let dir = tempfile::tempdir().unwrap();
    let path = spatialite_v3(dir.path(), &grid(3));
    let mut db = SpatialDatabase::open(&path, &OpenOptions::default()).unwrap();

    let towns = db.vector_table("towns").unwrap().unwrap();
    assert_eq!(towns.style, Style::new("towns"));
    assert_eq!(db.style_for("towns").unwrap(), Style::new("towns"));
    db.close().unwrap();
    assert_eq!(style_rows(&path), 1);

    // Reopening never duplicates the seeded row.
    let mut db = SpatialDatabase::open(&path, &OpenOptions::default()).unwrap();
    db.vector_tables(false).unwrap();
    db.close().unwrap();
    assert_eq!(style_rows(&path), 1);
}

#[test]
fn updates_reach_the_cached_catalog() {
    let dir = tempfile::tempdir().unwrap();
    let mut db = SpatialDatabase::open(&geopackage(dir.path(), &grid(3)), &OpenOptions::default()).unwrap();
    db.vector_tables(false).unwrap();
    let version = db.catalog_version();

    let mut style = db.style_for("towns").unwrap();
    style.set("fillcolor", "blue").unwrap();
    style.set("width", "1.5").unwrap();
    style.set("enabled", "false").unwrap();
    assert!(db.update_style(&style).unwrap());

    assert!(db.catalog_version() > version);
    let towns = db.vector_table("towns").unwrap().unwrap();
    assert_eq!(towns.style.fill_color, "blue");
    assert_eq!(towns.style.width, 1.5);
    assert!(!towns.style.enabled);
    assert_eq!(db.style_for("towns").unwrap(), style);
}

#[test]
fn updating_an_unknown_layer_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = spatialite_v3(dir.path(), &grid(3));
    let mut db = SpatialDatabase::open(&path, &OpenOptions::default()).unwrap();
    db.vector_tables(false).unwrap();

    let mut ghost = Style::new("ghost");
    ghost.size = 20.0;
    assert!(!db.update_style(&ghost).unwrap());
    assert_eq!(db.style_for("ghost").unwrap(), Style::new("ghost"));
    db.close().unwrap();
    assert_eq!(style_rows(&path), 1);
}

#[test]
fn bad_style_values_are_rejected() {
    let mut style = Style::new("towns");
    assert!(style.set("size", "big").is_err());
    assert!(style.set("colour", "red").is_err());
    assert_eq!(style, Style::new("towns"));
}

fn layer_names(db: &mut SpatialDatabase) -> Vec<String> {
    db.vector_tables(false).unwrap().iter().map(|t| t.table_name.clone()).collect()
}

#[test]
fn layers_follow_draw_order_and_resort_on_update() {
    let dir = tempfile::tempdir().unwrap();
    let path = spatialite_v3(dir.path(), &grid(3));
    {
        let conn = Connection::open(&path).unwrap();
        conn.execute("INSERT INTO geometry_columns VALUES ('roads', 'geom', 'POINT', 'XY', 4326, 1)", []).unwrap();
        create_points(&conn, "roads", &[(10.5, 44.5)], 4326, BlobFormat::Spatialite, Index::Spatialite);
    }

    // Seed both rows, then store an order opposite to discovery.
    let mut db = SpatialDatabase::open(&path, &OpenOptions::default()).unwrap();
    assert_eq!(layer_names(&mut db).len(), 2);
    db.close().unwrap();
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        "UPDATE dataproperties SET layerorder = 5 WHERE name = 'towns';
         UPDATE dataproperties SET layerorder = 1 WHERE name = 'roads';",
    ).unwrap();
    drop(conn);

    let mut db = SpatialDatabase::open(&path, &OpenOptions::default()).unwrap();
    assert_eq!(layer_names(&mut db), ["roads", "towns"]);

    let mut towns = db.style_for("towns").unwrap();
    towns.set("layerorder", "0").unwrap();
    assert!(db.update_style(&towns).unwrap());
    assert_eq!(layer_names(&mut db), ["towns", "roads"]);
    let orders = db.vector_tables(false).unwrap().iter().map(|t| t.style.order).collect::<Vec<_>>();
    assert_eq!(orders, [0, 1]);
}
