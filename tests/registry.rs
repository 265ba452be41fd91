mod common;

use std::path::Path;

use common::mbtiles;
use fieldmap::{
    pref_keys, BaseMapEntry, BaseMapRegistry, JsonFilePreferences, MapType, PreferenceStore, RegistryConfig,
};

fn default_entry() -> BaseMapEntry {
    BaseMapEntry::new("/bundled/mapnik.mapurl", "Mapnik", MapType::Mapurl)
}

fn registry(prefs: &Path) -> BaseMapRegistry<JsonFilePreferences> {
    BaseMapRegistry::open(JsonFilePreferences::open(prefs).unwrap(), RegistryConfig::new(default_entry())).unwrap()
}

fn tiles(dir: &Path, name: &str) -> std::path::PathBuf {
    mbtiles(dir, name, &[("name", name), ("bounds", "10,45,12,47"), ("minzoom", "3"), ("maxzoom", "9")])
}

#[test]
fn selection_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let prefs = dir.path().join("prefs.json");
    let alps = tiles(dir.path(), "alps");
    let coast = tiles(dir.path(), "coast");

    let mut first = registry(&prefs);
    assert!(first.add_from_file(&alps).unwrap());
    assert!(first.add_from_file(&coast).unwrap());
    let coast_entry = first.base_maps().unwrap()[1].clone();
    assert_eq!(coast_entry.title, "coast");
    first.select(&coast_entry).unwrap();
    drop(first);

    let mut second = registry(&prefs);
    assert_eq!(second.selected(), Some(&coast_entry));
    assert_eq!(second.selected_table().map(|t| t.min_zoom), Some(3));
    assert_eq!(second.base_maps().unwrap().len(), 2);
}

#[test]
fn deleted_selection_falls_back_to_the_default() {
    let dir = tempfile::tempdir().unwrap();
    let prefs = dir.path().join("prefs.json");
    let alps = tiles(dir.path(), "alps");

    let mut first = registry(&prefs);
    first.add_from_file(&alps).unwrap();
    let entry = first.base_maps().unwrap()[0].clone();
    first.select(&entry).unwrap();
    drop(first);

    std::fs::remove_file(&alps).unwrap();

    let mut second = registry(&prefs);
    assert_eq!(second.selected(), Some(&default_entry()));
    assert_eq!(second.base_maps().unwrap(), &[default_entry()]);

    let stored = JsonFilePreferences::open(&prefs).unwrap();
    assert_eq!(stored.get_string(pref_keys::TILE_SOURCE_FILE).as_deref(), Some("/bundled/mapnik.mapurl"));
    assert_eq!(stored.get_string(pref_keys::TILE_SOURCE).as_deref(), Some("mapurl"));
}

#[test]
fn files_without_rasters_are_not_added() {
    let dir = tempfile::tempdir().unwrap();
    let prefs = dir.path().join("prefs.json");
    let vectors = common::spatialite_v3(dir.path(), &common::grid(2));

    let mut registry = registry(&prefs);
    assert!(!registry.add_from_file(&vectors).unwrap());
    assert!(registry.add_from_file(dir.path().join("missing.mbtiles")).is_err());
    assert_eq!(registry.base_maps().unwrap(), &[default_entry()]);
}
