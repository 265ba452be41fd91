use std::path::{Path, PathBuf};

use ahash::AHashMap;
use anyhow::{Context, Result};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::basemap::prefs::{keys, PreferenceStore};
use crate::basemap::{BaseMapEntry, TileSurface};
use crate::catalog::{MapType, RasterTable};
use crate::db::{OpenOptions, SpatialDatabase, VectorQueryMode};

/// File extensions picked up by [`BaseMapRegistry::scan_dir`].
const MAP_EXTENSIONS: [&str; 4] = ["sqlite", "gpkg", "mbtiles", "db"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryState {
    /// Nothing has been read from the preferences yet.
    Uninitialized,
    /// Entries and descriptors match the persisted list.
    Populated,
    /// The persisted list changed; the next read rebuilds.
    Stale,
}

#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Used when nothing else is available or the selection is gone.
    pub default_entry: BaseMapEntry,
    /// Options for opening each base-map database.
    pub open: OpenOptions,
}

impl RegistryConfig {
    pub fn new(default_entry: BaseMapEntry) -> Self {
        Self { default_entry, open: OpenOptions::default() }
    }
}

/// Known base-map sources and the currently selected one, persisted in a [`PreferenceStore`].
#[derive(Debug)]
pub struct BaseMapRegistry<P: PreferenceStore> {
    prefs: P,
    config: RegistryConfig,
    state: RegistryState,
    entries: Vec<BaseMapEntry>,
    tables: AHashMap<BaseMapEntry, RasterTable>,
    selected: Option<BaseMapEntry>,
}

impl<P: PreferenceStore> BaseMapRegistry<P> {
    /// Build the registry from persisted preferences.
    ///
    /// A selection whose file no longer exists is replaced by the default entry.
    pub fn open(prefs: P, config: RegistryConfig) -> Result<Self> {
        let mut registry = Self {
            prefs,
            config,
            state: RegistryState::Uninitialized,
            entries: Vec::new(),
            tables: AHashMap::new(),
            selected: None,
        };

        if registry.take_recovery_mode()? {
            registry.config.open.query_mode = VectorQueryMode::Corrective;
        }

        let persisted = registry.persisted_selection();
        registry.base_maps()?;

        match persisted {
            Some(entry) if entry.database_path.exists() => registry.selected = Some(entry),
            other => {
                if let Some(entry) = other {
                    warn!(path = %entry.database_path.display(), "selected base map is gone, using the default");
                }
                let fallback = registry.config.default_entry.clone();
                registry.select(&fallback)?;
            }
        }
        Ok(registry)
    }

    fn persisted_selection(&self) -> Option<BaseMapEntry> {
        let path = self.prefs.get_string(keys::TILE_SOURCE_FILE).filter(|p| !p.is_empty())?;
        let map_type = self.prefs.get_string(keys::TILE_SOURCE)
            .and_then(|t| t.parse().ok())
            .or_else(|| MapType::from_path(Path::new(&path)))?;
        let title = self.prefs.get_string(keys::TILE_SOURCE_TITLE).unwrap_or_default();
        Some(BaseMapEntry::new(path, title, map_type))
    }

    /// Read and clear the one-shot recovery flag.
    pub fn take_recovery_mode(&mut self) -> Result<bool> {
        let requested = self.prefs.get_bool(keys::RECOVERY_MODE);
        if requested {
            self.prefs.set_bool(keys::RECOVERY_MODE, false)?;
            info!("recovery mode requested, vector metadata will be recomputed");
        }
        Ok(requested)
    }

    #[inline] pub fn state(&self) -> RegistryState { self.state }

    #[inline] pub fn config(&self) -> &RegistryConfig { &self.config }

    #[inline] pub fn selected(&self) -> Option<&BaseMapEntry> { self.selected.as_ref() }

    /// Raster descriptor of the selected entry, if it has one.
    pub fn selected_table(&self) -> Option<&RasterTable> {
        self.selected.as_ref().and_then(|e| self.tables.get(e))
    }

    /// Raster descriptor of an entry, if it has one.
    pub fn table_for(&self, entry: &BaseMapEntry) -> Option<&RasterTable> {
        self.tables.get(entry)
    }

    pub fn into_preferences(self) -> P { self.prefs }

    /// All known entries, rebuilt from the persisted list when needed.
    ///
    /// Databases that cannot be opened are skipped; an empty list holds the default entry.
    pub fn base_maps(&mut self) -> Result<&[BaseMapEntry]> {
        if self.state != RegistryState::Populated {
            self.rebuild()?;
        }
        Ok(&self.entries)
    }

    fn rebuild(&mut self) -> Result<()> {
        let json = self.prefs.get_string(keys::BASEMAPS).unwrap_or_default();
        let persisted = BaseMapEntry::list_from_json(&json)?;

        let mut tables = AHashMap::new();
        let mut cataloged: AHashMap<PathBuf, Vec<RasterTable>> = AHashMap::new();
        let mut entries = Vec::with_capacity(persisted.len());
        for entry in persisted {
            if entries.contains(&entry) {
                continue;
            }
            if !cataloged.contains_key(&entry.database_path) {
                match raster_tables_in(&entry.database_path, &self.config.open) {
                    Ok(found) => { cataloged.insert(entry.database_path.clone(), found); }
                    Err(e) => {
                        warn!(path = %entry.database_path.display(), error = %e, "skipping base map database");
                        continue;
                    }
                }
            }
            let table = cataloged.get(&entry.database_path)
                .and_then(|found| found.iter().find(|t| BaseMapEntry::from_table(t) == entry));
            if let Some(table) = table {
                tables.insert(entry.clone(), table.clone());
            } else {
                debug!(entry = %entry, "base map has no raster table");
            }
            entries.push(entry);
        }
        if entries.is_empty() {
            entries.push(self.config.default_entry.clone());
        }

        debug!(count = entries.len(), "rebuilt base map list");
        self.entries = entries;
        self.tables = tables;
        self.state = RegistryState::Populated;
        Ok(())
    }

    /// Persist `entries` as the new list and mark the cache stale.
    fn persist(&mut self, entries: &[BaseMapEntry]) -> Result<()> {
        let json = BaseMapEntry::list_to_json(entries)?;
        self.prefs.set_string(keys::BASEMAPS, &json)?;
        self.state = RegistryState::Stale;
        Ok(())
    }

    /// Entries as persisted, without the implicit default entry.
    fn persisted_entries(&self) -> Result<Vec<BaseMapEntry>> {
        let json = self.prefs.get_string(keys::BASEMAPS).unwrap_or_default();
        BaseMapEntry::list_from_json(&json)
    }

    /// Add every raster table of a database file.
    ///
    /// Returns whether the file held any raster table.
    pub fn add_from_file(&mut self, path: impl AsRef<Path>) -> Result<bool> {
        let path = path.as_ref();
        let found = raster_tables_in(path, &self.config.open)
            .with_context(|| format!("[basemap::add_from_file] Failed to catalog {}", path.display()))?;
        if found.is_empty() {
            debug!(path = %path.display(), "no raster tables found");
            return Ok(false);
        }

        let mut entries = self.persisted_entries()?;
        let mut added = 0;
        for table in &found {
            let entry = BaseMapEntry::from_table(table);
            if !entries.contains(&entry) {
                entries.push(entry);
                added += 1;
            }
        }
        if added > 0 {
            self.persist(&entries)?;
            info!(path = %path.display(), added, "added base maps");
        }
        Ok(true)
    }

    /// Add every map file below `dir`. Returns the number of files that held raster tables.
    pub fn scan_dir(&mut self, dir: impl AsRef<Path>) -> Result<usize> {
        let dir = dir.as_ref();
        let mut files = 0;
        for item in WalkDir::new(dir).follow_links(true) {
            let item = item.with_context(|| format!("[basemap::scan_dir] Failed to walk {}", dir.display()))?;
            if !item.file_type().is_file() || !has_map_extension(item.path()) {
                continue;
            }
            match self.add_from_file(item.path()) {
                Ok(true) => files += 1,
                Ok(false) => {}
                Err(e) => warn!(path = %item.path().display(), error = %e, "skipping map file"),
            }
        }
        info!(dir = %dir.display(), files, "scanned map directory");
        Ok(files)
    }

    /// Remove an entry. Returns whether it was known.
    pub fn remove(&mut self, entry: &BaseMapEntry) -> Result<bool> {
        let mut entries = self.persisted_entries()?;
        let before = entries.len();
        entries.retain(|e| e != entry);
        if entries.len() == before {
            return Ok(false);
        }
        self.persist(&entries)?;
        info!(entry = %entry, "removed base map");
        Ok(true)
    }

    /// Make `entry` the selection and persist it.
    pub fn select(&mut self, entry: &BaseMapEntry) -> Result<()> {
        self.prefs.set_string(keys::TILE_SOURCE, entry.map_type.to_str())?;
        self.prefs.set_string(keys::TILE_SOURCE_FILE, &entry.database_path.to_string_lossy())?;
        self.prefs.set_string(keys::TILE_SOURCE_TITLE, &entry.title)?;
        self.selected = Some(entry.clone());
        info!(entry = %entry, "selected base map");
        Ok(())
    }

    /// Push the selected entry to a tile surface.
    pub fn load_selected(&mut self, surface: &mut dyn TileSurface) -> Result<()> {
        if self.state != RegistryState::Populated {
            self.rebuild()?;
        }
        let Some(entry) = self.selected.as_ref() else { return Ok(()) };
        surface.clear_tile_cache();
        surface.set_tile_source(entry, self.tables.get(entry))
    }
}

fn has_map_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| MAP_EXTENSIONS.iter().any(|m| m.eq_ignore_ascii_case(e)))
}

fn raster_tables_in(path: &Path, options: &OpenOptions) -> Result<Vec<RasterTable>> {
    let mut db = SpatialDatabase::open(path, options)?;
    let tables = (*db.raster_tables(false)?).clone();
    db.close()?;
    Ok(tables)
}
