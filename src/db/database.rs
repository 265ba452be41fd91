use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use rusqlite::{Connection, OpenFlags};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::catalog::{RasterTable, VectorTable};
use crate::db::snapshot::Snapshot;

/// What to do when the database file does not exist yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpenMode {
    /// Fail when the file is missing.
    #[default]
    Existing,
    /// Create an empty database when the file is missing.
    CreateIfMissing,
}

/// How far the vector catalog trusts published layer metadata.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorQueryMode {
    /// Use row counts and extents as published.
    #[default]
    Strict,
    /// Recompute row counts and extents from the table data.
    Corrective,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenOptions {
    pub mode: OpenMode,
    pub query_mode: VectorQueryMode,
}

impl OpenOptions {
    #[inline]
    pub fn create_if_missing(mut self) -> Self {
        self.mode = OpenMode::CreateIfMissing;
        self
    }

    #[inline]
    pub fn corrective(mut self) -> Self {
        self.query_mode = VectorQueryMode::Corrective;
        self
    }
}

/// An open spatial database and the catalogs discovered in it.
///
/// The handle is the only owner of its connection. Statements and cursors
/// borrow it, so it cannot be closed while any of them is alive.
pub struct SpatialDatabase {
    path: PathBuf,
    pub(crate) conn: Connection,
    options: OpenOptions,
    pub(crate) vectors: Snapshot<VectorTable>,
    pub(crate) rasters: Snapshot<RasterTable>,
}

impl std::fmt::Debug for SpatialDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpatialDatabase")
            .field("path", &self.path)
            .field("options", &self.options)
            .field("vectors_loaded", &self.vectors.is_loaded())
            .field("rasters_loaded", &self.rasters.is_loaded())
            .field("catalog_version", &self.catalog_version())
            .finish()
    }
}

impl SpatialDatabase {
    /// Open a database file read-write.
    pub fn open(path: impl AsRef<Path>, options: &OpenOptions) -> Result<Self> {
        let path = path.as_ref();
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        if !parent.is_dir() {
            bail!("[db::open] parent directory {} does not exist", parent.display());
        }

        let mut flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        if !path.exists() {
            match options.mode {
                OpenMode::Existing => bail!("[db::open] database {} does not exist", path.display()),
                OpenMode::CreateIfMissing => {
                    info!(path = %path.display(), "creating missing database");
                    flags |= OpenFlags::SQLITE_OPEN_CREATE;
                }
            }
        }

        let conn = Connection::open_with_flags(path, flags)
            .with_context(|| format!("[db::open] Failed to open {}", path.display()))?;
        // Forces SQLite to read the header so corrupt files fail here.
        conn.query_row("SELECT count(*) FROM sqlite_master", [], |row| row.get::<_, i64>(0))
            .with_context(|| format!("[db::open] {} is not a readable database", path.display()))?;
        debug!(path = %path.display(), ?options, "opened database");

        Ok(Self {
            path: path.to_path_buf(),
            conn,
            options: *options,
            vectors: Snapshot::default(),
            rasters: Snapshot::default(),
        })
    }

    #[inline] pub fn path(&self) -> &Path { &self.path }

    #[inline] pub fn options(&self) -> &OpenOptions { &self.options }

    #[inline] pub fn connection(&self) -> &Connection { &self.conn }

    /// Get the file name without its extension.
    pub fn name(&self) -> String {
        self.path.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Switch the vector metadata mode; drops the cached vector catalog.
    pub fn set_query_mode(&mut self, mode: VectorQueryMode) {
        if self.options.query_mode != mode {
            self.options.query_mode = mode;
            self.vectors.invalidate();
        }
    }

    /// A counter that increases whenever either catalog is rebuilt or a style changes.
    #[inline]
    pub fn catalog_version(&self) -> u64 { self.vectors.version() + self.rasters.version() }

    /// Close the connection, reporting any error SQLite raises while doing so.
    pub fn close(self) -> Result<()> {
        let path = self.path;
        self.conn.close()
            .map_err(|(_, e)| e)
            .with_context(|| format!("[db::close] Failed to close {}", path.display()))
    }
}
