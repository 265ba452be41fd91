pub mod basemaps;
pub mod bounds;
pub mod query;
pub mod style;
pub mod tables;

use std::path::Path;

use anyhow::Result;
use fieldmap::{OpenOptions, SpatialDatabase, VectorTable};

/// Open options selected by the global flags.
pub fn open_options(cli: &crate::cli::Cli) -> OpenOptions {
    let mut options = OpenOptions::default();
    if cli.create { options = options.create_if_missing(); }
    if cli.corrective { options = options.corrective(); }
    options
}

pub fn open(cli: &crate::cli::Cli, path: &Path) -> Result<SpatialDatabase> {
    SpatialDatabase::open(path, &open_options(cli))
}

pub fn vector_table(db: &mut SpatialDatabase, name: &str) -> Result<VectorTable> {
    db.vector_table(name)?
        .ok_or_else(|| anyhow::anyhow!("no vector table named {name} in {}", db.path().display()))
}
