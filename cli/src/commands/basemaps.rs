use anyhow::{anyhow, Result};
use fieldmap::{BaseMapEntry, BaseMapRegistry, JsonFilePreferences, MapType, RegistryConfig};

use crate::cli::BasemapAction;

/// Entry used when nothing else is known or the selection is gone.
fn default_entry() -> BaseMapEntry {
    BaseMapEntry::new("mapnik.mapurl", "Mapnik", MapType::Mapurl)
}

pub fn run(cli: &crate::cli::Cli, args: &crate::cli::BasemapsArgs) -> Result<()> {
    let prefs = JsonFilePreferences::open(&args.prefs)?;
    let mut config = RegistryConfig::new(default_entry());
    config.open = super::open_options(cli);
    let mut registry = BaseMapRegistry::open(prefs, config)?;

    match args.action.as_ref().unwrap_or(&BasemapAction::List) {
        BasemapAction::List => {}
        BasemapAction::Add { file } => {
            if !registry.add_from_file(file)? {
                eprintln!("[basemaps] no raster tables in {}", file.display());
            }
        }
        BasemapAction::Scan { dir } => {
            let files = registry.scan_dir(dir)?;
            eprintln!("[basemaps] added base maps from {files} files");
        }
        BasemapAction::Select { index } => {
            let entry = registry.base_maps()?
                .get(*index)
                .cloned()
                .ok_or_else(|| anyhow!("no base map at position {index}"))?;
            registry.select(&entry)?;
        }
    }

    let selected = registry.selected().cloned();
    for (i, entry) in registry.base_maps()?.iter().enumerate() {
        let marker = if Some(entry) == selected.as_ref() { "*" } else { " " };
        println!("{marker} {i:>3} {entry}");
    }
    Ok(())
}
