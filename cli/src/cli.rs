use std::path::PathBuf;

/// Spatial database catalog and query CLI
#[derive(clap::Parser, Debug)]
#[command(name = "fieldmap", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Create the database when it does not exist
    #[arg(long, global = true)]
    pub create: bool,

    /// Recompute layer extents and row counts from the data
    #[arg(long, global = true)]
    pub corrective: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// List vector and raster tables as JSON
    Tables(TablesArgs),

    /// Print hex WKB of every geometry intersecting a box
    Query(QueryArgs),

    /// Print the extent of a layer
    Bounds(BoundsArgs),

    /// Show or change the style of a layer
    Style(StyleArgs),

    /// Manage the base map list
    Basemaps(BasemapsArgs),
}

#[derive(clap::Args, Debug)]
pub struct TablesArgs {
    /// Spatialite, GeoPackage or MBTiles file
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub database: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct QueryArgs {
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub database: PathBuf,

    /// Vector table name
    pub table: String,

    /// Query box as west,south,east,north
    #[arg(long, value_parser = parse_bbox, allow_hyphen_values = true)]
    pub bbox: [f64; 4],

    /// SRID of the query box and of the output, defaults to 4326
    #[arg(long, default_value_t = 4326)]
    pub srid: i32,

    /// Stream results through a cursor instead of collecting them
    #[arg(long)]
    pub lazy: bool,
}

#[derive(clap::Args, Debug)]
pub struct BoundsArgs {
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub database: PathBuf,

    pub table: String,

    /// SRID of the printed extent, defaults to 4326
    #[arg(long, default_value_t = 4326)]
    pub srid: i32,
}

#[derive(clap::Args, Debug)]
pub struct StyleArgs {
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub database: PathBuf,

    /// Layer (table) name
    pub layer: String,

    /// Style properties to change, e.g. --set fillcolor=blue
    #[arg(long = "set", value_parser = parse_assignment)]
    pub set: Vec<(String, String)>,
}

#[derive(clap::Args, Debug)]
pub struct BasemapsArgs {
    /// Preferences file holding the base map list and selection
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub prefs: PathBuf,

    #[command(subcommand)]
    pub action: Option<BasemapAction>,
}

#[derive(clap::Subcommand, Debug)]
pub enum BasemapAction {
    /// List known base maps, marking the selected one
    List,
    /// Add every raster table of a file
    Add {
        #[arg(value_hint = clap::ValueHint::FilePath)]
        file: PathBuf,
    },
    /// Add every map file below a directory
    Scan {
        #[arg(value_hint = clap::ValueHint::DirPath)]
        dir: PathBuf,
    },
    /// Select a base map by its position in the list
    Select { index: usize },
}

fn parse_bbox(value: &str) -> Result<[f64; 4], String> {
    let numbers = value.split(',')
        .map(|v| v.trim().parse::<f64>().map_err(|e| format!("{v:?}: {e}")))
        .collect::<Result<Vec<_>, _>>()?;
    numbers.try_into().map_err(|_| "expected four numbers: west,south,east,north".to_string())
}

fn parse_assignment(value: &str) -> Result<(String, String), String> {
    value.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .ok_or_else(|| format!("expected key=value, got {value:?}"))
}
