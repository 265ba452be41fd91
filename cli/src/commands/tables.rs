use anyhow::Result;
use serde_json::json;

pub fn run(cli: &crate::cli::Cli, args: &crate::cli::TablesArgs) -> Result<()> {
    let mut db = super::open(cli, &args.database)?;
    let vectors = db.vector_tables(false)?;
    let rasters = db.raster_tables(false)?;

    let out = json!({
        "database": db.name(),
        "vector": vectors.as_slice(),
        "raster": rasters.as_slice(),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
