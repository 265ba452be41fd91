use anyhow::Result;
use fieldmap::{geometry_to_wkb, Bounds};

pub fn run(cli: &crate::cli::Cli, args: &crate::cli::QueryArgs) -> Result<()> {
    let mut db = super::open(cli, &args.database)?;
    let table = super::vector_table(&mut db, &args.table)?;
    let [west, south, east, north] = args.bbox;
    let bounds = Bounds::new(west, south, east, north);

    if args.lazy {
        let printed = db.with_geometries_in_bounds(&table, args.srid, bounds, |cursor| -> Result<usize> {
            let mut count = 0;
            for geometry in cursor {
                println!("{}", hex::encode(geometry_to_wkb(&geometry?)));
                count += 1;
            }
            Ok(count)
        })??;
        tracing::info!(count = printed, "streamed geometries");
    } else {
        let found = db.query_wkb_in_bounds(&table, args.srid, bounds)?;
        for wkb in &found {
            println!("{}", hex::encode(wkb));
        }
        tracing::info!(count = found.len(), "collected geometries");
    }
    Ok(())
}
