use anyhow::Result;

pub fn run(cli: &crate::cli::Cli, args: &crate::cli::BoundsArgs) -> Result<()> {
    let mut db = super::open(cli, &args.database)?;
    let table = super::vector_table(&mut db, &args.table)?;
    match db.table_bounds_in_srid(&table, args.srid)? {
        Some(bounds) => println!("{bounds}"),
        None => eprintln!("[bounds] {} has no geometries", table.table_name),
    }
    Ok(())
}
