use anyhow::{bail, Result};

pub fn run(cli: &crate::cli::Cli, args: &crate::cli::StyleArgs) -> Result<()> {
    let mut db = super::open(cli, &args.database)?;
    // Seeds the style table for every cataloged layer.
    db.vector_tables(false)?;
    let mut style = db.style_for(&args.layer)?;

    if !args.set.is_empty() {
        for (key, value) in &args.set {
            style.set(key, value)?;
        }
        if !db.update_style(&style)? {
            bail!("[style] no stored style for layer {}", args.layer);
        }
    }
    println!("{}", serde_json::to_string_pretty(&style)?);
    Ok(())
}
