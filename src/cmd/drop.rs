//! Drop command - emit a teardown script for the catalog schemas or tables.

use super::CatalogArgs;
use anyhow::Result;
use catalog_order::plan::{render_drop_script, DropPlan, DropScope};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

/// Run the drop command
pub fn run(
    catalog: CatalogArgs,
    output: Option<PathBuf>,
    dry_run: bool,
    tables: bool,
    json: bool,
) -> Result<()> {
    let config = catalog.resolve()?;
    let plan = DropPlan::build(&config.tables_dir, catalog.usernames.as_deref());

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    let scope = if tables {
        DropScope::Tables
    } else {
        DropScope::Schemas
    };
    let items = match scope {
        DropScope::Schemas => &plan.schemas,
        DropScope::Tables => &plan.tables,
    };

    if items.is_empty() {
        eprintln!("Nothing to drop in: {}", config.tables_dir.display());
        return Ok(());
    }

    if dry_run {
        eprintln!("Drop order:");
        for (i, item) in items.iter().enumerate() {
            eprintln!("  {}. {}", i + 1, item);
        }
        return Ok(());
    }

    let writer: Box<dyn Write> = match &output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(std::io::stdout())),
    };

    let stats = render_drop_script(&plan, scope, writer)?;

    if let Some(path) = &output {
        eprintln!("Drop script written to: {}", path.display());
    }
    let noun = match scope {
        DropScope::Schemas => "schemas",
        DropScope::Tables => "tables",
    };
    eprintln!("\nPlanned {} {} for dropping.", stats.written, noun);

    Ok(())
}
