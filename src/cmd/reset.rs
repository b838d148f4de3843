//! Reset command - drop, recreate and reseed the catalog in one psql script.

use super::CatalogArgs;
use anyhow::{bail, Result};
use catalog_order::plan::{render_reset_script, CreatePlan, DropPlan, SeedPlan};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

#[derive(Serialize)]
struct ResetJsonOutput<'a> {
    drop: &'a DropPlan,
    create: &'a CreatePlan,
    seed: &'a SeedPlan,
}

/// Run the reset command
pub fn run(
    catalog: CatalogArgs,
    output: Option<PathBuf>,
    dry_run: bool,
    check: bool,
    json: bool,
) -> Result<()> {
    let config = catalog.resolve()?;
    let usernames = catalog.usernames.as_deref();

    if !json {
        eprintln!(
            "Planning catalog reset from: {}",
            config.tables_dir.display()
        );
    }

    let create = CreatePlan::build(&config.tables_dir, usernames);
    let drop_plan = DropPlan::from_create_plan(&config.tables_dir, usernames, &create);
    let seed = SeedPlan::build(&config.tables_dir, usernames);
    let complete = create.is_complete() && seed.is_complete();

    if json {
        let output = ResetJsonOutput {
            drop: &drop_plan,
            create: &create,
            seed: &seed,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        if check && !complete {
            bail!(
                "check failed: {} tables are part of cycles",
                create.unresolved.len()
            );
        }
        return Ok(());
    }

    if drop_plan.is_empty() {
        eprintln!("Nothing to reset in: {}", config.tables_dir.display());
        return Ok(());
    }

    if !complete {
        eprintln!("\nWarning: Circular dependencies detected!");
        eprintln!("The following tables are part of cycles:");
        for table in &create.unresolved {
            eprintln!("  - {}", table.table);
        }
        eprintln!();

        if check {
            bail!(
                "check failed: cannot determine a valid reset order, {} tables are part of cycles",
                create.unresolved.len()
            );
        }
    }

    super::seed::report_skipped(&seed);

    if check || dry_run {
        if check {
            eprintln!("Check PASSED: Tables can be ordered topologically.");
        }
        eprintln!("Drop schemas:");
        for (i, schema) in drop_plan.schemas.iter().enumerate() {
            eprintln!("  {}. {}", i + 1, schema);
        }
        eprintln!("Creation order:");
        super::create::print_order(&create);
        eprintln!("Seed order:");
        super::seed::print_order(&seed);
        return Ok(());
    }

    let writer: Box<dyn Write> = match &output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(std::io::stdout())),
    };

    let stats = render_reset_script(&drop_plan, &create, &seed, writer)?;

    if let Some(path) = &output {
        eprintln!("Reset script written to: {}", path.display());
    }
    eprintln!(
        "\nPlanned {} schemas, {} create.sql files and {} seeded tables.",
        stats.dropped.written, stats.created.written, stats.seeded.written
    );
    if stats.created.failed > 0 {
        eprintln!(
            "Warning: {} create.sql files could not be read.",
            stats.created.failed
        );
    }

    Ok(())
}
