//! Seed command - emit a psql script loading seed.csv files in dependency order.

use super::CatalogArgs;
use anyhow::{bail, Result};
use catalog_order::plan::{render_seed_script, SeedPlan};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

/// Run the seed command
pub fn run(
    catalog: CatalogArgs,
    output: Option<PathBuf>,
    dry_run: bool,
    check: bool,
    json: bool,
) -> Result<()> {
    let config = catalog.resolve()?;

    if !json {
        eprintln!(
            "Planning table seeding from: {}",
            config.tables_dir.display()
        );
    }

    let plan = SeedPlan::build(&config.tables_dir, catalog.usernames.as_deref());

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        if check && !plan.is_complete() {
            bail!(
                "check failed: {} tables are part of cycles",
                plan.unresolved.len()
            );
        }
        return Ok(());
    }

    report_skipped(&plan);

    if plan.entries.is_empty() && plan.catalog_files.is_empty() {
        eprintln!("No seed.csv or catalog.csv files found.");
        return Ok(());
    }

    if !plan.is_complete() {
        eprintln!("\nWarning: Circular dependencies detected!");
        eprintln!("The following tables are part of cycles:");
        for table in &plan.unresolved {
            eprintln!("  - {}", table);
        }
        eprintln!();

        if check {
            bail!(
                "check failed: cannot determine a valid seed order, {} tables are part of cycles",
                plan.unresolved.len()
            );
        }
    }

    if check || dry_run {
        let label = if check {
            "Check PASSED: Tables can be ordered topologically."
        } else {
            "Seed order:"
        };
        eprintln!("{}", label);
        print_order(&plan);
        return Ok(());
    }

    let writer: Box<dyn Write> = match &output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(std::io::stdout())),
    };

    let stats = render_seed_script(&plan, writer)?;

    if let Some(path) = &output {
        eprintln!("Seed script written to: {}", path.display());
    }
    eprintln!(
        "\nPlanned {} tables and {} catalog files for seeding.",
        stats.written,
        plan.catalog_files.len()
    );

    Ok(())
}

pub(super) fn report_skipped(plan: &SeedPlan) {
    for skipped in &plan.skipped {
        eprintln!(
            "Skipping {}: no create.sql with a table name next to it",
            skipped.display()
        );
    }
    for skipped in &plan.skipped_catalog_files {
        eprintln!(
            "Skipping {}: header does not match meta.catalog",
            skipped.display()
        );
    }
}

pub(super) fn print_order(plan: &SeedPlan) {
    for (i, entry) in plan.entries.iter().enumerate() {
        let suffix = if i < plan.ordered_count { "" } else { " (unordered)" };
        eprintln!("  {}. {}{}", i + 1, entry.table, suffix);
    }
    for file in &plan.catalog_files {
        eprintln!("  meta.catalog <- {}", file.path.display());
    }
}
