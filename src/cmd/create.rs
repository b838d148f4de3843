//! Create command - emit create.sql files in dependency order.

use super::CatalogArgs;
use anyhow::{bail, Result};
use catalog_order::plan::{render_create_script, CreatePlan};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

/// Run the create command
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
            "Planning table creation from: {}",
            config.tables_dir.display()
        );
    }

    let plan = CreatePlan::build(&config.tables_dir, catalog.usernames.as_deref());

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

    if plan.processing_order().is_empty() {
        eprintln!("No create.sql files found.");
        return Ok(());
    }

    if !plan.is_complete() {
        eprintln!("\nWarning: Circular dependencies detected!");
        eprintln!("The following tables are part of cycles:");
        for table in &plan.unresolved {
            eprintln!("  - {}", table.table);
        }
        eprintln!();

        if check {
            bail!(
                "check failed: cannot determine a valid creation order, {} tables are part of cycles",
                plan.unresolved.len()
            );
        }
    }

    for dup in &plan.duplicates {
        eprintln!(
            "Warning: {} is defined more than once; using {}",
            dup.entity,
            dup.kept
                .as_deref()
                .map(|p| p.display().to_string())
                .unwrap_or_default()
        );
    }

    if check || dry_run {
        let label = if check {
            "Check PASSED: Tables can be ordered topologically."
        } else {
            "Creation order:"
        };
        eprintln!("{}", label);
        print_order(&plan);
        return Ok(());
    }

    let writer: Box<dyn Write> = match &output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(std::io::stdout())),
    };

    let stats = render_create_script(&plan, writer)?;

    if let Some(path) = &output {
        eprintln!("Create script written to: {}", path.display());
    }
    eprintln!(
        "\nProcessed {} create.sql files in dependency order.",
        stats.written
    );
    if stats.failed > 0 {
        eprintln!(
            "Warning: {} create.sql files could not be read.",
            stats.failed
        );
    }

    Ok(())
}

pub(super) fn print_order(plan: &CreatePlan) {
    let mut position = 0;
    for table in &plan.ordered {
        position += 1;
        eprintln!("  {}. {}", position, table.table);
    }
    for source in &plan.leftovers {
        position += 1;
        eprintln!("  {}. {} (unordered)", position, source.display());
    }
}
