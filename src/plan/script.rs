//! SQL script rendering for create, seed, drop and reset plans.

use super::{CatalogFile, CreatePlan, DropPlan, SeedEntry, SeedPlan};
use std::fs;
use std::io::{self, Write};
use tracing::warn;

/// Outcome of rendering a script
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Sources written to the script
    pub written: usize,
    /// Sources that could not be read
    pub failed: usize,
}

/// Write every `create.sql` in plan order as one script.
///
/// Unreadable sources are logged, counted and left out.
pub fn render_create_script<W: Write>(
    plan: &CreatePlan,
    mut writer: W,
) -> io::Result<RenderStats> {
    let sources = plan.processing_order();
    write_header(&mut writer, "create", "Tables", sources.len())?;

    let mut stats = RenderStats::default();
    for source in sources {
        let sql = match fs::read_to_string(source) {
            Ok(sql) => sql,
            Err(e) => {
                warn!(source = %source.display(), error = %e, "failed to read create.sql");
                stats.failed += 1;
                continue;
            }
        };

        match plan.table_for(source) {
            Some(table) => writeln!(writer, "-- Table: {}", table)?,
            None => writeln!(writer, "-- Source: {}", source.display())?,
        }
        writeln!(writer, "{}", sql.trim_end())?;
        writeln!(writer)?;
        stats.written += 1;
    }

    writer.flush()?;
    Ok(stats)
}

/// Write a psql script that truncates and loads every seed file in plan order.
///
/// `catalog.csv` files are loaded into `meta.catalog` after all tables.
pub fn render_seed_script<W: Write>(plan: &SeedPlan, mut writer: W) -> io::Result<RenderStats> {
    write_header(&mut writer, "seed", "Tables", plan.entries.len())?;

    let mut stats = RenderStats::default();
    for entry in &plan.entries {
        write_seed_entry(&mut writer, entry)?;
        stats.written += 1;
    }

    if !plan.catalog_files.is_empty() {
        writeln!(writer, "-- Catalog: {} files", plan.catalog_files.len())?;
        writeln!(writer, "DELETE FROM {};", CATALOG_TABLE)?;
        for file in &plan.catalog_files {
            write_catalog_copy(&mut writer, file)?;
        }
        if plan.catalog_files.iter().any(|f| f.has_column("Column")) {
            writeln!(
                writer,
                "UPDATE {} SET \"Column\" = NULL WHERE upper(trim(\"Column\")) = 'NULL';",
                CATALOG_TABLE
            )?;
        }
        writeln!(writer)?;
    }

    writer.flush()?;
    Ok(stats)
}

/// What a drop script removes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DropScope {
    /// `DROP SCHEMA ... CASCADE` for every schema
    #[default]
    Schemas,
    /// `DROP TABLE ... CASCADE` for every table, dependents first
    Tables,
}

/// Write a script that drops the schemas or tables of a plan
pub fn render_drop_script<W: Write>(
    plan: &DropPlan,
    scope: DropScope,
    mut writer: W,
) -> io::Result<RenderStats> {
    let mut stats = RenderStats::default();
    match scope {
        DropScope::Schemas => {
            write_header(&mut writer, "drop", "Schemas", plan.schemas.len())?;
            for schema in &plan.schemas {
                writeln!(
                    writer,
                    "DROP SCHEMA IF EXISTS {} CASCADE;",
                    quote_identifier(schema)
                )?;
                stats.written += 1;
            }
        }
        DropScope::Tables => {
            write_header(&mut writer, "drop", "Tables", plan.tables.len())?;
            for table in &plan.tables {
                writeln!(
                    writer,
                    "DROP TABLE IF EXISTS {} CASCADE;",
                    quote_schema_table(table)
                )?;
                stats.written += 1;
            }
        }
    }
    writeln!(writer)?;

    writer.flush()?;
    Ok(stats)
}

/// Outcome of rendering a reset script
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResetStats {
    pub dropped: RenderStats,
    pub created: RenderStats,
    pub seeded: RenderStats,
}

/// Write one psql script that drops the schemas, recreates them with their
/// tables and seeds them again.
pub fn render_reset_script<W: Write>(
    drop_plan: &DropPlan,
    create: &CreatePlan,
    seed: &SeedPlan,
    mut writer: W,
) -> io::Result<ResetStats> {
    let dropped = render_drop_script(drop_plan, DropScope::Schemas, &mut writer)?;

    for schema in &drop_plan.schemas {
        writeln!(
            writer,
            "CREATE SCHEMA IF NOT EXISTS {};",
            quote_identifier(schema)
        )?;
    }
    writeln!(writer)?;

    let created = render_create_script(create, &mut writer)?;
    let seeded = render_seed_script(seed, &mut writer)?;

    Ok(ResetStats {
        dropped,
        created,
        seeded,
    })
}

/// Table documenting every column of the catalog
const CATALOG_TABLE: &str = "meta.catalog";

fn sql_string(s: &str) -> String {
    s.replace('\'', "''")
}

fn write_header<W: Write>(
    writer: &mut W,
    kind: &str,
    noun: &str,
    count: usize,
) -> io::Result<()> {
    writeln!(writer, "-- Catalog {} script", kind)?;
    writeln!(writer, "-- Generated by catalog-order")?;
    writeln!(
        writer,
        "-- Date: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    )?;
    writeln!(writer, "-- {}: {}", noun, count)?;
    writeln!(writer)?;
    Ok(())
}

fn write_catalog_copy<W: Write>(writer: &mut W, file: &CatalogFile) -> io::Result<()> {
    let columns: Vec<String> = file.columns.iter().map(|c| quote_identifier(c)).collect();
    writeln!(
        writer,
        "\\copy {} ({}) FROM '{}' WITH (FORMAT csv, HEADER true, NULL '')",
        CATALOG_TABLE,
        columns.join(", "),
        sql_string(&file.path.display().to_string())
    )
}

fn write_seed_entry<W: Write>(writer: &mut W, entry: &SeedEntry) -> io::Result<()> {
    let quoted = quote_schema_table(&entry.table);
    let csv = sql_string(&entry.csv.display().to_string());

    writeln!(writer, "-- Table: {}", entry.table)?;
    writeln!(writer, "TRUNCATE {} CASCADE;", quoted)?;
    writeln!(
        writer,
        "\\copy {} FROM '{}' WITH (FORMAT csv, HEADER true, NULL '')",
        quoted, csv
    )?;
    if entry.reset_sequence {
        writeln!(writer, "{}", sequence_reset_sql(&entry.table))?;
    }
    writeln!(writer)?;
    Ok(())
}

/// Statement that moves a table's `"ID"` sequence so `nextval` returns MAX("ID") + 1
pub fn sequence_reset_sql(table: &str) -> String {
    let (schema, name) = match table.split_once('.') {
        Some((schema, name)) => (Some(schema.trim_matches('"')), name.trim_matches('"')),
        None => (None, table.trim_matches('"')),
    };

    let (quoted_table, sequence) = match schema {
        Some(schema) => (
            format!("\"{}\".\"{}\"", schema, name),
            format!("\"{}\".\"{}_ID_seq\"", schema, name),
        ),
        None => (format!("\"{}\"", name), format!("\"{}_ID_seq\"", name)),
    };

    format!(
        "SELECT setval('{}', GREATEST(COALESCE((SELECT MAX(\"ID\") FROM {}), 0), 1));",
        sequence, quoted_table
    )
}

/// Quote a PostgreSQL identifier if needed.
///
/// Identifiers starting with a digit, containing uppercase letters, or
/// containing anything besides alphanumerics and `_` are double-quoted.
/// Already-quoted identifiers are returned unchanged.
pub fn quote_identifier(identifier: &str) -> String {
    if identifier.len() >= 2 && identifier.starts_with('"') && identifier.ends_with('"') {
        return identifier.to_string();
    }

    let needs_quote = identifier.is_empty()
        || identifier.starts_with(|c: char| c.is_ascii_digit())
        || identifier.chars().any(char::is_uppercase)
        || !identifier.chars().all(|c| c.is_alphanumeric() || c == '_');

    if needs_quote {
        format!("\"{}\"", identifier)
    } else {
        identifier.to_string()
    }
}

/// Quote a `schema.table` identifier, each half on its own
pub fn quote_schema_table(table: &str) -> String {
    match table.split_once('.') {
        Some((schema, name)) => format!("{}.{}", quote_identifier(schema), quote_identifier(name)),
        None => quote_identifier(table),
    }
}
