//! PostgreSQL DDL scanning for catalog tables.
//!
//! This is a best-effort regex scan, not a SQL parser. Anything that does not
//! match the expected shapes is skipped rather than reported as an error.

use super::EntityId;
use ahash::AHashSet;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Regex for the target of a `REFERENCES` clause.
/// Supports: REFERENCES schema.table (...) and REFERENCES "schema".table (...)
static REFERENCES_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)REFERENCES\s+(?:"([^"]+)"\.(\w+)|(\w+)\.(\w+))\s*\("#).unwrap()
});

/// Regex to extract the table name from CREATE TABLE.
/// Supports: schema.table, "schema".table, "schema"."table", "table"
static CREATE_TABLE_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)CREATE\s+TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?(?:"([^"]+)"\.)?(?:"([^"]+)"|([a-zA-Z_][a-zA-Z0-9_]*(?:\.[a-zA-Z_][a-zA-Z0-9_]*)*))"#,
    )
    .unwrap()
});

/// Extract the tables referenced by `REFERENCES` clauses.
///
/// Returns `schema.table` names in the order they first appear, without
/// duplicates. When `self_table` is given, references to that table are
/// dropped so a self-referencing FK never becomes a dependency.
pub fn parse_references(sql: &str, self_table: Option<&str>) -> Vec<EntityId> {
    let mut seen: AHashSet<EntityId> = AHashSet::new();
    let mut refs = Vec::new();

    for caps in REFERENCES_RE.captures_iter(sql) {
        let (schema, table) = match (caps.get(1), caps.get(2)) {
            (Some(schema), Some(table)) => (schema, table),
            _ => match (caps.get(3), caps.get(4)) {
                (Some(schema), Some(table)) => (schema, table),
                _ => continue,
            },
        };
        let referenced = format!("{}.{}", schema.as_str(), table.as_str());

        if self_table == Some(referenced.as_str()) {
            continue;
        }

        if seen.insert(referenced.clone()) {
            refs.push(referenced);
        }
    }

    refs
}

/// Extract the table name from a CREATE TABLE statement
pub fn extract_create_table_name(sql: &str) -> Option<EntityId> {
    let caps = CREATE_TABLE_NAME_RE.captures(sql)?;
    let schema = caps.get(1).map(|m| m.as_str());
    let table = caps.get(2).or_else(|| caps.get(3))?.as_str();

    match schema {
        Some(schema) => Some(format!("{}.{}", schema, table)),
        None => Some(table.to_string()),
    }
}

/// Read a `create.sql` file and extract its table name.
///
/// Unreadable files yield `None`, same as files without a CREATE TABLE.
pub fn extract_table_name_from_file(path: &Path) -> Option<EntityId> {
    let content = fs::read_to_string(path).ok()?;
    extract_create_table_name(&content)
}

/// Check whether a `create.sql` source declares a SERIAL column
pub fn has_serial_column(sql: &str) -> bool {
    sql.to_uppercase().contains("SERIAL")
}
