//! Data catalog discovery.
//!
//! Finds `create.sql`, `seed.csv` and `catalog.csv` files under the tables
//! directory, optionally restricted to a set of schema (username) folders.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Table definition file name
pub const CREATE_SQL: &str = "create.sql";

/// Seed data file name
pub const SEED_CSV: &str = "seed.csv";

/// Column documentation file name
pub const CATALOG_CSV: &str = "catalog.csv";

/// Schemas whose `catalog.csv` files are collected by default
pub const DEFAULT_CATALOG_SCHEMAS: &[&str] = &["meta", "test00000000000000000000"];

/// The catalog table documents the other tables; it is not seeded from a seed file.
const CATALOG_SEED_SUFFIX: &[&str] = &["meta", "catalog", SEED_CSV];

/// Find all `create.sql` files, in all schemas or only the given ones.
pub fn find_create_sql_files(tables_dir: &Path, usernames: Option<&[String]>) -> Vec<PathBuf> {
    search_dirs(tables_dir, usernames)
        .iter()
        .flat_map(|dir| find_named(dir, CREATE_SQL))
        .collect()
}

/// Find all `seed.csv` files, excluding the one for `meta/catalog`.
pub fn find_seed_csv_files(tables_dir: &Path, usernames: Option<&[String]>) -> Vec<PathBuf> {
    search_dirs(tables_dir, usernames)
        .iter()
        .flat_map(|dir| find_named(dir, SEED_CSV))
        .filter(|path| !is_catalog_seed(path))
        .collect()
}

/// Find all `catalog.csv` files in the given schemas (sorted).
pub fn find_catalog_csv_files(tables_dir: &Path, schemas: Option<&[String]>) -> Vec<PathBuf> {
    let schemas: Vec<String> = match schemas {
        Some(s) => s.to_vec(),
        None => DEFAULT_CATALOG_SCHEMAS
            .iter()
            .map(|s| s.to_string())
            .collect(),
    };

    let mut files: Vec<PathBuf> = schemas
        .iter()
        .map(|schema| tables_dir.join(schema))
        .filter(|dir| dir.is_dir())
        .flat_map(|dir| find_named(&dir, CATALOG_CSV))
        .collect();
    files.sort();
    files
}

/// Names of the schema directories directly under `tables_dir` (sorted).
pub fn find_schema_dirs(tables_dir: &Path) -> Vec<String> {
    let entries = match fs::read_dir(tables_dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(dir = %tables_dir.display(), error = %e, "cannot list tables directory");
            return Vec::new();
        }
    };

    let mut schemas: Vec<String> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| entry.file_name().to_str().map(String::from))
        .collect();
    schemas.sort();
    schemas
}

fn search_dirs(tables_dir: &Path, usernames: Option<&[String]>) -> Vec<PathBuf> {
    let dirs = match usernames {
        Some(names) if !names.is_empty() => names.iter().map(|u| tables_dir.join(u)).collect(),
        _ => vec![tables_dir.to_path_buf()],
    };

    dirs.into_iter()
        .filter(|dir| {
            let exists = dir.is_dir();
            if !exists {
                debug!(dir = %dir.display(), "search directory does not exist, skipping");
            }
            exists
        })
        .collect()
}

/// Recursively find files with the given name under `dir` (sorted).
fn find_named(dir: &Path, file_name: &str) -> Vec<PathBuf> {
    let base = glob::Pattern::escape(&dir.to_string_lossy());
    let pattern = format!("{}/**/{}", base.trim_end_matches('/'), file_name);

    let entries = match glob::glob(&pattern) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(pattern = %pattern, error = %e, "invalid glob pattern");
            return Vec::new();
        }
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| match entry {
            Ok(path) if path.is_file() => Some(path),
            Ok(_) => None,
            Err(e) => {
                debug!(error = %e, "error reading path during discovery");
                None
            }
        })
        .collect();
    files.sort();
    files
}

fn is_catalog_seed(path: &Path) -> bool {
    let tail: Vec<_> = path
        .components()
        .rev()
        .take(CATALOG_SEED_SUFFIX.len())
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();

    tail.len() == CATALOG_SEED_SUFFIX.len()
        && tail
            .iter()
            .rev()
            .zip(CATALOG_SEED_SUFFIX)
            .all(|(a, b)| a == b)
}
