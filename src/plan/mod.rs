//! Create, seed and drop plans for the data catalog.
//!
//! A plan is the list of catalog sources in the order they should be
//! processed: tables in dependency order first, then every source the graph
//! could not place (no table name, unreadable, cyclic, replaced duplicate).

mod script;

pub use script::*;

use crate::catalog::{
    find_catalog_csv_files, find_create_sql_files, find_schema_dirs, find_seed_csv_files,
    CREATE_SQL,
};
use crate::schema::{
    build_dependency_graph, extract_table_name_from_file, has_serial_column, DependencyGraph,
    DuplicateEntity, EntityId,
};
use ahash::{AHashMap, AHashSet};
use anyhow::{bail, Context};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Columns of `meta.catalog`, in table order
pub const CATALOG_COLUMNS: &[&str] = &[
    "Table",
    "Column",
    "Order",
    "Type",
    "Nullable?",
    "Primary Key?",
    "Foreign Key",
    "Description",
    "Sample Values",
];

/// A table and the file it comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedTable {
    pub table: EntityId,
    pub source: PathBuf,
}

/// Order in which `create.sql` files should be executed
#[derive(Debug, Clone, Serialize)]
pub struct CreatePlan {
    /// Tables in dependency order
    pub ordered: Vec<PlannedTable>,
    /// Tables that could not be ordered because of cycles
    pub unresolved: Vec<PlannedTable>,
    /// Sources not in `ordered`, in discovery order
    pub leftovers: Vec<PathBuf>,
    /// Tables defined by more than one source
    pub duplicates: Vec<DuplicateEntity>,
    /// Referenced tables with no `create.sql` among the sources
    pub external: Vec<EntityId>,
}

impl CreatePlan {
    /// Discover `create.sql` files under `tables_dir` and plan them
    pub fn build(tables_dir: &Path, usernames: Option<&[String]>) -> Self {
        let sources = find_create_sql_files(tables_dir, usernames);
        Self::from_sources(&sources)
    }

    /// Plan an explicit list of `create.sql` files
    pub fn from_sources(sources: &[PathBuf]) -> Self {
        let graph = build_dependency_graph(sources, extract_table_name_from_file);
        let sorted = graph.topo_sort();

        let ordered = planned(&graph, &sorted.order);
        let unresolved = planned(&graph, &sorted.unresolved);

        let placed: AHashSet<&Path> = ordered.iter().map(|t| t.source.as_path()).collect();
        let mut leftovers: Vec<PathBuf> = Vec::new();
        for source in sources {
            if !placed.contains(source.as_path()) && !leftovers.contains(source) {
                leftovers.push(source.clone());
            }
        }

        info!(
            sources = sources.len(),
            ordered = ordered.len(),
            leftovers = leftovers.len(),
            "create plan built"
        );

        Self {
            ordered,
            unresolved,
            leftovers,
            duplicates: graph.duplicates().to_vec(),
            external: graph
                .external_dependencies()
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }

    /// All sources to execute: ordered tables first, then leftovers
    pub fn processing_order(&self) -> Vec<&Path> {
        self.ordered
            .iter()
            .map(|t| t.source.as_path())
            .chain(self.leftovers.iter().map(PathBuf::as_path))
            .collect()
    }

    /// True when no table was held back by a cycle
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }

    /// Table name for a source, when the graph placed it
    pub fn table_for(&self, source: &Path) -> Option<&str> {
        self.ordered
            .iter()
            .find(|t| t.source == source)
            .map(|t| t.table.as_str())
    }
}

fn planned(graph: &DependencyGraph, tables: &[EntityId]) -> Vec<PlannedTable> {
    tables
        .iter()
        .filter_map(|table| {
            graph.source(table).map(|source| PlannedTable {
                table: table.clone(),
                source: source.to_path_buf(),
            })
        })
        .collect()
}

/// Schemas and tables to tear down
#[derive(Debug, Clone, Serialize)]
pub struct DropPlan {
    /// Schemas dropped with CASCADE
    pub schemas: Vec<String>,
    /// Tables in reverse creation order, dependents before the tables they reference
    pub tables: Vec<EntityId>,
}

impl DropPlan {
    /// Plan a teardown of `tables_dir`: every schema directory, or only the given schemas
    pub fn build(tables_dir: &Path, schemas: Option<&[String]>) -> Self {
        let create = CreatePlan::build(tables_dir, schemas);
        Self::from_create_plan(tables_dir, schemas, &create)
    }

    /// Plan a teardown that undoes `create`
    pub fn from_create_plan(
        tables_dir: &Path,
        schemas: Option<&[String]>,
        create: &CreatePlan,
    ) -> Self {
        let schemas = match schemas {
            Some(names) if !names.is_empty() => names.to_vec(),
            _ => find_schema_dirs(tables_dir),
        };

        // Cyclic tables were created last, so they are dropped first
        let tables = create
            .ordered
            .iter()
            .chain(&create.unresolved)
            .rev()
            .map(|t| t.table.clone())
            .collect();

        Self { schemas, tables }
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty() && self.tables.is_empty()
    }
}

/// One table to seed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeedEntry {
    pub table: EntityId,
    pub csv: PathBuf,
    pub create_sql: PathBuf,
    /// The table has a SERIAL `"ID"` column whose sequence must be moved past the seeded rows
    pub reset_sequence: bool,
}

/// Order in which `seed.csv` files should be loaded
#[derive(Debug, Clone, Serialize)]
pub struct SeedPlan {
    /// Tables to seed: dependency order first, then tables the graph could not place
    pub entries: Vec<SeedEntry>,
    /// Number of leading entries that follow dependency order
    pub ordered_count: usize,
    /// Tables that could not be ordered because of cycles
    pub unresolved: Vec<EntityId>,
    /// Seed files skipped for lack of a readable `create.sql` with a table name
    pub skipped: Vec<PathBuf>,
    /// `catalog.csv` files loaded into `meta.catalog` once the tables are seeded
    pub catalog_files: Vec<CatalogFile>,
    /// `catalog.csv` files with an unreadable or unknown header
    pub skipped_catalog_files: Vec<PathBuf>,
}

impl SeedPlan {
    /// Discover `seed.csv` and `catalog.csv` files under `tables_dir` and plan them
    pub fn build(tables_dir: &Path, usernames: Option<&[String]>) -> Self {
        let csv_files = find_seed_csv_files(tables_dir, usernames);
        let mut plan = Self::from_seed_files(&csv_files);
        plan.add_catalog_files(&find_catalog_csv_files(tables_dir, None));
        plan
    }

    /// Read the header of each `catalog.csv` and queue it for loading.
    ///
    /// Files whose header cannot be mapped onto `meta.catalog` are skipped.
    pub fn add_catalog_files(&mut self, paths: &[PathBuf]) {
        for path in paths {
            match CatalogFile::read(path) {
                Ok(file) => self.catalog_files.push(file),
                Err(e) => {
                    warn!(error = %format!("{e:#}"), "skipping catalog file");
                    self.skipped_catalog_files.push(path.clone());
                }
            }
        }
    }

    /// Plan an explicit list of `seed.csv` files.
    ///
    /// Each seed file is matched with the `create.sql` next to it.
    pub fn from_seed_files(csv_files: &[PathBuf]) -> Self {
        let mut tables: Vec<SeedEntry> = Vec::new();
        let mut by_table: AHashMap<EntityId, usize> = AHashMap::new();
        let mut create_paths: Vec<PathBuf> = Vec::new();
        let mut skipped: Vec<PathBuf> = Vec::new();

        for csv in csv_files {
            let create_sql = csv
                .parent()
                .map(|dir| dir.join(CREATE_SQL))
                .unwrap_or_else(|| PathBuf::from(CREATE_SQL));

            if !create_sql.is_file() {
                debug!(csv = %csv.display(), "no create.sql next to seed file, skipping");
                skipped.push(csv.clone());
                continue;
            }

            let Some(table) = extract_table_name_from_file(&create_sql) else {
                debug!(csv = %csv.display(), "no table name in create.sql, skipping");
                skipped.push(csv.clone());
                continue;
            };

            let entry = SeedEntry {
                table: table.clone(),
                csv: csv.clone(),
                reset_sequence: needs_sequence_reset(&create_sql),
                create_sql: create_sql.clone(),
            };

            match by_table.get(&table) {
                Some(&idx) => tables[idx] = entry,
                None => {
                    by_table.insert(table, tables.len());
                    tables.push(entry);
                }
            }
            create_paths.push(create_sql);
        }

        let graph = build_dependency_graph(&create_paths, extract_table_name_from_file);
        let sorted = graph.topo_sort();

        let mut entries: Vec<SeedEntry> = Vec::with_capacity(tables.len());
        let mut taken = vec![false; tables.len()];
        for table in &sorted.order {
            if let Some(&idx) = by_table.get(table) {
                if !taken[idx] {
                    taken[idx] = true;
                    entries.push(tables[idx].clone());
                }
            }
        }
        let ordered_count = entries.len();

        for (idx, entry) in tables.into_iter().enumerate() {
            if !taken[idx] {
                entries.push(entry);
            }
        }

        info!(
            seed_files = csv_files.len(),
            ordered = ordered_count,
            total = entries.len(),
            skipped = skipped.len(),
            "seed plan built"
        );

        Self {
            entries,
            ordered_count,
            unresolved: sorted.unresolved,
            skipped,
            catalog_files: Vec::new(),
            skipped_catalog_files: Vec::new(),
        }
    }

    /// True when no table was held back by a cycle
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// A `catalog.csv` file and the `meta.catalog` columns its header names
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogFile {
    pub path: PathBuf,
    /// Header columns in file order
    pub columns: Vec<String>,
}

impl CatalogFile {
    /// Read the header of a `catalog.csv`.
    ///
    /// Every header column must be a distinct `meta.catalog` column.
    pub fn read(path: &Path) -> anyhow::Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        let columns: Vec<String> = reader
            .headers()
            .with_context(|| format!("failed to read header of {}", path.display()))?
            .iter()
            .map(|c| c.trim().to_string())
            .collect();

        if columns.iter().all(String::is_empty) {
            bail!("{} has no header", path.display());
        }
        for (i, column) in columns.iter().enumerate() {
            if !CATALOG_COLUMNS.contains(&column.as_str()) {
                bail!("{}: unknown catalog column {:?}", path.display(), column);
            }
            if columns[..i].contains(column) {
                bail!("{}: duplicate catalog column {:?}", path.display(), column);
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            columns,
        })
    }

    /// True when the file fills the given `meta.catalog` column
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }
}

fn needs_sequence_reset(create_sql: &Path) -> bool {
    fs::read_to_string(create_sql)
        .map(|sql| has_serial_column(&sql) && sql.contains("\"ID\""))
        .unwrap_or(false)
}
