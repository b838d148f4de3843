//! Table dependency graph for FK-ordered create and seed operations.
//!
//! Provides:
//! - Dependency graph construction from `create.sql` sources
//! - Topological sorting for processing order
//! - Cycle detection, with the unresolved tables reported back to the caller

use super::{parse_references, EntityId};
use ahash::AHashMap;
use serde::Serialize;
use std::collections::{BTreeSet, VecDeque};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Table dependency graph built from `REFERENCES` clauses.
///
/// Each table maps to the set of tables it references. A referenced table
/// that is not itself a key is an external dependency: it is assumed to
/// exist already and never holds back ordering.
///
/// Tables are kept in insertion order so that sorting is deterministic.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// Tables in insertion order
    entities: Vec<EntityId>,
    /// Map from table name to its position in `entities`
    index: AHashMap<EntityId, usize>,
    /// For each table, the tables it depends on (never itself)
    dependencies: Vec<BTreeSet<EntityId>>,
    /// For each table, the source that defined it
    sources: Vec<Option<PathBuf>>,
    /// Tables defined by more than one source
    duplicates: Vec<DuplicateEntity>,
}

/// A table defined by more than one source.
///
/// The later source wins; the earlier one is kept here so callers can still
/// process it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateEntity {
    pub entity: EntityId,
    pub kept: Option<PathBuf>,
    pub replaced: Option<PathBuf>,
}

/// Result of topological sort
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TopoSortResult {
    /// Tables in topological order (dependencies before dependents)
    pub order: Vec<EntityId>,
    /// Tables that are part of, or depend on, a cycle (could not be ordered)
    pub unresolved: Vec<EntityId>,
}

impl TopoSortResult {
    /// True when every table in the graph was ordered
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }

    /// All tables: the sorted ones first, then the unresolved ones.
    pub fn into_processing_order(self) -> Vec<EntityId> {
        let mut all = self.order;
        all.extend(self.unresolved);
        all
    }
}

impl DependencyGraph {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from `(table, dependencies)` pairs.
    ///
    /// Self-references are dropped. Later pairs for the same table replace
    /// earlier ones, as with [`DependencyGraph::insert`].
    pub fn from_edges<I, D, S>(edges: I) -> Self
    where
        I: IntoIterator<Item = (S, D)>,
        D: IntoIterator<Item = S>,
        S: Into<EntityId>,
    {
        let mut graph = Self::new();
        for (entity, deps) in edges {
            graph.insert(entity.into(), deps.into_iter().map(Into::into), None);
        }
        graph
    }

    /// Add a table with its dependencies.
    ///
    /// If the table is already present, its dependencies and source are
    /// replaced in place and the overwrite is recorded in
    /// [`DependencyGraph::duplicates`].
    pub fn insert<D>(&mut self, entity: EntityId, deps: D, source: Option<PathBuf>)
    where
        D: IntoIterator<Item = EntityId>,
    {
        let deps: BTreeSet<EntityId> = deps.into_iter().filter(|d| *d != entity).collect();

        if let Some(&idx) = self.index.get(&entity) {
            let replaced = std::mem::replace(&mut self.sources[idx], source.clone());
            warn!(
                table = %entity,
                kept = ?source,
                replaced = ?replaced,
                "table defined by more than one source, keeping the later one"
            );
            self.dependencies[idx] = deps;
            self.duplicates.push(DuplicateEntity {
                entity,
                kept: source,
                replaced,
            });
            return;
        }

        self.index.insert(entity.clone(), self.entities.len());
        self.entities.push(entity);
        self.dependencies.push(deps);
        self.sources.push(source);
    }

    /// Get the number of tables in the graph
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check if the graph is empty
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Check if a table is a key of the graph
    pub fn contains(&self, entity: &str) -> bool {
        self.index.contains_key(entity)
    }

    /// Tables in insertion order
    pub fn entities(&self) -> &[EntityId] {
        &self.entities
    }

    /// Tables the given table depends on
    pub fn dependencies(&self, entity: &str) -> Option<&BTreeSet<EntityId>> {
        self.index.get(entity).map(|&idx| &self.dependencies[idx])
    }

    /// Source that defined the given table
    pub fn source(&self, entity: &str) -> Option<&Path> {
        self.index
            .get(entity)
            .and_then(|&idx| self.sources[idx].as_deref())
    }

    /// Iterate over `(table, source)` for tables that have a source
    pub fn sources(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.entities
            .iter()
            .zip(&self.sources)
            .filter_map(|(e, s)| s.as_deref().map(|s| (e.as_str(), s)))
    }

    /// Tables defined by more than one source
    pub fn duplicates(&self) -> &[DuplicateEntity] {
        &self.duplicates
    }

    /// Tables that directly depend on the given table, in insertion order
    pub fn dependents(&self, entity: &str) -> Vec<&str> {
        self.entities
            .iter()
            .zip(&self.dependencies)
            .filter(|(_, deps)| deps.contains(entity))
            .map(|(e, _)| e.as_str())
            .collect()
    }

    /// Referenced tables that are not keys of the graph (sorted)
    pub fn external_dependencies(&self) -> Vec<&str> {
        let external: BTreeSet<&str> = self
            .dependencies
            .iter()
            .flatten()
            .map(String::as_str)
            .filter(|d| !self.contains(d))
            .collect();
        external.into_iter().collect()
    }

    /// Perform topological sort using Kahn's algorithm.
    ///
    /// Returns tables in dependency order. Only dependencies that are keys of
    /// the graph count towards a table's in-degree. Tables that never reach
    /// in-degree zero (cycles and anything downstream of one) are returned
    /// separately in `unresolved`; this is not an error.
    pub fn topo_sort(&self) -> TopoSortResult {
        let n = self.len();
        if n == 0 {
            return TopoSortResult::default();
        }

        // Calculate in-degrees and the reverse edges (dependency -> dependents)
        let mut in_degree: Vec<usize> = vec![0; n];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (i, deps) in self.dependencies.iter().enumerate() {
            for dep in deps {
                if let Some(&d) = self.index.get(dep) {
                    in_degree[i] += 1;
                    dependents[d].push(i);
                }
            }
        }

        // Start with tables that have no in-graph dependencies
        let mut queue: VecDeque<usize> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, &deg)| deg == 0)
            .map(|(i, _)| i)
            .collect();

        let mut order = Vec::with_capacity(n);

        while let Some(idx) = queue.pop_front() {
            order.push(self.entities[idx].clone());

            for &dependent in &dependents[idx] {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    queue.push_back(dependent);
                }
            }
        }

        // Tables with remaining in-degree > 0 are part of cycles
        let unresolved: Vec<EntityId> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, &deg)| deg > 0)
            .map(|(i, _)| self.entities[i].clone())
            .collect();

        if !unresolved.is_empty() {
            warn!(
                count = unresolved.len(),
                tables = ?unresolved,
                "cycle detected in dependency graph, unresolved tables left out of the order"
            );
        }

        TopoSortResult { order, unresolved }
    }
}

/// Build a dependency graph from `create.sql` files.
///
/// `extract_fn` maps a source to its table name; sources without one are
/// skipped. Sources that cannot be read are logged and skipped.
pub fn build_dependency_graph<P, F>(sources: &[P], extract_fn: F) -> DependencyGraph
where
    P: AsRef<Path>,
    F: FnMut(&Path) -> Option<EntityId>,
{
    build_dependency_graph_with(sources, extract_fn, |path| fs::read_to_string(path))
}

/// Same as [`build_dependency_graph`] with a caller-supplied loader.
pub fn build_dependency_graph_with<P, F, L>(
    sources: &[P],
    mut extract_fn: F,
    mut load_fn: L,
) -> DependencyGraph
where
    P: AsRef<Path>,
    F: FnMut(&Path) -> Option<EntityId>,
    L: FnMut(&Path) -> io::Result<String>,
{
    let mut graph = DependencyGraph::new();

    for source in sources {
        let path = source.as_ref();

        let Some(entity) = extract_fn(path) else {
            debug!(source = %path.display(), "no table name found, leaving out of the graph");
            continue;
        };

        let content = match load_fn(path) {
            Ok(content) => content,
            Err(e) => {
                warn!(source = %path.display(), error = %e, "failed to read source, skipping");
                continue;
            }
        };

        let deps = parse_references(&content, Some(&entity));
        graph.insert(entity, deps, Some(path.to_path_buf()));
    }

    graph
}
