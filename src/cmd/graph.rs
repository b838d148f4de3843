//! Graph command - show table dependencies and the resulting order.

use super::CatalogArgs;
use anyhow::Result;
use catalog_order::catalog::find_create_sql_files;
use catalog_order::schema::{
    build_dependency_graph, extract_table_name_from_file, DependencyGraph, DuplicateEntity,
    TopoSortResult,
};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
struct GraphJsonOutput {
    tables: Vec<GraphTableJson>,
    order: Vec<String>,
    unresolved: Vec<String>,
    external: Vec<String>,
    duplicates: Vec<DuplicateEntity>,
}

#[derive(Serialize)]
struct GraphTableJson {
    table: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<PathBuf>,
    depends_on: Vec<String>,
}

/// Run the graph command
pub fn run(catalog: CatalogArgs, json: bool) -> Result<()> {
    let config = catalog.resolve()?;
    let sources = find_create_sql_files(&config.tables_dir, catalog.usernames.as_deref());
    let graph = build_dependency_graph(&sources, extract_table_name_from_file);
    let sorted = graph.topo_sort();

    if json {
        let output = to_json(&graph, sorted);
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if graph.is_empty() {
        eprintln!("No tables found in: {}", config.tables_dir.display());
        return Ok(());
    }

    println!("Tables ({}):", graph.len());
    for table in graph.entities() {
        let deps: Vec<&str> = graph
            .dependencies(table)
            .map(|d| d.iter().map(String::as_str).collect())
            .unwrap_or_default();
        if deps.is_empty() {
            println!("  {}", table);
        } else {
            println!("  {} -> {}", table, deps.join(", "));
        }
    }

    let external = graph.external_dependencies();
    if !external.is_empty() {
        println!("\nExternal dependencies ({}):", external.len());
        for table in external {
            println!("  {}", table);
        }
    }

    println!("\nOrder ({} of {}):", sorted.order.len(), graph.len());
    for (i, table) in sorted.order.iter().enumerate() {
        println!("  {}. {}", i + 1, table);
    }

    if !sorted.is_complete() {
        println!("\nUnresolved (cycles):");
        for table in &sorted.unresolved {
            println!("  - {}", table);
        }
    }

    if !graph.duplicates().is_empty() {
        println!("\nDefined more than once:");
        for dup in graph.duplicates() {
            println!("  - {}", dup.entity);
        }
    }

    Ok(())
}

fn to_json(graph: &DependencyGraph, sorted: TopoSortResult) -> GraphJsonOutput {
    let tables = graph
        .entities()
        .iter()
        .map(|table| GraphTableJson {
            table: table.clone(),
            source: graph.source(table).map(|p| p.to_path_buf()),
            depends_on: graph
                .dependencies(table)
                .map(|d| d.iter().cloned().collect())
                .unwrap_or_default(),
        })
        .collect();

    GraphJsonOutput {
        tables,
        order: sorted.order,
        unresolved: sorted.unresolved,
        external: graph
            .external_dependencies()
            .into_iter()
            .map(String::from)
            .collect(),
        duplicates: graph.duplicates().to_vec(),
    }
}
