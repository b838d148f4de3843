//! Table dependency analysis for the data catalog.
//!
//! This module provides:
//! - `REFERENCES` clause extraction from `create.sql` sources
//! - Table name extraction from `CREATE TABLE` statements
//! - Dependency graph construction keyed by `schema.table`
//! - Topological sorting with cycle reporting

mod ddl;
mod graph;

pub use ddl::*;
pub use graph::*;

/// Schema-qualified table name (`schema.table`), treated as an opaque key.
pub type EntityId = String;
