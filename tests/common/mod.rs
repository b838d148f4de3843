//! Shared catalog fixtures for integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Write `<tables>/<schema>/<table>/<file>` and return its path
pub fn write_file(tables: &Path, schema: &str, table: &str, file: &str, content: &str) -> PathBuf {
    let dir = tables.join(schema).join(table);
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join(file);
    fs::write(&path, content).unwrap();
    path
}

/// A small catalog:
///
/// - meta.users (SERIAL "ID", seeded)
/// - meta.group (seeded)
/// - meta.group__member -> meta.group, meta.users, meta.group__member (seeded)
/// - meta.catalog (seed.csv excluded from seeding, catalog.csv present)
/// - meta/notes/create.sql without a CREATE TABLE
/// - meta/orphan/seed.csv without a create.sql
/// - test00000000000000000000.help__theme (catalog.csv present)
pub fn sample_catalog() -> TempDir {
    let dir = TempDir::new().unwrap();
    let tables = dir.path();

    write_file(
        tables,
        "meta",
        "users",
        "create.sql",
        "CREATE TABLE meta.users (\n    \"ID\" SERIAL PRIMARY KEY,\n    \"Name\" TEXT\n);\n",
    );
    write_file(tables, "meta", "users", "seed.csv", "ID,Name\n1,alice\n");

    write_file(
        tables,
        "meta",
        "group",
        "create.sql",
        "CREATE TABLE meta.group (\n    \"ID\" INTEGER PRIMARY KEY\n);\n",
    );
    write_file(tables, "meta", "group", "seed.csv", "ID\n1\n");

    write_file(
        tables,
        "meta",
        "group__member",
        "create.sql",
        r#"CREATE TABLE meta.group__member (
    "Group ID" INTEGER,
    "User ID" INTEGER,
    "Sponsor ID" INTEGER,
    FOREIGN KEY ("Group ID") REFERENCES meta.group ("ID"),
    FOREIGN KEY ("User ID") REFERENCES meta.users ("ID") ON DELETE CASCADE,
    FOREIGN KEY ("Sponsor ID") REFERENCES meta.group__member ("ID")
);
"#,
    );
    write_file(tables, "meta", "group__member", "seed.csv", "Group ID,User ID\n1,1\n");

    write_file(
        tables,
        "meta",
        "catalog",
        "create.sql",
        "CREATE TABLE meta.catalog (\n    \"Table\" TEXT\n);\n",
    );
    write_file(tables, "meta", "catalog", "seed.csv", "Table\nmeta.users\n");
    write_file(tables, "meta", "catalog", "catalog.csv", "Table,Column\nmeta.users,ID\n");

    write_file(tables, "meta", "notes", "create.sql", "-- notes live in the documents bucket\n");
    write_file(tables, "meta", "orphan", "seed.csv", "ID\n1\n");

    write_file(
        tables,
        "test00000000000000000000",
        "help__theme",
        "create.sql",
        "CREATE TABLE \"test00000000000000000000\".help__theme (\n    \"ID\" SERIAL\n);\n",
    );
    write_file(
        tables,
        "test00000000000000000000",
        "help__theme",
        "catalog.csv",
        "Table,Column\nhelp__theme,ID\n",
    );

    dir
}

/// A catalog where meta.a and meta.b reference each other and meta.c stands alone
pub fn cyclic_catalog() -> TempDir {
    let dir = TempDir::new().unwrap();
    let tables = dir.path();

    write_file(
        tables,
        "meta",
        "a",
        "create.sql",
        "CREATE TABLE meta.a (\n    \"B ID\" INTEGER,\n    FOREIGN KEY (\"B ID\") REFERENCES meta.b (\"ID\")\n);\n",
    );
    write_file(tables, "meta", "a", "seed.csv", "B ID\n1\n");
    write_file(
        tables,
        "meta",
        "b",
        "create.sql",
        "CREATE TABLE meta.b (\n    \"A ID\" INTEGER,\n    FOREIGN KEY (\"A ID\") REFERENCES meta.a (\"ID\")\n);\n",
    );
    write_file(tables, "meta", "b", "seed.csv", "A ID\n1\n");
    write_file(
        tables,
        "meta",
        "c",
        "create.sql",
        "CREATE TABLE meta.c (\n    \"ID\" INTEGER\n);\n",
    );
    write_file(tables, "meta", "c", "seed.csv", "ID\n1\n");

    dir
}
