//! Unit tests for create/seed plans and script rendering.

mod common;

use catalog_order::plan::{
    quote_identifier, quote_schema_table, render_create_script, render_drop_script,
    render_reset_script, render_seed_script, sequence_reset_sql, CatalogFile, CreatePlan,
    DropPlan, DropScope, SeedPlan,
};
use common::{cyclic_catalog, sample_catalog, write_file};
use std::path::PathBuf;

fn tables(plan: &CreatePlan) -> Vec<&str> {
    plan.ordered.iter().map(|t| t.table.as_str()).collect()
}

fn index_of(items: &[&str], item: &str) -> usize {
    items
        .iter()
        .position(|i| *i == item)
        .unwrap_or_else(|| panic!("{} missing from {:?}", item, items))
}

mod create_plan_tests {
    use super::*;

    #[test]
    fn test_create_plan_orders_parents_first() {
        let dir = sample_catalog();
        let plan = CreatePlan::build(dir.path(), None);
        let ordered = tables(&plan);

        assert_eq!(ordered.len(), 5);
        assert!(index_of(&ordered, "meta.group") < index_of(&ordered, "meta.group__member"));
        assert!(index_of(&ordered, "meta.users") < index_of(&ordered, "meta.group__member"));
        assert!(ordered.contains(&"test00000000000000000000.help__theme"));
        assert!(plan.is_complete());
    }

    #[test]
    fn test_create_plan_keeps_unnamed_sources_as_leftovers() {
        let dir = sample_catalog();
        let plan = CreatePlan::build(dir.path(), None);

        let notes = dir.path().join("meta").join("notes").join("create.sql");
        assert_eq!(plan.leftovers, vec![notes.clone()]);

        let order = plan.processing_order();
        assert_eq!(order.len(), 6);
        assert_eq!(order.last().copied(), Some(notes.as_path()));
        assert_eq!(plan.table_for(&notes), None);
    }

    #[test]
    fn test_create_plan_filters_usernames() {
        let dir = sample_catalog();
        let usernames = vec!["test00000000000000000000".to_string()];
        let plan = CreatePlan::build(dir.path(), Some(usernames.as_slice()));

        assert_eq!(tables(&plan), vec!["test00000000000000000000.help__theme"]);
        assert!(plan.leftovers.is_empty());
    }

    #[test]
    fn test_create_plan_external_dependencies() {
        let dir = sample_catalog();
        let usernames = vec!["meta".to_string()];
        write_file(
            dir.path(),
            "meta",
            "settings",
            "create.sql",
            r#"CREATE TABLE meta.settings (FOREIGN KEY ("Theme ID") REFERENCES "test00000000000000000000".help__theme ("ID"));"#,
        );

        let plan = CreatePlan::build(dir.path(), Some(usernames.as_slice()));
        assert_eq!(plan.external, vec!["test00000000000000000000.help__theme"]);
        assert!(tables(&plan).contains(&"meta.settings"));
    }

    #[test]
    fn test_create_plan_cycle() {
        let dir = cyclic_catalog();
        let plan = CreatePlan::build(dir.path(), None);

        assert_eq!(tables(&plan), vec!["meta.c"]);
        let unresolved: Vec<&str> = plan.unresolved.iter().map(|t| t.table.as_str()).collect();
        assert_eq!(unresolved, vec!["meta.a", "meta.b"]);
        assert!(!plan.is_complete());

        // Cyclic tables are still processed, after the ordered ones
        let a = dir.path().join("meta").join("a").join("create.sql");
        let b = dir.path().join("meta").join("b").join("create.sql");
        assert_eq!(plan.leftovers, vec![a, b]);
        assert_eq!(plan.processing_order().len(), 3);
    }

    #[test]
    fn test_create_plan_duplicate_table_is_still_processed() {
        let dir = sample_catalog();
        let copy = write_file(
            dir.path(),
            "meta",
            "users_v2",
            "create.sql",
            "CREATE TABLE meta.users (\n    \"ID\" SERIAL\n);\n",
        );
        let original = dir.path().join("meta").join("users").join("create.sql");

        let plan = CreatePlan::build(dir.path(), Some(vec!["meta".to_string()].as_slice()));

        assert_eq!(plan.duplicates.len(), 1);
        assert_eq!(plan.duplicates[0].entity, "meta.users");
        // users_v2 is discovered after users, so it wins
        assert_eq!(plan.duplicates[0].kept.as_deref(), Some(copy.as_path()));
        assert_eq!(plan.duplicates[0].replaced.as_deref(), Some(original.as_path()));
        assert!(plan.leftovers.contains(&original));
    }

    #[test]
    fn test_create_plan_empty_sources() {
        let plan = CreatePlan::from_sources(&[]);
        assert!(plan.ordered.is_empty());
        assert!(plan.processing_order().is_empty());
    }
}

mod seed_plan_tests {
    use super::*;

    #[test]
    fn test_seed_plan_orders_and_skips() {
        let dir = sample_catalog();
        let plan = SeedPlan::build(dir.path(), None);

        let seeded: Vec<&str> = plan.entries.iter().map(|e| e.table.as_str()).collect();
        assert_eq!(seeded.len(), 3);
        assert!(!seeded.contains(&"meta.catalog"));
        assert!(index_of(&seeded, "meta.group") < index_of(&seeded, "meta.group__member"));
        assert!(index_of(&seeded, "meta.users") < index_of(&seeded, "meta.group__member"));
        assert_eq!(plan.ordered_count, 3);

        let orphan = dir.path().join("meta").join("orphan").join("seed.csv");
        assert_eq!(plan.skipped, vec![orphan]);
        assert_eq!(plan.catalog_files.len(), 2);
    }

    #[test]
    fn test_seed_plan_sequence_reset() {
        let dir = sample_catalog();
        let plan = SeedPlan::build(dir.path(), None);

        let users = plan.entries.iter().find(|e| e.table == "meta.users").unwrap();
        assert!(users.reset_sequence);
        assert_eq!(
            users.create_sql,
            dir.path().join("meta").join("users").join("create.sql")
        );

        let group = plan.entries.iter().find(|e| e.table == "meta.group").unwrap();
        assert!(!group.reset_sequence);
    }

    #[test]
    fn test_seed_plan_cycle_tables_come_last() {
        let dir = cyclic_catalog();
        let plan = SeedPlan::build(dir.path(), None);

        let seeded: Vec<&str> = plan.entries.iter().map(|e| e.table.as_str()).collect();
        assert_eq!(seeded, vec!["meta.c", "meta.a", "meta.b"]);
        assert_eq!(plan.ordered_count, 1);
        assert_eq!(plan.unresolved, vec!["meta.a", "meta.b"]);
        assert!(!plan.is_complete());
    }

    #[test]
    fn test_seed_plan_explicit_files() {
        let dir = sample_catalog();
        let files: Vec<PathBuf> = vec![
            dir.path().join("meta").join("group__member").join("seed.csv"),
            dir.path().join("meta").join("group").join("seed.csv"),
        ];
        let plan = SeedPlan::from_seed_files(&files);

        let seeded: Vec<&str> = plan.entries.iter().map(|e| e.table.as_str()).collect();
        assert_eq!(seeded, vec!["meta.group", "meta.group__member"]);
    }

    #[test]
    fn test_catalog_file_reads_header_in_file_order() {
        let dir = sample_catalog();
        let path = write_file(
            dir.path(),
            "meta",
            "audit",
            "catalog.csv",
            "Column,Table,Order\nID,meta.audit,1\n",
        );

        let file = CatalogFile::read(&path).unwrap();
        assert_eq!(file.columns, vec!["Column", "Table", "Order"]);
        assert!(file.has_column("Column"));
        assert!(!file.has_column("Type"));
    }

    #[test]
    fn test_catalog_file_rejects_unknown_or_missing_header() {
        let dir = sample_catalog();
        let unknown = write_file(
            dir.path(),
            "meta",
            "audit",
            "catalog.csv",
            "Table,Colour\nmeta.audit,red\n",
        );
        let empty = write_file(dir.path(), "meta", "empty", "catalog.csv", "");
        let repeated = write_file(dir.path(), "meta", "twice", "catalog.csv", "Table,Table\n");

        assert!(CatalogFile::read(&unknown).is_err());
        assert!(CatalogFile::read(&empty).is_err());
        assert!(CatalogFile::read(&repeated).is_err());
        assert!(CatalogFile::read(&dir.path().join("missing.csv")).is_err());
    }

    #[test]
    fn test_seed_plan_skips_catalog_files_with_bad_header() {
        let dir = sample_catalog();
        let good = dir.path().join("meta").join("catalog").join("catalog.csv");
        let bad = write_file(dir.path(), "meta", "audit", "catalog.csv", "Colour\nred\n");

        let mut plan = SeedPlan::from_seed_files(&[]);
        plan.add_catalog_files(&[good.clone(), bad.clone()]);

        assert_eq!(plan.catalog_files.len(), 1);
        assert_eq!(plan.catalog_files[0].path, good);
        assert_eq!(plan.skipped_catalog_files, vec![bad]);
    }
}

mod drop_plan_tests {
    use super::*;

    #[test]
    fn test_drop_plan_all_schemas() {
        let dir = sample_catalog();
        let plan = DropPlan::build(dir.path(), None);

        assert_eq!(plan.schemas, vec!["meta", "test00000000000000000000"]);
        assert!(!plan.is_empty());
    }

    #[test]
    fn test_drop_plan_given_schemas() {
        let dir = sample_catalog();
        let schemas = vec!["meta".to_string()];
        let plan = DropPlan::build(dir.path(), Some(schemas.as_slice()));

        assert_eq!(plan.schemas, vec!["meta"]);
        assert!(!plan.tables.contains(&"test00000000000000000000.help__theme".to_string()));
    }

    #[test]
    fn test_drop_plan_tables_dependents_first() {
        let dir = sample_catalog();
        let plan = DropPlan::build(dir.path(), None);
        let tables: Vec<&str> = plan.tables.iter().map(String::as_str).collect();

        assert_eq!(tables.len(), 5);
        assert!(index_of(&tables, "meta.group__member") < index_of(&tables, "meta.group"));
        assert!(index_of(&tables, "meta.group__member") < index_of(&tables, "meta.users"));
    }

    #[test]
    fn test_drop_plan_cyclic_tables_first() {
        let dir = cyclic_catalog();
        let plan = DropPlan::build(dir.path(), None);

        assert_eq!(plan.tables, vec!["meta.b", "meta.a", "meta.c"]);
    }

    #[test]
    fn test_drop_plan_empty_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        let plan = DropPlan::build(dir.path(), None);

        assert!(plan.is_empty());
    }
}

mod script_tests {
    use super::*;

    #[test]
    fn test_render_create_script() {
        let dir = sample_catalog();
        let plan = CreatePlan::build(dir.path(), None);

        let mut out = Vec::new();
        let stats = render_create_script(&plan, &mut out).unwrap();
        let script = String::from_utf8(out).unwrap();

        assert_eq!(stats.written, 6);
        assert_eq!(stats.failed, 0);
        assert!(script.starts_with("-- Catalog create script\n"));
        assert!(script.contains("-- Tables: 6"));

        let group = script.find("CREATE TABLE meta.group (").unwrap();
        let member = script.find("CREATE TABLE meta.group__member (").unwrap();
        let users = script.find("CREATE TABLE meta.users (").unwrap();
        assert!(group < member);
        assert!(users < member);
        assert!(script.contains("-- Table: meta.group__member"));
        assert!(script.contains("-- Source: "));
    }

    #[test]
    fn test_render_create_script_counts_unreadable() {
        let dir = sample_catalog();
        let plan = CreatePlan::build(dir.path(), Some(vec!["meta".to_string()].as_slice()));
        std::fs::remove_file(dir.path().join("meta").join("notes").join("create.sql")).unwrap();

        let mut out = Vec::new();
        let stats = render_create_script(&plan, &mut out).unwrap();

        assert_eq!(stats.failed, 1);
        assert_eq!(stats.written, 4);
    }

    #[test]
    fn test_render_seed_script() {
        let dir = sample_catalog();
        let plan = SeedPlan::build(dir.path(), None);

        let mut out = Vec::new();
        let stats = render_seed_script(&plan, &mut out).unwrap();
        let script = String::from_utf8(out).unwrap();

        assert_eq!(stats.written, 3);
        assert!(script.contains("TRUNCATE meta.users CASCADE;"));
        assert!(script.contains("\\copy meta.users FROM '"));
        assert!(script.contains("WITH (FORMAT csv, HEADER true, NULL '')"));
        assert!(script.contains(r#"SELECT setval('"meta"."users_ID_seq"'"#));
        assert!(!script.contains("group_ID_seq"));

        let group = script.find("TRUNCATE meta.group CASCADE;").unwrap();
        let member = script.find("TRUNCATE meta.group__member CASCADE;").unwrap();
        assert!(group < member);

        // catalog.csv files load after every table
        let catalog = script.find("DELETE FROM meta.catalog;").unwrap();
        assert!(member < catalog);
        assert_eq!(
            script
                .matches("\\copy meta.catalog (\"Table\", \"Column\") FROM '")
                .count(),
            2
        );
        assert!(!script.contains("Sample Values"));
    }

    #[test]
    fn test_render_seed_script_uses_catalog_header() {
        let dir = sample_catalog();
        let reordered = write_file(
            dir.path(),
            "meta",
            "audit",
            "catalog.csv",
            "Column,Table,Order\nNULL,meta.audit,0\n",
        );

        let mut plan = SeedPlan::from_seed_files(&[]);
        plan.add_catalog_files(&[reordered]);

        let mut out = Vec::new();
        render_seed_script(&plan, &mut out).unwrap();
        let script = String::from_utf8(out).unwrap();

        assert!(script.contains("DELETE FROM meta.catalog;"));
        assert!(script.contains("\\copy meta.catalog (\"Column\", \"Table\", \"Order\") FROM '"));
        assert!(script.contains(r#"UPDATE meta.catalog SET "Column" = NULL"#));
    }

    #[test]
    fn test_render_seed_script_without_column_skips_null_update() {
        let dir = sample_catalog();
        let path = write_file(dir.path(), "meta", "audit", "catalog.csv", "Table\nmeta.audit\n");

        let mut plan = SeedPlan::from_seed_files(&[]);
        plan.add_catalog_files(&[path]);

        let mut out = Vec::new();
        render_seed_script(&plan, &mut out).unwrap();
        let script = String::from_utf8(out).unwrap();

        assert!(script.contains("\\copy meta.catalog (\"Table\") FROM '"));
        assert!(!script.contains("UPDATE meta.catalog"));
    }

    #[test]
    fn test_render_drop_script_schemas() {
        let dir = sample_catalog();
        let plan = DropPlan::build(dir.path(), None);

        let mut out = Vec::new();
        let stats = render_drop_script(&plan, DropScope::Schemas, &mut out).unwrap();
        let script = String::from_utf8(out).unwrap();

        assert_eq!(stats.written, 2);
        assert!(script.starts_with("-- Catalog drop script\n"));
        assert!(script.contains("-- Schemas: 2"));
        assert!(script.contains("DROP SCHEMA IF EXISTS meta CASCADE;"));
        assert!(script.contains("DROP SCHEMA IF EXISTS test00000000000000000000 CASCADE;"));
        assert!(!script.contains("DROP TABLE"));
    }

    #[test]
    fn test_render_drop_script_tables() {
        let dir = sample_catalog();
        let plan = DropPlan::build(dir.path(), None);

        let mut out = Vec::new();
        let stats = render_drop_script(&plan, DropScope::Tables, &mut out).unwrap();
        let script = String::from_utf8(out).unwrap();

        assert_eq!(stats.written, 5);
        let member = script
            .find("DROP TABLE IF EXISTS meta.group__member CASCADE;")
            .unwrap();
        let group = script.find("DROP TABLE IF EXISTS meta.group CASCADE;").unwrap();
        assert!(member < group);
        assert!(!script.contains("DROP SCHEMA"));
    }

    #[test]
    fn test_render_drop_script_quotes_schema() {
        let plan = DropPlan {
            schemas: vec!["Sales-2024".to_string()],
            tables: Vec::new(),
        };

        let mut out = Vec::new();
        render_drop_script(&plan, DropScope::Schemas, &mut out).unwrap();
        let script = String::from_utf8(out).unwrap();

        assert!(script.contains("DROP SCHEMA IF EXISTS \"Sales-2024\" CASCADE;"));
    }

    #[test]
    fn test_render_reset_script_drop_create_seed() {
        let dir = sample_catalog();
        let create = CreatePlan::build(dir.path(), None);
        let drop_plan = DropPlan::from_create_plan(dir.path(), None, &create);
        let seed = SeedPlan::build(dir.path(), None);

        let mut out = Vec::new();
        let stats = render_reset_script(&drop_plan, &create, &seed, &mut out).unwrap();
        let script = String::from_utf8(out).unwrap();

        assert_eq!(stats.dropped.written, 2);
        assert_eq!(stats.created.written, 6);
        assert_eq!(stats.seeded.written, 3);

        let drop_schema = script.find("DROP SCHEMA IF EXISTS meta CASCADE;").unwrap();
        let create_schema = script.find("CREATE SCHEMA IF NOT EXISTS meta;").unwrap();
        let create_table = script.find("CREATE TABLE meta.group (").unwrap();
        let truncate = script.find("TRUNCATE meta.group CASCADE;").unwrap();
        let catalog = script.find("DELETE FROM meta.catalog;").unwrap();
        assert!(drop_schema < create_schema);
        assert!(create_schema < create_table);
        assert!(create_table < truncate);
        assert!(truncate < catalog);
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("users"), "users");
        assert_eq!(quote_identifier("group__member"), "group__member");
        assert_eq!(quote_identifier("Users"), "\"Users\"");
        assert_eq!(quote_identifier("1users"), "\"1users\"");
        assert_eq!(quote_identifier("my-schema"), "\"my-schema\"");
        assert_eq!(quote_identifier("\"Already\""), "\"Already\"");
        assert_eq!(
            quote_identifier("test00000000000000000000"),
            "test00000000000000000000"
        );
    }

    #[test]
    fn test_quote_schema_table() {
        assert_eq!(quote_schema_table("meta.users"), "meta.users");
        assert_eq!(quote_schema_table("meta.Users"), "meta.\"Users\"");
        assert_eq!(quote_schema_table("My Schema.users"), "\"My Schema\".users");
        assert_eq!(quote_schema_table("users"), "users");
    }

    #[test]
    fn test_sequence_reset_sql() {
        assert_eq!(
            sequence_reset_sql("meta.users"),
            r#"SELECT setval('"meta"."users_ID_seq"', GREATEST(COALESCE((SELECT MAX("ID") FROM "meta"."users"), 0), 1));"#
        );
        assert_eq!(
            sequence_reset_sql("users"),
            r#"SELECT setval('"users_ID_seq"', GREATEST(COALESCE((SELECT MAX("ID") FROM "users"), 0), 1));"#
        );
    }
}
