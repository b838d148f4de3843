mod create;
mod drop;
mod graph;
mod reset;
mod seed;

use catalog_order::config::CatalogConfig;
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "catalog-order")]
#[command(version)]
#[command(
    about = "Order data-catalog tables by foreign-key dependencies",
    long_about = None
)]
pub struct Cli {
    /// Verbose logging (same as RUST_LOG=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where to find the catalog
#[derive(Args, Debug, Clone)]
pub struct CatalogArgs {
    /// Tables directory (default: data/tables, or the value from --config)
    #[arg(long)]
    pub tables_dir: Option<PathBuf>,

    /// YAML config file with tables_dir / buckets_dir
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Only include these schemas (usernames)
    #[arg(short, long, visible_alias = "schemas", num_args = 1..)]
    pub usernames: Option<Vec<String>>,
}

impl CatalogArgs {
    /// Resolve the catalog location: --tables-dir, then --config, then defaults
    pub fn resolve(&self) -> anyhow::Result<CatalogConfig> {
        let config = match &self.config {
            Some(path) => CatalogConfig::load(path)?,
            None => CatalogConfig::default(),
        }
        .with_tables_dir(self.tables_dir.clone());

        config.validate()?;
        Ok(config)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Emit all create.sql files as one script, parents before children
    Create {
        #[command(flatten)]
        catalog: CatalogArgs,

        /// Output SQL file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Only list the creation order
        #[arg(long)]
        dry_run: bool,

        /// Fail if circular dependencies prevent a full ordering
        #[arg(long)]
        check: bool,

        /// Output the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Emit a psql script loading every seed.csv, parents before children
    Seed {
        #[command(flatten)]
        catalog: CatalogArgs,

        /// Output script file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Only list the seed order
        #[arg(long)]
        dry_run: bool,

        /// Fail if circular dependencies prevent a full ordering
        #[arg(long)]
        check: bool,

        /// Output the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Emit a script dropping every schema (or every table, dependents first)
    Drop {
        #[command(flatten)]
        catalog: CatalogArgs,

        /// Output SQL file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Only list what would be dropped
        #[arg(long)]
        dry_run: bool,

        /// Drop tables in reverse dependency order instead of whole schemas
        #[arg(long)]
        tables: bool,

        /// Output the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Emit one psql script that drops, recreates and reseeds the catalog
    Reset {
        #[command(flatten)]
        catalog: CatalogArgs,

        /// Output script file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Only list the drop, creation and seed order
        #[arg(long)]
        dry_run: bool,

        /// Fail if circular dependencies prevent a full ordering
        #[arg(long)]
        check: bool,

        /// Output the plans as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the table dependency graph
    Graph {
        #[command(flatten)]
        catalog: CatalogArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Create {
            catalog,
            output,
            dry_run,
            check,
            json,
        } => create::run(catalog, output, dry_run, check, json),
        Commands::Seed {
            catalog,
            output,
            dry_run,
            check,
            json,
        } => seed::run(catalog, output, dry_run, check, json),
        Commands::Drop {
            catalog,
            output,
            dry_run,
            tables,
            json,
        } => drop::run(catalog, output, dry_run, tables, json),
        Commands::Reset {
            catalog,
            output,
            dry_run,
            check,
            json,
        } => reset::run(catalog, output, dry_run, check, json),
        Commands::Graph { catalog, json } => graph::run(catalog, json),
        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "catalog-order", &mut io::stdout());
            Ok(())
        }
    }
}
