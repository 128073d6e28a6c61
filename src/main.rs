//! Valuegraph CLI - maintenance commands for the graph-of-values store

use clap::{Parser, Subcommand};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use valuegraph::config::{self, StoreConfig};
use valuegraph::migration::{LATEST_GENERATION, Migrations};
use valuegraph::{GraphStore, RecordId, Value, ValueKind};

#[derive(Parser)]
#[command(name = "valuegraph")]
#[command(version = "0.1.0")]
#[command(about = "Embedded graph-of-values store - typed facts linked into a property graph")]
#[command(long_about = r#"
Valuegraph stores typed scalar facts as addressable records and relates
them through directed, optionally-labeled links:
  • Point reads and string lookups over typed value records
  • Index-backed link traversal by source, key, source+key, and target
  • Generational schema migrations for legacy text-keyed stores

Example usage:
  valuegraph init
  valuegraph migrate --database facts.db
  valuegraph get --id 67e55044-10b1-426f-9247-bb680e5fe0c8
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a store and bring it to the latest schema generation
    Init {
        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Migrate an existing store to the latest schema generation
    Migrate {
        /// Path to the database file (defaults to the configured store)
        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// Show statistics about the store
    Stats {
        /// Path to the database file (defaults to the configured store)
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Check link endpoint integrity
    Check {
        /// Path to the database file (defaults to the configured store)
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Fetch one value record by identifier
    Get {
        /// Record identifier (hyphenated UUID or plain hex)
        #[arg(short, long)]
        id: String,

        /// Path to the database file (defaults to the configured store)
        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// Store one typed value, minting an identifier when none is given
    Put {
        /// Payload kind (bool, u8, i8, u16, i16, u32, i32, u64, i64, f32, f64, str)
        #[arg(short, long)]
        kind: String,

        /// Payload literal
        #[arg(long)]
        value: String,

        /// Record identifier (minted at random when omitted)
        #[arg(short, long)]
        id: Option<String>,

        /// Path to the database file (defaults to the configured store)
        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// Find records whose string payload equals the given text
    Find {
        /// String payload to look up
        #[arg(short, long)]
        text: String,

        /// Path to the database file (defaults to the configured store)
        #[arg(short, long)]
        database: Option<PathBuf>,
    },
}

/// Pick the database path: explicit flag, then config file, then default
fn resolve_database(database: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    if let Some(path) = database {
        return Ok(path);
    }
    if let Some(config) = config::load_config(None)? {
        if let Some(path) = config.database {
            return Ok(PathBuf::from(path));
        }
    }
    Ok(config::default_database_path_in(Path::new(".")))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match cli.command {
        Commands::Init { database, force } => {
            let db_path =
                database.unwrap_or_else(|| config::default_database_path_in(Path::new(".")));
            config::ensure_db_dir(&db_path)?;

            let store = GraphStore::open(&db_path)?;
            config::write_config(
                &config::default_config_path(),
                &StoreConfig {
                    database: Some(db_path.display().to_string()),
                },
                force,
            )?;
            config::ensure_gitignore(Path::new("."))?;

            println!(
                "✅ Initialized store at {:?} (generation {})",
                db_path,
                store.generation()?
            );
        }

        Commands::Migrate { database } => {
            let db_path = resolve_database(database)?;
            if !db_path.exists() {
                anyhow::bail!("no store found at {}", db_path.display());
            }

            let mut conn = Connection::open(&db_path)?;
            let mut migrations = Migrations::new(&mut conn)?;

            println!("🗄️  Store: {:?}", db_path);
            println!("Current generation: {}", migrations.generation());
            println!("Target generation: {}", LATEST_GENERATION);

            if migrations.is_current() {
                println!("✅ Already at the latest generation.");
                return Ok(());
            }

            while let Some(generation) = migrations.run_step()? {
                println!("Migrated to generation {}", generation);
            }
            for report in migrations.integrity_reports() {
                println!("{}", report);
            }
            println!("✅ Migration complete.");
        }

        Commands::Stats { database, format } => {
            let db_path = resolve_database(database)?;
            let store = GraphStore::open(&db_path)?;
            let stats = store.stats()?;

            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("📊 Valuegraph Statistics ({:?})", db_path);
                println!("------------------------------------");
                println!("{}", stats);
            }
        }

        Commands::Check { database, format } => {
            let store = GraphStore::open(&resolve_database(database)?)?;
            let report = store.check_integrity()?;

            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report);
                if !report.is_well_formed() {
                    println!("❌ Malformed link endpoints found.");
                } else if report.dangling_links > 0 {
                    println!("Dangling links are tolerated by design; nothing to fix.");
                }
            }
        }

        Commands::Get { id, database } => {
            let store = GraphStore::open(&resolve_database(database)?)?;
            let id: RecordId = id.parse()?;
            let record = store.get(&id)?;

            match record.payload {
                Some(value) => println!("[{}] {}", value.kind(), value),
                None => println!("∅ Record {} carries no payload.", id),
            }
        }

        Commands::Put {
            kind,
            value,
            id,
            database,
        } => {
            let store = GraphStore::open(&resolve_database(database)?)?;
            let kind: ValueKind = kind.parse()?;
            let value = Value::parse_as(kind, &value)?;
            let id = match id {
                Some(s) => s.parse()?,
                None => RecordId::random(),
            };

            store.put(&id, &value)?;
            println!("✅ Stored [{}] under {}", value.kind(), id);
        }

        Commands::Find { text, database } => {
            let store = GraphStore::open(&resolve_database(database)?)?;
            let ids = store.find_by_string(&text)?;

            if ids.is_empty() {
                println!("❌ No records found.");
            } else {
                for id in ids {
                    println!("- {}", id);
                }
            }
        }
    }

    Ok(())
}
