//! Command-line front-end for the flexdb data layer.
//!
//! Stands in for an interactive presentation layer: every subcommand maps
//! onto one boundary operation of the store manager.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};

use flexdb_api::{FieldMap, StoreConfig, StoreManager};

/// Command-line arguments for the flexdb tool.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding the catalog and database files
    #[arg(long, default_value = "./data")]
    data_dir: PathBuf,

    /// Optional JSON config file overriding the defaults
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// One boundary operation per subcommand.
#[derive(Subcommand, Debug)]
enum Command {
    /// Create a database
    CreateDb { name: String },
    /// List databases
    ListDbs,
    /// Open a database as the selected database
    OpenDb { name: String },
    /// Rename a database
    RenameDb { old: String, new: String },
    /// Delete a database and everything it owns
    DeleteDb { name: String },
    /// Reset the selected database connection
    Reset,
    /// Create a collection
    CreateCollection { db: String, name: String },
    /// List collections of a database
    ListCollections { db: String },
    /// Rename a collection
    RenameCollection {
        db: String,
        old: String,
        new: String,
    },
    /// Delete a collection and everything it owns
    DeleteCollection { db: String, name: String },
    /// Declare a field (STRING, INTEGER, DOUBLE, BOOLEAN, or JSON)
    CreateField {
        db: String,
        collection: String,
        name: String,
        field_type: String,
    },
    /// List fields of a collection (repairs schema drift as it lists)
    ListFields { db: String, collection: String },
    /// Rename and/or retype a field
    UpdateField {
        db: String,
        collection: String,
        old: String,
        new: String,
        field_type: String,
    },
    /// Delete a field, stripping it from stored records
    DeleteField {
        db: String,
        collection: String,
        name: String,
    },
    /// Insert a record from a JSON object
    Insert {
        db: String,
        collection: String,
        values: String,
    },
    /// Query records, optionally filtered by a JSON object
    Query {
        db: String,
        collection: String,
        #[arg(long)]
        filter: Option<String>,
    },
    /// Update records by position or filter
    Update {
        db: String,
        collection: String,
        values: String,
        #[arg(long)]
        position: Option<usize>,
        #[arg(long)]
        filter: Option<String>,
    },
    /// Delete records by position or filter
    Delete {
        db: String,
        collection: String,
        #[arg(long)]
        position: Option<usize>,
        #[arg(long)]
        filter: Option<String>,
    },
    /// Reconcile stored records with the declared field set
    Sync { db: String, collection: String },
}

/// Parses a CLI argument as a JSON object.
fn parse_object(text: &str) -> anyhow::Result<FieldMap> {
    let value: serde_json::Value =
        serde_json::from_str(text).context("argument is not valid JSON")?;
    match value {
        serde_json::Value::Object(map) => Ok(map),
        _ => bail!("argument must be a JSON object"),
    }
}

/// Turns a boundary success flag into a process outcome.
fn finish(ok: bool) -> anyhow::Result<()> {
    if ok {
        println!("ok");
        Ok(())
    } else {
        bail!("operation failed")
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("cannot read config {}", path.display()))?;
            serde_json::from_str(&text).context("invalid config file")?
        }
        None => StoreConfig {
            data_dir: args.data_dir.clone(),
            ..Default::default()
        },
    };

    let manager = StoreManager::open(config).context("cannot open store")?;

    match args.command {
        Command::CreateDb { name } => finish(manager.create_database(&name).await),
        Command::ListDbs => {
            for name in manager.list_databases().await {
                println!("{name}");
            }
            Ok(())
        }
        Command::OpenDb { name } => {
            let ok = manager.open_database(&name).await;
            if ok {
                println!("selected {}", name);
            }
            finish(ok)
        }
        Command::RenameDb { old, new } => finish(manager.rename_database(&old, &new).await),
        Command::DeleteDb { name } => finish(manager.delete_database(&name).await),
        Command::Reset => finish(manager.reset_connection().await),
        Command::CreateCollection { db, name } => {
            finish(manager.create_collection(&db, &name).await)
        }
        Command::ListCollections { db } => {
            for name in manager.list_collections(&db).await {
                println!("{name}");
            }
            Ok(())
        }
        Command::RenameCollection { db, old, new } => {
            finish(manager.rename_collection(&db, &old, &new).await)
        }
        Command::DeleteCollection { db, name } => {
            finish(manager.delete_collection(&db, &name).await)
        }
        Command::CreateField {
            db,
            collection,
            name,
            field_type,
        } => finish(manager.create_field(&db, &collection, &name, &field_type).await),
        Command::ListFields { db, collection } => {
            for (name, field_type) in manager.list_fields(&db, &collection).await {
                println!("{name}\t{field_type}");
            }
            Ok(())
        }
        Command::UpdateField {
            db,
            collection,
            old,
            new,
            field_type,
        } => finish(
            manager
                .update_field(&db, &collection, &old, &new, &field_type)
                .await,
        ),
        Command::DeleteField {
            db,
            collection,
            name,
        } => finish(manager.delete_field(&db, &collection, &name).await),
        Command::Insert {
            db,
            collection,
            values,
        } => {
            let values = parse_object(&values)?;
            finish(manager.insert_data(&db, &collection, values).await)
        }
        Command::Query {
            db,
            collection,
            filter,
        } => {
            let filter = filter.as_deref().map(parse_object).transpose()?;
            for row in manager.query_data(&db, &collection, filter).await {
                println!("{}", serde_json::Value::Object(row));
            }
            Ok(())
        }
        Command::Update {
            db,
            collection,
            values,
            position,
            filter,
        } => {
            let values = parse_object(&values)?;
            let filter = filter.as_deref().map(parse_object).transpose()?;
            finish(
                manager
                    .update_data(&db, &collection, position, filter, values)
                    .await,
            )
        }
        Command::Delete {
            db,
            collection,
            position,
            filter,
        } => {
            let filter = filter.as_deref().map(parse_object).transpose()?;
            finish(manager.delete_data(&db, &collection, position, filter).await)
        }
        Command::Sync { db, collection } => {
            finish(manager.sync_collection_fields(&db, &collection).await)
        }
    }
}
