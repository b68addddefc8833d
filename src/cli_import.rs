//! Song Import Tool
//!
//! Loads a JSON song list into the catalog database, creating the songbook
//! and its categories as needed. Running it again refreshes existing songs.

use anyhow::{Context, Result};
use clap::Parser;
use songbook_server::catalog_store::SqliteCatalogStore;
use songbook_server::cli_style::get_styles;
use songbook_server::config::DEFAULT_READ_POOL_SIZE;
use songbook_server::import::{import_songs, load_entries, resolve_source, DEFAULT_SONGBOOK_NAME};
use std::path::PathBuf;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "cli-import", styles = get_styles())]
#[command(about = "Import a JSON song list into the songbook catalog")]
struct Args {
    /// Path to the SQLite catalog database file.
    #[arg(value_name = "CATALOG_DB")]
    catalog_db: PathBuf,

    /// JSON song list. Falls back to SONGBOOK_IMPORT_SOURCE, then songs.json.
    #[arg(long)]
    source: Option<PathBuf>,

    /// Name of the songbook receiving the songs.
    #[arg(long, default_value = DEFAULT_SONGBOOK_NAME)]
    songbook: String,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Could not install the tracing subscriber")?;

    let args = Args::parse();
    let source = resolve_source(args.source);

    info!("Song Import Tool");
    info!("================");
    info!("Source: {}", source.display());
    info!("Catalog database: {}", args.catalog_db.display());

    let entries = load_entries(&source)?;
    let store = SqliteCatalogStore::new(&args.catalog_db, DEFAULT_READ_POOL_SIZE)?;
    let summary = import_songs(&store, &args.songbook, &entries)?;

    println!("Songs imported into '{}': {}", args.songbook, summary);
    Ok(())
}
