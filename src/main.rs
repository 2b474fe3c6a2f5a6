use anyhow::{Context, Result, bail};
use catalog_loader::schema_helpers;
use catalog_loader::search::query_terms;
use catalog_loader::{
    CollectionName, DEFAULT_CONFIG_PATH, IndexSchema, SearchService, load_config, normalize_file,
    render_hits,
};
use clap::{Parser, Subcommand};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::prelude::*;

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
struct Args {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Strip leading codes from every catalog field but the first, printing CSV to stdout
    Normalize {
        /// Raw catalog file
        input: PathBuf,
    },
    /// Recreate a collection and bulk-load the cleaned catalog into it
    LoadCatalog {
        #[clap(long, default_value = "m-index-1")]
        collection: String,
        /// Index settings/mappings document (built-in product mapping when omitted)
        #[clap(long)]
        schema: Option<PathBuf>,
        #[clap(long, default_value = "productos_cleaned.csv")]
        input: PathBuf,
    },
    /// Recreate a collection and bulk-load synthetic search-log entries into it
    LoadQueries {
        #[clap(long, default_value = "m-index-2")]
        collection: String,
        /// Index settings/mappings document (built-in query-log mapping when omitted)
        #[clap(long)]
        schema: Option<PathBuf>,
        #[clap(long, default_value_t = 10_000)]
        count: usize,
        #[clap(long, default_value_t = 0)]
        seed: u64,
    },
    /// Run query documents against a collection and print the top hits
    Search {
        collection: String,
        #[clap(required = true)]
        queries: Vec<PathBuf>,
        /// Source field shown next to each hit
        #[clap(long, default_value = "description")]
        field: String,
    },
    /// Wait until the search service answers
    Wait,
}

fn config_path() -> PathBuf {
    std::env::var_os("APP_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

fn connect() -> Result<SearchService> {
    let config = load_config(config_path())?;
    tracing::debug!("Loaded config: {:?}", config);
    Ok(SearchService::new(config)?)
}

fn load_schema(path: Option<&Path>, fallback: fn() -> IndexSchema) -> Result<IndexSchema> {
    match path {
        Some(path) => IndexSchema::from_file(path)
            .with_context(|| format!("Failed to load schema: '{}'", path.display())),
        None => Ok(fallback()),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // let trace max level configurable (default to info)
    let trace_max_level = std::env::var("TRACE_MAX_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .parse()
        .unwrap_or(tracing::Level::INFO);
    tracing_subscriber::fmt()
        .with_max_level(trace_max_level)
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive("catalog_loader=info".parse()?)
                .from_env_lossy(),
        )
        .without_time()
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish()
        .init();

    // Parse the command line arguments.
    let args = Args::parse();

    match args.command {
        Commands::Normalize { input } => {
            let stdout = std::io::stdout();
            let mut out = BufWriter::new(stdout.lock());
            let rows = normalize_file(&input, &mut out)
                .with_context(|| format!("Failed to normalize '{}'", input.display()))?;
            out.flush()?;
            tracing::info!("Normalized {} rows", rows);
        }
        Commands::LoadCatalog {
            collection,
            schema,
            input,
        } => {
            let schema = load_schema(schema.as_deref(), schema_helpers::product_catalog_schema)?;
            let collection = CollectionName::from(collection);
            connect()?
                .load_catalog(&collection, &schema, &input)
                .await
                .with_context(|| format!("Failed to load '{}'", input.display()))?;
        }
        Commands::LoadQueries {
            collection,
            schema,
            count,
            seed,
        } => {
            let schema = load_schema(schema.as_deref(), schema_helpers::query_log_schema)?;
            let collection = CollectionName::from(collection);
            connect()?
                .load_queries(&collection, &schema, count, seed, chrono::Utc::now())
                .await
                .context("Failed to load synthetic queries")?;
        }
        Commands::Search {
            collection,
            mut queries,
            field,
        } => {
            let collection = CollectionName::from(collection);
            let client = connect()?.search_client();
            queries.sort();

            for path in &queries {
                let raw = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read query: '{}'", path.display()))?;
                let query: serde_json::Value = serde_json::from_str(&raw)
                    .with_context(|| format!("Failed to parse query: '{}'", path.display()))?;

                let response = client.search(&collection, &query).await?;
                if response.hits.hits.is_empty() {
                    bail!("Query '{}' returned no hits", path.display());
                }

                println!();
                println!(
                    "Top results for query: '{}', terms: '{}'",
                    path.display(),
                    query_terms(&query).unwrap_or_default()
                );
                print!("{}", render_hits(&response.hits.hits, &field));
            }
        }
        Commands::Wait => {
            connect()?.search_client().wait_until_ready().await?;
        }
    }

    Ok(())
}
