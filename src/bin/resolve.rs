//! Schema Reference Resolver CLI
//!
//! Loads a seed file of REST schemas into an in-memory store, then resolves
//! or parses one of them.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use schema_refs::{
    rest, InMemorySchemaStore, ProviderRegistry, ReferenceResolver, RefsConfig,
    SchemaVersionFetcher, StoredSchema, VersionSpec,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schema-resolve")]
#[command(about = "Resolve schema references against a seeded in-memory store")]
struct Cli {
    /// Config file (layered over schema-refs.toml and SCHEMA_REFS__* env vars)
    #[arg(short, long)]
    config: Option<String>,

    /// JSON array of REST schemas to load (overrides store.seed_path)
    #[arg(short, long)]
    seed: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the pinned references and resolved definitions of a schema
    Resolve {
        #[arg(long)]
        subject: String,
        /// Version number or "latest"
        #[arg(long, default_value = "latest")]
        version: VersionSpec,
    },

    /// Parse a schema with the provider for its type
    Parse {
        #[arg(long)]
        subject: String,
        /// Version number or "latest"
        #[arg(long, default_value = "latest")]
        version: VersionSpec,
    },
}

fn main() {
    let cli = Cli::parse();

    let config = match RefsConfig::load_from(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli, config) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli, config: RefsConfig) -> anyhow::Result<()> {
    let seed = cli
        .seed
        .or_else(|| config.store.seed_path.clone())
        .context("no seed file given (use --seed or store.seed_path)")?;
    let entities = rest::load_rest_schemas(&seed)
        .with_context(|| format!("loading seed file {}", seed.display()))?;
    let store = Arc::new(InMemorySchemaStore::from_rest_entities(entities)?);
    tracing::info!(schemas = store.len(), "store seeded");

    match cli.command {
        Commands::Resolve { subject, version } => {
            let root = fetch_root(&store, &subject, version)?;
            let resolver = ReferenceResolver::with_settings(Arc::clone(&store), &config.resolver);
            let resolution = resolver.resolve(&root.references)?;
            println!("{}", serde_json::to_string_pretty(&resolution)?);
        }

        Commands::Parse { subject, version } => {
            let root = fetch_root(&store, &subject, version)?;
            let registry = ProviderRegistry::with_defaults(Arc::clone(&store), &config.resolver);
            match registry.parse_schema(root.schema_type.as_str(), &root.definition, &root.references)? {
                Some(parsed) => {
                    println!("type:        {}", parsed.schema_type);
                    println!("name:        {}", parsed.name.as_deref().unwrap_or("-"));
                    println!("references:  {}", parsed.dependencies.len());
                    println!("fingerprint: {}", parsed.fingerprint());
                }
                None => bail!(
                    "{} v{} could not be parsed as {}",
                    root.subject,
                    root.version,
                    root.schema_type
                ),
            }
        }
    }

    Ok(())
}

fn fetch_root(
    store: &InMemorySchemaStore,
    subject: &str,
    version: VersionSpec,
) -> anyhow::Result<Arc<StoredSchema>> {
    store
        .get_by_version(subject, version, true)?
        .with_context(|| format!("no schema for subject \"{}\" version {}", subject, version))
}
