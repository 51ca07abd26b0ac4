//! chunkcas CLI - Command line interface for a chunkcas store
//!
//! Stores and reads raw objects and blobs. Designed to be driven by build
//! tooling: every command other than payload reads prints one JSON value.

use bytes::Bytes;
use chunkcas::{
    open_url, CasBlob, ContentId, ContentStore, FileBackedStore, ImportOptions, PosixFileDetails,
    StoreConfig,
};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "chunkcas")]
#[command(about = "A content-addressed object store for build artifacts")]
#[command(version)]
struct Cli {
    /// Store root directory
    #[arg(short, long, env = "CHUNKCAS_ROOT")]
    root: Option<PathBuf>,

    /// Store URL such as file:///var/cache/cas (takes precedence over --root)
    #[arg(short, long)]
    url: Option<String>,

    /// Worker threads for blocking file I/O
    #[arg(short, long)]
    threads: Option<usize>,

    /// Config file (defaults to ~/.config/chunkcas/config.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format (json or text)
    #[arg(short, long, default_value = "json")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

#[derive(Subcommand)]
enum Commands {
    // === Raw Object Commands ===
    /// Store a file as a raw object with no refs
    Put {
        /// File to store
        file: PathBuf,
    },

    /// Write a raw object's payload
    Get {
        /// Object id
        id: String,
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check whether an object is stored
    Contains {
        /// Object id
        id: String,
    },

    // === Blob Commands ===
    /// Import a file as a blob
    Import {
        /// File to import
        file: PathBuf,
        /// Mark the blob executable
        #[arg(short = 'x', long)]
        executable: bool,
        /// POSIX mode bits
        #[arg(long)]
        mode: Option<u32>,
        /// POSIX owner id
        #[arg(long)]
        owner: Option<u32>,
        /// POSIX group id
        #[arg(long)]
        group: Option<u32>,
    },

    /// Read a byte range of a blob
    Cat {
        /// Blob id
        id: String,
        /// First byte to read
        #[arg(short, long, default_value = "0")]
        start: u64,
        /// End of the range (exclusive), defaults to the blob size
        #[arg(short, long)]
        end: Option<u64>,
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the id that re-imports to the same blob
    Export {
        /// Blob id
        id: String,
    },

    /// Describe a blob
    Stat {
        /// Blob id
        id: String,
    },

    /// Show the directory entry a blob would get under a name
    Entry {
        /// Blob id
        id: String,
        /// Entry name
        name: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => StoreConfig::load(path)?,
        None => StoreConfig::load_default()?,
    };
    if let Some(root) = &cli.root {
        config.root = Some(root.clone());
    }
    if let Some(threads) = cli.threads {
        config.worker_threads = threads;
    }
    config.validate()?;
    init_logging(&config);

    let store = open_store(&cli, &config)?;

    match cli.command {
        Commands::Put { file } => {
            let data = tokio::fs::read(&file).await?;
            let id = store.put(vec![], Bytes::from(data)).await?;
            output(
                &cli.format,
                &serde_json::json!({
                    "status": "ok",
                    "id": id.to_hex()
                }),
            );
        }

        Commands::Get { id, output: path } => {
            let id = parse_id(&id)?;
            match store.get(&id).await? {
                Some(object) => write_payload(&object.data, path.as_ref()).await?,
                None => {
                    output(
                        &cli.format,
                        &serde_json::json!({
                            "status": "error",
                            "message": format!("Object not found: {}", id)
                        }),
                    );
                    std::process::exit(1);
                }
            }
        }

        Commands::Contains { id } => {
            let id = parse_id(&id)?;
            let present = store.contains(&id).await?;
            output(
                &cli.format,
                &serde_json::json!({
                    "id": id.to_hex(),
                    "contains": present
                }),
            );
        }

        Commands::Import {
            file,
            executable,
            mode,
            owner,
            group,
        } => {
            let data = tokio::fs::read(&file).await?;
            let mut options = ImportOptions {
                executable,
                posix_details: None,
            };
            if mode.is_some() || owner.is_some() || group.is_some() {
                options = options.with_posix_details(PosixFileDetails {
                    mode: mode.unwrap_or(0),
                    owner: owner.unwrap_or(0),
                    group: group.unwrap_or(0),
                });
            }

            let blob = CasBlob::import(Bytes::from(data), options, store.clone()).await?;
            output(
                &cli.format,
                &serde_json::json!({
                    "status": "ok",
                    "id": blob.received_id().id().to_hex(),
                    "received": blob.received_id(),
                    "size": blob.size(),
                    "kind": blob.kind()
                }),
            );
        }

        Commands::Cat {
            id,
            start,
            end,
            output: path,
        } => {
            let blob = CasBlob::parse(parse_id(&id)?, store.clone()).await?;
            let end = end.unwrap_or(blob.size());
            let data = blob.read(start..end).await?;
            write_payload(&data, path.as_ref()).await?;
        }

        Commands::Export { id } => {
            let blob = CasBlob::parse(parse_id(&id)?, store.clone()).await?;
            let exported = blob.export().await?;
            output(
                &cli.format,
                &serde_json::json!({
                    "status": "ok",
                    "id": exported.to_hex()
                }),
            );
        }

        Commands::Stat { id } => {
            let blob = CasBlob::parse(parse_id(&id)?, store.clone()).await?;
            output(
                &cli.format,
                &serde_json::json!({
                    "id": blob.received_id().id().to_hex(),
                    "received": blob.received_id(),
                    "size": blob.size(),
                    "kind": blob.kind(),
                    "chunk_size": blob.chunk_size(),
                    "chunks": blob.chunk_ids(),
                    "posix_details": blob.posix_details()
                }),
            );
        }

        Commands::Entry { id, name } => {
            let blob = CasBlob::parse(parse_id(&id)?, store.clone()).await?;
            let entry = blob.as_directory_entry(name);
            output(&cli.format, &serde_json::to_value(&entry)?);
        }
    }

    Ok(())
}

fn init_logging(config: &StoreConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_filter.as_deref().unwrap_or("warn")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open_store(cli: &Cli, config: &StoreConfig) -> anyhow::Result<Arc<dyn ContentStore>> {
    let store: Arc<dyn ContentStore> = match &cli.url {
        Some(url) => open_url(url, config)?,
        None => Arc::new(FileBackedStore::with_config(config)?),
    };
    Ok(store)
}

fn parse_id(id: &str) -> anyhow::Result<ContentId> {
    Ok(id.parse()?)
}

async fn write_payload(data: &[u8], path: Option<&PathBuf>) -> anyhow::Result<()> {
    match path {
        Some(path) => tokio::fs::write(path, data).await?,
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(data)?;
            stdout.flush()?;
        }
    }
    Ok(())
}

fn output(format: &OutputFormat, value: &serde_json::Value) {
    match format {
        OutputFormat::Json => {
            println!("{}", value);
        }
        OutputFormat::Text => {
            println!("{:#}", value);
        }
    }
}
