use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use futures::TryStreamExt;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use elastices::codec::documents_to_table;
use elastices::csv_io;
use elastices::{Client, ConnectionConfig};
use elastices_repository::config::parse_keep_alive;

#[derive(Parser)]
#[command(name = "elastices")]
#[command(about = "Load CSV tables into OpenSearch and export query results", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// OpenSearch URL (overrides ELASTICES_URL)
    #[arg(long, global = true)]
    url: Option<String>,

    /// Per-request timeout in seconds (overrides ELASTICES_TIMEOUT_SECS)
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Scroll a query and write the documents to stdout
    Export {
        #[arg(long)]
        index: String,

        /// Query body as JSON; matches every document when omitted
        #[arg(long)]
        query: Option<String>,

        #[arg(long, value_enum, default_value_t = ExportFormat::Jsonl)]
        format: ExportFormat,

        #[arg(long)]
        batch_size: Option<usize>,

        /// Scroll keep-alive, e.g. "5m" or "300s"
        #[arg(long)]
        keep_alive: Option<String>,
    },
    /// Load a CSV file into an index
    Import {
        #[arg(long)]
        index: String,

        #[arg(long)]
        file: PathBuf,

        /// Column whose values become the document ids
        #[arg(long)]
        id_column: String,

        /// Routing tag for the written documents
        #[arg(long)]
        doc_type: Option<String>,
    },
    /// Delete every document in an index
    Truncate {
        #[arg(long)]
        index: String,
    },
    /// Create an index if it does not exist
    EnsureIndex {
        #[arg(long)]
        index: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportFormat {
    Jsonl,
    Csv,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("ELASTICES_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
    }
}

fn build_config(cli: &Cli) -> Result<ConnectionConfig> {
    let mut config = ConnectionConfig::from_env().context("Failed to read configuration")?;
    if let Some(url) = &cli.url {
        config.url = url.clone();
    }
    if let Some(secs) = cli.timeout_secs {
        config.timeout = Duration::from_secs(secs);
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = build_config(&cli)?;

    let mut client = Client::connect_to(config)
        .await
        .context("Failed to connect to search engine")?;

    match client.health_check().await {
        Ok(true) => info!("Cluster is healthy"),
        Ok(false) => warn!("Cluster health is red"),
        Err(e) => warn!(error = %e, "Health check failed"),
    }

    let result = run(&client, cli.command).await;

    if let Err(e) = client.disconnect() {
        warn!(error = %e, "Disconnect failed");
    }

    result
}

async fn run(client: &Client, command: Commands) -> Result<()> {
    match command {
        Commands::Export {
            index,
            query,
            format,
            batch_size,
            keep_alive,
        } => {
            let body = match query {
                Some(raw) => serde_json::from_str(&raw).context("Query is not valid JSON")?,
                None => serde_json::Value::Null,
            };
            let keep_alive = keep_alive
                .map(|raw| {
                    parse_keep_alive(&raw).ok_or_else(|| anyhow!("Invalid keep-alive '{}'", raw))
                })
                .transpose()?;

            export(client, &index, body, format, batch_size, keep_alive).await
        }
        Commands::Import {
            index,
            file,
            id_column,
            doc_type,
        } => {
            let reader = File::open(&file)
                .with_context(|| format!("Failed to open {}", file.display()))?;
            let table = csv_io::read_table(reader)
                .with_context(|| format!("Failed to read {}", file.display()))?;

            let report = client
                .write_table(&table, &index, doc_type.as_deref(), &id_column)
                .await
                .context("Import failed")?;

            println!(
                "total={} succeeded={} failed={}",
                report.total, report.succeeded, report.failed
            );
            for (id, reason) in report.failures() {
                eprintln!("{}\t{}", id, reason);
            }
            if !report.is_complete_success() {
                bail!("{} of {} documents failed", report.failed, report.total);
            }
            Ok(())
        }
        Commands::Truncate { index } => {
            let deleted = client
                .truncate_index(&index)
                .await
                .with_context(|| format!("Failed to truncate {}", index))?;
            println!("deleted={}", deleted);
            Ok(())
        }
        Commands::EnsureIndex { index } => {
            let created = client
                .ensure_index(&index)
                .await
                .with_context(|| format!("Failed to ensure {}", index))?;
            println!("created={}", created);
            Ok(())
        }
    }
}

async fn export(
    client: &Client,
    index: &str,
    body: serde_json::Value,
    format: ExportFormat,
    batch_size: Option<usize>,
    keep_alive: Option<Duration>,
) -> Result<()> {
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    match format {
        ExportFormat::Jsonl => {
            let reader = client.query(index, body, batch_size, keep_alive).await?;
            let mut documents = Box::pin(reader.into_stream());
            let mut count: u64 = 0;
            while let Some(doc) = documents.try_next().await? {
                serde_json::to_writer(&mut out, &doc.to_source())?;
                out.write_all(b"\n")?;
                count += 1;
            }
            info!(index = %index, documents = count, "Export completed");
        }
        ExportFormat::Csv => {
            let reader = client.query(index, body, batch_size, keep_alive).await?;
            let table = documents_to_table(&reader.collect_all().await?)?;
            csv_io::write_table(&table, &mut out)?;
            info!(index = %index, documents = table.num_rows(), "Export completed");
        }
    }

    out.flush()?;
    Ok(())
}
