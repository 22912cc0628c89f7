//! `intelhub` command line: ask questions, ingest documents, manage models.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{ArgGroup, Parser, Subcommand};

use intelhub_lib::application::services::{samples, ChunkingConfig};
use intelhub_lib::domain::Domain;
use intelhub_lib::infrastructure::storage::sled_store::collection_description;
use intelhub_lib::settings::ConfigManager;
use intelhub_lib::{
    build_environment, init_tracing, load_dotenv, resolve_data_dir, AppHandles, StoreMode,
};

#[derive(Parser)]
#[command(name = "intelhub")]
#[command(about = "Local intelligence hub: routed, document-grounded answers from local models", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask the hub a question
    Query {
        #[arg(value_name = "QUERY")]
        query: String,
        /// Print the full routing and retrieval report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Ingest documents (.pdf, .txt, .md) into a domain collection
    #[command(group(ArgGroup::new("source").required(true).args(["path", "file"])))]
    Ingest {
        /// Target domain: finance, medical or news
        #[arg(long, short = 'd', value_parser = parse_domain)]
        domain: Domain,
        /// Directory to walk recursively
        #[arg(long, value_name = "DIR")]
        path: Option<PathBuf>,
        /// Single document
        #[arg(long, value_name = "FILE")]
        file: Option<PathBuf>,
        /// Window size in characters (defaults to configuration)
        #[arg(long, value_name = "CHARS")]
        chunk_size: Option<usize>,
        /// Overlap between windows in characters (defaults to configuration)
        #[arg(long, value_name = "CHARS")]
        chunk_overlap: Option<usize>,
    },
    /// Make sure every configured model is available in Ollama
    Models {
        /// Only report missing models, do not pull
        #[arg(long)]
        check: bool,
    },
    /// Write sample documents for each domain
    Samples {
        /// Output directory; one subdirectory per domain is created
        #[arg(long, value_name = "DIR", default_value = "data")]
        out: PathBuf,
    },
    /// Show document counts per domain collection
    Collections,
    /// Print the effective configuration (file plus environment overrides)
    Config {
        /// Write the effective configuration to config.json
        #[arg(long)]
        save: bool,
    },
}

fn parse_domain(raw: &str) -> Result<Domain, String> {
    raw.parse::<Domain>().map_err(|err| err.to_string())
}

fn main() {
    let cli = Cli::parse();
    init_tracing();
    load_dotenv();

    if let Err(err) = run(cli.command) {
        eprintln!("[intelhub] {err:#}");
        std::process::exit(1);
    }
}

fn run(command: Commands) -> Result<()> {
    match &command {
        Commands::Samples { out } => return write_samples(out),
        Commands::Config { save } => return show_config(*save),
        _ => {}
    }

    let handles = build_environment()?;
    if let StoreMode::Remote { url } = &handles.mode {
        eprintln!("[intelhub] using collections served by {url}");
    }
    run_with(handles, command)
}

fn write_samples(out: &std::path::Path) -> Result<()> {
    let written = samples::write_sample_documents(out).map_err(|err| anyhow!(err))?;
    for path in &written {
        println!("{}", path.display());
    }
    println!(
        "Wrote {} sample documents. Ingest them with: intelhub ingest --domain <domain> --path {}/<domain>",
        written.len(),
        out.display()
    );
    Ok(())
}

fn show_config(save: bool) -> Result<()> {
    let data_dir = resolve_data_dir()?;
    let manager = ConfigManager::load_with_env(&data_dir)
        .map_err(|err| anyhow!(err))
        .context("failed to load configuration")?;

    println!("{}", serde_json::to_string_pretty(&manager.current())?);
    if save {
        manager
            .persist()
            .map_err(|err| anyhow!(err))
            .context("failed to save configuration")?;
        eprintln!("[intelhub] saved {}", manager.path().display());
    }
    Ok(())
}

fn run_with(handles: AppHandles, command: Commands) -> Result<()> {
    match command {
        Commands::Query { query, json } => {
            if query.is_empty() {
                bail!("query must not be empty");
            }
            let answer = handles.hub.run(&query);
            if json {
                println!("{}", serde_json::to_string_pretty(&answer)?);
            } else {
                if let Some(err) = &answer.retrieval_error {
                    eprintln!("[intelhub] retrieval failed, answered without documents: {err}");
                }
                eprintln!("[intelhub] domain: {} (model {})", answer.domain, answer.expert_model);
                println!("{}", answer.answer);
            }
            Ok(())
        }
        Commands::Ingest {
            domain,
            path,
            file,
            chunk_size,
            chunk_overlap,
        } => {
            let configured = handles.ingestion.chunking();
            let chunking = ChunkingConfig::new(
                chunk_size.unwrap_or(configured.size),
                chunk_overlap.unwrap_or(configured.overlap),
            );
            if chunking.size == 0 || chunking.overlap >= chunking.size {
                bail!(
                    "chunk overlap ({}) must be smaller than chunk size ({})",
                    chunking.overlap,
                    chunking.size
                );
            }
            let ingestion = if chunking == configured {
                Arc::clone(&handles.ingestion)
            } else {
                Arc::new(handles.ingestion.as_ref().clone().with_chunking(chunking))
            };

            match (path, file) {
                (_, Some(file)) => {
                    let added = ingestion
                        .ingest_file(domain, &file)
                        .map_err(|err| anyhow!(err))
                        .with_context(|| format!("failed to ingest {}", file.display()))?;
                    println!("Ingested {} chunks from {} into {domain}", added, file.display());
                }
                (Some(dir), None) => {
                    let report = ingestion
                        .ingest_directory(domain, &dir)
                        .map_err(|err| anyhow!(err))
                        .with_context(|| format!("failed to ingest {}", dir.display()))?;
                    for entry in &report.files {
                        println!("  {} -> {} chunks", entry.path, entry.chunks);
                    }
                    for failure in &report.failures {
                        eprintln!("  {} failed: {}", failure.path, failure.error);
                    }
                    println!(
                        "Ingested {} chunks from {} files into {domain} ({} failed)",
                        report.total_chunks(),
                        report.files.len(),
                        report.failures.len()
                    );
                }
                (None, None) => bail!("either --path or --file is required"),
            }
            Ok(())
        }
        Commands::Models { check } => {
            let required = handles.required_models();
            if check {
                let missing = handles.inventory.missing(&required).map_err(|err| anyhow!(err))?;
                if missing.is_empty() {
                    println!("All {} required models are installed.", required.len());
                } else {
                    println!("Missing models: {}", missing.join(", "));
                }
                return Ok(());
            }

            let report = handles
                .inventory
                .ensure(&required, &mut |model, status| eprintln!("  {model}: {status}"))
                .map_err(|err| anyhow!(err))
                .context("failed to ensure Ollama models")?;
            for model in &report.already_present {
                println!("{model}: already present");
            }
            for model in &report.pulled {
                println!("{model}: pulled");
            }
            Ok(())
        }
        Commands::Collections => {
            for domain in Domain::all() {
                let count = handles
                    .store
                    .collection(*domain)
                    .and_then(|collection| collection.count())
                    .map_err(|err| anyhow!(err))?;
                println!("{domain:<8} {count:>6}  {}", collection_description(*domain));
            }
            Ok(())
        }
        Commands::Samples { out } => write_samples(&out),
        Commands::Config { save } => show_config(save),
    }
}
