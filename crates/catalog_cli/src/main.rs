//! Catalog command-line entry point.
//!
//! # Responsibility
//! - Load seed records from JSON, run one use-case and print JSON results.
//! - Own logging setup for the process; the core only emits events.

use catalog_core::{
    active_log_config, init_logging, LogConfig, LogLevel, MemoryMetadataRepository, Metadata,
    MetadataId, MetadataService, SimpleValidator,
};
use clap::{Parser, Subcommand};
use log::info;
use std::error::Error;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "catalog")]
#[command(about = "In-memory metadata catalog", long_about = None)]
struct Cli {
    /// trace|debug|info|warn|error; defaults to debug in debug builds.
    #[arg(long, global = true, value_parser = parse_level)]
    log_level: Option<LogLevel>,

    /// Absolute directory for rolling log files; logging is off without it.
    #[arg(long, global = true)]
    log_dir: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print core health and version.
    Ping,
    /// Load seed records, then print every record matching the query.
    Search {
        /// JSON array of records to create first.
        #[arg(long)]
        seed: PathBuf,
        /// JSON record whose non-empty fields form the filter.
        #[arg(long)]
        query: PathBuf,
    },
    /// Load seed records, then print each one back by id.
    Show {
        #[arg(long)]
        seed: PathBuf,
    },
}

type CliResult<T> = Result<T, Box<dyn Error>>;

fn main() -> CliResult<()> {
    let cli = Cli::parse();

    if let Some(config) = log_config(&cli)? {
        init_logging(&config)?;
    }

    match cli.command {
        Command::Ping => {
            println!("catalog_core ping={}", catalog_core::ping());
            println!("catalog_core version={}", catalog_core::core_version());
            match active_log_config() {
                Some(config) => println!(
                    "catalog_core logging={} dir={}",
                    config.level,
                    config.dir.display()
                ),
                None => println!("catalog_core logging=off"),
            }
            Ok(())
        }
        Command::Search { seed, query } => run_search(&seed, &query),
        Command::Show { seed } => run_show(&seed),
    }
}

fn parse_level(raw: &str) -> Result<LogLevel, String> {
    LogLevel::parse(raw).map_err(|err| err.to_string())
}

/// Logging stays off unless a directory is given.
fn log_config(cli: &Cli) -> CliResult<Option<LogConfig>> {
    let Some(dir) = cli.log_dir.as_deref() else {
        return Ok(None);
    };
    let level = cli.log_level.unwrap_or_default();
    Ok(Some(LogConfig::new(level, dir)?))
}

fn run_search(seed: &Path, query: &Path) -> CliResult<()> {
    let service = seeded_service(seed)?.0;
    let filter: Metadata = read_json(query)?;
    let results = service.search_metadata(filter)?;
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}

fn run_show(seed: &Path) -> CliResult<()> {
    let (service, ids) = seeded_service(seed)?;
    for id in ids {
        let metadata = service.get_metadata(id)?;
        println!("{id}");
        println!("{}", serde_json::to_string_pretty(&metadata)?);
    }
    Ok(())
}

type CatalogService = MetadataService<MemoryMetadataRepository, SimpleValidator>;

fn seeded_service(seed: &Path) -> CliResult<(CatalogService, Vec<MetadataId>)> {
    let records: Vec<Metadata> = read_json(seed)?;
    let service = MetadataService::new(MemoryMetadataRepository::new()?, SimpleValidator);

    let ids = records
        .into_iter()
        .map(|record| service.create_metadata(record))
        .collect::<Result<Vec<_>, _>>()?;
    info!(
        "event=catalog_seed module=cli status=ok records={} source={}",
        ids.len(),
        seed.display()
    );
    Ok((service, ids))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> CliResult<T> {
    let raw = std::fs::read_to_string(path)
        .map_err(|err| format!("failed to read `{}`: {err}", path.display()))?;
    serde_json::from_str(&raw)
        .map_err(|err| format!("failed to parse `{}`: {err}", path.display()).into())
}
