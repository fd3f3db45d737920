use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use venue_geocoder::{
    default_output_path, init_tracing, inspect_input, normalize, read_input, write_output,
    AppConfig, BatchRunner, CityCentroidCache, HttpMapsClient, QueryShape, ResolutionQuery,
    ResolutionResult, Resolver, ResolverOptions,
};

/// Resolve attraction names (plus an optional city) into coordinates and addresses
#[derive(Parser, Debug)]
#[command(name = "venue-geocoder")]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve a single venue and print the result as JSON
    Resolve {
        /// Venue or attraction name
        #[arg(short = 'n', long)]
        name: Option<String>,

        /// City hint used to bias the search
        #[arg(short = 'c', long)]
        city: Option<String>,
    },
    /// Resolve every row of a CSV (column 1 = venue, column 2 = city)
    Batch {
        input: PathBuf,

        /// Output CSV (defaults to <input>_geocoded.csv)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Minimum delay between resolutions in milliseconds (overrides BATCH_DELAY_MS)
        #[arg(long)]
        delay_ms: Option<u64>,
    },
    /// Print headers, row counts and a short preview of a CSV
    Inspect { input: PathBuf },
}

fn build_resolver(config: &AppConfig) -> Result<Resolver> {
    let api = HttpMapsClient::shared(config)?;
    Ok(Resolver::new(
        api,
        Arc::new(CityCentroidCache::new()),
        &ResolverOptions::from(config),
    ))
}

// Empty queries never reach the client, so they need no API key.
async fn resolve_one(config: &AppConfig, query: &ResolutionQuery) -> Result<ResolutionResult> {
    match normalize(query) {
        QueryShape::Skip => Ok(ResolutionResult::skipped_empty()),
        QueryShape::Lookup(_) => Ok(build_resolver(config)?.resolve(query).await),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let config = AppConfig::from_env();

    match args.command {
        Command::Resolve { name, city } => {
            let query = ResolutionQuery {
                venue_name: name,
                city,
            };
            let result = resolve_one(&config, &query).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Batch {
            input,
            output,
            delay_ms,
        } => {
            let rows = read_input(&input)
                .with_context(|| format!("failed to read {}", input.display()))?;
            let delay = Duration::from_millis(delay_ms.unwrap_or(config.batch_delay_ms));
            let runner = BatchRunner::new(build_resolver(&config)?, delay);
            let report = runner.run(&rows, None, None).await;

            let output = output.unwrap_or_else(|| default_output_path(&input));
            write_output(&output, &rows, &report.results)
                .with_context(|| format!("failed to write {}", output.display()))?;

            println!("Saved: {}", output.display());
            println!("{}", serde_json::to_string_pretty(&report.summary)?);
        }
        Command::Inspect { input } => {
            let report = inspect_input(&input)
                .with_context(|| format!("failed to inspect {}", input.display()))?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
