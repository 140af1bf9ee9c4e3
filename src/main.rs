use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};

use stac_generator::config::{CollectionConfig, CommonMetadata};
use stac_generator::generator::GenerationOptions;
use stac_generator::logging::{self, LogConfig};
use stac_generator::projection::EpsgPolicy;
use stac_generator::temporal::{ISO8601, parse_timestamp};
use stac_generator::{prepare, template};

#[derive(Parser)]
#[command(name = "stac-generator", version)]
#[command(about = "Generate STAC items and collections from point, vector and raster sources")]
#[command(after_long_help = "\
ENVIRONMENT:
  RUST_LOG=debug                   Override the log filter
  STAC_GENERATOR_EPSG_POLICY       Default for --epsg-policy")]
struct Cli {
    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a collection from source configs and write it to --dst
    Generate(GenerateArgs),
    /// Write a source config template with column or band info pre-filled
    Template {
        /// Source config files (json, yaml, csv); glob patterns are expanded
        #[arg(required = true)]
        sources: Vec<String>,

        /// Template file to write, .json or .csv
        #[arg(long)]
        dst: PathBuf,
    },
}

#[derive(Args)]
struct GenerateArgs {
    /// Source config files (json, yaml, csv) or URLs; glob patterns are expanded
    #[arg(required = true)]
    sources: Vec<String>,

    /// Output directory, or base URL of a STAC API
    #[arg(long)]
    dst: String,

    /// Collection id
    #[arg(long)]
    id: Option<String>,

    #[arg(long)]
    title: Option<String>,

    #[arg(long)]
    description: Option<String>,

    #[arg(long, value_delimiter = ',')]
    keywords: Option<Vec<String>>,

    #[arg(long)]
    license: Option<String>,

    #[arg(long)]
    platform: Option<String>,

    #[arg(long)]
    constellation: Option<String>,

    #[arg(long)]
    mission: Option<String>,

    /// Ground sample distance in metres
    #[arg(long)]
    gsd: Option<f64>,

    #[arg(long, value_delimiter = ',')]
    instruments: Option<Vec<String>>,

    #[arg(long, value_parser = parse_datetime)]
    datetime: Option<DateTime<Utc>>,

    #[arg(long, value_parser = parse_datetime)]
    start_datetime: Option<DateTime<Utc>>,

    #[arg(long, value_parser = parse_datetime)]
    end_datetime: Option<DateTime<Utc>>,

    /// Collection metadata JSON; command line values take precedence
    #[arg(long)]
    metadata_json: Option<PathBuf>,

    /// How to handle sources whose EPSG cannot be read reliably
    #[arg(long, env = "STAC_GENERATOR_EPSG_POLICY", default_value = "strict")]
    epsg_policy: EpsgPolicy,

    /// Upload items to a STAC API concurrently
    #[arg(long)]
    concurrent: bool,
}

fn parse_datetime(value: &str) -> Result<DateTime<Utc>, String> {
    parse_timestamp(value, ISO8601).ok_or_else(|| format!("{value} is not an ISO 8601 datetime"))
}

impl GenerateArgs {
    fn collection_config(&self) -> Result<CollectionConfig> {
        let cli = CollectionConfig {
            id: self.id.clone().unwrap_or_default(),
            metadata: CommonMetadata {
                title: self.title.clone(),
                description: self.description.clone(),
                license: self.license.clone(),
                providers: None,
                platform: self.platform.clone(),
                instruments: self.instruments.clone(),
                constellation: self.constellation.clone(),
                mission: self.mission.clone(),
                gsd: self.gsd,
            },
            keywords: self.keywords.clone(),
            datetime: self.datetime,
            start_datetime: self.start_datetime,
            end_datetime: self.end_datetime,
        };
        let config = match &self.metadata_json {
            Some(path) => {
                let file = CollectionConfig::from_file(path).with_context(|| {
                    format!("Failed to read collection metadata {}", path.display())
                })?;
                cli.or(file)
            }
            None => cli,
        };
        Ok(config)
    }
}

/// Expands glob patterns. URLs and patterns matching nothing are kept as given
/// so that the config reader reports them.
fn expand_sources(patterns: &[String]) -> Result<Vec<String>> {
    let mut sources = Vec::new();
    for pattern in patterns {
        if stac_generator::config::is_http_url(pattern) {
            sources.push(pattern.clone());
            continue;
        }
        let mut matched: Vec<String> = glob::glob(pattern)
            .with_context(|| format!("Invalid source pattern {pattern}"))?
            .filter_map(|entry| entry.ok())
            .map(|path| path.to_string_lossy().into_owned())
            .collect();
        if matched.is_empty() {
            warn!("{} matches no file", pattern);
            sources.push(pattern.clone());
        } else {
            matched.sort();
            sources.append(&mut matched);
        }
    }
    Ok(sources)
}

fn run_generate(args: GenerateArgs) -> Result<()> {
    let sources = expand_sources(&args.sources)?;
    let collection = args.collection_config()?;
    let options = GenerationOptions {
        epsg_policy: args.epsg_policy,
    };

    let serialiser = prepare(&sources, collection, options, &args.dst)?;
    if args.concurrent {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to start async runtime")?;
        runtime.block_on(serialiser.write_concurrent())?;
    } else {
        serialiser.write()?;
    }
    info!(
        "Collection {} with {} item(s) written to {}",
        serialiser.collection().id,
        serialiser.collection().items.len(),
        args.dst
    );
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(LogConfig {
        verbose: cli.verbose,
        json: cli.log_json,
    });

    match cli.command {
        Command::Generate(args) => run_generate(args),
        Command::Template { sources, dst } => {
            let sources = expand_sources(&sources)?;
            template::generate_template(&sources, &dst)?;
            Ok(())
        }
    }
}
