//! CLI for the power tuner.
//!
//! This crate provides the `power-tuner` command-line interface:
//!
//! - `analyze` - extract, aggregate and select from a batch of raw reports
//! - `select` - select from pre-aggregated summaries
//! - `pricing` - show the resolved price for a region and architecture
//! - `candidates` - list the candidate configurations
//! - `settings` - show the effective settings and where to override them

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod input;
pub mod loader;

use clap::{Args, Parser, Subcommand, ValueEnum};
use power_tuner_analytics::settings::SettingKey;
use power_tuner_analytics::{
    analyze, optimize, LogFormat, OptimizationStrategy, PricingTable, TunerSettings,
};
use power_tuner_core::Architecture;
use power_tuner_output::io::{self, RECORDS_FILE, RECORD_CHUNK_SIZE};
use power_tuner_output::{markdown, write_outcome, TuningReport};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Power tuner CLI.
#[derive(Parser, Debug)]
#[command(name = "power-tuner")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Settings file (defaults to ./power-tuner.toml when present).
    #[arg(long, global = true, env = "POWER_TUNER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by the selecting commands.
#[derive(Args, Debug, Default)]
pub struct SelectionArgs {
    /// Optimization strategy: cost, speed or balanced.
    #[arg(short, long)]
    pub strategy: Option<OptimizationStrategy>,

    /// Price weight for the balanced strategy, between 0 and 1.
    #[arg(short, long)]
    pub weight: Option<f64>,

    /// Region used for pricing.
    #[arg(short, long)]
    pub region: Option<String>,
}

/// What `analyze` prints to stdout.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// The JSON report.
    Json,
    /// The markdown summary.
    Markdown,
    /// The markdown summary followed by the JSON report.
    Both,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze a batch of raw execution reports.
    ///
    /// Input lines are either `{"configuration": 512, "line": "..."}` or raw
    /// report lines following a `# configuration=<mb>` marker.
    Analyze {
        /// Batch file.
        #[arg(short, long)]
        input: PathBuf,

        /// Pricing table (JSON); the built-in table is used otherwise.
        #[arg(short, long)]
        pricing: Option<PathBuf>,

        #[command(flatten)]
        selection: SelectionArgs,

        /// Share of samples discarded from each end, between 0 and 0.4.
        #[arg(short, long)]
        discard: Option<f64>,

        /// Architecture used for pricing.
        #[arg(short, long)]
        architecture: Option<Architecture>,

        /// Directory for report.json, summaries.csv and summary.md.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// What to print: json, markdown, or both (default: both).
        #[arg(short, long, value_enum, default_value = "both")]
        format: OutputFormat,

        /// Label of the tuned function.
        #[arg(long, default_value = "function")]
        function: String,

        /// Also write the extracted records as JSON lines.
        #[arg(long)]
        records: bool,
    },

    /// Select a configuration from pre-aggregated summaries.
    Select {
        /// JSON array of summaries, or a previous report.
        #[arg(long)]
        stats: PathBuf,

        #[command(flatten)]
        selection: SelectionArgs,
    },

    /// Show the resolved price for a region and architecture.
    Pricing {
        /// Region to price.
        #[arg(short, long)]
        region: Option<String>,

        /// Architecture to price.
        #[arg(short, long)]
        architecture: Option<Architecture>,

        /// Pricing table (JSON).
        #[arg(short, long)]
        pricing: Option<PathBuf>,
    },

    /// List the candidate configurations.
    Candidates,

    /// Show the effective settings.
    Settings,
}

/// Initialise the global subscriber. Later calls are no-ops.
pub fn init_tracing(settings: &TunerSettings, verbose: bool) {
    let default_level = if verbose {
        "debug"
    } else {
        settings.log_level.as_str()
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let _ = match settings.log_format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };
}

fn apply_selection(settings: &mut TunerSettings, selection: SelectionArgs) {
    if let Some(strategy) = selection.strategy {
        settings.strategy = strategy;
    }
    if let Some(weight) = selection.weight {
        settings.balanced_weight = weight;
    }
    if let Some(region) = selection.region {
        settings.region = region;
    }
}

fn load_pricing(path: Option<&Path>) -> Result<PricingTable, Box<dyn std::error::Error>> {
    match path {
        Some(path) => Ok(PricingTable::from_json(&fs::read_to_string(path)?)?),
        None => Ok(PricingTable::default()),
    }
}

/// Run the CLI with the given arguments.
///
/// # Returns
///
/// Returns `Ok(())` on success, or an error if the command fails.
pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut settings = loader::load_settings(cli.config.as_deref())?;
    init_tracing(&settings, cli.verbose);

    match cli.command {
        Commands::Analyze {
            input,
            pricing,
            selection,
            discard,
            architecture,
            output,
            format,
            function,
            records,
        } => {
            apply_selection(&mut settings, selection);
            if let Some(discard) = discard {
                settings.discard_fraction = discard;
            }
            if let Some(architecture) = architecture {
                settings.architecture = architecture;
            }
            let pricing = load_pricing(pricing.as_deref())?;

            let batch = input::parse_batch(&fs::read_to_string(&input)?);
            debug!(
                reports = batch.reports.len(),
                untagged = batch.untagged,
                "Loaded batch"
            );
            let outcome = analyze(&batch.reports, &settings, &pricing)?;

            let report = match &output {
                Some(dir) => {
                    let (report, paths) = write_outcome(
                        dir,
                        &function,
                        &outcome,
                        settings.visualization_url.as_deref(),
                    )?;
                    if records {
                        let written = io::write_records_jsonl(
                            &outcome.records,
                            dir.join(RECORDS_FILE),
                            RECORD_CHUNK_SIZE,
                        )?;
                        info!(records = written, "Wrote extracted records");
                    }
                    info!(report = %paths.report.display(), "Outputs written");
                    report
                }
                None => TuningReport::from_outcome(&function, &outcome),
            };

            if matches!(format, OutputFormat::Markdown | OutputFormat::Both) {
                println!("{}", markdown::generate_summary(&report));
            }
            if matches!(format, OutputFormat::Json | OutputFormat::Both) {
                println!("{}", serde_json::to_string_pretty(&report)?);
            }

            Ok(())
        }
        Commands::Select { stats, selection } => {
            apply_selection(&mut settings, selection);
            settings.validate()?;

            let summaries = io::read_summaries_json(&stats)?;
            let result = optimize(&summaries, &settings.selection_request())?;
            println!("{}", serde_json::to_string_pretty(&result)?);

            Ok(())
        }
        Commands::Pricing {
            region,
            architecture,
            pricing,
        } => {
            if let Some(region) = region {
                settings.region = region;
            }
            if let Some(architecture) = architecture {
                settings.architecture = architecture;
            }
            let pricing = load_pricing(pricing.as_deref())?;
            let (model, lookup) = settings.cost_model(&pricing)?;

            println!("Region: {}", lookup.requested_region);
            println!("Architecture: {}", lookup.architecture);
            println!(
                "Price per billed second ({} MB): {}",
                model.min_billing_unit_mb(),
                lookup.quote.per_unit_time_price
            );
            match lookup.quote.per_request_price {
                Some(price) => println!("Price per request: {}", price),
                None => println!("Price per request: none"),
            }
            println!("Fell back to default: {}", lookup.fell_back);
            if cli.verbose {
                println!(
                    "Priced regions: {}",
                    pricing.regions(lookup.architecture).join(", ")
                );
            }

            Ok(())
        }
        Commands::Candidates => {
            for candidate in &settings.candidates {
                println!("{}", candidate);
            }
            Ok(())
        }
        Commands::Settings => {
            print!("{}", toml::to_string_pretty(&settings)?);
            if cli.verbose {
                println!();
                for key in SettingKey::ALL {
                    println!(
                        "# {}/{}: {} (default {})",
                        key.namespace(),
                        key.key(),
                        key.env_var(),
                        key.default_value()
                    );
                }
            }
            Ok(())
        }
    }
}
