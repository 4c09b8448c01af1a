//! Audience Studio: command-line access to the segment rule engine.
//!
//! Inspects the field catalog, turns phrases into rules, and evaluates rules
//! against a customer file.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use audience_core::{AppConfig, CustomerSource, InMemoryCustomers};
use audience_segmentation::{
    list_fields, matching_count, operators_for_type, preview, NaturalLanguageParser,
    SavedSegment, SegmentRegistry, SegmentRule,
};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "audience-studio")]
#[command(about = "Build and evaluate customer segment rules")]
#[command(version)]
struct Cli {
    /// Optional TOML config file
    #[arg(long, env = "AUDIENCE_STUDIO_CONFIG")]
    config: Option<String>,

    /// Customer JSON file (overrides config)
    #[arg(long, global = true, env = "AUDIENCE_STUDIO__CUSTOMERS_PATH")]
    customers: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List segmentable fields
    Fields,

    /// List operators legal for a field type (number, date, string, array)
    Operators { field_type: String },

    /// Turn a phrase into a rule
    Parse { text: String },

    /// Preview the audience of a rule file
    Query {
        /// Rule JSON file
        #[arg(short, long)]
        rule: PathBuf,

        /// Number of sample customers to show (overrides config)
        #[arg(long)]
        sample: Option<usize>,
    },

    /// Report conditions in a rule file that can never match
    Validate {
        #[arg(short, long)]
        rule: PathBuf,
    },

    /// Audience size of every saved segment in a file
    Segments {
        /// JSON array of saved segments
        #[arg(short, long)]
        file: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let loaded = AppConfig::load(cli.config.as_deref());
    let mut config = loaded.as_ref().ok().cloned().unwrap_or_default();
    init_tracing(&config);
    if let Err(e) = &loaded {
        warn!(error = %e, "Failed to load config, using defaults");
    }

    // Apply CLI overrides
    if let Some(path) = &cli.customers {
        config.customers_path = Some(path.display().to_string());
    }
    info!(customers = ?config.customers_path, "Configuration loaded");

    match cli.command {
        Commands::Fields => print_json(&list_fields()),
        Commands::Operators { field_type } => {
            let operators = operators_for_type(&field_type);
            if operators.is_empty() {
                warn!(%field_type, "Unknown field type");
            }
            print_json(&operators)
        }
        Commands::Parse { text } => {
            let rule = NaturalLanguageParser::new().parse(&text);
            println!("{}", rule);
            print_json(&rule)?;
            if let Some(customers) = load_customers(&config, false)? {
                println!("matching customers: {}", matching_count(&rule, customers.customers()));
            }
            Ok(())
        }
        Commands::Query { rule, sample } => {
            let rule: SegmentRule = read_json(&rule)?;
            let customers = load_customers(&config, true)?.unwrap_or_default();
            let sample_size = sample.unwrap_or(config.preview.sample_size);
            println!("{}", rule);
            print_json(&preview(&rule, customers.customers(), sample_size))
        }
        Commands::Validate { rule } => {
            let rule: SegmentRule = read_json(&rule)?;
            let issues = rule.validate();
            for issue in &issues {
                println!("{}", issue);
            }
            if !issues.is_empty() {
                bail!("{} issue(s) found in rule {}", issues.len(), rule.id);
            }
            println!("rule {} is valid", rule.id);
            Ok(())
        }
        Commands::Segments { file } => {
            let segments: Vec<SavedSegment> = read_json(&file)?;
            let registry = SegmentRegistry::new();
            for segment in segments {
                registry.register(segment);
            }
            let customers = load_customers(&config, true)?.unwrap_or_default();
            print_json(&registry.audience_sizes(customers.customers()))
        }
    }
}

fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "audience_studio=info,audience_segmentation=info".into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if config.json_logs() {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}

fn load_customers(config: &AppConfig, required: bool) -> anyhow::Result<Option<InMemoryCustomers>> {
    match &config.customers_path {
        Some(path) => Ok(Some(
            InMemoryCustomers::from_json_file(path)
                .with_context(|| format!("loading customers from {}", path))?,
        )),
        None if required => bail!("no customer file given (use --customers or AUDIENCE_STUDIO__CUSTOMERS_PATH)"),
        None => Ok(None),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
