pub mod cli;
pub mod compute;
pub mod discrepancy;
pub mod field;
pub mod field_type;
pub mod payload;

use std::{
    env,
    fs::File,
    io::{self, BufReader, Read},
    path::Path,
    sync::OnceLock,
};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, info, warn};
use thiserror::Error;

use crate::{
    cli::{Cli, Commands},
    field_type::FieldType,
    payload::{AttributeSample, ComputeOptions, Payload, RequestContext},
};

/// Errors surfaced by the field-computation core.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    /// A declared type label has no canonical Esri mapping.
    #[error("unsupported field type label '{0}'")]
    UnsupportedType(String),
    /// A collection that must carry an identifier field does not contain one.
    #[error("computed field collection carries no OBJECTID identifier field")]
    IdentifierFieldMissing,
}

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("feature_fields", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Compute(args) => handle_compute(&args),
        Commands::Types => handle_types(),
    }
}

fn handle_compute(args: &cli::ComputeArgs) -> Result<()> {
    let payload = read_payload(&args.input)?;
    let context = RequestContext::from_label(args.context.as_deref().unwrap_or_default());
    let attribute_sample = match &args.attribute_sample {
        Some(path) => Some(read_attribute_sample(path)?),
        None => None,
    };
    let options = ComputeOptions {
        attribute_sample,
        out_fields: args.out_fields.clone(),
    };

    let computed = compute::compute_fields(&payload, context, &options)?;
    for warning in &computed.warnings {
        warn!("{warning}");
    }

    let rendered = if args.pretty {
        serde_json::to_string_pretty(&computed.fields)
    } else {
        serde_json::to_string(&computed.fields)
    }
    .context("Serializing computed fields")?;
    println!("{rendered}");
    info!(
        "Computed {} field(s) with {} warning(s)",
        computed.fields.len(),
        computed.warnings.len()
    );
    Ok(())
}

fn handle_types() -> Result<()> {
    for field_type in FieldType::all() {
        println!("{:<14} {}", field_type.as_str(), field_type.esri_name());
    }
    Ok(())
}

fn read_payload(path: &Path) -> Result<Payload> {
    if is_dash(path) {
        let mut raw = String::new();
        io::stdin()
            .read_to_string(&mut raw)
            .context("Reading payload from stdin")?;
        return serde_json::from_str(&raw).context("Parsing payload JSON from stdin");
    }
    let file = File::open(path).with_context(|| format!("Opening payload file {path:?}"))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Parsing payload JSON from {path:?}"))
}

fn read_attribute_sample(path: &Path) -> Result<AttributeSample> {
    let file = File::open(path).with_context(|| format!("Opening attribute sample {path:?}"))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Parsing attribute sample JSON from {path:?}"))
}

fn is_dash(path: &Path) -> bool {
    path.as_os_str() == "-"
}
