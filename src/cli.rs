use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Compute feature-layer field schemas from metadata or sampled attributes",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Compute an ordered field collection from a JSON payload
    Compute(ComputeArgs),
    /// List supported type labels and their canonical Esri field types
    Types,
}

#[derive(Debug, Args)]
pub struct ComputeArgs {
    /// Input payload JSON file ('-' reads from stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Request context; 'layer' adds identifier injection and editable/nullable flags
    #[arg(long)]
    pub context: Option<String>,
    /// Comma-separated field-name allowlist ('*' keeps every field)
    #[arg(long = "out-fields")]
    pub out_fields: Option<String>,
    /// JSON file holding a fallback attribute record for feature-less payloads
    #[arg(long = "attribute-sample")]
    pub attribute_sample: Option<PathBuf>,
    /// Pretty-print the resulting field JSON
    #[arg(long)]
    pub pretty: bool,
}
