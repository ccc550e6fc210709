use clap::{Args, Parser, Subcommand};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

#[derive(Parser)]
#[command(
    name = "kbfuzz",
    version,
    long_version = concat!(env!("CARGO_PKG_VERSION"), " (built ", env!("BUILD_TIMESTAMP"), ")"),
    about = "Black-box robustness and security fuzzing for knowledge-base web APIs"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Emit log lines as JSON objects
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the fuzzing stages against a target
    Run(RunArgs),
    /// Generate the malformed-file corpus without running anything
    Generate(GenerateArgs),
    /// Validate a configuration file
    Validate(ValidateArgs),
}

#[derive(Args, Clone, Debug, Default)]
pub struct RunArgs {
    /// Target base URL [default: http://localhost:8080]
    #[arg(long)]
    pub base_url: Option<String>,

    /// Authorization header value, or $ENV_VAR to read it from the environment
    #[arg(long)]
    pub token: Option<String>,

    /// Knowledge base (dataset) under test; required by the file and API stages
    #[arg(long)]
    pub dataset_id: Option<String>,

    /// Directory for reports and ledgers
    #[arg(long)]
    pub results_dir: Option<String>,

    /// Stages to run: file, api, property (alias: hypothesis), all
    #[arg(long, default_value = "all")]
    pub only: String,

    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Maximum in-flight requests for categories that may run in parallel
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Delay between requests in milliseconds
    #[arg(long)]
    pub pacing_ms: Option<u64>,

    /// Upload latency in seconds above which a response counts as TIMEOUT
    #[arg(long)]
    pub slow_threshold: Option<f64>,

    /// Seed for property trials (printed in the report for replay)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Minimise failing property inputs after the trials
    #[arg(long)]
    pub shrink: bool,
}

#[derive(Args, Clone, Debug)]
pub struct GenerateArgs {
    /// Output directory for the corpus
    #[arg(short, long, default_value = "malformed_files")]
    pub output: String,

    /// Size of the oversized-body variants in MiB
    #[arg(long, default_value = "5")]
    pub oversized_mb: u64,
}

#[derive(Args, Clone, Debug)]
pub struct ValidateArgs {
    /// Config file to validate
    pub config: String,
}
