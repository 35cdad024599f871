use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "converge")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Converge REST backend resources to a declared state", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Manifest file (default: <config dir>/manifest.toml)
    #[arg(short, long, global = true, env = "CONVERGE_MANIFEST")]
    pub manifest: Option<PathBuf>,

    /// API token (overrides the manifest's token_env)
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Print reports as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show what apply would change, without writing anything
    Plan(PlanArgs),

    /// Converge resources to the manifest
    Apply(ApplyArgs),

    /// Look up one resource by name or UUID
    Show {
        /// Driver name from the manifest
        driver: String,

        /// Resource name or UUID
        identifier: String,
    },

    /// Run a one-shot action (e.g. start, stop) on an existing resource
    Action {
        /// Driver name from the manifest
        driver: String,

        /// Resource name or UUID
        name: String,

        /// Action name as configured on the driver
        action: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Check the manifest and every driver configuration
    Validate,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Reconcile Arguments
// ============================================================================

#[derive(Args, Clone)]
pub struct PlanArgs {
    /// Only this driver, or one `driver/name`
    pub target: Option<String>,
}

#[derive(Args, Clone)]
pub struct ApplyArgs {
    /// Only this driver, or one `driver/name`
    pub target: Option<String>,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Number of resources converged in parallel
    #[arg(short, long, default_value = "1")]
    pub jobs: u16,

    /// Do not wait for asynchronous backend tasks
    #[arg(long)]
    pub no_wait: bool,

    /// Polling timeout per task, in seconds
    #[arg(long, default_value = "600")]
    pub timeout: u64,

    /// Seconds between polls
    #[arg(long, default_value = "20")]
    pub interval: u64,
}
