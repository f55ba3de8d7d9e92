use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use reconcile::SslMode;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mzform")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Declarative state for Materialize catalogs", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show what apply would change
    Plan(PlanArgs),

    /// Make the catalog match the manifest
    Apply(ApplyArgs),

    /// Drop every object recorded in the state file
    Destroy(DestroyArgs),

    /// Re-read recorded objects and forget the ones that are gone
    Refresh(ManifestArgs),

    /// Bind an existing object to a manifest address
    Import(ImportArgs),

    /// Inspect and enable cloud regions
    #[command(subcommand)]
    Region(RegionCommand),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Connection
// ============================================================================

/// Connection settings; each one overrides the config file
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// Config file (default: ~/.config/mzform/config.toml)
    #[arg(long, env = "MZFORM_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// SQL host
    #[arg(long, env = "MZ_HOST", global = true)]
    pub host: Option<String>,

    /// SQL port
    #[arg(long, env = "MZ_PORT", global = true)]
    pub port: Option<u16>,

    /// SQL user
    #[arg(long, env = "MZ_USER", global = true)]
    pub user: Option<String>,

    /// SQL password
    #[arg(long, env = "MZ_PASSWORD", hide_env_values = true, global = true)]
    pub password: Option<String>,

    /// Database to connect to
    #[arg(long, env = "MZ_DATABASE", global = true)]
    pub database: Option<String>,

    /// TLS mode: disable, prefer or require
    #[arg(long, env = "MZ_SSLMODE", value_parser = parse_sslmode, global = true)]
    pub sslmode: Option<SslMode>,

    /// Suffix for the reported application name
    #[arg(long, env = "MZFORM_APPLICATION_NAME_SUFFIX", global = true)]
    pub application_name_suffix: Option<String>,

    /// App password for cloud mode (mzp_...)
    #[arg(long, env = "MZ_APP_PASSWORD", hide_env_values = true, global = true)]
    pub app_password: Option<String>,

    /// Cloud region id, e.g. aws/us-east-1
    #[arg(long, env = "MZ_REGION", global = true)]
    pub region: Option<String>,
}

fn parse_sslmode(s: &str) -> Result<SslMode, String> {
    SslMode::parse(s).ok_or_else(|| format!("unknown sslmode '{s}' (disable, prefer, require)"))
}

// ============================================================================
// Declarative commands
// ============================================================================

#[derive(Args, Debug, Clone)]
pub struct ManifestArgs {
    /// Desired-state manifest
    #[arg(short = 'f', long, default_value = "mzform.toml")]
    pub manifest: PathBuf,

    /// State file (default: next to the manifest)
    #[arg(long)]
    pub state: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct PlanArgs {
    #[command(flatten)]
    pub manifest: ManifestArgs,

    /// Only plan objects matching a target (type or type.key)
    #[arg(short, long)]
    pub target: Option<String>,

    /// Print the plan as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub manifest: ManifestArgs,

    /// Only apply objects matching a target (type or type.key)
    #[arg(short, long)]
    pub target: Option<String>,

    /// Dry run - show what would be done
    #[arg(short, long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Number of objects applied concurrently within a tier
    #[arg(short, long, default_value = "4")]
    pub jobs: usize,

    /// Fail instead of dropping and recreating objects
    #[arg(long)]
    pub no_replace: bool,
}

#[derive(Args, Debug, Clone)]
pub struct DestroyArgs {
    #[command(flatten)]
    pub manifest: ManifestArgs,

    /// Only destroy objects matching a target (type or type.key)
    #[arg(short, long)]
    pub target: Option<String>,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Number of objects dropped concurrently within a tier
    #[arg(short, long, default_value = "4")]
    pub jobs: usize,
}

#[derive(Args, Debug, Clone)]
pub struct ImportArgs {
    #[command(flatten)]
    pub manifest: ManifestArgs,

    /// Manifest address, e.g. connection.kafka_conn
    pub address: String,

    /// Server-assigned object id, e.g. u42
    pub id: String,
}

// ============================================================================
// Region commands
// ============================================================================

#[derive(Subcommand)]
pub enum RegionCommand {
    /// List the regions offered to the organization
    List,

    /// Show the endpoint of a region
    Show {
        /// Region id (default: --region)
        id: Option<String>,
    },

    /// Enable a region
    Enable {
        /// Region id (default: --region)
        id: Option<String>,
    },
}
