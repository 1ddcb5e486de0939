//! Clap derive structures for the `veeamly` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// veeamly -- watch and drive Veeam Backup & Replication from the terminal
#[derive(Debug, Parser)]
#[command(
    name = "veeamly",
    version,
    about = "Monitor Veeam Backup & Replication servers from the command line",
    long_about = "Polls the Veeam Backup & Replication REST API (port 9419) for jobs,\n\
        repositories, scale-out repositories, license and server health,\n\
        and runs job and repository actions.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Server profile to use
    #[arg(long, short = 'p', env = "VEEAMLY_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Backup server hostname or IP (overrides profile)
    #[arg(long, short = 'H', env = "VEEAMLY_HOST", global = true)]
    pub host: Option<String>,

    /// REST API port (overrides profile)
    #[arg(long, env = "VEEAMLY_PORT", global = true)]
    pub port: Option<u16>,

    /// Username (overrides profile)
    #[arg(long, short = 'u', env = "VEEAMLY_USERNAME", global = true)]
    pub username: Option<String>,

    /// x-api-version header value, e.g. 1.3-rev1 (overrides profile)
    #[arg(long, env = "VEEAMLY_API_VERSION", global = true)]
    pub api_version: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "VEEAMLY_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "VEEAMLY_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds
    #[arg(long, env = "VEEAMLY_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List and control backup jobs
    #[command(alias = "j")]
    Jobs(JobsArgs),

    /// List and rescan backup repositories
    #[command(alias = "repositories", alias = "r")]
    Repos(ReposArgs),

    /// List scale-out repositories and switch extent modes
    Sobrs(SobrsArgs),

    /// Backup server information
    #[command(alias = "sys")]
    Server(ServerArgs),

    /// License information
    License,

    /// Entities a poll cycle materializes, with their current values
    #[command(alias = "ent")]
    Entities(EntitiesArgs),

    /// Poll continuously and keep an entity registry file in sync
    Watch(WatchArgs),

    /// Redacted diagnostics report
    #[command(alias = "diag")]
    Diagnostics,

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  JOBS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct JobsArgs {
    #[command(subcommand)]
    pub command: JobsCommand,
}

#[derive(Debug, Subcommand)]
pub enum JobsCommand {
    /// List backup jobs with their state
    #[command(alias = "ls")]
    List {
        /// Only jobs whose display status matches (running, success, failed, ...)
        #[arg(long, short = 's')]
        status: Option<String>,
    },

    /// Get job details
    Get {
        /// Job ID or exact name
        job: String,
    },

    /// Start a job
    Start {
        /// Job ID or exact name
        job: String,

        /// Run an active full instead of an incremental
        #[arg(long)]
        full: bool,
    },

    /// Stop a running job
    Stop {
        /// Job ID or exact name
        job: String,

        /// Let the current task finish before stopping
        #[arg(long)]
        graceful: bool,
    },

    /// Retry the failed part of the last run
    Retry {
        /// Job ID or exact name
        job: String,
    },

    /// Enable a job's schedule
    Enable {
        /// Job ID or exact name
        job: String,
    },

    /// Disable a job's schedule
    Disable {
        /// Job ID or exact name
        job: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  REPOSITORIES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ReposArgs {
    #[command(subcommand)]
    pub command: ReposCommand,
}

#[derive(Debug, Subcommand)]
pub enum ReposCommand {
    /// List backup repositories with capacity
    #[command(alias = "ls")]
    List,

    /// Get repository details
    Get {
        /// Repository ID or exact name
        repo: String,
    },

    /// Rescan a repository
    Rescan {
        /// Repository ID or exact name
        repo: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SCALE-OUT REPOSITORIES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct SobrsArgs {
    #[command(subcommand)]
    pub command: SobrsCommand,
}

#[derive(Debug, Subcommand)]
pub enum SobrsCommand {
    /// List scale-out repositories
    #[command(alias = "ls")]
    List,

    /// List the extents of one scale-out repository
    Extents {
        /// Scale-out repository ID or exact name
        sobr: String,
    },

    /// Put an extent into sealed mode
    Seal(ExtentTarget),

    /// Take an extent out of sealed mode
    Unseal(ExtentTarget),

    /// Put an extent into maintenance mode
    MaintenanceOn(ExtentTarget),

    /// Take an extent out of maintenance mode
    MaintenanceOff(ExtentTarget),
}

#[derive(Debug, Args)]
pub struct ExtentTarget {
    /// Scale-out repository ID or exact name
    pub sobr: String,

    /// Extent ID or exact name
    pub extent: String,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SERVER
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ServerArgs {
    #[command(subcommand)]
    pub command: ServerCommand,
}

#[derive(Debug, Subcommand)]
pub enum ServerCommand {
    /// Server name, build and database
    Info,

    /// Write actions the negotiated API version offers
    Capabilities,

    /// Connectivity and token state after one poll
    Health,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  ENTITIES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct EntitiesArgs {
    /// Only entities of this platform
    #[arg(long)]
    pub platform: Option<PlatformFilter>,

    /// Only entities whose device id contains this text
    #[arg(long, short = 'd')]
    pub device: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PlatformFilter {
    Sensor,
    BinarySensor,
    Button,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  WATCH
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Registry file (defaults to the platform data directory)
    #[arg(long, short = 'r')]
    pub registry: Option<PathBuf>,

    /// Poll interval in seconds (overrides profile)
    #[arg(long, short = 'i')]
    pub interval: Option<u64>,

    /// Entry id used as the unique id prefix (defaults to the profile name)
    #[arg(long)]
    pub entry_id: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current configuration (secrets masked)
    Show,

    /// Set a value on the active profile
    Set {
        /// Profile key (host, port, username, verify_tls, ca_cert, api_version, poll_interval, timeout, password_env)
        key: String,

        /// Value to set
        value: String,
    },

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store a password in the system keyring
    SetPassword {
        /// Profile name
        #[arg(long)]
        profile: Option<String>,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
