//! Clap derive structures for the `evcnet` CLI.
//!
//! Also compiled into `build.rs` for man pages, so this file may only
//! depend on `clap` and `clap_complete`.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// evcnet -- monitor and control EVC-net charging spots
#[derive(Debug, Parser)]
#[command(
    name = "evcnet",
    version,
    about = "Monitor and control EVC-net charging spots from the command line",
    long_about = "Talks to an EVC-net charging portal with your account credentials.\n\n\
        Lists your charging spots, shows per-channel status, and starts, stops\n\
        or resets charging sessions.",
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
    /// Account profile to use
    #[arg(long, short = 'p', env = "EVCNET_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Portal base URL (overrides profile)
    #[arg(long, env = "EVCNET_BASE_URL", global = true)]
    pub base_url: Option<String>,

    /// Login e-mail address (overrides profile)
    #[arg(long, short = 'u', env = "EVCNET_USERNAME", global = true)]
    pub username: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "EVCNET_OUTPUT",
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

    /// Accept invalid TLS certificates
    #[arg(long, short = 'k', env = "EVCNET_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds
    #[arg(long, env = "EVCNET_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Minimum number of channels polled per spot
    #[arg(long, env = "EVCNET_MAX_CHANNELS", global = true)]
    pub max_channels: Option<usize>,
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
    /// List charging spots and the state of each channel
    #[command(alias = "ls")]
    Spots,

    /// Show detailed status for one spot
    Status(StatusArgs),

    /// Poll continuously and print every update until Ctrl-C
    Watch,

    /// Ask the portal for a fresh spot overview
    Refresh(SpotTarget),

    /// Start a charging session
    Start(StartArgs),

    /// Stop the running charging session
    Stop(SpotTarget),

    /// Soft-reset the charger
    SoftReset(SpotTarget),

    /// Hard-reset the charger
    HardReset(SpotTarget),

    /// Release the connector lock
    Unlock(SpotTarget),

    /// Block the spot for new sessions
    Block(SpotTarget),

    /// Unblock the spot
    Unblock(SpotTarget),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Spot commands ────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Spot id (IDX)
    pub spot: String,
}

/// The spot (and optionally channel) a command targets.
#[derive(Debug, Args)]
pub struct SpotTarget {
    /// Spot id (IDX)
    pub spot: String,

    /// Channel number (default: the spot's first channel)
    #[arg(long, short = 'c')]
    pub channel: Option<String>,
}

#[derive(Debug, Args)]
pub struct StartArgs {
    #[command(flatten)]
    pub target: SpotTarget,

    /// Card id (default: configured card, then the card reported by the spot)
    #[arg(long)]
    pub card: Option<String>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Interactive setup wizard
    Init,

    /// Show the current configuration
    Show,

    /// Print the config file location
    Path,

    /// Store the active profile's password in the system keyring
    SetPassword,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
