//! Clap derive structures for the `printgate` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// printgate -- drive a fingerprint scanner service from the command line
#[derive(Debug, Parser)]
#[command(
    name = "printgate",
    version,
    about = "Capture, enroll, and identify fingerprints from the command line",
    long_about = "A client for a fingerprint device-control service.\n\n\
        Request/response calls start each operation; progress and results\n\
        arrive over the service's push channel. Only one biometric operation\n\
        runs at a time.",
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
    /// Service profile to use
    #[arg(long, short = 'p', env = "PRINTGATE_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Device service URL (overrides profile)
    #[arg(long, short = 's', env = "PRINTGATE_SERVICE", global = true)]
    pub service: Option<String>,

    /// Push channel URL (defaults to the service URL)
    #[arg(long, env = "PRINTGATE_PUSH_URL", global = true)]
    pub push_url: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "PRINTGATE_OUTPUT",
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
    #[arg(long, short = 'k', env = "PRINTGATE_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile, default 30)
    #[arg(long, env = "PRINTGATE_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Give up on an operation that has not finished after this many seconds
    #[arg(long, env = "PRINTGATE_SESSION_TIMEOUT", global = true)]
    pub session_timeout: Option<u64>,
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
    /// Show device status and captured template slots
    #[command(alias = "st")]
    Status,

    /// Initialize the scanner
    Init,

    /// Capture a manual template into slot 1 or 2
    #[command(alias = "cap")]
    Capture(CaptureArgs),

    /// Compare the two captured templates (1:1)
    Match,

    /// Enroll a subject with the automated capture sequence
    Enroll(EnrollArgs),

    /// Identify a fingerprint against the database (1:N)
    #[command(alias = "id")]
    Identify,

    /// Stream push notices until interrupted
    Watch,

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Operation arguments ──────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CaptureArgs {
    /// Template slot
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=2))]
    pub slot: u8,

    /// What the scanner captures
    #[arg(long, short = 'm', default_value = "left-four")]
    pub method: CaptureMethodArg,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CaptureMethodArg {
    /// Four fingers of the left hand
    LeftFour,
    /// Four fingers of the right hand
    RightFour,
    /// Both thumbs
    TwoThumbs,
}

#[derive(Debug, Args)]
pub struct EnrollArgs {
    /// Subject's full name
    #[arg(long, short = 'n')]
    pub name: String,

    /// Subject's identity number
    #[arg(long, short = 'i')]
    pub id_number: String,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Interactive configuration wizard
    Init,

    /// Show the current configuration
    Show,

    /// Print the config file path
    Path,

    /// Set a value on the active profile
    Set {
        /// Key: service, push_url, timeout, insecure, ca_cert,
        /// reconnect_attempts, session_timeout
        key: String,
        value: String,
    },

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name
        name: String,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell
    pub shell: clap_complete::Shell,
}
