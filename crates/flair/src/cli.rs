//! Clap derive structures for the `flair` CLI.
//!
//! Defines the command tree, global flags, and shared value enums. This file
//! is also compiled by `build.rs` for man pages, so it only uses clap.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// flair -- inspect and control Flair smart vents and HVAC units
#[derive(Debug, Parser)]
#[command(
    name = "flair",
    version,
    about = "Inspect and control Flair smart vents, pucks and HVAC units",
    long_about = "Talks to the Flair cloud API with OAuth2 client credentials.\n\n\
        Every structure, room, puck, vent, bridge and HVAC unit on the account\n\
        is exposed as a set of entities (climate, cover, switch, sensor,\n\
        binary_sensor, number, select, button) that can be listed, watched\n\
        and written.",
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
    #[arg(long, short = 'p', env = "FLAIR_PROFILE", global = true)]
    pub profile: Option<String>,

    /// OAuth2 client id (overrides profile)
    #[arg(long, env = "FLAIR_CLIENT_ID", global = true)]
    pub client_id: Option<String>,

    /// OAuth2 client secret (overrides profile and keyring)
    #[arg(long, env = "FLAIR_CLIENT_SECRET", global = true, hide_env_values = true)]
    pub client_secret: Option<String>,

    /// API host (overrides profile)
    #[arg(long, env = "FLAIR_API_URL", global = true, hide = true)]
    pub api_url: Option<String>,

    /// Unit system for temperatures
    #[arg(long, short = 'u', env = "FLAIR_UNITS", global = true)]
    pub units: Option<UnitsArg>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "FLAIR_OUTPUT",
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

    /// Request timeout in seconds
    #[arg(long, env = "FLAIR_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Value Enums ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
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

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum UnitsArg {
    /// Celsius
    Metric,
    /// Fahrenheit
    Imperial,
}

/// Which climate attribute `set` writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ClimateAttr {
    Temperature,
    HvacMode,
    FanMode,
    SwingMode,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check credentials and list the users and structures they reach
    Validate,

    /// Show coordinator health and snapshot summary
    Status,

    /// List and inspect entities
    #[command(alias = "e")]
    Entities(EntitiesArgs),

    /// Poll continuously and print entity changes
    Watch(WatchArgs),

    /// Write a value to an entity
    Set(SetArgs),

    /// Press a button entity
    Press(PressArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Entities ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct EntitiesArgs {
    #[command(subcommand)]
    pub command: EntitiesCommand,
}

#[derive(Debug, Subcommand)]
pub enum EntitiesCommand {
    /// List entities with their current state
    #[command(alias = "ls")]
    List(EntityFilter),

    /// Show one entity in detail
    Get {
        /// Entity unique id (e.g. `r1_room`)
        unique_id: String,
    },
}

/// Shared filters for `entities list` and `watch`.
#[derive(Debug, Clone, Default, Args)]
pub struct EntityFilter {
    /// Only this platform (climate, cover, switch, sensor, ...)
    #[arg(long)]
    pub platform: Option<String>,

    /// Only entities of this structure id
    #[arg(long, short = 's')]
    pub structure: Option<String>,

    /// Include entities that are disabled by default
    #[arg(long, short = 'a')]
    pub all: bool,
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    #[command(flatten)]
    pub filter: EntityFilter,

    /// Seconds between refreshes (overrides profile)
    #[arg(long, short = 'i')]
    pub interval: Option<u64>,
}

// ── Writes ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SetArgs {
    /// Entity unique id
    pub unique_id: String,

    /// New value: a number, `on`/`off`, `open`/`close`, a mode or an option
    pub value: String,

    /// Climate attribute to write (inferred when omitted)
    #[arg(long)]
    pub attr: Option<ClimateAttr>,
}

#[derive(Debug, Args)]
pub struct PressArgs {
    /// Button entity unique id
    pub unique_id: String,
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

    /// Show the resolved configuration (secrets redacted)
    Show,

    /// Store a client secret in the system keyring for the active profile
    SetSecret,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
