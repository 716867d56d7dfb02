//! Clap derive structures for the `newsdeck` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// newsdeck -- read Hacker News from the command line
#[derive(Debug, Parser)]
#[command(
    name = "newsdeck",
    version,
    about = "Read Hacker News from the command line",
    long_about = "Browse stories, threads, users and search results.\n\n\
        Item lookups are batched, deduplicated and cached; `watch` keeps\n\
        items live and reprints them whenever they change.",
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
    /// Config file to load instead of the default location
    #[arg(long, env = "NEWSDECK_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// HN item API base URL (overrides config)
    #[arg(long, env = "NEWSDECK_HN_URL", global = true)]
    pub hn_url: Option<String>,

    /// Algolia search API base URL (overrides config)
    #[arg(long, env = "NEWSDECK_ALGOLIA_URL", global = true)]
    pub algolia_url: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "NEWSDECK_OUTPUT",
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

    /// Skip the on-disk cache for this run
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Request timeout in seconds (overrides config)
    #[arg(long, env = "NEWSDECK_TIMEOUT", global = true)]
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
    /// Show one or more items by id
    #[command(alias = "i")]
    Item(ItemArgs),

    /// List a story feed
    #[command(alias = "f")]
    Feed(FeedArgs),

    /// Show a story and its comment tree
    #[command(alias = "t")]
    Thread(ThreadArgs),

    /// Show a user profile
    #[command(alias = "u")]
    User(UserArgs),

    /// Search stories and comments
    #[command(alias = "s")]
    Search(SearchArgs),

    /// Keep items live and print them whenever they change
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Items ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ItemArgs {
    /// Item ids
    #[arg(required = true)]
    pub ids: Vec<u64>,

    /// Bypass the cache and fetch fresh copies
    #[arg(long, short = 'r')]
    pub refresh: bool,
}

// ── Feeds ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FeedKind {
    Top,
    New,
    Best,
    Ask,
    Show,
    Job,
}

#[derive(Debug, Args)]
pub struct FeedArgs {
    /// Which feed to list
    #[arg(default_value = "top")]
    pub feed: FeedKind,

    /// Zero-based page
    #[arg(long, default_value = "0")]
    pub page: usize,

    /// Stories per page
    #[arg(long, short = 'n', default_value = "30")]
    pub limit: usize,

    /// Bypass the cached id list
    #[arg(long, short = 'r')]
    pub refresh: bool,
}

// ── Threads ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ThreadArgs {
    /// Root item id
    pub id: u64,

    /// Maximum comment depth to print
    #[arg(long, short = 'd')]
    pub depth: Option<usize>,
}

// ── Users ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct UserArgs {
    /// Username (case-sensitive)
    pub name: String,
}

// ── Search ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Query text
    pub query: String,

    /// Algolia tag filter (e.g. `story`, `comment`, `author_pg`)
    #[arg(long)]
    pub tags: Option<String>,

    /// Zero-based result page
    #[arg(long, default_value = "0")]
    pub page: u32,

    /// Hits per page
    #[arg(long, short = 'n', default_value = "20")]
    pub limit: u32,

    /// Newest first instead of by relevance
    #[arg(long)]
    pub by_date: bool,
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Item ids to keep live
    #[arg(required = true)]
    pub ids: Vec<u64>,

    /// Seconds between forced refreshes
    #[arg(long, short = 'i', default_value = "60")]
    pub interval: u64,

    /// Stop after this many updates
    #[arg(long, short = 'c')]
    pub count: Option<usize>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file location
    Path,

    /// Show the effective configuration (file + environment)
    Show,

    /// Write a config file with the default settings
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
