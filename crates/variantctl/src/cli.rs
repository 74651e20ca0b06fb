use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "variantctl",
    author,
    version,
    about = "Record, inspect, and warm up shader variant configs"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay a capture script through a recording session and export the result.
    Record(RecordArgs),
    /// Print the labels and catalog stored in a variant config.
    Inspect(InspectArgs),
    /// Resolve labels against a variant config and print what would be compiled.
    Warmup(WarmupArgs),
}

#[derive(Args, Debug)]
pub struct RecordArgs {
    /// Capture script (TOML) describing the baseline and each recorded step.
    #[arg(value_name = "SCRIPT")]
    pub script: PathBuf,

    /// Destination config; `.toml` writes TOML, anything else JSON.
    #[arg(long, short, value_name = "CONFIG")]
    pub out: PathBuf,

    /// Keep baseline variants in every label instead of filtering them out.
    #[arg(long)]
    pub keep_defaults: bool,

    /// Scheduler steps each step waits before its capture is read.
    #[arg(long, value_name = "TICKS", default_value_t = 1)]
    pub settle_ticks: u32,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Also list every variant referenced by each label.
    #[arg(long)]
    pub verbose: bool,
}

#[derive(Args, Debug)]
pub struct WarmupArgs {
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Label to queue for warm-up; repeatable.
    #[arg(long = "label", short, value_name = "LABEL")]
    pub labels: Vec<String>,

    /// Warm up every variant in the catalog, ignoring labels.
    #[arg(long, conflicts_with = "labels")]
    pub all: bool,

    /// Only shaders named in this file (one per line) resolve; others fail.
    #[arg(long, value_name = "FILE")]
    pub shaders: Option<PathBuf>,

    /// Skip variants whose keywords include this keyword; repeatable.
    #[arg(long = "exclude-keyword", value_name = "KEYWORD")]
    pub exclude_keywords: Vec<String>,
}

pub fn parse() -> Cli {
    Cli::parse()
}
