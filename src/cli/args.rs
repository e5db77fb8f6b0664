/// CLI argument definitions via clap derive.
use std::ffi::OsString;

use clap::{ArgAction, Parser, ValueEnum};
use tracing::level_filters::LevelFilter;

/// scstacks: correlate Service Catalog provisioned products with CloudFormation stacks.
///
/// Lists every provisioned product, finds the stack each one launched, and
/// shows the vended account id and email. Products in ERROR, or whose stack
/// is gone, are listed for termination (or terminated, with `+delete`).
#[derive(Debug, Parser)]
#[command(
    name = "scstacks",
    about = "Correlate Service Catalog provisioned products with their CloudFormation stacks",
    version
)]
pub struct Cli {
    /// AWS profile to use.
    #[arg(
        short,
        long,
        env = "AWS_PROFILE",
        value_name = "PROFILE",
        default_value = "default"
    )]
    pub profile: String,

    /// AWS region to check.
    #[arg(
        short,
        long,
        env = "AWS_REGION",
        value_name = "REGION",
        default_value = "us-east-1"
    )]
    pub region: String,

    /// Terminate provisioned products that are in error or have no stack,
    /// without asking for confirmation. Also accepted as `+d` / `+delete`.
    #[arg(long)]
    pub delete: bool,

    /// Be verbose (`-v` errors, `-vv` warnings).
    #[arg(
        short = 'v',
        action = ArgAction::Count,
        overrides_with_all = ["verbose", "debug_count", "debug"]
    )]
    pub verbose_count: u8,

    /// Same as `-vv`.
    #[arg(long, overrides_with_all = ["verbose_count", "debug_count", "debug"])]
    pub verbose: bool,

    /// Print debugging statements (`-d` info, `-dd` debug).
    #[arg(
        short = 'd',
        action = ArgAction::Count,
        overrides_with_all = ["verbose_count", "verbose", "debug"]
    )]
    pub debug_count: u8,

    /// Same as `-dd`.
    #[arg(long, overrides_with_all = ["verbose_count", "verbose", "debug_count"])]
    pub debug: bool,

    /// Output format. Auto-detects: table when TTY, json when piped.
    #[arg(long, value_name = "FORMAT", default_value = "auto")]
    pub output: OutputFormat,

    /// Shorthand for --output json.
    #[arg(long, conflicts_with = "output")]
    pub json: bool,

    /// Omit the table header and separator row.
    #[arg(long)]
    pub no_header: bool,
}

/// Output format variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Auto-detect: table when stdout is a TTY, json when piped.
    #[default]
    Auto,
    /// JSON object (pretty-printed).
    Json,
    /// Compact single-line JSON.
    Compact,
    /// Newline-delimited JSON (one product row per line).
    Ndjson,
    /// Aligned table with headers (human-readable).
    Table,
    /// Provisioned product id only, one per line.
    Id,
}

impl Cli {
    /// Diagnostic level selected by the verbosity flags.
    ///
    /// The four flags override each other, so only the last one given is set.
    #[must_use]
    pub fn log_level(&self) -> LevelFilter {
        if self.debug || self.debug_count >= 2 {
            LevelFilter::DEBUG
        } else if self.debug_count == 1 {
            LevelFilter::INFO
        } else if self.verbose || self.verbose_count >= 2 {
            LevelFilter::WARN
        } else if self.verbose_count == 1 {
            LevelFilter::ERROR
        } else {
            LevelFilter::OFF
        }
    }
}

/// Rewrite the `+d` / `+delete` spellings to `--delete` so clap can parse them.
#[must_use]
pub fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    args.into_iter()
        .map(|arg| {
            if arg == "+d" || arg == "+delete" {
                OsString::from("--delete")
            } else {
                arg
            }
        })
        .collect()
}
