use clap::{ArgAction, Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "scriptrepo", version, about)]
pub struct Args {
    /// Units to include, by logical name (e.g. JQuery/Define)
    pub units: Vec<String>,

    /// Path to config.toml (overrides SCRIPTREPO_CONFIG and XDG default)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Extra unit lookup dir; searched after the configured dirs
    #[arg(short = 'd', long = "dir")]
    pub dirs: Vec<PathBuf>,

    /// Skip the configured default units and default assets
    #[arg(long, default_value_t = false)]
    pub no_defaults: bool,

    /// List the unit names found in the lookup dirs and exit
    #[arg(long, default_value_t = false)]
    pub list: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Print a build report to stderr
    #[arg(long, value_enum, default_value_t = ReportMode::Off)]
    pub report: ReportMode,

    /// Increase log verbosity (-v debug, -vv trace); SCRIPTREPO_LOG overrides
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Html,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportMode {
    Off,
    Summary,
    Full,
}
