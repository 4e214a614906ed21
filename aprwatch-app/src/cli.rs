use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Alternate run modes selected by the first positional argument.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunMode {
    /// Show the browser window instead of running headless.
    Test,
}

/// Restricts a run to one pipeline.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pipeline {
    Farms,
    Feed,
}

#[derive(Parser, Debug)]
#[command(name = "aprwatch")]
#[command(version, about = "Capture farm APRs from the rendered app and the pool feed")]
pub struct Cli {
    #[arg(value_enum)]
    pub mode: Option<RunMode>,

    /// Configuration file (defaults to ./aprwatch.yaml when present)
    #[arg(long, env = "APRWATCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Run a single pipeline
    #[arg(long, value_enum)]
    pub only: Option<Pipeline>,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,
}

impl Cli {
    pub fn runs(&self, pipeline: Pipeline) -> bool {
        self.only.is_none_or(|only| only == pipeline)
    }

    pub fn headed(&self) -> bool {
        self.mode == Some(RunMode::Test)
    }
}
