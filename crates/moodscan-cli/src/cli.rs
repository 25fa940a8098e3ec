//! Command-line arguments

use crate::input::InputFormat;
use clap::{Parser, Subcommand, ValueEnum};
use moodscan_engine::{ClassifierMode, EngineConfig};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "moodscan")]
#[command(about = "Five-class sentiment analysis for short texts", long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, default_value = "moodscan.yaml")]
    pub config: PathBuf,

    /// Classifier path; overrides `environment.mode`
    #[arg(short, long, global = true, value_enum)]
    pub mode: Option<ModeArg>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print Prometheus metrics to stderr on exit
    #[arg(long, global = true)]
    pub metrics: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Classify a single text
    Analyze {
        text: String,
    },

    /// Classify every text in a file
    Batch {
        /// Input file
        #[arg(short, long)]
        input: PathBuf,

        /// Input layout; guessed from the extension when omitted
        #[arg(short, long, value_enum)]
        format: Option<InputFormat>,

        /// Texts per chunk; overrides `batch.chunk_size`
        #[arg(long)]
        chunk_size: Option<usize>,
    },

    /// Compare 2 to 5 texts side by side
    Compare {
        #[arg(required = true, num_args = 1..)]
        texts: Vec<String>,
    },

    /// Print the detected environment profile
    Detect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Auto,
    Model,
    RuleBased,
}

impl From<ModeArg> for ClassifierMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Auto => Self::Auto,
            ModeArg::Model => Self::Model,
            ModeArg::RuleBased => Self::RuleBased,
        }
    }
}

impl Cli {
    /// Apply flag overrides on top of the loaded configuration
    pub fn apply_overrides(&self, config: &mut EngineConfig) {
        if let Some(mode) = self.mode {
            config.environment.mode = mode.into();
        }

        if let Command::Batch {
            chunk_size: Some(chunk_size),
            ..
        } = &self.command
        {
            config.batch.chunk_size = *chunk_size;
        }
    }
}
