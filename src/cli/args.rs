use crate::config::OutputFormat;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "cwefix")]
#[command(about = "Rewrites insecure random generation (CWE-338) in Java sources", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Rewrite insecure random calls in place
    Fix {
        /// Files or directories to process
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Source roots whose types are considered when resolving names
        #[arg(long = "classpath")]
        classpath: Vec<PathBuf>,

        /// Report what would change without writing files
        #[arg(long)]
        check: bool,

        /// Output format (defaults to the configured one)
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Configuration file (defaults to the nearest .cwefix.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Worker threads, 0 for all cores
        #[arg(short = 'j', long = "jobs", env = "CWEFIX_JOBS")]
        jobs: Option<usize>,

        /// Only apply these rules
        #[arg(long, value_delimiter = ',')]
        rules: Option<Vec<String>>,

        /// Increase verbosity level (can be repeated: -v, -vv, -vvv)
        #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
        verbosity: u8,

        /// Hide progress bars
        #[arg(short, long)]
        quiet: bool,
    },

    /// List the loaded rules
    Rules {
        /// Output format
        #[arg(short, long, value_enum, default_value = "terminal")]
        format: OutputFormat,

        /// Configuration file (defaults to the nearest .cwefix.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Write a default .cwefix.toml in the current directory
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

pub fn parse_args() -> Cli {
    Cli::parse()
}
