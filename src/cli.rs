use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::extend::DEFAULT_CONCURRENCY;

#[derive(Debug, Clone, Parser)]
#[command(name = "mcc-import")]
#[command(about = "Extend bank statement exports with merchant categories resolved from MCC codes")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, value_name = "FILE")]
    pub codes: Option<PathBuf>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    Extend {
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,

        #[arg(short = 'o', long, value_name = "FILE")]
        out: Option<PathBuf>,

        #[arg(long, value_name = "N", default_value_t = DEFAULT_CONCURRENCY)]
        concurrency: usize,

        #[arg(long, value_name = "URL")]
        reference_url: Option<String>,
    },
    Stats,
    Clear,
}
