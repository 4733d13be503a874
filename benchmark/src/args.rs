use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use benchmark::game::DEFAULT_MAX_PLIES;
use benchmark::rules::STANDARD_POSITION_FEN;

/// One day, in milliseconds. Upper bound for every time flag.
const MAX_MILLIS: u64 = 24 * 60 * 60 * 1000;

#[derive(Parser, Debug)]
#[command(name = "Engine Benchmark")]
#[command(author = "Jørgen Hanssen <jorgen@hanssen.io>")]
#[command(version = "1.0.0")]
#[command(about = "Plays UCI engines against each other, or against known best moves, in parallel")]
pub struct Args {
    /// Number of concurrent workers
    #[arg(long, default_value_t = 8, value_parser = clap::value_parser!(u16).range(1..))]
    pub workers: u16,

    /// Milliseconds between progress updates
    #[arg(long, default_value_t = 250)]
    pub progress_interval: u64,

    /// Extra milliseconds an engine gets past its move time before it is killed
    #[arg(long, default_value_t = 1000, value_parser = clap::value_parser!(u64).range(..=MAX_MILLIS))]
    pub timeout_margin: u64,

    /// Also write debug logs, including engine traffic, to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Only log warnings and errors, and hide the progress bar
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub mode: Mode,
}

impl Args {
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval)
    }

    pub fn timeout_margin(&self) -> Duration {
        Duration::from_millis(self.timeout_margin)
    }
}

#[derive(Subcommand, Debug)]
pub enum Mode {
    /// Play games between the engine under test and a reference engine
    Match {
        #[arg(long)]
        engine: PathBuf,

        #[arg(long)]
        reference: PathBuf,

        #[arg(long, default_value_t = 100)]
        games: usize,

        /// Milliseconds per move for the engine under test
        #[arg(long, default_value_t = 1000, value_parser = clap::value_parser!(u64).range(1..=MAX_MILLIS))]
        engine_movetime: u64,

        /// Milliseconds per move for the reference engine
        #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u64).range(1..=MAX_MILLIS))]
        reference_movetime: u64,

        /// Games reaching this many plies are scored as draws
        #[arg(long, default_value_t = DEFAULT_MAX_PLIES)]
        max_plies: u32,

        #[arg(long, default_value = STANDARD_POSITION_FEN)]
        start_fen: String,

        /// Argument passed to the engine under test, may be repeated
        #[arg(long = "engine-arg", allow_hyphen_values = true)]
        engine_args: Vec<String>,

        /// Argument passed to the reference engine, may be repeated
        #[arg(long = "reference-arg", allow_hyphen_values = true)]
        reference_args: Vec<String>,
    },
    /// Compare the engine's moves with a file of `<best move> | <fen>` lines
    Accuracy {
        #[arg(long)]
        engine: PathBuf,

        #[arg(long, default_value = "stockfish_moves.txt")]
        cases: PathBuf,

        /// Milliseconds per position
        #[arg(long, default_value_t = 1000, value_parser = clap::value_parser!(u64).range(1..=MAX_MILLIS))]
        movetime: u64,

        #[arg(long = "engine-arg", allow_hyphen_values = true)]
        engine_args: Vec<String>,
    },
}
