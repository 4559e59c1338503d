use clap::Parser;
use std::path::PathBuf;

/// Converts a trades list exported from the trading platform (tab
/// separated) into a cleaned csv of flat-to-flat positions.
#[derive(Parser)]
#[clap(version = "1.0", author)]
pub struct Opts {
    /// Exported trades list to read
    pub input: Option<PathBuf>,

    /// Csv file to write
    pub output: Option<PathBuf>,

    #[clap(short, long)]
    pub quiet: bool,
    /// Verbose mode (-v, -vv, -vvv, etc)
    #[clap(short, long, parse(from_occurrences))]
    pub verbose: usize,
    /// Timestamp (sec, ms, ns, none)
    #[clap(short, long)]
    pub ts: Option<stderrlog::Timestamp>,
}

pub fn parse_args() -> Opts {
    let mut opts = Opts::parse();
    if opts.input.is_none() {
        opts.input = Some(PathBuf::from(crate::TRADES_LIST_FILE));
    }
    if opts.output.is_none() {
        opts.output = Some(PathBuf::from(crate::TRADES_CSV_FILE));
    }
    opts
}
