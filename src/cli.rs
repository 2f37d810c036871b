use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Replays recorded touch-controller frames through the point-tracking engine.
/// Reads one JSON frame per line from stdin and writes one JSON report per
/// line to stdout.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Controller configuration blob: a JSON array of 32-bit words. Built-in
    /// defaults are used when omitted.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log every frame (input flags, candidates, emitted points) at debug level.
    #[arg(long)]
    pub log_all_frames: bool,

    /// Dump interval statistics to stderr every N seconds (0 = disabled).
    #[arg(long, default_value = "0", value_name = "SECONDS")]
    pub log_interval: u64,

    /// Print statistics as JSON instead of the human-readable summary.
    #[arg(long)]
    pub stats_json: bool,

    /// Include targets in log lines and raise the default level to debug.
    #[arg(short, long)]
    pub verbose: bool,

    /// Tracing filter directive; overrides RUST_LOG.
    #[arg(long, value_name = "FILTER")]
    pub log_filter: Option<String>,
}

/// Runtime options derived from the command line.
#[derive(Clone, Debug)]
pub struct Options {
    pub config: Option<PathBuf>,
    pub log_all_frames: bool,
    pub log_interval: Duration,
    pub stats_json: bool,
    pub verbose: bool,
    pub log_filter: String,
}

impl From<&Args> for Options {
    fn from(a: &Args) -> Self {
        let default_filter = if a.verbose || a.log_all_frames {
            "touch_track=debug"
        } else {
            "touch_track=info"
        };
        let log_filter = a
            .log_filter
            .clone()
            .or_else(|| std::env::var("RUST_LOG").ok())
            .unwrap_or_else(|| default_filter.to_string());
        Options {
            config: a.config.clone(),
            log_all_frames: a.log_all_frames,
            log_interval: Duration::from_secs(a.log_interval),
            stats_json: a.stats_json,
            verbose: a.verbose,
            log_filter,
        }
    }
}

/// Parses command line arguments using clap.
pub fn parse_args() -> Args {
    Args::parse()
}
