//! Tracing initialisation for the replay binary.

use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::Options;
use crate::util;

/// Installs the global subscriber: a `fmt` layer on stderr filtered by
/// `opts.log_filter`.
pub fn init_tracing(opts: &Options) {
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(opts.verbose)
        .with_level(true);

    let filter = EnvFilter::try_new(&opts.log_filter).unwrap_or_else(|e| {
        eprintln!("Warning: Invalid log filter '{}': {e}", opts.log_filter);
        EnvFilter::new("touch_track=info")
    });

    tracing_subscriber::registry().with(fmt_layer).with(filter).init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        algorithm = %format!("{:#010x}", crate::version_id()),
        "touch-track starting"
    );
    info!(
        config = %opts.config.as_deref().map_or_else(|| "<default>".into(), |p| p.display().to_string()),
        log_all_frames = opts.log_all_frames,
        log_interval = %util::format_duration(opts.log_interval),
        stats_json = opts.stats_json,
        verbose = opts.verbose,
        log_filter = %opts.log_filter,
        "Configuration loaded"
    );
}
