// Replay binary: feeds recorded controller frames through the engine.
// Sets up tracing, the logger thread and signal handling, runs the frame
// loop over stdin/stdout and prints the final statistics.

use anyhow::{Context, Result};
use crossbeam_channel::{bounded, Sender, TrySendError};
use signal_hook::consts::signal::*;
use signal_hook::iterator::Signals;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::process::exit;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{error, info, warn};

use touch_track::cli::{self, Options};
use touch_track::engine::{FINGER_COUNT_MASK, FLAG_RESET, FLAG_RESET_ONCE};
use touch_track::frame::{read_frame, write_frame, ReportLine};
use touch_track::logger::{FrameInfo, LogMessage, Logger};
use touch_track::stats::{Meta, StatsCollector};
use touch_track::{telemetry, Engine, POINT_MAX};

const LOG_CHANNEL_CAPACITY: usize = 1024;

type LoggerHandle = Arc<Mutex<Option<JoinHandle<StatsCollector>>>>;

/// Filter-loop side of the logger channel, with drop warnings.
struct MainState {
    log_sender: Sender<LogMessage>,
    warned_about_dropping: bool,
    currently_dropping: bool,
}

impl MainState {
    fn send(&mut self, frame: FrameInfo) {
        match self.log_sender.try_send(LogMessage::Frame(frame)) {
            Ok(()) => {
                if self.currently_dropping {
                    info!("Logger caught up, frame records flowing again");
                    self.currently_dropping = false;
                }
            }
            Err(TrySendError::Full(_)) => {
                if !self.warned_about_dropping {
                    warn!("Logger channel full, dropping frame records (statistics will be incomplete)");
                    self.warned_about_dropping = true;
                }
                self.currently_dropping = true;
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}

fn load_config(path: &Path) -> Result<Vec<u32>> {
    let text = fs::read_to_string(path).with_context(|| format!("reading config blob {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing config blob {} as a JSON array of u32", path.display()))
}

/// Stops the logger, joins it and prints the final statistics once.
fn print_final_stats(
    running: &AtomicBool,
    handle: &LoggerHandle,
    printed: &AtomicBool,
    meta: &Meta,
    opts: &Options,
    started: Instant,
) {
    if printed.swap(true, Ordering::SeqCst) {
        return;
    }
    running.store(false, Ordering::SeqCst);
    let joined = match handle.lock() {
        Ok(mut h) => h.take(),
        Err(poisoned) => poisoned.into_inner().take(),
    };
    let stats = match joined.map(JoinHandle::join) {
        Some(Ok(stats)) => stats,
        Some(Err(_)) => {
            error!("Logger thread panicked, statistics unavailable");
            return;
        }
        None => return,
    };
    let runtime = Some(started.elapsed());
    let res = if opts.stats_json {
        stats.print_stats_json(meta, runtime, io::stderr().lock())
    } else {
        stats.print_stats(meta, runtime, io::stderr().lock())
    };
    if let Err(e) = res {
        error!(error = %e, "Failed to write final statistics");
    }
}

fn main() -> Result<()> {
    let args = cli::parse_args();
    let opts = Options::from(&args);
    telemetry::init_tracing(&opts);

    let words = opts.config.as_deref().map(load_config).transpose()?;
    let mut engine = Engine::new();
    engine.data_init(words.as_deref());
    if !engine.config().geometry_valid() {
        warn!("Configured panel geometry is invalid; every frame will be dropped");
    }

    let meta = Meta {
        config_source: opts
            .config
            .as_deref()
            .map_or_else(|| "<default>".into(), |p| p.display().to_string()),
        layout: engine.layout(),
        log_all_frames: opts.log_all_frames,
        log_interval_us: opts.log_interval.as_micros() as u64,
    };

    let started = Instant::now();
    let running = Arc::new(AtomicBool::new(true));
    let printed = Arc::new(AtomicBool::new(false));
    let (log_sender, log_receiver) = bounded(LOG_CHANNEL_CAPACITY);
    let mut logger = Logger::new(
        log_receiver,
        Arc::clone(&running),
        opts.log_all_frames,
        opts.log_interval,
        opts.stats_json,
        meta.clone(),
    );
    let handle: LoggerHandle = Arc::new(Mutex::new(Some(
        thread::Builder::new()
            .name("logger".into())
            .spawn(move || logger.run())
            .context("spawning logger thread")?,
    )));

    let mut signals = Signals::new([SIGTERM, SIGINT, SIGQUIT]).context("installing signal handlers")?;
    {
        let (running, handle, printed) = (Arc::clone(&running), Arc::clone(&handle), Arc::clone(&printed));
        let (meta, opts) = (meta.clone(), opts.clone());
        thread::spawn(move || {
            if let Some(sig) = signals.forever().next() {
                info!(signal = sig, "Received signal, printing final stats and exiting");
                print_final_stats(&running, &handle, &printed, &meta, &opts, started);
                exit(128 + sig);
            }
        });
    }

    let mut state = MainState {
        log_sender,
        warned_about_dropping: false,
        currently_dropping: false,
    };
    let mut reader = io::stdin().lock();
    let mut writer = BufWriter::new(io::stdout().lock());
    let mut line = String::new();
    let mut index = 0u64;

    loop {
        let mut info = match read_frame(&mut reader, &mut line) {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(e) => {
                error!(frame = index, error = %e, "Error reading input frame");
                exit(3);
            }
        };
        let flags = info.finger_num;
        engine.alg_id_main(&mut info);

        let mut pressure = [0; POINT_MAX];
        engine.report_pressure(&mut pressure);
        let report = ReportLine {
            info,
            reset_mask: engine.mask_tiaoping(),
            near: engine.touch_near() != 0,
            pressure,
        };
        if let Err(e) = write_frame(&mut writer, &report).and_then(|()| writer.flush()) {
            error!(frame = index, error = %e, "Error writing output report");
            exit(4);
        }

        state.send(FrameInfo {
            index,
            candidates: (flags & FINGER_COUNT_MASK) as usize,
            flags,
            output: report.info,
            reset: flags & (FLAG_RESET | FLAG_RESET_ONCE) != 0,
            reset_mask: report.reset_mask,
            near: report.near,
        });
        index += 1;
    }

    drop(state);
    print_final_stats(&running, &handle, &printed, &meta, &opts, started);
    Ok(())
}
