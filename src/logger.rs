// The logger thread of the replay binary. The filter loop sends one record
// per frame over a bounded channel; this thread accumulates statistics,
// logs frames on request and dumps interval statistics periodically.

use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

use crate::frame::TouchInfo;
use crate::stats::{Meta, StatsCollector};

/// Message sent from the filter loop to the logger thread.
#[derive(Debug)]
pub enum LogMessage {
    Frame(FrameInfo),
}

/// What happened to one frame.
#[derive(Clone, Debug)]
pub struct FrameInfo {
    /// Zero-based frame index in the input stream.
    pub index: u64,
    /// Candidates the controller delivered (bits 0..7 of the flags word).
    pub candidates: usize,
    /// The input `finger_num` word with all mode bits.
    pub flags: u32,
    /// The frame as emitted by the engine.
    pub output: TouchInfo,
    pub reset: bool,
    /// Reset-mask token taken after the frame, 0 when none.
    pub reset_mask: u32,
    pub near: bool,
}

/// State of the logger thread.
pub struct Logger {
    receiver: Receiver<LogMessage>,
    running: Arc<AtomicBool>,
    log_all_frames: bool,
    log_interval: Duration,
    stats_json: bool,
    meta: Meta,

    cumulative: StatsCollector,
    interval: StatsCollector,
    last_dump: Instant,
}

impl Logger {
    pub fn new(
        receiver: Receiver<LogMessage>,
        running: Arc<AtomicBool>,
        log_all_frames: bool,
        log_interval: Duration,
        stats_json: bool,
        meta: Meta,
    ) -> Self {
        Logger {
            receiver,
            running,
            log_all_frames,
            // Zero disables periodic dumps.
            log_interval: if log_interval.is_zero() { Duration::MAX } else { log_interval },
            stats_json,
            meta,
            cumulative: StatsCollector::new(),
            interval: StatsCollector::new(),
            last_dump: Instant::now(),
        }
    }

    /// Receives until the channel disconnects or `running` is cleared, then
    /// drains whatever is queued. Returns the cumulative statistics.
    pub fn run(&mut self) -> StatsCollector {
        let check_interval = Duration::from_millis(100);
        loop {
            if !self.running.load(Ordering::SeqCst) {
                debug!("Logger shutdown requested, draining channel");
                self.drain();
                break;
            }
            if self.log_interval != Duration::MAX && self.last_dump.elapsed() >= self.log_interval {
                self.dump_interval_stats();
                self.last_dump = Instant::now();
            }
            match self.receiver.recv_timeout(check_interval) {
                Ok(msg) => self.process_message(msg),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    trace!("Logger channel disconnected, draining");
                    self.drain();
                    break;
                }
            }
        }
        std::mem::take(&mut self.cumulative)
    }

    fn drain(&mut self) {
        while let Ok(msg) = self.receiver.try_recv() {
            self.process_message(msg);
        }
    }

    fn process_message(&mut self, msg: LogMessage) {
        match msg {
            LogMessage::Frame(frame) => {
                self.cumulative.record(&frame);
                self.interval.record(&frame);
                if self.log_all_frames {
                    log_frame(&frame);
                }
                if frame.reset_mask != 0 {
                    info!(frame = frame.index, token = frame.reset_mask, "Reset-mask token");
                }
            }
        }
    }

    fn dump_interval_stats(&mut self) {
        info!(interval = %crate::util::format_duration(self.log_interval), "Periodic stats dump");
        let interval = std::mem::take(&mut self.interval);
        let res = if self.stats_json {
            interval.print_stats_json(&self.meta, None, io::stderr().lock())
        } else {
            interval.print_stats(&self.meta, None, io::stderr().lock())
        };
        if let Err(e) = res {
            warn!(error = %e, "Failed to write periodic stats");
        }
    }
}

fn log_frame(frame: &FrameInfo) {
    let points: Vec<_> = frame.output.points().collect();
    debug!(
        frame = frame.index,
        flags = frame.flags,
        candidates = frame.candidates,
        emitted = frame.output.count(),
        ?points,
        near = frame.near,
        "Frame"
    );
}
