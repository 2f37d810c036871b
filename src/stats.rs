// Statistics accumulated by the replay binary over a run (or an interval of
// it) and their human-readable and JSON renderings.

use serde::Serialize;
use std::io::{self, Write};
use std::time::Duration;

use crate::logger::FrameInfo;
use crate::util::format_duration;
use crate::POINT_MAX;

/// Metadata included in JSON statistics output.
#[derive(Clone, Debug, Serialize)]
pub struct Meta {
    pub config_source: String,
    pub layout: crate::config::Layout,
    pub log_all_frames: bool,
    pub log_interval_us: u64,
}

/// Totals for a run of frames.
#[derive(Clone, Debug, Default, Serialize, PartialEq, Eq)]
pub struct StatsCollector {
    pub frames_processed: u64,
    /// Frames that carried at least one candidate.
    pub frames_with_touch: u64,
    /// Frames that carried candidates but emitted nothing.
    pub frames_suppressed: u64,
    pub points_in: u64,
    pub points_emitted: u64,
    /// Frames with the hard- or once-reset flag.
    pub resets: u64,
    pub reset_mask_tokens: u64,
    pub near_frames: u64,
    pub peak_fingers: usize,
    /// Frame count per emitted finger count (index 0..=POINT_MAX).
    pub finger_histogram: [u64; POINT_MAX + 1],
}

impl StatsCollector {
    pub fn new() -> Self {
        StatsCollector::default()
    }

    pub fn record(&mut self, frame: &FrameInfo) {
        self.frames_processed += 1;
        self.points_in += frame.candidates as u64;
        let emitted = frame.output.count();
        self.points_emitted += emitted as u64;
        if frame.candidates > 0 {
            self.frames_with_touch += 1;
            if emitted == 0 {
                self.frames_suppressed += 1;
            }
        }
        if frame.reset {
            self.resets += 1;
        }
        if frame.reset_mask != 0 {
            self.reset_mask_tokens += 1;
        }
        if frame.near {
            self.near_frames += 1;
        }
        self.peak_fingers = self.peak_fingers.max(emitted);
        self.finger_histogram[emitted] += 1;
    }

    /// Share of touch-carrying frames that emitted nothing, in percent.
    pub fn suppressed_percent(&self) -> f64 {
        if self.frames_with_touch == 0 {
            0.0
        } else {
            self.frames_suppressed as f64 * 100.0 / self.frames_with_touch as f64
        }
    }

    /// Human-readable summary.
    pub fn print_stats(&self, meta: &Meta, runtime: Option<Duration>, mut w: impl Write) -> io::Result<()> {
        writeln!(w, "--- touch-track status ---")?;
        writeln!(w, "Configuration: {} ({:?})", meta.config_source, meta.layout)?;
        writeln!(
            w,
            "Log All Frames (--log-all-frames): {}",
            if meta.log_all_frames { "Active" } else { "Inactive" }
        )?;
        if meta.log_interval_us > 0 {
            writeln!(
                w,
                "Periodic Log Interval (--log-interval): every {}",
                format_duration(Duration::from_micros(meta.log_interval_us))
            )?;
        } else {
            writeln!(w, "Periodic Log Interval (--log-interval): Disabled")?;
        }

        writeln!(w, "\n--- Overall Statistics ---")?;
        writeln!(w, "Frames Processed:   {}", self.frames_processed)?;
        writeln!(w, "Frames With Touch:  {}", self.frames_with_touch)?;
        writeln!(
            w,
            "Frames Suppressed:  {} ({:.2}%)",
            self.frames_suppressed,
            self.suppressed_percent()
        )?;
        writeln!(w, "Points In / Out:    {} / {}", self.points_in, self.points_emitted)?;
        writeln!(w, "Peak Fingers:       {}", self.peak_fingers)?;
        writeln!(w, "Resets:             {}", self.resets)?;
        writeln!(w, "Reset-Mask Tokens:  {}", self.reset_mask_tokens)?;
        writeln!(w, "Near Frames:        {}", self.near_frames)?;
        if let Some(rt) = runtime {
            writeln!(w, "Runtime:            {}", format_duration(rt))?;
        }

        if self.frames_processed > 0 {
            writeln!(w, "\n--- Frames Per Emitted Finger Count ---")?;
            for (n, &count) in self.finger_histogram.iter().enumerate() {
                if count > 0 {
                    writeln!(w, "  {n:>2} finger(s): {count}")?;
                }
            }
        }
        writeln!(w, "--------------------------")
    }

    /// JSON summary; `runtime` is omitted from periodic dumps.
    pub fn print_stats_json(&self, meta: &Meta, runtime: Option<Duration>, mut w: impl Write) -> io::Result<()> {
        #[derive(Serialize)]
        struct Output<'a> {
            meta: &'a Meta,
            stats: &'a StatsCollector,
            #[serde(skip_serializing_if = "Option::is_none")]
            runtime_us: Option<u64>,
        }
        let output = Output {
            meta,
            stats: self,
            runtime_us: runtime.map(|d| d.as_micros() as u64),
        };
        serde_json::to_writer_pretty(&mut w, &output).map_err(io::Error::from)?;
        writeln!(w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Layout;
    use crate::frame::TouchInfo;

    fn frame(candidates: usize, emitted: usize) -> FrameInfo {
        FrameInfo {
            index: 0,
            candidates,
            flags: candidates as u32,
            output: TouchInfo::with_points(&[(1, 1); POINT_MAX][..emitted], 0),
            reset: false,
            reset_mask: 0,
            near: false,
        }
    }

    fn meta() -> Meta {
        Meta {
            config_source: "<default>".into(),
            layout: Layout::Default,
            log_all_frames: false,
            log_interval_us: 0,
        }
    }

    #[test]
    fn counts_suppressed_and_peak() {
        let mut s = StatsCollector::new();
        s.record(&frame(2, 2));
        s.record(&frame(3, 0));
        s.record(&frame(0, 0));
        assert_eq!(s.frames_processed, 3);
        assert_eq!(s.frames_with_touch, 2);
        assert_eq!(s.frames_suppressed, 1);
        assert_eq!(s.points_in, 5);
        assert_eq!(s.points_emitted, 2);
        assert_eq!(s.peak_fingers, 2);
        assert_eq!(s.finger_histogram[0], 2);
        assert!((s.suppressed_percent() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn json_output_has_meta_and_stats() {
        let mut s = StatsCollector::new();
        let mut f = frame(1, 1);
        f.reset_mask = 0x55;
        s.record(&f);
        let mut out = Vec::new();
        s.print_stats_json(&meta(), Some(Duration::from_millis(3)), &mut out).unwrap();
        let v: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(v["stats"]["reset_mask_tokens"], 1);
        assert_eq!(v["meta"]["layout"]["kind"], "default");
        assert_eq!(v["runtime_us"], 3000);
    }

    #[test]
    fn human_output_mentions_totals() {
        let mut s = StatsCollector::new();
        s.record(&frame(1, 1));
        let mut out = Vec::new();
        s.print_stats(&meta(), None, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Frames Processed:   1"));
        assert!(text.contains("1 finger(s): 1"));
    }
}
