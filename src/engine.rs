// The point-tracking pipeline.
//
// `Engine` owns every piece of state the pipeline touches: the parsed
// configuration, the history rings, the per-slot delay/filter/shake/corner
// state, the reset-mask machine and the proximity detector. One call to
// `alg_id_main` runs every stage in order on one controller interrupt.
// Nothing is allocated after construction.

mod correct;
mod delay;
mod history;
mod near;
mod pressure;
mod report;
mod reset_mask;
mod smooth;
mod track;


use tracing::{debug, trace};

use crate::config::{Config, Layout};
use crate::frame::TouchInfo;
use crate::point::Point;
use crate::POINT_MAX;

use delay::Delay;
use history::History;
use near::Near;
use reset_mask::ResetMask;
use smooth::Corner;

/// `finger_num` bits 0..7: candidate count.
pub const FINGER_COUNT_MASK: u32 = 0xff;
/// Zero every history before processing this frame.
pub const FLAG_RESET: u32 = 1 << 8;
/// Reset unless a reset is already in progress.
pub const FLAG_RESET_ONCE: u32 = 1 << 9;
/// Track a single finger only.
pub const FLAG_SINGLE_TOUCH: u32 = 1 << 10;
/// The `id` fields carry pressure instead of identifiers.
pub const FLAG_PRESSURE: u32 = 1 << 11;
/// Proximity counts come from an AC-coupled measurement.
pub const FLAG_NEAR_AC: u32 = 1 << 12;
/// `finger_num` bits 16..31: raw proximity count.
pub const NEAR_SHIFT: u32 = 16;

/// Repeat suppression stays in its wide "near" mode for this many frames
/// after a merge or a drop in finger count.
const NEAR_HOLD: u32 = 8;

/// Multi-touch tracking engine for one touchscreen.
#[derive(Clone, Debug)]
pub struct Engine {
    config: Config,
    layout: Layout,
    hist: History,
    point_now: [Point; POINT_MAX],
    pressure_now: [u32; POINT_MAX],
    pressure_report: [u32; POINT_MAX],
    /// Smoothed pressure per emitted index of the last report.
    pressure_out: [u32; POINT_MAX],
    delay: [Delay; POINT_MAX],
    filter_deep: [usize; POINT_MAX],
    shake: [bool; POINT_MAX],
    corner: [Corner; POINT_MAX],
    reset_mask: ResetMask,
    near: Near,
    inte_count: u32,
    point_num: usize,
    prev_num: usize,
    point_near: u32,
    point_reset: bool,
    point_only: bool,
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new()
    }
}

impl Engine {
    /// Engine running the built-in default configuration.
    #[must_use]
    pub fn new() -> Self {
        Engine::from_parts(Config::default(), Layout::Default)
    }

    /// Engine running an already-built configuration.
    #[must_use]
    pub fn with_config(config: Config) -> Self {
        Engine::from_parts(config, Layout::Default)
    }

    /// Engine initialised from a controller blob, as `data_init` would.
    #[must_use]
    pub fn from_words(words: &[u32]) -> Self {
        let (config, layout) = Config::from_words(words);
        Engine::from_parts(config, layout)
    }

    fn from_parts(config: Config, layout: Layout) -> Self {
        Engine {
            config,
            layout,
            hist: History::default(),
            point_now: [Point::EMPTY; POINT_MAX],
            pressure_now: [0; POINT_MAX],
            pressure_report: [0; POINT_MAX],
            pressure_out: [0; POINT_MAX],
            delay: [Delay::default(); POINT_MAX],
            filter_deep: [0; POINT_MAX],
            shake: [false; POINT_MAX],
            corner: [Corner::Unknown; POINT_MAX],
            reset_mask: ResetMask::default(),
            near: Near::default(),
            inte_count: 0,
            point_num: 0,
            prev_num: 0,
            point_near: 0,
            point_reset: true,
            point_only: false,
        }
    }

    /// Applies a configuration blob (or the defaults for `None`) and zeroes
    /// every piece of tracking state.
    pub fn data_init(&mut self, conf: Option<&[u32]>) {
        let (config, layout) = match conf {
            Some(words) => Config::from_words(words),
            None => (Config::default(), Layout::Default),
        };
        debug!(
            ?layout,
            drv = config.drv_num_nokey,
            sen = config.sen_num_nokey,
            valid = config.geometry_valid(),
            "Engine initialised"
        );
        *self = Engine::from_parts(config, layout);
    }

    /// Runs the full pipeline for one interrupt, rewriting `info` in place
    /// with the emitted points.
    pub fn alg_id_main(&mut self, info: &mut TouchInfo) {
        let flags = info.finger_num;
        if flags & FLAG_RESET != 0 || (flags & FLAG_RESET_ONCE != 0 && !self.point_reset) {
            debug!(flags, "In-band reset, clearing histories");
            self.reset_tracking();
        }
        if flags & (FLAG_RESET | FLAG_RESET_ONCE) == 0 {
            self.point_reset = false;
        }
        self.point_only = flags & FLAG_SINGLE_TOUCH != 0;
        self.inte_count = self.inte_count.wrapping_add(1);

        let count = ((flags & FINGER_COUNT_MASK) as usize).min(POINT_MAX);
        for (i, p) in self.point_now.iter_mut().enumerate() {
            *p = if i < count {
                Point::from_raw(info.x[i], info.y[i], info.id[i])
            } else {
                Point::EMPTY
            };
        }
        if !self.config.geometry_valid() {
            trace!("Invalid panel geometry, frame dropped");
            self.point_num = 0;
            info.finger_num = 0;
            return;
        }

        if self.config.global_flag.c2f_able() {
            self.near
                .update(flags, self.inte_count, self.config.near_set);
        }
        self.pressure_save(flags & FLAG_PRESSURE != 0);
        self.point_num = count;

        self.coordinate_correct();
        self.point_edge();
        self.point_repeat();
        self.point_num = self.point_now.iter().filter(|p| !p.is_empty()).count();
        self.point_pointer();

        self.point_predict();
        self.point_id();
        self.point_new_id();
        self.point_order();
        self.point_cross();
        self.point_num = self.hist.live_now();
        self.prev_num = self.point_num;

        self.reset_mask_step();
        self.shake_smooth();
        self.point_diagonal();
        self.point_filter();
        self.point_delay();
        self.point_pressure();
        self.point_report(info);
    }

    /// Alias of [`Engine::alg_id_main`].
    #[inline]
    pub fn run(&mut self, info: &mut TouchInfo) {
        self.alg_id_main(info);
    }

    /// Takes the pending reset-mask token, if any. Returns 0 when nothing
    /// is pending; a token is returned exactly once.
    pub fn mask_tiaoping(&mut self) -> u32 {
        self.reset_mask.take()
    }

    /// 1 while the proximity detector reports an object near the panel.
    pub fn touch_near(&self) -> u32 {
        u32::from(self.near.is_near())
    }

    /// Clamped pressure per emitted index of the last report: 0 for no
    /// pressure or no finger, otherwise `raw - 7` clamped to `1..=63`.
    pub fn report_pressure(&self, out: &mut [u32; POINT_MAX]) {
        for (i, o) in out.iter_mut().enumerate() {
            *o = if i >= self.point_num {
                0
            } else {
                match self.pressure_out[i] {
                    0 => 0,
                    p if p <= 7 => 1,
                    p if p > 63 + 7 => 63,
                    p => p - 7,
                }
            };
        }
    }

    /// Algorithm version tag.
    pub fn version_id(&self) -> u32 {
        crate::version_id()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Number of fingers emitted by the last call.
    pub fn point_num(&self) -> usize {
        self.point_num
    }

    pub fn inte_count(&self) -> u32 {
        self.inte_count
    }

    /// Whether repeat suppression is currently using its wide radius.
    pub fn is_near_mode(&self) -> bool {
        self.point_near != 0
    }

    /// Zeroes histories and per-slot state; configuration and the
    /// proximity detector are untouched.
    fn reset_tracking(&mut self) {
        self.hist.clear();
        self.delay = [Delay::default(); POINT_MAX];
        self.filter_deep = [0; POINT_MAX];
        self.shake = [false; POINT_MAX];
        self.corner = [Corner::Unknown; POINT_MAX];
        self.reset_mask.clear();
        self.prev_num = 0;
        self.point_near = 0;
        self.point_reset = true;
    }

    /// Temporal filter state is kept (and placeholders synthesised) only
    /// for the fixed and adaptive filter modes.
    #[inline]
    fn filter_active(&self) -> bool {
        !(0..=1).contains(&self.config.filter_able)
    }
}
