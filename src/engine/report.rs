// Panel-to-screen mapping and emission into the caller's frame.

use tracing::trace;

use super::Engine;
use crate::config::Config;
use crate::frame::TouchInfo;
use crate::point::Point;
use crate::{POINT_MAX, PR_DEEP};

const KEY_ENTRIES: usize = 8;
const MATCH_ONE: i64 = 4096;
const OUT_MASK: u16 = 0xfff;

/// `(min << 16) | max`, inclusive.
#[inline]
fn in_range(word: u32, v: i64) -> bool {
    (i64::from(word >> 16)..=i64::from(word & 0xffff)).contains(&v)
}

/// Looks a raw key coordinate up in the `{drv range, sen range, coord}`
/// table. The coordinate word holds `x` low and `y` high.
/// Range bounds are compared in panel units, before any screen scaling.
fn key_map(table: &[u32; KEY_ENTRIES * 3], x: i64, y: i64) -> Option<(i64, i64)> {
    table
        .chunks_exact(3)
        .find(|e| in_range(e[0], x) && in_range(e[1], y))
        .map(|e| (i64::from(e[2] & 0xffff), i64::from(e[2] >> 16)))
}

/// False when `v` falls in one of the `[top, bottom]` rejection bands. The
/// bottom band is a width from the far edge when it is at most half the
/// screen and an absolute limit otherwise.
fn outside_ignore(v: i64, band: [i32; 2], screen: i64) -> bool {
    let [top, bottom] = band.map(i64::from);
    if top == 0 && bottom == 0 {
        return true;
    }
    if v < top {
        return false;
    }
    if bottom <= screen / 2 && v > screen - bottom {
        return false;
    }
    if bottom >= screen / 2 && v > bottom {
        return false;
    }
    true
}

#[inline]
fn edge_clip(v: i64, low: u32, high: u32, screen: i64) -> i64 {
    let (low, high) = (i64::from(low), i64::from(high));
    let mut v = v;
    if v <= low {
        v = low + 1;
    }
    if v >= screen - high {
        v = screen - high - 1;
    }
    v
}

#[inline]
fn rematch(v: i64, m: [i32; 2]) -> i64 {
    (v - i64::from(m[1])).saturating_mul(i64::from(m[0])).saturating_add(MATCH_ONE / 2) / MATCH_ONE
}

/// Maps a reported point to screen coordinates, or `None` when the point
/// must not be emitted.
pub(crate) fn screen_resolution(cfg: &Config, p: Point) -> Option<(u16, u16)> {
    let (sx, sy) = (i64::from(cfg.screen_x_max), i64::from(cfg.screen_y_max));
    let (px, py) = (cfg.panel_x(), cfg.panel_y());
    let (mut x, mut y) = (i64::from(p.x()), i64::from(p.y()));

    if p.key() {
        if cfg.key_map_able & 1 != 0 {
            (x, y) = key_map(&cfg.key_range_array, x, y)?;
        } else {
            x = (x * sx / px).max(0);
            y = (y * sy / py).max(0);
        }
    } else {
        x = rematch(x, cfg.match_x).saturating_mul(sx) / px;
        y = rematch(y, cfg.match_y).saturating_mul(sy) / py;
        if !outside_ignore(y, cfg.ignore_y, sy) || !outside_ignore(x, cfg.ignore_x, sx) {
            return None;
        }
        y = edge_clip(y, cfg.edge_cut[2], cfg.edge_cut[3], sy);
        x = edge_clip(x, cfg.edge_cut[0], cfg.edge_cut[1], sx);
        let flags = cfg.global_flag;
        if flags.opposite_x() {
            x = sx - x;
        }
        if flags.opposite_y() {
            y = sy - y;
        }
        if flags.opposite_xy() {
            std::mem::swap(&mut x, &mut y);
        }
    }
    Some((x as u16 & OUT_MASK, y as u16 & OUT_MASK))
}

impl Engine {
    /// Emits every able slot into `info` and records the smoothed pressure
    /// per emitted index.
    pub(super) fn point_report(&mut self, info: &mut TouchInfo) {
        self.pressure_out = [0; POINT_MAX];
        let max = self.config.point_num_max as usize;
        if self.point_num > max && self.config.global_flag.over_report_mask() {
            trace!(fingers = self.point_num, max, "Over-report, frame suppressed");
            self.point_num = 0;
            info.finger_num = 0;
            return;
        }

        let mut num = 0;
        for i in 0..POINT_MAX {
            let d = self.delay[i];
            if !d.able || usize::from(d.report) >= PR_DEEP {
                continue;
            }
            let p = self.hist.pr(usize::from(d.report), i);
            let id = p.id() as usize;
            if id == 0 || id > max {
                continue;
            }
            let Some((x, y)) = screen_resolution(&self.config, p) else {
                continue;
            };
            info.x[num] = x;
            info.y[num] = y;
            info.id[num] = id as u16;
            self.pressure_out[num] = self.pressure_report[i];
            num += 1;
        }
        self.point_num = num;
        info.finger_num = num as u32;
    }
}
