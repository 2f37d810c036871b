// Raw candidate conditioning: calibration-table correction, edge stretch
// and merging of near-coincident candidates. These run on `point_now`
// before the history rings are advanced.

use super::{Engine, NEAR_HOLD};
use crate::config::Config;
use crate::point::{Point, FLAG_ABLE, FLAG_COOR, FLAG_KEY};
use crate::POINT_MAX;

/// Points closer than this to a panel border skip table correction.
const EDGE_SIZE: i64 = 64;
const SEGMENTS: usize = 4;

const REPEAT_NEAR_DEFAULT: i64 = 96;
const REPEAT_DEFAULT: i64 = 32;

/// Applies one 64-entry correction table. `variant` selects the remap rule
/// (0: mirrored 32-step, 1: mirrored 64-step, 2: plain 64-step); unknown
/// variants leave the coordinate alone.
fn cco(x: u32, coe: &[u32; 64], variant: u32) -> Option<u32> {
    let v = match variant {
        0 if x & 32 != 0 => (x & !31) + (31 - (coe[(31 - (x & 31)) as usize] & 31)),
        0 => (x & !31) + (coe[(x & 31) as usize] & 31),
        1 if x & 64 != 0 => (x & !63) + (63 - (coe[(63 - (x & 63)) as usize] & 63)),
        1 => (x & !63) + (coe[(x & 63) as usize] & 63),
        2 => (x & !63) + (coe[(x & 63) as usize] & 63),
        _ => return None,
    };
    Some(v)
}

/// Per-axis table selection from up to four `{range: low16, group: high16}`
/// segment descriptors.
struct Segments<'a> {
    ranges: [u32; SEGMENTS],
    /// Index 0 is the default table; the rest are the referenced groups in
    /// descriptor order.
    tables: [Option<&'a [u32; 64]>; SEGMENTS + 1],
}

impl<'a> Segments<'a> {
    fn new(descriptors: &[u32; SEGMENTS], default: &'a [u32; 64], groups: &'a [[u32; 64]; 4]) -> Self {
        let mut tables = [None; SEGMENTS + 1];
        tables[0] = Some(default);
        let mut n = 1;
        for &d in descriptors {
            let (range, group) = (d & 0xffff, (d >> 16) as usize);
            if range != 0 && group < SEGMENTS {
                tables[n] = Some(&groups[group]);
                n += 1;
            }
        }
        Segments {
            ranges: descriptors.map(|d| d & 0xffff),
            tables,
        }
    }

    fn table_for(&self, v: u32) -> Option<&'a [u32; 64]> {
        (0..=SEGMENTS)
            .find(|&j| {
                j >= SEGMENTS || self.tables[j + 1].is_none() || self.ranges[j] == 0 || v < self.ranges[j]
            })
            .and_then(|j| self.tables[j])
    }

    /// Corrected coordinate, or `None` when `v` lies in the border band.
    fn correct(&self, v: u32, panel: i64, variant: u32) -> Option<u32> {
        let vi = i64::from(v);
        if vi < EDGE_SIZE || vi > panel - EDGE_SIZE {
            return None;
        }
        self.table_for(v).and_then(|t| cco(v, t, variant))
    }
}

#[derive(Clone, Copy, Default)]
struct Stage {
    range: i64,
    coe: i64,
}

/// The four edge profiles with ranges in panel units.
struct Stretch {
    up: [Stage; 4],
    down: [Stage; 4],
    left: [Stage; 4],
    right: [Stage; 4],
}

impl Stretch {
    fn from_config(cfg: &Config) -> Self {
        let edge = |e: usize| -> [Stage; 4] {
            let mut s = [Stage::default(); 4];
            for (i, st) in s.iter_mut().enumerate() {
                st.range = i64::from(cfg.stretch_array[e * 8 + i * 2] as i32);
                st.coe = i64::from(cfg.stretch_array[e * 8 + i * 2 + 1] as i32);
            }
            s
        };
        let mut s = Stretch {
            up: edge(0),
            down: edge(1),
            left: edge(2),
            right: edge(3),
        };

        // Ranges given in screen units are converted to panel units; down
        // and right are then measured from the far border.
        let (sx, sy) = (i64::from(cfg.screen_x_max), i64::from(cfg.screen_y_max));
        let in_screen_units = (0..4).any(|i| s.right[i].range > sy * 64 / 128 || s.down[i].range > sx * 64 / 128);
        if in_screen_units {
            let (px, py) = (cfg.panel_x(), cfg.panel_y());
            for i in 0..4 {
                if s.up[i].range != 0 {
                    s.up[i].range = s.up[i].range.saturating_mul(px) / sx;
                }
                if s.down[i].range != 0 {
                    s.down[i].range = (sx - s.down[i].range).saturating_mul(px) / sx;
                }
                if s.left[i].range != 0 {
                    s.left[i].range = s.left[i].range.saturating_mul(py) / sy;
                }
                if s.right[i].range != 0 {
                    s.right[i].range = (sy - s.right[i].range).saturating_mul(py) / sy;
                }
            }
        }
        s
    }
}

/// Walks one profile from distance `d` to its border and returns the
/// stretched distance.
fn stretch_edge(stages: &[Stage; 4], d: i64) -> i64 {
    let mut pull = 0;
    let mut at = d;
    for s in stages {
        if s.range == 0 {
            break;
        }
        if at < s.range {
            pull = (s.range - at).saturating_mul(s.coe) / 128 + pull;
            at = s.range;
        }
    }
    at - pull
}

#[inline]
fn clamp_panel(v: i64, panel: i64) -> i64 {
    if v <= 0 {
        1
    } else if v >= panel {
        panel - 1
    } else {
        v
    }
}

impl Engine {
    pub(super) fn coordinate_correct(&mut self) {
        let cfg = &self.config;
        if cfg.coordinate_correct_able & 0xf == 0 {
            return;
        }
        let sx = Segments::new(&cfg.multi_x_array, &cfg.coordinate_correct_coe_x, &cfg.multi_group);
        let sy = Segments::new(&cfg.multi_y_array, &cfg.coordinate_correct_coe_y, &cfg.multi_group);
        let vx = (cfg.coordinate_correct_able >> 4) & 0xf;
        let vy = (cfg.coordinate_correct_able >> 8) & 0xf;
        let (px, py) = (cfg.panel_x(), cfg.panel_y());

        for p in self.point_now.iter_mut().take(self.point_num) {
            if p.is_empty() {
                break;
            }
            if p.key() {
                continue;
            }
            if let Some(x) = sx.correct(p.x(), px, vx) {
                p.set_x(x);
            }
            if let Some(y) = sy.correct(p.y(), py, vy) {
                p.set_y(y);
            }
        }
    }

    pub(super) fn point_edge(&mut self) {
        let cfg = &self.config;
        if cfg.screen_x_max == 0 || cfg.screen_y_max == 0 {
            return;
        }
        let s = Stretch::from_config(cfg);
        let (px, py) = (cfg.panel_x(), cfg.panel_y());

        for p in self.point_now.iter_mut() {
            if p.is_empty() || p.key() {
                continue;
            }
            let mut y = clamp_panel(stretch_edge(&s.left, i64::from(p.y())), py);
            y = clamp_panel(py - stretch_edge(&s.right, py - y), py);
            let mut x = clamp_panel(stretch_edge(&s.up, i64::from(p.x())), px);
            x = clamp_panel(px - stretch_edge(&s.down, px - x), px);
            p.set_x(x as u32);
            p.set_y(y as u32);
        }
    }

    fn repeat_radius(&self) -> i64 {
        let [normal, near] = self.config.point_repeat.map(i64::from);
        match (normal == 0 || near == 0, self.point_near != 0) {
            (true, true) => REPEAT_NEAR_DEFAULT,
            (true, false) => REPEAT_DEFAULT,
            (false, true) => near,
            (false, false) => normal,
        }
    }

    pub(super) fn point_repeat(&mut self) {
        self.point_near = self.point_near.saturating_sub(1);
        if self.prev_num > self.point_num {
            self.point_near = NEAR_HOLD;
        }
        let r = self.repeat_radius();

        let mut i = 0;
        while i < POINT_MAX {
            let a = self.point_now[i];
            if a.is_empty() {
                i += 1;
                continue;
            }
            let (ax, ay) = (i64::from(a.x()), i64::from(a.y()));
            let hit = (i + 1..POINT_MAX).find(|&j| {
                let b = self.point_now[j];
                !b.is_empty() && (i64::from(b.x()) - ax).abs() < r && (i64::from(b.y()) - ay).abs() < r
            });
            match hit {
                Some(j) => {
                    let b = self.point_now[j];
                    let mut merged = a;
                    merged.set_x((a.x() + b.x() + 1) / 2);
                    merged.set_y((a.y() + b.y() + 1) / 2);
                    self.point_now[i] = merged;
                    self.point_now[j] = Point::EMPTY;
                    self.point_near = NEAR_HOLD;
                    // The merged point may now overlap another candidate.
                }
                None => i += 1,
            }
        }
    }

    /// Advances the rings and compacts `point_now` (with its pressures) to
    /// the front, dropping emptied candidates.
    pub(super) fn point_pointer(&mut self) {
        self.hist.advance();
        let mut n = 0;
        for i in 0..POINT_MAX {
            let p = self.point_now[i].masked(FLAG_COOR | FLAG_KEY | FLAG_ABLE);
            if !p.is_empty() {
                self.point_now[n] = p;
                self.pressure_now[n] = self.pressure_now[i];
                n += 1;
            }
        }
        self.point_now[n..].fill(Point::EMPTY);
        self.pressure_now[n..].fill(0);
        self.point_num = n;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> [u32; 64] {
        let mut t = [0u32; 64];
        for (i, v) in t.iter_mut().enumerate() {
            *v = i as u32;
        }
        t
    }

    #[test]
    fn cco_identity_table_is_noop() {
        let t = identity();
        for x in [64u32, 100, 127, 500, 959] {
            assert_eq!(cco(x, &t, 0), Some(x));
            assert_eq!(cco(x, &t, 1), Some(x));
            assert_eq!(cco(x, &t, 2), Some(x));
        }
        assert_eq!(cco(100, &t, 7), None);
    }

    #[test]
    fn cco_plain_variant_uses_low_bits() {
        let mut t = [0u32; 64];
        t[4] = 10;
        // 196 = 3*64 + 4
        assert_eq!(cco(196, &t, 2), Some(192 + 10));
    }

    #[test]
    fn segment_picks_group_below_range() {
        let default = identity();
        let mut groups = [[0u32; 64]; 4];
        groups[2] = [5; 64];
        let s = Segments::new(&[300 | (2 << 16), 0, 0, 0], &default, &groups);
        // Below the first range: default table.
        assert_eq!(s.correct(200, 1024, 2), Some(200));
        // At or above it: the group table.
        assert_eq!(s.correct(320, 1024, 2), Some(320 + 5));
        // Border band is left alone.
        assert_eq!(s.correct(40, 1024, 2), None);
        assert_eq!(s.correct(990, 1024, 2), None);
    }

    #[test]
    fn stretch_pulls_toward_border() {
        let stages = [
            Stage { range: 100, coe: 64 },
            Stage::default(),
            Stage::default(),
            Stage::default(),
        ];
        // (100 - 40) * 64 / 128 = 30 pulled from the clamped distance 100.
        assert_eq!(stretch_edge(&stages, 40), 70);
        assert_eq!(stretch_edge(&stages, 150), 150);
    }
}
