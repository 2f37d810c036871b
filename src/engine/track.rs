// Identity tracking: per-slot prediction, nearest-neighbour matching of the
// new candidates against the predictions, allocation of fresh IDs, slot
// ordering and the crossing fix.

use super::Engine;
use crate::point::{Point, FLAG_ABLE, FLAG_COOR, FLAG_ID, FLAG_KEY, ID_NEW};
use crate::POINT_MAX;

const DIST_NONE: u32 = 0x7fff_ffff;

/// New IDs go only to slots idle for more than this many frames.
const ID_IDLE_MIN: usize = 2;

#[inline]
fn two_tap(p1: u32, p2: u32) -> u32 {
    (p1 * 2).saturating_sub(p2).min(0xfff)
}

#[inline]
fn three_tap(p1: u32, p2: u32, p3: u32) -> u32 {
    ((p1 * 5 + p3).saturating_sub(p2 * 4) / 2).min(0xfff)
}

/// Speed-gate multiplier for a slot whose last step covered squared
/// distance `d`: 8 for a still slot, falling by one per doubling of `d`
/// above `0x200`.
fn speed_bucket(d: u32) -> u32 {
    let k = (1..=8u32).rev().find(|&k| d > 0x100 << k).unwrap_or(0);
    8 - k
}

/// Candidate-by-slot squared distances; consumed entries read as `DIST_NONE`.
struct DistanceMatrix {
    d: [[u32; POINT_MAX]; POINT_MAX],
}

impl DistanceMatrix {
    fn new() -> Self {
        DistanceMatrix {
            d: [[DIST_NONE; POINT_MAX]; POINT_MAX],
        }
    }

    /// Smallest remaining entry as `(candidate, slot, distance)`, first in
    /// candidate-major order on ties.
    fn min(&self) -> Option<(usize, usize, u32)> {
        let mut best: Option<(usize, usize, u32)> = None;
        for (j, row) in self.d.iter().enumerate() {
            for (i, &v) in row.iter().enumerate() {
                if v < best.map_or(DIST_NONE, |b| b.2) {
                    best = Some((j, i, v));
                }
            }
        }
        best
    }

    fn consume(&mut self, j: usize, i: usize) {
        self.d[j] = [DIST_NONE; POINT_MAX];
        for row in self.d.iter_mut() {
            row[i] = DIST_NONE;
        }
    }
}

#[inline]
fn flipped(now_a: u32, now_b: u32, prev_a: u32, prev_b: u32) -> bool {
    (now_a < now_b && prev_a > prev_b) || (now_a > now_b && prev_a < prev_b)
}

impl Engine {
    /// Writes each slot's expected position into `pp[0]`.
    pub(super) fn point_predict(&mut self) {
        for i in 0..POINT_MAX {
            let (p1, p2, p3) = (self.hist.pp(1, i), self.hist.pp(2, i), self.hist.pp(3, i));
            let mut p0 = if p1.is_empty() {
                Point::SENTINEL
            } else if p2.is_empty() || p2.fill() || p3.fill() {
                p1.masked(FLAG_COOR)
            } else if p3.is_empty() {
                let mut p = Point::new(two_tap(p1.x(), p2.x()), two_tap(p1.y(), p2.y()));
                p.set_predict(true);
                p
            } else {
                let mut p = Point::new(
                    three_tap(p1.x(), p2.x(), p3.x()),
                    three_tap(p1.y(), p2.y(), p3.y()),
                );
                p.set_predict(true);
                p
            };
            if p1.key() {
                p0.set_key(true);
            }
            *self.hist.pp_mut(0, i) = p0;
        }
    }

    /// Greedy nearest-neighbour matching of candidates to predicted slots.
    pub(super) fn point_id(&mut self) {
        let cfg = &self.config;
        let mut speed = [0u32; POINT_MAX];
        for (i, s) in speed.iter_mut().enumerate() {
            let (p0, p1) = (self.hist.pp(0, i), self.hist.pp(1, i));
            *s = if !p0.predict() || p1.fill() {
                cfg.id_first_coe
            } else {
                speed_bucket(p1.distance(p0))
            };
        }

        let mut dist = DistanceMatrix::new();
        for i in 0..POINT_MAX {
            let p0 = self.hist.pp(0, i);
            if p0 == Point::SENTINEL {
                continue;
            }
            for j in 0..self.point_num {
                dist.d[j][i] = self.point_now[j].distance(p0);
            }
        }
        if self.point_num == 0 {
            return;
        }

        if self.point_only {
            if let Some((j, _, _)) = dist.min() {
                self.point_now[j].set_id(1);
                self.point_now[0] = self.point_now[j];
                self.pressure_now[0] = self.pressure_now[j];
            }
            self.point_num = 1;
            return;
        }

        for _ in 0..self.point_num {
            let Some((j, i, min)) = dist.min() else {
                break;
            };
            let gate = u64::from(cfg.id_static_coe) + u64::from(speed[i]) * u64::from(cfg.id_speed_coe);
            if u64::from(min) >= gate {
                // Left unmasked: the remaining candidates fall through to
                // new-ID allocation as well.
                self.point_now[j].set_id(ID_NEW);
                continue;
            }
            self.point_now[j].set_id(i as u32 + 1);
            dist.consume(j, i);
        }
    }

    /// Gives unmatched candidates the lowest ID that is unused this frame
    /// and whose slot has been idle long enough.
    pub(super) fn point_new_id(&mut self) {
        for j in 0..self.point_num {
            let id = self.point_now[j].id();
            if id != 0 && id != ID_NEW {
                continue;
            }
            let free = (1..=POINT_MAX as u32).find(|&id| {
                self.point_now.iter().all(|p| p.id() != id) && self.hist.clear_len(id as usize - 1) > ID_IDLE_MIN
            });
            let Some(id) = free else {
                continue;
            };
            if self.point_now[j].able() {
                continue;
            }
            self.point_now[j].set_id(id);
        }
    }

    /// Builds `pp[0]` indexed by ID from the matched candidates.
    pub(super) fn point_order(&mut self) {
        let placeholders = self.filter_active();
        for i in 0..POINT_MAX {
            let p = self.hist.pp_mut(0, i);
            if placeholders {
                p.set_id(i as u32 + 1);
                p.set_fill(true);
            } else {
                *p = Point::EMPTY;
            }
        }
        for n in 0..self.point_num {
            let id = self.point_now[n].id() as usize;
            if id == 0 || id > POINT_MAX {
                continue;
            }
            *self.hist.pp_mut(0, id - 1) = self.point_now[n].masked(FLAG_ID | FLAG_COOR | FLAG_KEY | FLAG_ABLE);
            *self.hist.pa_mut(0, id - 1) = self.pressure_now[n];
        }
        // A placeholder survives one frame only.
        for i in 0..POINT_MAX {
            if !self.hist.pp(0, i).fill() {
                continue;
            }
            let p1 = self.hist.pp(1, i);
            if p1.is_empty() || p1.fill() {
                *self.hist.pp_mut(0, i) = Point::EMPTY;
            }
        }
    }

    /// Swaps the positions of two slots whose trajectories crossed on both
    /// axes since the previous frame.
    pub(super) fn point_cross(&mut self) {
        for j in 0..POINT_MAX {
            for i in j + 1..POINT_MAX {
                let (a0, b0) = (self.hist.pp(0, j), self.hist.pp(0, i));
                let (a1, b1) = (self.hist.pp(1, j), self.hist.pp(1, i));
                if a0.is_empty() || b0.is_empty() || a1.is_empty() || b1.is_empty() {
                    continue;
                }
                if flipped(a0.x(), b0.x(), a1.x(), b1.x()) && flipped(a0.y(), b0.y(), a1.y(), b1.y()) {
                    let (mut na, mut nb) = (a0, b0);
                    na.set_x(b0.x());
                    na.set_y(b0.y());
                    nb.set_x(a0.x());
                    nb.set_y(a0.y());
                    *self.hist.pp_mut(0, j) = na;
                    *self.hist.pp_mut(0, i) = nb;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taps_saturate() {
        assert_eq!(two_tap(100, 90), 110);
        assert_eq!(two_tap(10, 50), 0);
        assert_eq!(two_tap(0xff0, 0x100), 0xfff);
        // (5*100 + 80 - 4*90) / 2 = 110
        assert_eq!(three_tap(100, 90, 80), 110);
        assert_eq!(three_tap(0, 500, 0), 0);
    }

    #[test]
    fn speed_bucket_shrinks_with_distance() {
        assert_eq!(speed_bucket(0), 8);
        assert_eq!(speed_bucket(0x200), 8);
        assert_eq!(speed_bucket(0x201), 7);
        assert_eq!(speed_bucket(0x401), 6);
        assert_eq!(speed_bucket(u32::MAX), 0);
    }

    #[test]
    fn matrix_min_prefers_first_candidate_on_tie() {
        let mut m = DistanceMatrix::new();
        m.d[0][1] = 200;
        m.d[1][0] = 200;
        assert_eq!(m.min(), Some((0, 1, 200)));
        m.consume(0, 1);
        assert_eq!(m.min(), Some((1, 0, 200)));
        m.consume(1, 0);
        assert_eq!(m.min(), None);
    }

    #[test]
    fn cross_fix_is_self_inverse() {
        let mut e = Engine::with_config(crate::Config::default());
        *e.hist.pp_mut(1, 0) = Point::from_raw(100, 100, 1);
        *e.hist.pp_mut(1, 1) = Point::from_raw(200, 200, 2);
        *e.hist.pp_mut(0, 0) = Point::from_raw(210, 210, 1);
        *e.hist.pp_mut(0, 1) = Point::from_raw(90, 90, 2);

        e.point_cross();
        let fixed = (e.hist.pp(0, 0), e.hist.pp(0, 1));
        assert_eq!((fixed.0.x(), fixed.0.y(), fixed.0.id()), (90, 90, 1));
        assert_eq!((fixed.1.x(), fixed.1.y(), fixed.1.id()), (210, 210, 2));

        // Already corrected: a second pass changes nothing.
        e.point_cross();
        assert_eq!((e.hist.pp(0, 0), e.hist.pp(0, 1)), fixed);
    }

    #[test]
    fn flip_requires_strict_order_change() {
        assert!(flipped(90, 210, 100, 50));
        assert!(!flipped(90, 90, 100, 50));
        assert!(!flipped(90, 210, 50, 100));
    }
}
