// Motion smoothing stages: the shake dead zone with its piecewise
// attenuation curve, diagonal corner compression, and the temporal filter.

use super::history::History;
use super::Engine;
use crate::config::Config;
use crate::point::Point;
use crate::util::isqrt;
use crate::{POINT_MAX, PR_DEEP, PS_DEEP};

const SHAKE_STAGES: usize = 8;
const FILTER_TAPS: usize = 8;
const FILTER_LEVELS: usize = 4;

/// Per-slot diagonal corner state, decided on the first frame a slot is
/// live and kept until the slot empties.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) enum Corner {
    #[default]
    Unknown,
    /// Not in a corner, or left the compression zone.
    Outside,
    /// Top-left or bottom-right corner.
    Main,
    /// Bottom-left or top-right corner.
    Anti,
}

/// `{dis, coe}` attenuation curve from `shake_all_array`.
struct ShakeCurve {
    len: usize,
    dis: [i64; SHAKE_STAGES],
    coe: [i64; SHAKE_STAGES],
}

impl ShakeCurve {
    fn from_config(cfg: &Config) -> Self {
        let mut c = ShakeCurve {
            len: SHAKE_STAGES,
            dis: [0; SHAKE_STAGES],
            coe: [0; SHAKE_STAGES],
        };
        for i in 0..SHAKE_STAGES {
            c.dis[i] = i64::from(cfg.shake_all_array[i * 2] as i32);
            c.coe[i] = i64::from(cfg.shake_all_array[i * 2 + 1] as i32);
        }
        if let Some(n) = c.dis.iter().position(|&d| d == 0) {
            c.len = n;
        }
        c
    }
}

/// Moves `s1` toward `p0` by `num / den` of the way, writing the result
/// into `out`'s coordinates.
#[inline]
fn interpolate(out: &mut Point, s1: Point, p0: Point, num: i64, den: i64) {
    let step = |a: u32, b: u32| -> u32 {
        let a = i64::from(a);
        let v = a.saturating_add((i64::from(b) - a).saturating_mul(num) / den.max(1));
        v.clamp(0, 0xfff) as u32
    };
    out.set_x(step(s1.x(), p0.x()));
    out.set_y(step(s1.y(), p0.y()));
}

#[inline]
fn hold_position(out: &mut Point, s1: Point) {
    out.set_x(s1.x());
    out.set_y(s1.y());
}

fn seed_ps(hist: &mut History, i: usize) {
    let p = hist.ps(0, i);
    for j in 1..PS_DEEP {
        *hist.ps_mut(j, i) = p;
    }
}

fn diagonal_distance(sen: i64, drv: i64, x: i64, y: i64, corner: Corner) -> i64 {
    let divisor = (sen.saturating_mul(sen).saturating_add(drv.saturating_mul(drv)) / 16).max(1);
    let (sx, dy) = (sen.saturating_mul(x), drv.saturating_mul(y));
    let square = match corner {
        Corner::Anti => sx.saturating_add(dy).saturating_sub(sen.saturating_mul(drv).saturating_mul(64)) / 4,
        _ => sx.saturating_sub(dy) / 4,
    };
    square.saturating_mul(square) / divisor
}

/// Squeezes the perpendicular-to-diagonal component of `(x, y)`. Returns
/// the new coordinates clamped to the panel.
fn diagonal_compress(sen: i64, drv: i64, x: i64, y: i64, corner: Corner, dis: i64, size: i64) -> (i64, i64) {
    let size = size.max(1);
    let coe = if dis > size {
        ((dis - size).saturating_mul(128) / size.saturating_mul(3)).saturating_add(128)
    } else {
        128
    }
    .min(256);
    let (sen, drv) = (sen.max(1), drv.max(1));
    let (px, py) = (drv.saturating_mul(64), sen.saturating_mul(64));
    let anti = corner == Corner::Anti;
    let y = if anti { py - y } else { y };
    let (tx, ty) = (x.saturating_mul(sen), y.saturating_mul(drv));
    let sum = tx.saturating_add(ty);
    let mut x = sum.saturating_add(tx.saturating_sub(ty).saturating_mul(coe) / 256) / 2 / sen;
    let mut y = sum.saturating_add(ty.saturating_sub(tx).saturating_mul(coe) / 256) / 2 / drv;
    if anti {
        y = py - y;
    }
    (x.clamp(1, (px - 1).max(1)), y.clamp(1, (py - 1).max(1)))
}

/// Signed byte coefficients of the fixed filter: `ps` taps from words 0..2,
/// `pr` taps from words 2..4.
fn fixed_coefficients(words: &[u32; 4]) -> ([i32; FILTER_TAPS], [i32; FILTER_TAPS]) {
    let byte = |w: u32, i: usize| i32::from((w >> ((i % 4) * 8)) as u8 as i8);
    let mut ps_c = [0; FILTER_TAPS];
    let mut pr_c = [0; FILTER_TAPS];
    for i in 0..FILTER_TAPS {
        ps_c[i] = byte(words[i / 4], i);
        pr_c[i] = byte(words[i / 4 + 2], i);
    }
    (ps_c, pr_c)
}

/// Eight-tap mix of the smoothed and reported histories into `pr[0]`.
fn filter_one(hist: &mut History, i: usize, ps_c: &[i32; FILTER_TAPS], pr_c: &[i32; FILTER_TAPS], den: i64) {
    let now = hist.ps(0, i);
    *hist.pr_mut(0, i) = now;
    if now.is_empty() || den <= 0 {
        return;
    }
    let (mut x, mut y) = (0i64, 0i64);
    for j in 0..FILTER_TAPS {
        let (r, s) = (hist.pr(j, i), hist.ps(j, i));
        x += i64::from(r.x()) * i64::from(pr_c[j]) + i64::from(s.x()) * i64::from(ps_c[j]);
        y += i64::from(r.y()) * i64::from(pr_c[j]) + i64::from(s.y()) * i64::from(ps_c[j]);
    }
    let x = ((x + den / 2) / den).clamp(0, 0xfff);
    let y = ((y + den / 2) / den).clamp(0, 0xfff);
    let p = hist.pr_mut(0, i);
    p.set_x(x as u32);
    p.set_y(y as u32);
}

fn filter_speed(hist: &History, i: usize) -> i64 {
    let (s0, s1, s2) = (hist.ps(0, i), hist.ps(1, i), hist.ps(2, i));
    i64::from(isqrt(i64::from(s0.distance(s1))) + isqrt(i64::from(s1.distance(s2)))) / 2
}

impl Engine {
    /// Copies `pp[0]` into `ps[0]`, holds sub-threshold motion, then
    /// attenuates the residual motion of moving slots.
    pub(super) fn shake_smooth(&mut self) {
        let cfg = &self.config;
        let hist = &mut self.hist;
        for i in 0..POINT_MAX {
            *hist.ps_mut(0, i) = hist.pp(0, i);
        }
        for i in 0..POINT_MAX {
            let p0 = hist.pp(0, i);
            if p0.is_empty() {
                self.shake[i] = false;
                continue;
            }
            let s1 = hist.ps(1, i);
            if s1.is_empty() {
                continue;
            }
            if !self.shake[i] && !p0.key() {
                if p0.distance(s1) < cfg.shake_min {
                    *hist.ps_mut(0, i) = s1;
                    continue;
                }
                self.shake[i] = true;
            }
        }

        let curve = ShakeCurve::from_config(cfg);
        match curve.len {
            1 => {
                let ds0 = i64::from(isqrt(curve.dis[0]));
                for i in 0..POINT_MAX {
                    let s1 = hist.ps(1, i);
                    if s1.is_empty() {
                        seed_ps(hist, i);
                        continue;
                    }
                    if !self.shake[i] {
                        continue;
                    }
                    let p0 = hist.pp(0, i);
                    let dn = i64::from(isqrt(i64::from(p0.distance(s1))));
                    let dr = (dn - ds0).max(0);
                    let out = hist.ps_mut(0, i);
                    if dn == 0 || dr == 0 {
                        hold_position(out, s1);
                    } else {
                        interpolate(out, s1, p0, dr, dn);
                    }
                }
            }
            len if len > 2 => {
                let mut ds = [0i64; SHAKE_STAGES + 1];
                let mut dc = [0i64; SHAKE_STAGES + 1];
                for k in 0..len {
                    ds[k + 1] = i64::from(isqrt(curve.dis[k]));
                    dc[k + 1] = ds[k + 1].saturating_mul(curve.coe[k]);
                }
                let (c0, c1) = (curve.coe[0], curve.coe[1]);
                if c0 >= 128 || c0 <= c1 {
                    ds[0] = ds[1];
                    dc[0] = dc[1];
                } else {
                    ds[0] = ds[1].saturating_add((128 - c0).saturating_mul(ds[1] - ds[2]) / (c0 - c1));
                    dc[0] = ds[0].saturating_mul(128);
                }

                for i in 0..POINT_MAX {
                    let s1 = hist.ps(1, i);
                    if s1.is_empty() {
                        seed_ps(hist, i);
                        continue;
                    }
                    if !self.shake[i] {
                        continue;
                    }
                    let p0 = hist.pp(0, i);
                    let dn = i64::from(isqrt(i64::from(p0.distance(s1))));
                    if dn >= ds[0] {
                        continue;
                    }
                    let out = hist.ps_mut(0, i);
                    if dn == 0 {
                        hold_position(out, s1);
                        continue;
                    }
                    match (0..len).find(|&j| ds[j] > dn && dn >= ds[j + 1]) {
                        Some(j) => {
                            let slope = (dn - ds[j + 1]).saturating_mul(dc[j].saturating_sub(dc[j + 1]));
                            let dr = dc[j + 1].saturating_add(slope / (ds[j] - ds[j + 1]));
                            interpolate(out, s1, p0, dr, dn * 128);
                        }
                        None => hold_position(out, s1),
                    }
                }
            }
            // Zero or two stages: no attenuation.
            _ => {}
        }
    }

    /// Compresses points that entered from a panel corner toward the
    /// corner's diagonal.
    pub(super) fn point_diagonal(&mut self) {
        let cfg = &self.config;
        let diagonal = i64::from(cfg.diagonal);
        if diagonal == 0 {
            return;
        }
        let size = diagonal.saturating_mul(diagonal);
        let start = diagonal.saturating_mul(3) / 2;
        let (sen, drv) = (i64::from(cfg.sen_num_nokey), i64::from(cfg.drv_num_nokey));
        let (px, py) = (cfg.panel_x(), cfg.panel_y());

        for i in 0..POINT_MAX {
            let p = self.hist.ps(0, i);
            if p.is_empty() || p.key() {
                self.corner[i] = Corner::Unknown;
                continue;
            }
            let (x, y) = (i64::from(p.x()), i64::from(p.y()));
            if self.corner[i] == Corner::Unknown {
                let (near_x0, near_x1) = (x <= start, x >= px - start);
                let (near_y0, near_y1) = (y <= start, y >= py - start);
                self.corner[i] = if (near_x0 && near_y0) || (near_x1 && near_y1) {
                    Corner::Main
                } else if (near_x0 && near_y1) || (near_x1 && near_y0) {
                    Corner::Anti
                } else {
                    Corner::Outside
                };
            }
            let corner = self.corner[i];
            if corner == Corner::Outside {
                continue;
            }
            let dis = diagonal_distance(sen, drv, x, y, corner);
            if dis <= size.saturating_mul(4) {
                let (nx, ny) = diagonal_compress(sen, drv, x, y, corner, dis, size);
                let out = self.hist.ps_mut(0, i);
                out.set_x(nx as u32);
                out.set_y(ny as u32);
            } else {
                self.corner[i] = Corner::Outside;
            }
        }
    }

    /// Temporal filter from `ps` into `pr`, seeding both rings for slots
    /// that just appeared.
    pub(super) fn point_filter(&mut self) {
        let cfg = &self.config;
        let hist = &mut self.hist;
        for i in 0..POINT_MAX {
            *hist.pr_mut(0, i) = hist.ps(0, i);
        }
        for i in 0..POINT_MAX {
            let p = hist.pr(0, i);
            if !p.is_empty() && hist.pr(1, i).is_empty() {
                for j in 1..PR_DEEP {
                    *hist.pr_mut(j, i) = p;
                }
                seed_ps(hist, i);
            }
        }

        let able = cfg.filter_able;
        if (0..=1).contains(&able) {
            return;
        }
        if able > 1 {
            let (ps_c, pr_c) = fixed_coefficients(&cfg.filter_coe);
            for i in 0..POINT_MAX {
                filter_one(hist, i, &ps_c, &pr_c, i64::from(able));
            }
            return;
        }

        let m = cfg.median_dis.map(i64::from);
        let thresholds = [m[0] * 2 - m[1], m[0], m[1], m[2], m[3], m[3] / 2];
        for i in 0..POINT_MAX {
            if hist.pr(0, i).is_empty() {
                self.filter_deep[i] = 0;
                continue;
            }
            let speed = filter_speed(hist, i);
            let deep = &mut self.filter_deep[i];
            if *deep > 0 && speed > thresholds[*deep + 1] {
                *deep -= 1;
            } else if *deep < FILTER_LEVELS - 1 && speed < thresholds[*deep + 3] {
                *deep += 1;
            }
            let d = *deep;
            filter_one(hist, i, &cfg.ps_coe[d], &cfg.pr_coe[d], -i64::from(able));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_coefficients_sign_extend() {
        let (ps_c, pr_c) = fixed_coefficients(&[0x0000_ff28, 0, 0x0000_0080, 0x7f00_0000]);
        assert_eq!(ps_c[0], 40);
        assert_eq!(ps_c[1], -1);
        assert_eq!(pr_c[0], -128);
        assert_eq!(pr_c[7], 127);
    }

    #[test]
    fn diagonal_compress_at_full_coefficient_is_identity() {
        // coe reaches 256 at dis = 4 * size.
        let (x, y) = diagonal_compress(10, 16, 50, 40, Corner::Main, 400, 100);
        assert_eq!((x, y), (50, 40));
    }

    #[test]
    fn diagonal_compress_pulls_toward_diagonal() {
        // Main diagonal for a 16x10 panel: sen*x == drv*y.
        let (sen, drv) = (10, 16);
        let (x, y) = (60, 20);
        let dis = diagonal_distance(sen, drv, x, y, Corner::Main);
        let (nx, ny) = diagonal_compress(sen, drv, x, y, Corner::Main, dis, dis);
        let before = (sen * x - drv * y).abs();
        let after = (sen * nx - drv * ny).abs();
        assert!(after < before, "{after} !< {before}");
    }

    #[test]
    fn shake_curve_length_stops_at_zero_dis() {
        let mut cfg = Config::default();
        cfg.shake_all_array[0] = 100;
        cfg.shake_all_array[2] = 50;
        assert_eq!(ShakeCurve::from_config(&cfg).len, 2);
        cfg.shake_all_array = [0; 16];
        assert_eq!(ShakeCurve::from_config(&cfg).len, 0);
    }
}
