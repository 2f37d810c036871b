// Ring storage for the point and pressure histories.
//
// The three point rings (pp, ps, pr) share one backing store of
// POINT_DEEP rows. Row k of a ring is the frame k steps in the past;
// advancing the frame counter turns the oldest row into the new row 0.

use crate::point::Point;
use crate::{POINT_DEEP, POINT_MAX, PP_DEEP, PRESSURE_DEEP, PR_DEEP, PS_DEEP};

/// The frame counter wraps at the product of the ring depths so every
/// ring keeps a consistent head across the wrap.
const FRAME_WRAP: u32 = (PP_DEEP * PS_DEEP * PR_DEEP * PRESSURE_DEEP) as u32;

const PP_BASE: usize = 0;
const PS_BASE: usize = PP_DEEP;
const PR_BASE: usize = PP_DEEP + PS_DEEP;

#[derive(Clone, Debug)]
pub(crate) struct History {
    points: [[Point; POINT_MAX]; POINT_DEEP],
    pressure: [[u32; POINT_MAX]; PRESSURE_DEEP],
    point_n: u32,
}

impl Default for History {
    fn default() -> Self {
        History {
            points: [[Point::EMPTY; POINT_MAX]; POINT_DEEP],
            pressure: [[0; POINT_MAX]; PRESSURE_DEEP],
            point_n: 0,
        }
    }
}

impl History {
    pub fn clear(&mut self) {
        *self = History::default();
    }

    /// Moves every ring forward by one frame. The recycled pressure row is
    /// zeroed since slot ordering only writes the slots that are live.
    pub fn advance(&mut self) {
        self.point_n += 1;
        if self.point_n >= FRAME_WRAP {
            self.point_n = 0;
        }
        let row = self.point_n as usize % PRESSURE_DEEP;
        self.pressure[row] = [0; POINT_MAX];
    }

    #[inline]
    fn row(&self, base: usize, depth: usize, k: usize) -> usize {
        debug_assert!(k < depth);
        let head = self.point_n as usize % depth;
        base + (head + depth - k) % depth
    }

    #[inline]
    pub fn pp(&self, k: usize, i: usize) -> Point {
        self.points[self.row(PP_BASE, PP_DEEP, k)][i]
    }

    #[inline]
    pub fn pp_mut(&mut self, k: usize, i: usize) -> &mut Point {
        let r = self.row(PP_BASE, PP_DEEP, k);
        &mut self.points[r][i]
    }

    #[inline]
    pub fn ps(&self, k: usize, i: usize) -> Point {
        self.points[self.row(PS_BASE, PS_DEEP, k)][i]
    }

    #[inline]
    pub fn ps_mut(&mut self, k: usize, i: usize) -> &mut Point {
        let r = self.row(PS_BASE, PS_DEEP, k);
        &mut self.points[r][i]
    }

    #[inline]
    pub fn pr(&self, k: usize, i: usize) -> Point {
        self.points[self.row(PR_BASE, PR_DEEP, k)][i]
    }

    #[inline]
    pub fn pr_mut(&mut self, k: usize, i: usize) -> &mut Point {
        let r = self.row(PR_BASE, PR_DEEP, k);
        &mut self.points[r][i]
    }

    #[inline]
    pub fn pa(&self, k: usize, i: usize) -> u32 {
        let head = self.point_n as usize % PRESSURE_DEEP;
        self.pressure[(head + PRESSURE_DEEP - k) % PRESSURE_DEEP][i]
    }

    #[inline]
    pub fn pa_mut(&mut self, k: usize, i: usize) -> &mut u32 {
        let head = self.point_n as usize % PRESSURE_DEEP;
        &mut self.pressure[(head + PRESSURE_DEEP - k) % PRESSURE_DEEP][i]
    }

    /// Number of live slots in the newest `pp` row.
    pub fn live_now(&self) -> usize {
        (0..POINT_MAX).filter(|&i| !self.pp(0, i).is_empty()).count()
    }

    /// Frames since slot `i` was last live, looking back from `pp[1]`.
    pub fn clear_len(&self, i: usize) -> usize {
        (1..PP_DEEP)
            .find(|&n| !self.pp(n, i).is_empty())
            .unwrap_or(PP_DEEP)
    }

    #[cfg(test)]
    pub fn frame_counter(&self) -> u32 {
        self.point_n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_shifts_rows_back() {
        let mut h = History::default();
        *h.pp_mut(0, 3) = Point::new(7, 9);
        *h.pr_mut(0, 3) = Point::new(1, 1);
        h.advance();
        assert!(h.pp(0, 3).is_empty());
        assert_eq!(h.pp(1, 3), Point::new(7, 9));
        assert_eq!(h.pr(1, 3), Point::new(1, 1));
        assert!(h.ps(1, 3).is_empty());
    }

    #[test]
    fn rings_do_not_alias() {
        let mut h = History::default();
        for k in 0..PP_DEEP {
            *h.pp_mut(k, 0) = Point::new(k as u32 + 1, 0);
            *h.ps_mut(k, 0) = Point::new(0, k as u32 + 1);
        }
        for k in 0..PP_DEEP {
            assert_eq!(h.pp(k, 0).x(), k as u32 + 1);
            assert_eq!(h.ps(k, 0).y(), k as u32 + 1);
            assert!(h.pr(k, 0).is_empty());
        }
    }

    #[test]
    fn recycled_pressure_row_is_cleared() {
        let mut h = History::default();
        for _ in 0..PRESSURE_DEEP {
            *h.pa_mut(0, 0) = 9;
            h.advance();
        }
        assert_eq!(h.pa(0, 0), 0);
        assert_eq!(h.pa(1, 0), 9);
    }

    #[test]
    fn clear_len_counts_empty_frames() {
        let mut h = History::default();
        assert_eq!(h.clear_len(2), PP_DEEP);
        *h.pp_mut(0, 2) = Point::new(1, 1);
        h.advance();
        h.advance();
        assert_eq!(h.clear_len(2), 2);
    }

    #[test]
    fn frame_counter_wraps() {
        let mut h = History::default();
        for _ in 0..FRAME_WRAP {
            h.advance();
        }
        assert_eq!(h.frame_counter(), 0);
    }
}
