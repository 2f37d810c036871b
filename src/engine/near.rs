// Proximity ("touch near") detection from the raw capacitance count the
// controller reports in the upper half of `finger_num`.

use super::{FLAG_NEAR_AC, NEAR_SHIFT};
use crate::util::sort_small;

const WINDOW: usize = 128;
const WINDOW_MASK: u32 = WINDOW as u32 - 1;
const PERIOD_DEFAULT: u32 = 1000;
const OUT_FAR: i32 = 16;
const OUT_NEAR: i32 = -16;
const COUNT_WRAP: u32 = 0x7000_0000;
const COUNT_REWIND: u32 = 0x1000_0000;
/// Samples used to build the reference level.
const REFE_END: u32 = 32 + 8;

#[derive(Clone, Debug)]
pub(crate) struct Near {
    period: u32,
    count: u32,
    /// Hysteresis counter: negative while near.
    out: i32,
    ignore: u32,
    data_prev: u32,
    inte: u32,
    refe_start: i32,
    data: [i32; WINDOW],
}

impl Default for Near {
    fn default() -> Self {
        Near {
            period: PERIOD_DEFAULT,
            count: 0,
            out: OUT_FAR,
            ignore: 0,
            data_prev: 0,
            inte: 0,
            refe_start: 0,
            data: [0; WINDOW],
        }
    }
}

impl Near {
    pub fn is_near(&self) -> bool {
        self.out < 0
    }

    fn push(&mut self, v: u32) {
        self.data[(self.count & WINDOW_MASK) as usize] = v as i32;
        self.count += 1;
    }

    fn mean(&self, from: u32, to: u32, den: u32) -> i32 {
        let sum: i64 = (from..to).map(|i| i64::from(self.data[(i & WINDOW_MASK) as usize])).sum();
        (sum / i64::from(den.max(1))) as i32
    }

    /// Feeds one frame's flags word. `inte_count` is the frame counter.
    pub fn update(&mut self, flags: u32, inte_count: u32, near_set: [i32; 2]) {
        let data = flags >> NEAR_SHIFT;
        if data == 0 {
            self.out = OUT_FAR;
            self.count = 0;
            self.period = PERIOD_DEFAULT;
            self.data_prev = 0;
            return;
        }
        let ac = flags & FLAG_NEAR_AC != 0;
        if self.count >= COUNT_WRAP {
            self.count = COUNT_REWIND;
        }

        if data != self.data_prev {
            self.period = self.period.min(inte_count.wrapping_sub(self.inte));
            self.inte = inte_count;
            self.data_prev = data;
            self.ignore = 0;
        } else {
            let ignore = self.ignore;
            self.ignore += 1;
            if ignore < self.period.saturating_mul(3) / 2 {
                return;
            }
            self.ignore = 0;
        }
        self.push(data);

        let n = self.count;
        if !ac && (8..REFE_END).contains(&n) {
            self.refe_start = self.mean(4, n - n / 4, n - 4 - n / 4);
        }
        if ac && (16..REFE_END).contains(&n) {
            self.refe_start = self.mean(4, n - 8, n - 12);
        }

        let mut window = [0i32; 8];
        for (i, w) in window.iter_mut().enumerate() {
            *w = self.data[(n.wrapping_sub(i as u32) & WINDOW_MASK) as usize];
        }
        sort_small(&mut window);
        let mean = window[2..6].iter().sum::<i32>() / 4;
        let d = self.refe_start - mean;

        if d > near_set[0] && self.out >= 0 {
            self.out -= 2;
            if self.out < 0 {
                self.out = OUT_NEAR;
            }
        }
        if d < near_set[1] && self.out < 0 {
            self.out += 1;
            if self.out >= 0 {
                self.out = OUT_FAR;
            }
        }
    }
}
