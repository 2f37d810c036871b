// Per-slot report delay.

use super::Engine;
use crate::{POINT_MAX, PP_DEEP};

/// Rows closer than this (squared) let the read offset catch up by one.
const CATCH_UP_DIS: u32 = 9;

/// Delay state for one slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Delay {
    /// Frames of uninterrupted presence required before the slot reports.
    pub delay: u8,
    /// History row read by the reporter.
    pub report: u8,
    /// The slot may report.
    pub able: bool,
    /// `delay`/`report` have been chosen for the current touch.
    pub init: bool,
}

/// Three-bit field of a per-finger-count delay word.
#[inline]
fn delay_field(word: u32, point_num: usize) -> u8 {
    let shift = 3 * (point_num.min(POINT_MAX) as u32 - 1);
    ((word >> shift) & 7) as u8
}

impl Engine {
    pub(super) fn point_delay(&mut self) {
        let (rd, ahead) = (self.config.report_delay, self.config.report_ahead);
        if rd == 0 {
            self.delay = [Delay {
                able: true,
                ..Delay::default()
            }; POINT_MAX];
            return;
        }

        for i in 0..POINT_MAX {
            let d = &mut self.delay[i];
            if self.hist.pp(0, i).is_empty() {
                d.init = false;
            } else if !d.init && !d.able {
                if self.point_num == 0 {
                    continue;
                }
                d.delay = delay_field(rd, self.point_num);
                d.report = delay_field(ahead, self.point_num).min(d.delay);
                d.init = true;
            }

            if !d.able && d.init {
                let held = (0..=usize::from(d.delay).min(PP_DEEP - 1)).all(|j| {
                    let p = self.hist.pp(j, i);
                    !p.is_empty() && !p.fill() && !p.able()
                });
                if !held {
                    continue;
                }
                d.able = true;
            }

            let r = usize::from(d.report);
            if self.hist.pp(r, i).is_empty() {
                d.able = false;
                continue;
            }
            if !d.able {
                continue;
            }
            if r > 0 && self.hist.pp(r, i).distance(self.hist.pp(r - 1, i)) < CATCH_UP_DIS {
                d.report -= 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_selects_by_finger_count() {
        let word = 0o7654321;
        assert_eq!(delay_field(word, 1), 1);
        assert_eq!(delay_field(word, 2), 2);
        assert_eq!(delay_field(word, 7), 7);
        assert_eq!(delay_field(word, 8), 0);
        // Counts above the slot count use the last field.
        assert_eq!(delay_field(0o7 << 27, 12), 7);
    }
}
