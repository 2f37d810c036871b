// Reset-mask ("tiao-ping") detection.
//
// A single finger held for a while and then moved far from where it landed
// asks the host to tear down every contact. The detector waits for the
// screen to clear, counts one more frame, then latches a token that the
// host reads once through `Engine::mask_tiaoping`.

use tracing::debug;

use super::Engine;
use crate::point::Point;

/// Token latched; waiting for the host to take it.
const ARMED: u32 = 0xffff_ffff;
/// Gesture recognised; waiting for the screen to clear.
const FIRING: u32 = 0xffff_fff1;
/// Countdown values run down to (and stop at) this value.
const COUNTDOWN_END: u32 = 0xf000_0000;
const COUNTDOWN_TICKS: u32 = 1;

const DIS_MASK: u32 = 0x00ff_ffff;
const COUNT_SHIFT: u32 = 24;

/// The `state` word is 0 when idle, the packed anchor point while a touch
/// is being timed, or one of the marker values above. Anchors always carry
/// slot 0's id (1) in the top nibble, so they never collide with markers.
#[derive(Clone, Debug, Default)]
pub(crate) struct ResetMask {
    state: u32,
    count: u32,
    send: u32,
}

impl ResetMask {
    pub fn clear(&mut self) {
        *self = ResetMask::default();
    }

    pub fn take(&mut self) -> u32 {
        std::mem::take(&mut self.send)
    }

    /// Advances the machine by one frame. `live` is the number of live
    /// slots and `first` is slot 0's current point. Returns true when the
    /// token was latched on this frame.
    pub fn step(&mut self, dis: u32, kind: u32, live: usize, first: Point) -> bool {
        if dis == 0 || kind == 0 {
            return false;
        }
        match self.state {
            ARMED => {
                if self.send == 0 {
                    self.state = 0;
                    self.count = 0;
                }
                return false;
            }
            FIRING => {
                if live == 0 {
                    self.state = COUNTDOWN_END + COUNTDOWN_TICKS;
                }
                return false;
            }
            s if s > COUNTDOWN_END => {
                self.state -= 1;
                if self.state == COUNTDOWN_END {
                    self.send = kind;
                    self.state = ARMED;
                    return true;
                }
                return false;
            }
            _ => {}
        }

        if live > 1 || first.is_empty() {
            self.state = 0;
            self.count = 0;
            return false;
        }
        self.count = self.count.saturating_add(1);
        if self.state == 0 {
            self.state = first.bits();
        } else if Point::from_bits(self.state).distance(first) > dis & DIS_MASK && self.count > dis >> COUNT_SHIFT {
            self.state = FIRING;
        }
        false
    }
}

impl Engine {
    pub(super) fn reset_mask_step(&mut self) {
        let first = self.hist.pp(0, 0);
        let (dis, kind) = (self.config.reset_mask_dis, self.config.reset_mask_type);
        if self.reset_mask.step(dis, kind, self.point_num, first) {
            debug!(token = kind, "Reset-mask token latched");
        }
    }
}
