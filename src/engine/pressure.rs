// Pressure capture and smoothing.

use super::Engine;
use crate::POINT_MAX;

/// Steps smaller than this are dropped.
const DEAD_BAND: i64 = 2;
const SEED_SCALE: u32 = 5;

/// One step of the pressure low-pass, with the dead band applied.
fn pressure_step(report: u32, pa: [u32; 3]) -> u32 {
    let rep = i64::from(report);
    let [a0, a1, a2] = pa.map(i64::from);
    let mut step = (rep + 1) / 2 + a0 + a1 + (a2 + 1) / 2 - rep;
    if step > DEAD_BAND {
        step -= DEAD_BAND;
    } else if step < -DEAD_BAND {
        step += DEAD_BAND;
    } else {
        step = 0;
    }
    (rep + step).clamp(0, i64::from(u32::MAX)) as u32
}

impl Engine {
    /// Moves pressure out of the candidates' ID field when `present`,
    /// otherwise clears every pressure.
    pub(super) fn pressure_save(&mut self, present: bool) {
        if !present {
            self.pressure_now = [0; POINT_MAX];
            self.pressure_report = [0; POINT_MAX];
            return;
        }
        for (p, pressure) in self.point_now.iter_mut().zip(self.pressure_now.iter_mut()) {
            *pressure = p.id();
            p.set_id(0);
        }
    }

    pub(super) fn point_pressure(&mut self) {
        for i in 0..POINT_MAX {
            let (a0, a1) = (self.hist.pa(0, i), self.hist.pa(1, i));
            if a0 != 0 && a1 == 0 {
                self.pressure_report[i] = a0 * SEED_SCALE;
                for j in 1..crate::PRESSURE_DEEP {
                    *self.hist.pa_mut(j, i) = a0;
                }
            }
            let pa = [a0, self.hist.pa(1, i), self.hist.pa(2, i)];
            self.pressure_report[i] = pressure_step(self.pressure_report[i], pa);
        }
    }
}
