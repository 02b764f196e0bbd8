//! CFL and linear-iteration ramping for the implicit drivers.
//!
//! ```text
//! step <  ramp_start              -> (cfl_init,  lin_start)
//! ramp_start <= step < ramp_end   -> linear interpolation
//! step >= ramp_end                -> (cfl_final, lin_end)
//! ```
//!
//! With `ramp_end <= ramp_start` the schedule is a step at `ramp_start`.
//! The interpolated iteration cap is truncated toward zero.

/// Parameters in effect at one nonlinear iteration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RampValues {
    pub cfl: f64,
    pub lin_max_iter: usize,
}

/// A linear ramp of the CFL number and the linear iteration cap.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RampSchedule {
    pub cfl_init: f64,
    pub cfl_final: f64,
    pub lin_max_iter_start: usize,
    pub lin_max_iter_end: usize,
    pub ramp_start: usize,
    pub ramp_end: usize,
}

impl RampSchedule {
    /// Ramp values at nonlinear iteration `step`.
    pub fn at(&self, step: usize) -> RampValues {
        if step < self.ramp_start {
            return RampValues {
                cfl: self.cfl_init,
                lin_max_iter: self.lin_max_iter_start,
            };
        }
        if step >= self.ramp_end || self.ramp_end <= self.ramp_start {
            return RampValues {
                cfl: self.cfl_final,
                lin_max_iter: self.lin_max_iter_end,
            };
        }

        let span = (self.ramp_end - self.ramp_start) as f64;
        let t = (step - self.ramp_start) as f64;
        let cfl = self.cfl_init + (self.cfl_final - self.cfl_init) / span * t;
        let lin_start = self.lin_max_iter_start as f64;
        let lin_slope = (self.lin_max_iter_end as f64 - lin_start) / span;
        RampValues {
            cfl,
            lin_max_iter: (lin_start + lin_slope * t) as usize,
        }
    }
}
