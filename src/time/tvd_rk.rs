//! TVD Runge-Kutta multistage time integration (Shu-Osher form).
//!
//! Each physical step of size `dt` runs `order` stages on a staging copy:
//!
//! ```text
//! ustage <- u
//! for each stage (c0, c1, c2):
//!     ustage <- c0 u + c1 ustage - c2 dt / area * R(ustage)
//! u <- ustage
//! ```
//!
//! `dt` is the CFL number times the smallest local time step reported by
//! the spatial operator at the first stage, clipped so the final step lands
//! on the requested final time.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::io::{append_timing_summary, thread_count};
use crate::solver::{ConfigError, SolverError, StateVector, UnsteadySolverConfig};
use crate::spatial::SpatialOperator;
use crate::timing::{RunTimer, RunTimes};

/// Time within this distance of the final time counts as reached.
const TIME_EPS: f64 = 1e-12;

/// Progress line cadence.
const PROGRESS_EVERY: usize = 50;

// =============================================================================
// Coefficient table
// =============================================================================

/// Shu-Osher stage coefficients `(c0, c1, c2)`, one row per stage.
#[derive(Clone, Debug, PartialEq)]
pub struct TvdRkCoefficients {
    rows: Vec<[f64; 3]>,
}

impl TvdRkCoefficients {
    /// Coefficients of the TVD-RK scheme of the given order (1, 2 or 3).
    pub fn for_order(order: usize) -> Result<Self, ConfigError> {
        let rows = match order {
            1 => vec![[1.0, 0.0, 1.0]],
            2 => vec![[1.0, 0.0, 1.0], [0.5, 0.5, 0.5]],
            3 => vec![
                [1.0, 0.0, 1.0],
                [0.75, 0.25, 0.25],
                [1.0 / 3.0, 2.0 / 3.0, 2.0 / 3.0],
            ],
            _ => return Err(ConfigError::UnsupportedOrder(order)),
        };
        Ok(Self { rows })
    }

    /// Number of stages.
    pub fn stages(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[[f64; 3]] {
        &self.rows
    }
}

// =============================================================================
// Driver
// =============================================================================

/// Outcome of one unsteady `solve` call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UnsteadyReport {
    /// Physical time steps taken.
    pub steps: usize,
    /// Physical time reached.
    pub final_time: f64,
    /// Wall and CPU time of this call.
    pub times: RunTimes,
}

/// Explicit multistage driver for time-accurate problems.
pub struct TvdRkSolver<const N: usize, S> {
    space: S,
    config: UnsteadySolverConfig,
    coeffs: TvdRkCoefficients,
    residual: StateVector<N>,
    dt_local: Vec<f64>,
    ustage: StateVector<N>,
    times: RunTimes,
}

impl<const N: usize, S: SpatialOperator<N>> TvdRkSolver<N, S> {
    const NAME: &'static str = "TVDRKSolver";

    /// Build the driver; orders other than 1, 2 and 3 are rejected.
    pub fn new(space: S, config: UnsteadySolverConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let coeffs = TvdRkCoefficients::for_order(config.order)?;
        let n = space.mesh().n_cells();
        log::info!(
            "{}: order {}, CFL = {}",
            Self::NAME,
            config.order,
            config.cfl
        );
        Ok(Self {
            space,
            config,
            coeffs,
            residual: StateVector::zeros(n),
            dt_local: vec![0.0; n],
            ustage: StateVector::zeros(n),
            times: RunTimes::default(),
        })
    }

    pub fn space(&self) -> &S {
        &self.space
    }

    pub fn coefficients(&self) -> &TvdRkCoefficients {
        &self.coeffs
    }

    /// Accumulated over every `solve` call on this driver.
    pub fn run_times(&self) -> RunTimes {
        self.times
    }

    /// Advance `u` from time 0 to `final_time`, which must be finite.
    pub fn solve(
        &mut self,
        u: &mut StateVector<N>,
        final_time: f64,
    ) -> Result<UnsteadyReport, SolverError> {
        if !final_time.is_finite() {
            return Err(ConfigError::InvalidValue {
                name: "final_time",
                value: final_time,
            }
            .into());
        }
        let mesh = self.space.mesh();
        if u.n_cells() != mesh.n_cells() {
            return Err(ConfigError::StateSizeMismatch {
                expected: mesh.n_cells(),
                got: u.n_cells(),
            }
            .into());
        }
        let areas = mesh.areas();

        let timer = RunTimer::start();
        let mut step = 0;
        let mut time = 0.0;

        while time <= final_time - TIME_EPS {
            self.ustage.copy_from(u);
            let mut dt = 0.0;

            for (stage, &c) in self.coeffs.rows.iter().enumerate() {
                self.residual.fill(0.0);
                self.space
                    .compute_residual(&self.ustage, &mut self.residual, true, &mut self.dt_local);

                if stage == 0 {
                    let dtmin = self.dt_local.iter().copied().fold(f64::INFINITY, f64::min);
                    dt = self.config.cfl * dtmin;
                    if !(dt.is_finite() && dt > 0.0) {
                        return Err(SolverError::InvalidTimeStep { dt, step });
                    }
                    dt = dt.min(final_time - time);
                }

                stage_update(u, &mut self.ustage, &self.residual, areas, c, dt);
            }

            u.copy_from(&self.ustage);

            if step % PROGRESS_EVERY == 0 {
                log::info!("{}: step {step}, time {time}", Self::NAME);
            }
            step += 1;
            time += dt;
        }

        let elapsed = timer.elapsed();
        self.times.accumulate(elapsed);
        log::info!(
            "{}: done, steps = {step}; wall time = {:.3}s, CPU time = {:.3}s",
            Self::NAME,
            self.times.wall,
            self.times.cpu
        );

        if let Some(path) = &self.config.log_file {
            append_timing_summary(path, thread_count(), self.times)?;
        }

        Ok(UnsteadyReport {
            steps: step,
            final_time: time,
            times: elapsed,
        })
    }
}

/// `ustage_i = c0 u_i + c1 ustage_i - c2 dt / area_i * r_i`.
fn stage_update<const N: usize>(
    u: &StateVector<N>,
    ustage: &mut StateVector<N>,
    residual: &StateVector<N>,
    areas: &[f64],
    [c0, c1, c2]: [f64; 3],
    dt: f64,
) {
    let kernel = |(((us, ui), ri), area): (((&mut [f64; N], &[f64; N]), &[f64; N]), &f64)| {
        let c = c2 * dt / area;
        for ((s, x), r) in us.iter_mut().zip(ui).zip(ri) {
            *s = c0 * x + c1 * *s - c * r;
        }
    };

    #[cfg(feature = "parallel")]
    ustage
        .rows_mut()
        .par_iter_mut()
        .zip(u.rows().par_iter())
        .zip(residual.rows().par_iter())
        .zip(areas.par_iter())
        .for_each(kernel);
    #[cfg(not(feature = "parallel"))]
    ustage
        .rows_mut()
        .iter_mut()
        .zip(u.rows().iter())
        .zip(residual.rows().iter())
        .zip(areas.iter())
        .for_each(kernel);
}
