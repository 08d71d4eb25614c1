use serde::{Deserialize, Serialize};

use crate::error::SirError;
use crate::model::SirModel;
use crate::solvers::{Dopri5, Rk4};
use crate::traits::{Steppable, VectorField};

/// Smallest step the adaptive loop will attempt before declaring failure.
const MIN_STEP: f64 = 1e-12;

/// An epidemic scenario: population split, rates, and horizon.
///
/// `days` is the number of samples in the output grid, spanning `[0, days]`
/// inclusive. The susceptible compartment is implied: `S0 = N - I0 - R0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SirScenario {
    /// Total population N.
    pub population: f64,
    /// Initially infected individuals I0.
    pub initial_infected: f64,
    /// Initially recovered individuals R0.
    pub initial_recovered: f64,
    /// Transmission rate per day.
    pub beta: f64,
    /// Recovery rate per day.
    pub gamma: f64,
    /// Number of grid samples.
    pub days: u32,
}

impl SirScenario {
    /// Rejects inconsistent inputs before any integration runs.
    pub fn check(&self) -> Result<(), SirError> {
        if !self.population.is_finite() || self.population <= 0.0 {
            return Err(SirError::InvalidPopulation {
                reason: format!("population must be positive and finite, got {}", self.population),
            });
        }
        if !self.initial_infected.is_finite() || self.initial_infected < 0.0 {
            return Err(SirError::InvalidPopulation {
                reason: format!(
                    "initial infected must be non-negative and finite, got {}",
                    self.initial_infected
                ),
            });
        }
        if !self.initial_recovered.is_finite() || self.initial_recovered < 0.0 {
            return Err(SirError::InvalidPopulation {
                reason: format!(
                    "initial recovered must be non-negative and finite, got {}",
                    self.initial_recovered
                ),
            });
        }
        if self.initial_infected + self.initial_recovered > self.population {
            return Err(SirError::InvalidPopulation {
                reason: format!(
                    "initial infected ({}) plus recovered ({}) exceed the population ({})",
                    self.initial_infected, self.initial_recovered, self.population
                ),
            });
        }
        if !self.beta.is_finite() || self.beta <= 0.0 {
            return Err(SirError::InvalidParameter {
                reason: format!("beta must be positive and finite, got {}", self.beta),
            });
        }
        if !self.gamma.is_finite() || self.gamma <= 0.0 {
            return Err(SirError::InvalidParameter {
                reason: format!("gamma must be positive and finite, got {}", self.gamma),
            });
        }
        if self.days < 1 {
            return Err(SirError::InvalidParameter {
                reason: "days must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Implied initial susceptible count `N - I0 - R0`.
    pub fn susceptible_start(&self) -> f64 {
        self.population - self.initial_infected - self.initial_recovered
    }

    /// The state vector `[S0, I0, R0]` the integration starts from.
    pub fn initial_state(&self) -> [f64; 3] {
        [
            self.susceptible_start(),
            self.initial_infected,
            self.initial_recovered,
        ]
    }
}

/// Which stepper advances the state between grid points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Method {
    /// Embedded Dormand-Prince 5(4) with adaptive step control.
    Dopri5,
    /// Fixed-step classic RK4, `substeps` equal steps per grid interval.
    Rk4 { substeps: usize },
}

/// Tunables for the integration loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverSettings {
    pub method: Method,
    /// Relative tolerance for the adaptive error norm.
    pub rel_tol: f64,
    /// Absolute tolerance for the adaptive error norm.
    pub abs_tol: f64,
    /// Attempt budget per grid interval before giving up.
    pub max_steps_per_interval: usize,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            method: Method::Dopri5,
            rel_tol: 1e-8,
            abs_tol: 1e-8,
            max_steps_per_interval: 10_000,
        }
    }
}

impl SolverSettings {
    pub fn check(&self) -> Result<(), SirError> {
        if !self.rel_tol.is_finite() || self.rel_tol <= 0.0 {
            return Err(SirError::InvalidParameter {
                reason: format!("rel_tol must be positive and finite, got {}", self.rel_tol),
            });
        }
        if !self.abs_tol.is_finite() || self.abs_tol <= 0.0 {
            return Err(SirError::InvalidParameter {
                reason: format!("abs_tol must be positive and finite, got {}", self.abs_tol),
            });
        }
        if self.max_steps_per_interval == 0 {
            return Err(SirError::InvalidParameter {
                reason: "max_steps_per_interval must be at least 1".to_string(),
            });
        }
        if let Method::Rk4 { substeps } = self.method {
            if substeps == 0 {
                return Err(SirError::InvalidParameter {
                    reason: "substeps must be at least 1".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// A finished simulation sampled on the uniform day grid.
///
/// The four vectors always have equal length. Every value is finite; the
/// driver refuses to return a trajectory containing NaN or infinity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SirTrajectory {
    pub time: Vec<f64>,
    pub susceptible: Vec<f64>,
    pub infected: Vec<f64>,
    pub recovered: Vec<f64>,
}

impl SirTrajectory {
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }
}

/// Uniform grid of `days` samples over `[0, days]`.
///
/// A single sample degenerates to `[0.0]`. Otherwise the spacing is
/// `days / (days - 1)` and the last sample lands exactly on `days`.
pub fn time_grid(days: u32) -> Vec<f64> {
    if days == 1 {
        return vec![0.0];
    }
    let span = f64::from(days);
    let last = f64::from(days - 1);
    (0..days).map(|k| f64::from(k) * span / last).collect()
}

/// Runs the scenario with default solver settings.
pub fn simulate(scenario: &SirScenario) -> Result<SirTrajectory, SirError> {
    simulate_with(scenario, &SolverSettings::default())
}

/// Runs the scenario with explicit solver settings.
///
/// Validation happens up front; once integration starts the only remaining
/// failure class is `Numeric`.
pub fn simulate_with(
    scenario: &SirScenario,
    settings: &SolverSettings,
) -> Result<SirTrajectory, SirError> {
    scenario.check()?;
    settings.check()?;

    let grid = time_grid(scenario.days);
    let model = SirModel::new(scenario.beta, scenario.gamma);
    let state = scenario.initial_state();

    let samples = match settings.method {
        Method::Dopri5 => integrate_adaptive(&model, &grid, state, settings)?,
        Method::Rk4 { substeps } => integrate_fixed(&model, &grid, state, substeps),
    };

    for (index, sample) in samples.iter().enumerate() {
        if sample.iter().any(|v| !v.is_finite()) {
            return Err(SirError::Numeric {
                reason: format!("non-finite state at t = {}", grid[index]),
            });
        }
    }

    let mut trajectory = SirTrajectory {
        time: grid,
        susceptible: Vec::with_capacity(samples.len()),
        infected: Vec::with_capacity(samples.len()),
        recovered: Vec::with_capacity(samples.len()),
    };
    for [s, i, r] in samples {
        trajectory.susceptible.push(s);
        trajectory.infected.push(i);
        trajectory.recovered.push(r);
    }
    Ok(trajectory)
}

/// Marches the adaptive stepper interval by interval, clamping the trial
/// step so every grid point is hit exactly.
fn integrate_adaptive(
    model: &SirModel<f64>,
    grid: &[f64],
    mut state: [f64; 3],
    settings: &SolverSettings,
) -> Result<Vec<[f64; 3]>, SirError> {
    let mut stepper = Dopri5::new(model.dimension());
    let mut samples = Vec::with_capacity(grid.len());
    samples.push(state);

    if grid.len() == 1 {
        return Ok(samples);
    }

    let mut t = grid[0];
    // Initial guess; the controller adjusts it from the first error norm on.
    let mut dt = (grid[1] - grid[0]) / 10.0;

    for &end in &grid[1..] {
        let mut attempts = 0usize;
        while t < end {
            if attempts >= settings.max_steps_per_interval {
                return Err(SirError::Numeric {
                    reason: format!(
                        "step budget of {} exhausted near t = {t}",
                        settings.max_steps_per_interval
                    ),
                });
            }
            attempts += 1;

            let trial = dt.min(end - t);
            let norm =
                stepper.attempt_step(model, t, &state, trial, settings.rel_tol, settings.abs_tol);

            if !norm.is_finite() {
                // The trial state escaped the evaluable region; shrink and retry.
                dt = trial * 0.5;
                if dt < MIN_STEP {
                    return Err(SirError::Numeric {
                        reason: format!("step size underflow near t = {t}"),
                    });
                }
                continue;
            }

            if norm <= 1.0 {
                stepper.accept_step(&mut state);
                t += trial;
            }

            let factor = if norm == 0.0 {
                5.0
            } else {
                (0.9 * norm.powf(-0.2)).clamp(0.2, 5.0)
            };
            dt = trial * factor;
            if dt < MIN_STEP {
                return Err(SirError::Numeric {
                    reason: format!("step size underflow near t = {t}"),
                });
            }
        }
        samples.push(state);
    }
    Ok(samples)
}

/// Advances the fixed-step solver by `substeps` equal steps per interval.
fn integrate_fixed(
    model: &SirModel<f64>,
    grid: &[f64],
    mut state: [f64; 3],
    substeps: usize,
) -> Vec<[f64; 3]> {
    let mut stepper = Rk4::new(model.dimension());
    let mut samples = Vec::with_capacity(grid.len());
    samples.push(state);

    let mut t = grid[0];
    for window in grid.windows(2) {
        let dt = (window[1] - window[0]) / substeps as f64;
        for _ in 0..substeps {
            stepper.step(model, &mut t, &mut state, dt);
        }
        // Snap to the grid point so rounding never drifts across intervals.
        t = window[1];
        samples.push(state);
    }
    samples
}
