//! Numerical integration of the SIR compartmental epidemic model over a
//! fixed horizon, exposing the trajectory as per-compartment time series.
//!
//! Key components:
//! - **Traits**: `Scalar` (numeric type abstraction), `VectorField` (the ODE
//!   right-hand side), `Steppable` (fixed-step solvers).
//! - **Model**: the SIR vector field with transmission rate `beta` and
//!   recovery rate `gamma`.
//! - **Solvers**: a fixed-step RK4 and an embedded Dormand-Prince 5(4) pair.
//! - **Simulate**: the integrator driver producing a `SirTrajectory` sampled
//!   on a uniform day grid.
//! - **Summary**: derived epidemic quantities from a finished trajectory.

pub mod error;
pub mod model;
pub mod simulate;
pub mod solvers;
pub mod summary;
pub mod traits;
