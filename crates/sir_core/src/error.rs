use thiserror::Error;

/// Failure classes for a simulation run.
///
/// Input inconsistencies are detected before any integration step executes;
/// `Numeric` is surfaced verbatim from the integration loop. No variant is
/// ever recovered or substituted internally.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SirError {
    /// The initial compartments are inconsistent: non-positive or non-finite
    /// population, negative initial counts, or initial infected plus
    /// recovered exceeding the population.
    #[error("invalid population: {reason}")]
    InvalidPopulation { reason: String },

    /// Non-physical rate parameters, a degenerate time grid request, or
    /// unusable solver settings.
    #[error("invalid parameter: {reason}")]
    InvalidParameter { reason: String },

    /// The integrator could not advance or produced non-finite values.
    #[error("numeric failure: {reason}")]
    Numeric { reason: String },
}
