use serde::Serialize;

use crate::error::SirError;
use crate::simulate::{SirScenario, SirTrajectory};

/// Derived epidemic quantities for a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EpidemicSummary {
    /// Basic reproduction number `beta / gamma`.
    pub basic_reproduction_number: f64,
    /// Fraction of the population that must be immune to stop growth,
    /// `1 - 1/R0`, floored at zero when the epidemic cannot grow.
    pub herd_immunity_threshold: f64,
    /// Largest infected count observed on the grid.
    pub peak_infected: f64,
    /// Grid time at which the peak occurs. Ties resolve to the earliest.
    pub peak_day: f64,
    /// Recovered count at the final grid point.
    pub final_recovered: f64,
    /// Fraction of the population that left the susceptible compartment
    /// over the horizon.
    pub attack_rate: f64,
}

/// Reduces a trajectory to its headline epidemic quantities.
///
/// The trajectory is assumed to come from `simulate` for the same scenario;
/// an empty trajectory is the only rejected input.
pub fn summarize(
    scenario: &SirScenario,
    trajectory: &SirTrajectory,
) -> Result<EpidemicSummary, SirError> {
    if trajectory.is_empty() {
        return Err(SirError::Numeric {
            reason: "cannot summarize an empty trajectory".to_string(),
        });
    }

    let r0 = scenario.beta / scenario.gamma;
    let threshold = if r0 > 1.0 { 1.0 - 1.0 / r0 } else { 0.0 };

    let mut peak_index = 0;
    for (index, &value) in trajectory.infected.iter().enumerate() {
        if value > trajectory.infected[peak_index] {
            peak_index = index;
        }
    }

    let last = trajectory.len() - 1;
    let attack_rate =
        (trajectory.susceptible[0] - trajectory.susceptible[last]) / scenario.population;

    Ok(EpidemicSummary {
        basic_reproduction_number: r0,
        herd_immunity_threshold: threshold,
        peak_infected: trajectory.infected[peak_index],
        peak_day: trajectory.time[peak_index],
        final_recovered: trajectory.recovered[last],
        attack_rate,
    })
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::summarize;
    use crate::error::SirError;
    use crate::simulate::{simulate, SirScenario, SirTrajectory};

    fn classic() -> SirScenario {
        SirScenario {
            population: 1000.0,
            initial_infected: 1.0,
            initial_recovered: 0.0,
            beta: 0.3,
            gamma: 0.1,
            days: 100,
        }
    }

    #[test]
    fn reproduction_number_and_threshold_follow_the_rates() {
        let scenario = classic();
        let trajectory = simulate(&scenario).unwrap();
        let summary = summarize(&scenario, &trajectory).unwrap();

        assert_relative_eq!(summary.basic_reproduction_number, 3.0, max_relative = 1e-12);
        assert_relative_eq!(summary.herd_immunity_threshold, 2.0 / 3.0, max_relative = 1e-12);
    }

    #[test]
    fn subcritical_epidemic_has_zero_threshold() {
        let scenario = SirScenario {
            beta: 0.05,
            ..classic()
        };
        let trajectory = simulate(&scenario).unwrap();
        let summary = summarize(&scenario, &trajectory).unwrap();

        assert_relative_eq!(summary.basic_reproduction_number, 0.5, max_relative = 1e-12);
        assert_eq!(summary.herd_immunity_threshold, 0.0);
    }

    #[test]
    fn peak_and_attack_rate_match_the_trajectory() {
        let scenario = classic();
        let trajectory = simulate(&scenario).unwrap();
        let summary = summarize(&scenario, &trajectory).unwrap();

        let expected_peak = trajectory
            .infected
            .iter()
            .cloned()
            .fold(f64::MIN, f64::max);
        assert_eq!(summary.peak_infected, expected_peak);
        assert!(summary.peak_day > 0.0);
        assert!(summary.peak_day < 100.0);

        let last = trajectory.len() - 1;
        assert_eq!(summary.final_recovered, trajectory.recovered[last]);
        assert!(summary.attack_rate > 0.85);
        assert!(summary.attack_rate <= 1.0);
    }

    #[test]
    fn frozen_epidemic_summarizes_to_zeros() {
        let scenario = SirScenario {
            initial_infected: 0.0,
            ..classic()
        };
        let trajectory = simulate(&scenario).unwrap();
        let summary = summarize(&scenario, &trajectory).unwrap();

        assert!(summary.peak_infected.abs() < 1e-9);
        assert!(summary.final_recovered.abs() < 1e-9);
        assert!(summary.attack_rate.abs() < 1e-9);
    }

    #[test]
    fn empty_trajectory_is_rejected() {
        let trajectory = SirTrajectory {
            time: vec![],
            susceptible: vec![],
            infected: vec![],
            recovered: vec![],
        };
        let err = summarize(&classic(), &trajectory).unwrap_err();
        assert!(matches!(err, SirError::Numeric { .. }));
    }
}
