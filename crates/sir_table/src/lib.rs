//! Tabular presentation of a finished SIR run.
//!
//! Turns a `SirTrajectory` into row-per-day records and renders them as
//! CSV with a fixed `day,susceptible,infected,recovered` header.

use serde::Serialize;
use std::fmt::Write;

use sir_core::simulate::SirTrajectory;

/// One output row: a grid time with its compartment values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SirRecord {
    pub day: f64,
    pub susceptible: f64,
    pub infected: f64,
    pub recovered: f64,
}

/// Zips the trajectory's columns into row records, preserving grid order.
pub fn records(trajectory: &SirTrajectory) -> Vec<SirRecord> {
    (0..trajectory.len())
        .map(|k| SirRecord {
            day: trajectory.time[k],
            susceptible: trajectory.susceptible[k],
            infected: trajectory.infected[k],
            recovered: trajectory.recovered[k],
        })
        .collect()
}

/// Renders records as CSV, header first, one row per record.
pub fn to_csv(rows: &[SirRecord]) -> String {
    let mut out = String::from("day,susceptible,infected,recovered\n");
    for row in rows {
        // Writing to a String cannot fail.
        let _ = writeln!(
            out,
            "{},{},{},{}",
            row.day, row.susceptible, row.infected, row.recovered
        );
    }
    out
}
