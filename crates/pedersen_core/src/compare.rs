use crate::cycle::{analytic_cycle, CycleTable, SolverSettings};
use crate::profile::{CartesianProfile, ProfileParams, SphericalProfile};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Worst-case disagreement between two cycle tables computed over the same sweep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CycleComparison {
    /// Largest absolute cycle range difference (m).
    pub max_range_difference: f64,
    /// Largest absolute cycle time difference (s).
    pub max_time_difference: f64,
}

impl CycleComparison {
    pub fn within(&self, range_tolerance: f64, time_tolerance: f64) -> bool {
        self.max_range_difference <= range_tolerance && self.max_time_difference <= time_tolerance
    }
}

pub fn compare_cycles(first: &CycleTable, second: &CycleTable) -> Result<CycleComparison> {
    if first.len() != second.len() {
        bail!(
            "Cycle tables have different lengths ({} vs {}).",
            first.len(),
            second.len()
        );
    }
    let max_abs_diff = |a: &[f64], b: &[f64]| {
        a.iter()
            .zip(b)
            .map(|(x, y)| (x - y).abs())
            .fold(0.0, f64::max)
    };
    Ok(CycleComparison {
        max_range_difference: max_abs_diff(&first.range, &second.range),
        max_time_difference: max_abs_diff(&first.travel_time, &second.travel_time),
    })
}

/// Solves the same sweep in flat and curved coordinates and compares the cycles.
pub fn compare_coordinate_systems(
    params: ProfileParams,
    earth_radius: f64,
    anchor_depth: f64,
    angles: &[f64],
    settings: SolverSettings,
) -> Result<CycleComparison> {
    let flat = CartesianProfile::new(params)?;
    let curved = SphericalProfile::new(params, earth_radius)?;
    let flat_cycles = analytic_cycle(&flat, anchor_depth, angles, settings)
        .context("Flat-earth cycle solve failed.")?;
    let curved_cycles = analytic_cycle(&curved, anchor_depth, angles, settings)
        .context("Curved-earth cycle solve failed.")?;
    compare_cycles(&flat_cycles, &curved_cycles)
}
