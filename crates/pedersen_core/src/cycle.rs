use crate::quadrature::{integrate_from_vertex, QuadratureSettings};
use crate::traits::SoundSpeedModel;
use crate::vertex::{find_vertex, VertexSettings};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SolverSettings {
    pub vertex: VertexSettings,
    pub quadrature: QuadratureSettings,
}

impl SolverSettings {
    pub fn validate(&self) -> Result<()> {
        self.vertex.validate()?;
        self.quadrature.validate()
    }
}

/// One refraction cycle of a single ray: anchor to vertex and back to the anchor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CycleSolution {
    /// Horizontal range of the full cycle (m).
    pub range: f64,
    /// Travel time of the full cycle (s).
    pub travel_time: f64,
    /// Vertex in the model's position coordinate.
    pub vertex_position: f64,
    pub ray_parameter: f64,
    /// Whether both the range and time integrals met the quadrature tolerance.
    pub converged: bool,
}

/// Cycle solutions for a launch-angle sweep, stored as parallel arrays in sweep order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CycleTable {
    pub range: Vec<f64>,
    pub travel_time: Vec<f64>,
    pub vertex_position: Vec<f64>,
    pub ray_parameter: Vec<f64>,
    pub converged: Vec<bool>,
}

impl CycleTable {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            range: Vec::with_capacity(capacity),
            travel_time: Vec::with_capacity(capacity),
            vertex_position: Vec::with_capacity(capacity),
            ray_parameter: Vec::with_capacity(capacity),
            converged: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    /// True when every cycle in the table met the quadrature tolerance.
    pub fn all_converged(&self) -> bool {
        self.converged.iter().all(|&c| c)
    }

    pub fn push(&mut self, cycle: CycleSolution) {
        self.range.push(cycle.range);
        self.travel_time.push(cycle.travel_time);
        self.vertex_position.push(cycle.vertex_position);
        self.ray_parameter.push(cycle.ray_parameter);
        self.converged.push(cycle.converged);
    }

    pub fn get(&self, index: usize) -> Option<CycleSolution> {
        Some(CycleSolution {
            range: *self.range.get(index)?,
            travel_time: *self.travel_time.get(index)?,
            vertex_position: *self.vertex_position.get(index)?,
            ray_parameter: *self.ray_parameter.get(index)?,
            converged: *self.converged.get(index)?,
        })
    }
}

impl FromIterator<CycleSolution> for CycleTable {
    fn from_iter<I: IntoIterator<Item = CycleSolution>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut table = CycleTable::with_capacity(iter.size_hint().0);
        for cycle in iter {
            table.push(cycle);
        }
        table
    }
}

/// Maps every launch angle independently, keeping sweep order.
#[cfg(feature = "parallel")]
pub(crate) fn map_angles<T, F>(angles: &[f64], f: F) -> Vec<T>
where
    T: Send,
    F: Fn(f64) -> T + Sync + Send,
{
    angles.par_iter().map(|&angle| f(angle)).collect()
}

#[cfg(not(feature = "parallel"))]
pub(crate) fn map_angles<T, F>(angles: &[f64], f: F) -> Vec<T>
where
    T: Send,
    F: Fn(f64) -> T + Sync + Send,
{
    angles.iter().map(|&angle| f(angle)).collect()
}

pub(crate) fn check_angles(angles: &[f64]) -> Result<()> {
    for (idx, angle) in angles.iter().enumerate() {
        if !angle.is_finite() || angle.abs() >= 90.0 {
            bail!(
                "Launch angle {} at index {} must be finite and inside (-90, 90) degrees.",
                angle,
                idx
            );
        }
    }
    Ok(())
}

/// Cycle range and time for one ray launched at `angle_deg` from `anchor` (a model position).
///
/// Range is twice the integral of cot(a) / scale(p) from vertex to anchor, rescaled by the
/// anchor's Snell scale. Time is twice the integral of 1 / (c(p) sin(a)). A cycle whose
/// integrals stop at `max_intervals` before meeting the tolerance keeps its best estimate and
/// is flagged with `converged = false`.
pub fn cycle_solution<M: SoundSpeedModel + ?Sized>(
    model: &M,
    anchor: f64,
    angle_deg: f64,
    settings: &SolverSettings,
) -> CycleSolution {
    let ray_parameter = model.ray_parameter(anchor, angle_deg);
    let vertex = find_vertex(model, ray_parameter, anchor, &settings.vertex);

    let range_integrand = |p: f64| {
        let cosine = model.cosine(ray_parameter, p);
        let sine = (1.0 - cosine * cosine).max(0.0).sqrt();
        if sine == 0.0 {
            return 0.0;
        }
        cosine / (sine * model.scale(p))
    };
    let time_integrand = |p: f64| {
        let speed = model.speed(p);
        let cosine = ray_parameter * speed / model.scale(p);
        let sine = (1.0 - cosine * cosine).max(0.0).sqrt();
        if sine == 0.0 {
            return 0.0;
        }
        1.0 / (speed * sine)
    };

    let range = integrate_from_vertex(range_integrand, vertex.position, anchor, &settings.quadrature);
    let time = integrate_from_vertex(time_integrand, vertex.position, anchor, &settings.quadrature);

    CycleSolution {
        range: 2.0 * model.scale(anchor) * range.value,
        travel_time: 2.0 * time.value,
        vertex_position: vertex.position,
        ray_parameter,
        converged: range.converged && time.converged,
    }
}

/// Cycle solutions for a sweep of launch angles (degrees, up positive) from `anchor_depth`.
pub fn analytic_cycle<M: SoundSpeedModel + ?Sized>(
    model: &M,
    anchor_depth: f64,
    angles: &[f64],
    settings: SolverSettings,
) -> Result<CycleTable> {
    settings.validate()?;
    model.check_depth(anchor_depth)?;
    check_angles(angles)?;

    let anchor = model.position_at_depth(anchor_depth);
    let cycles = map_angles(angles, |angle| {
        cycle_solution(model, anchor, angle, &settings)
    });
    Ok(cycles.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{CartesianProfile, ProfileParams, SphericalProfile, EARTH_RADIUS};

    fn assert_err_contains<T: std::fmt::Debug>(result: Result<T>, needle: &str) {
        let err = result.expect_err("expected error");
        let message = format!("{err}");
        assert!(
            message.contains(needle),
            "expected error to contain \"{needle}\", got \"{message}\""
        );
    }

    fn cartesian() -> CartesianProfile {
        CartesianProfile::new(ProfileParams::default()).expect("profile")
    }

    #[test]
    fn quadrature_matches_closed_form_for_turning_and_truncated_rays() {
        let profile = cartesian();
        let angles: Vec<f64> = (0..12).map(|i| 1.0 + 2.0 * i as f64).collect();
        let table = analytic_cycle(&profile, 75.0, &angles, SolverSettings::default())
            .expect("cycle");
        for (idx, &angle) in angles.iter().enumerate() {
            let exact = profile.closed_form_cycle(75.0, angle).expect("closed form");
            let cycle = table.get(idx).expect("entry");
            assert!(
                (cycle.range - exact.range).abs() < 1e-3,
                "range mismatch at {angle} deg: {} vs {}",
                cycle.range,
                exact.range
            );
            assert!((cycle.travel_time - exact.travel_time).abs() < 1e-6);
            assert!((cycle.vertex_position - exact.vertex_position).abs() < 1e-9);
            assert_eq!(cycle.ray_parameter, exact.ray_parameter);
        }
    }

    #[test]
    fn deep_cycles_match_closed_form() {
        let profile = cartesian();
        let angles: Vec<f64> = (20..60).map(f64::from).collect();
        let table = analytic_cycle(&profile, 1000.0, &angles, SolverSettings::default())
            .expect("cycle");
        for (idx, &angle) in angles.iter().enumerate() {
            let exact = profile.closed_form_cycle(1000.0, angle).expect("closed form");
            assert!((table.range[idx] - exact.range).abs() < 1e-3);
            assert!((table.travel_time[idx] - exact.travel_time).abs() < 1e-6);
        }
    }

    #[test]
    fn ranges_are_non_negative_and_vertices_bounded() {
        let profile = SphericalProfile::new(ProfileParams::default(), EARTH_RADIUS).expect("profile");
        let angles: Vec<f64> = (20..60).map(f64::from).collect();
        let table = analytic_cycle(&profile, 1000.0, &angles, SolverSettings::default())
            .expect("cycle");
        let anchor = profile.position_at_depth(1000.0);
        assert_eq!(table.len(), angles.len());
        for idx in 0..table.len() {
            assert!(table.range[idx] >= 0.0);
            assert!(table.vertex_position[idx] >= anchor);
            assert!(table.vertex_position[idx] <= EARTH_RADIUS);
        }
    }

    #[test]
    fn horizontal_launch_has_zero_cycle() {
        let profile = cartesian();
        let table = analytic_cycle(&profile, 75.0, &[0.0], SolverSettings::default())
            .expect("cycle");
        assert_eq!(table.range[0], 0.0);
        assert_eq!(table.travel_time[0], 0.0);
        assert_eq!(table.vertex_position[0], 75.0);
        assert!(table.converged[0]);
    }

    #[test]
    fn repeated_sweeps_are_identical() {
        let profile = cartesian();
        let angles = [3.0, 11.0, 17.0, 21.0];
        let first = analytic_cycle(&profile, 75.0, &angles, SolverSettings::default())
            .expect("cycle");
        let second = analytic_cycle(&profile, 75.0, &angles, SolverSettings::default())
            .expect("cycle");
        assert_eq!(first, second);
    }

    #[test]
    fn unconverged_quadrature_is_flagged() {
        let profile = cartesian();
        let defaults = analytic_cycle(&profile, 1000.0, &[30.0], SolverSettings::default())
            .expect("cycle");
        assert!(defaults.all_converged());

        let mut settings = SolverSettings::default();
        settings.quadrature.abs_tolerance = 1e-300;
        settings.quadrature.rel_tolerance = 1e-300;
        settings.quadrature.max_intervals = 1;
        let starved = analytic_cycle(&profile, 1000.0, &[30.0], settings).expect("cycle");
        assert_eq!(starved.converged, vec![false]);
        assert!(!starved.all_converged());
        assert!((starved.range[0] - defaults.range[0]).abs() < 1.0);
    }

    #[test]
    fn empty_sweep_gives_empty_table() {
        let table = analytic_cycle(&cartesian(), 75.0, &[], SolverSettings::default())
            .expect("cycle");
        assert!(table.is_empty());
    }

    #[test]
    fn rejects_invalid_inputs() {
        let profile = cartesian();
        assert_err_contains(
            analytic_cycle(&profile, 75.0, &[10.0, 90.0], SolverSettings::default()),
            "index 1",
        );
        assert_err_contains(
            analytic_cycle(&profile, -5.0, &[10.0], SolverSettings::default()),
            "at or below the surface",
        );
        let mut settings = SolverSettings::default();
        settings.vertex.max_steps = 0;
        assert_err_contains(analytic_cycle(&profile, 75.0, &[10.0], settings), "max_steps");
    }
}
