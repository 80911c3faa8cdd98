//! Eigenrays from a launch-angle sweep.
//!
//! Each source angle is carried to the target depth with Snell's law, one refraction cycle is
//! solved at both ends and the two are averaged into a source-to-target hop. Across the sweep
//! the hop range rises to a single maximum (the fold) and falls again; the rising side is the
//! direct branch and the falling side, read backwards, is the folded branch. Each branch is
//! interpolated onto the requested target ranges it actually covers.

use crate::cycle::{analytic_cycle, check_angles, map_angles, CycleTable, SolverSettings};
use crate::interpolate::Pchip;
use crate::traits::SoundSpeedModel;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EigenrayRequest {
    /// Source depth below the surface (m).
    pub source_depth: f64,
    /// Launch angles at the source (deg, up positive), in sweep order.
    pub launch_angles: Vec<f64>,
    /// Target depth below the surface (m).
    pub target_depth: f64,
    /// Horizontal target ranges (m).
    pub target_ranges: Vec<f64>,
}

impl EigenrayRequest {
    pub fn validate(&self) -> Result<()> {
        check_angles(&self.launch_angles)?;
        if let Some(idx) = self.target_ranges.iter().position(|r| !r.is_finite()) {
            bail!("Target range at index {} must be finite.", idx);
        }
        Ok(())
    }
}

/// One family of eigenrays, as parallel arrays ordered by increasing range.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EigenrayBranch {
    pub range: Vec<f64>,
    pub travel_time: Vec<f64>,
    #[serde(rename = "source_de")]
    pub source_angle: Vec<f64>,
    #[serde(rename = "target_de")]
    pub target_angle: Vec<f64>,
}

impl EigenrayBranch {
    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    /// Mean travel time over mean range (s/m), the bulk slowness removed before comparing
    /// arrival structure between models. `None` for an empty branch or zero mean range.
    pub fn bulk_slowness(&self) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        let n = self.len() as f64;
        let mean_range = self.range.iter().sum::<f64>() / n;
        let mean_time = self.travel_time.iter().sum::<f64>() / n;
        if mean_range == 0.0 {
            return None;
        }
        Some(mean_time / mean_range)
    }

    /// Travel time with the bulk term `slowness * range` removed.
    pub fn reduced_travel_time(&self, slowness: f64) -> Vec<f64> {
        self.range
            .iter()
            .zip(&self.travel_time)
            .map(|(r, t)| t - slowness * r)
            .collect()
    }
}

/// Composite source-to-target hop for every surviving launch angle, in sweep order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EigenrayFan {
    pub source_angle: Vec<f64>,
    pub target_angle: Vec<f64>,
    pub range: Vec<f64>,
    pub travel_time: Vec<f64>,
}

impl EigenrayFan {
    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

/// The sweep sample with the largest hop range, where direct and folded paths meet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fold {
    pub index: usize,
    /// Source launch angle at the fold (deg).
    pub angle: f64,
    pub range: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EigenraySolution {
    pub direct: EigenrayBranch,
    pub folded: EigenrayBranch,
    pub fold: Option<Fold>,
    pub fan: EigenrayFan,
    pub source_cycles: CycleTable,
    pub target_cycles: CycleTable,
}

/// Snell's law cosine at the target for a ray leaving the source at `angle_deg`.
pub fn target_cosine<M: SoundSpeedModel + ?Sized>(
    model: &M,
    source: f64,
    target: f64,
    angle_deg: f64,
) -> f64 {
    angle_deg.to_radians().cos() * model.speed(target) / model.speed(source) * model.scale(source)
        / model.scale(target)
}

pub fn solve_eigenrays<M: SoundSpeedModel + ?Sized>(
    model: &M,
    request: &EigenrayRequest,
    settings: SolverSettings,
) -> Result<EigenraySolution> {
    settings.validate()?;
    model
        .check_depth(request.source_depth)
        .context("Invalid source depth.")?;
    model
        .check_depth(request.target_depth)
        .context("Invalid target depth.")?;
    request.validate()?;

    let source = model.position_at_depth(request.source_depth);
    let target = model.position_at_depth(request.target_depth);

    let mapped = map_angles(&request.launch_angles, |angle| {
        let cosine = target_cosine(model, source, target, angle);
        (cosine < 1.0).then(|| (angle, -cosine.acos().to_degrees()))
    });
    let (source_angles, target_angles): (Vec<f64>, Vec<f64>) = mapped.into_iter().flatten().unzip();
    let discarded = request.launch_angles.len() - source_angles.len();
    if discarded > 0 {
        tracing::debug!(discarded, "launch angles cannot reach the target depth");
    }
    if source_angles.is_empty() {
        return Ok(EigenraySolution::default());
    }

    let source_cycles = analytic_cycle(model, request.source_depth, &source_angles, settings)?;
    let target_cycles = analytic_cycle(model, request.target_depth, &target_angles, settings)?;

    let range: Vec<f64> = source_cycles
        .range
        .iter()
        .zip(&target_cycles.range)
        .map(|(s, t)| 0.5 * (s + t))
        .collect();
    let travel_time: Vec<f64> = source_cycles
        .travel_time
        .iter()
        .zip(&target_cycles.travel_time)
        .map(|(s, t)| 0.5 * (s + t))
        .collect();
    let fan = EigenrayFan {
        source_angle: source_angles,
        target_angle: target_angles,
        range,
        travel_time,
    };

    // first occurrence of the maximum
    let fold_index = fan
        .range
        .iter()
        .enumerate()
        .fold(0, |best, (idx, r)| if *r > fan.range[best] { idx } else { best });
    let fold = Fold {
        index: fold_index,
        angle: fan.source_angle[fold_index],
        range: fan.range[fold_index],
    };

    let direct = build_branch(&fan, 0..=fold_index, &request.target_ranges)
        .context("Failed to interpolate direct branch.")?;
    let folded = build_branch(&fan, (fold_index..fan.len()).rev(), &request.target_ranges)
        .context("Failed to interpolate folded branch.")?;
    tracing::trace!(
        fold_index,
        fold_angle = fold.angle,
        direct = direct.len(),
        folded = folded.len(),
        "eigenray branches built"
    );

    Ok(EigenraySolution {
        direct,
        folded,
        fold: Some(fold),
        fan,
        source_cycles,
        target_cycles,
    })
}

/// Relative range difference below which two neighbouring samples count as a tie.
const RANGE_TIE_TOLERANCE: f64 = 1e-9;

/// Interpolates one branch of the fan, visited in `order`, onto the target ranges it covers.
///
/// Along `order` the range must rise. Samples tied with their predecessor (floating-point
/// flatness at the fold) are dropped; any real decrease means the sweep is not single-peaked
/// and is an error.
fn build_branch(
    fan: &EigenrayFan,
    order: impl Iterator<Item = usize>,
    target_ranges: &[f64],
) -> Result<EigenrayBranch> {
    let mut x = Vec::new();
    let mut time = Vec::new();
    let mut source = Vec::new();
    let mut target = Vec::new();
    let mut dropped = 0usize;
    for idx in order {
        let r = fan.range[idx];
        if let Some(&last) = x.last() {
            if r <= last {
                if last - r > RANGE_TIE_TOLERANCE * last.abs().max(1.0) {
                    bail!(
                        "Composite range is not single-peaked: sample {} (launch angle {} deg, \
                         range {}) breaks the monotone run at range {}.",
                        idx,
                        fan.source_angle[idx],
                        r,
                        last
                    );
                }
                dropped += 1;
                continue;
            }
        }
        x.push(r);
        time.push(fan.travel_time[idx]);
        source.push(fan.source_angle[idx]);
        target.push(fan.target_angle[idx]);
    }
    if dropped > 0 {
        tracing::debug!(dropped, "tied samples dropped from branch");
    }
    if x.is_empty() {
        return Ok(EigenrayBranch::default());
    }

    let (lower, upper) = (x[0], x[x.len() - 1]);
    let mut queries: Vec<f64> = target_ranges
        .iter()
        .copied()
        .filter(|r| (lower..=upper).contains(r))
        .collect();
    queries.sort_by(f64::total_cmp);
    if queries.is_empty() {
        return Ok(EigenrayBranch::default());
    }

    let travel_time = Pchip::new(x.clone(), time)?.evaluate_many(&queries);
    let source_angle = Pchip::new(x.clone(), source)?.evaluate_many(&queries);
    let target_angle = Pchip::new(x, target)?.evaluate_many(&queries);
    Ok(EigenrayBranch {
        range: queries,
        travel_time,
        source_angle,
        target_angle,
    })
}
