//! Adaptive Gauss-Kronrod quadrature with a turning-point substitution.
//!
//! Ray integrals over position behave like 1/sqrt(p - p_vertex) at the vertex. Writing
//! p = p_vertex +/- u^2 turns dp into 2u du and cancels the inverse square root, so the
//! integrand in u is smooth and the Kronrod rule (which never samples interval endpoints)
//! converges normally.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuadratureSettings {
    pub abs_tolerance: f64,
    pub rel_tolerance: f64,
    /// Upper bound on the number of subintervals kept by the adaptive loop.
    pub max_intervals: usize,
}

impl Default for QuadratureSettings {
    fn default() -> Self {
        Self {
            abs_tolerance: 1e-10,
            rel_tolerance: 1e-10,
            max_intervals: 200,
        }
    }
}

impl QuadratureSettings {
    pub fn validate(&self) -> Result<()> {
        if !self.abs_tolerance.is_finite() || self.abs_tolerance <= 0.0 {
            bail!("Quadrature abs_tolerance must be finite and positive.");
        }
        if !self.rel_tolerance.is_finite() || self.rel_tolerance <= 0.0 {
            bail!("Quadrature rel_tolerance must be finite and positive.");
        }
        if self.max_intervals == 0 {
            bail!("Quadrature max_intervals must be greater than zero.");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quadrature {
    pub value: f64,
    pub error: f64,
    pub intervals: usize,
    pub converged: bool,
}

// 15-point Kronrod abscissae (non-negative half) and weights, with the embedded 7-point Gauss
// weights for the odd-indexed abscissae.
const XGK: [f64; 8] = [
    0.991455371120812639206854697526329,
    0.949107912342758524526189684047851,
    0.864864423359769072789712788640926,
    0.741531185599394439863864773280788,
    0.586087235467691130294144845693013,
    0.405845151377397166906606412076961,
    0.207784955007898467600689403773245,
    0.000000000000000000000000000000000,
];

const WGK: [f64; 8] = [
    0.022935322010529224963732008058970,
    0.063092092629978553290700663189204,
    0.104790010322250183839876322541518,
    0.140653259715525918745189590510238,
    0.169004726639267902826583426598550,
    0.190350578064785409913256402421014,
    0.204432940075298892414161999234649,
    0.209482141084727828012999174891714,
];

const WG: [f64; 4] = [
    0.129484966168869693270611432679082,
    0.279705391489276667901467771423780,
    0.381830050505118944950369775488975,
    0.417959183673469387755102040816327,
];

#[derive(Debug, Clone, Copy)]
struct Segment {
    lower: f64,
    upper: f64,
    value: f64,
    error: f64,
}

fn kronrod_segment<F: Fn(f64) -> f64>(f: &F, lower: f64, upper: f64) -> Segment {
    let center = 0.5 * (lower + upper);
    let half = 0.5 * (upper - lower);

    let f_center = f(center);
    let mut kronrod = WGK[7] * f_center;
    let mut gauss = WG[3] * f_center;
    for j in 0..7 {
        let offset = half * XGK[j];
        let pair = f(center - offset) + f(center + offset);
        kronrod += WGK[j] * pair;
        if j % 2 == 1 {
            gauss += WG[j / 2] * pair;
        }
    }

    Segment {
        lower,
        upper,
        value: kronrod * half,
        error: ((kronrod - gauss) * half).abs(),
    }
}

/// Globally adaptive integration of `f` over [lower, upper]: the segment with the largest
/// error estimate is bisected until the summed error meets the tolerance.
pub fn integrate<F: Fn(f64) -> f64>(
    f: F,
    lower: f64,
    upper: f64,
    settings: &QuadratureSettings,
) -> Quadrature {
    if lower == upper {
        return Quadrature {
            value: 0.0,
            error: 0.0,
            intervals: 0,
            converged: true,
        };
    }

    let mut segments = vec![kronrod_segment(&f, lower, upper)];
    loop {
        let value: f64 = segments.iter().map(|s| s.value).sum();
        let error: f64 = segments.iter().map(|s| s.error).sum();
        let target = settings.abs_tolerance.max(settings.rel_tolerance * value.abs());

        let converged = error <= target;
        if converged || segments.len() >= settings.max_intervals || !error.is_finite() {
            if !converged {
                tracing::warn!(
                    value,
                    error,
                    intervals = segments.len(),
                    "quadrature stopped before reaching tolerance"
                );
            }
            return Quadrature {
                value,
                error,
                intervals: segments.len(),
                converged,
            };
        }

        let worst = segments
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.error.total_cmp(&b.1.error))
            .map(|(idx, _)| idx)
            .unwrap_or(0);
        let segment = segments.swap_remove(worst);
        let mid = 0.5 * (segment.lower + segment.upper);
        if mid <= segment.lower.min(segment.upper) || mid >= segment.lower.max(segment.upper) {
            // interval cannot be split further in floating point
            segments.push(segment);
            let value: f64 = segments.iter().map(|s| s.value).sum();
            let error: f64 = segments.iter().map(|s| s.error).sum();
            return Quadrature {
                value,
                error,
                intervals: segments.len(),
                converged: false,
            };
        }
        segments.push(kronrod_segment(&f, segment.lower, mid));
        segments.push(kronrod_segment(&f, mid, segment.upper));
    }
}

/// Integrates `f` over the positions between `vertex` and `anchor` (in either order) with
/// respect to |dp|, removing an inverse square root singularity at `vertex`.
pub fn integrate_from_vertex<F: Fn(f64) -> f64>(
    f: F,
    vertex: f64,
    anchor: f64,
    settings: &QuadratureSettings,
) -> Quadrature {
    let direction = if anchor >= vertex { 1.0 } else { -1.0 };
    let extent = (anchor - vertex).abs().sqrt();
    integrate(
        |u| 2.0 * u * f(vertex + direction * u * u),
        0.0,
        extent,
        settings,
    )
}
