use anyhow::{bail, Result};

/// Shape-preserving piecewise cubic Hermite interpolant (Fritsch-Carlson slopes).
///
/// Between samples the curve never overshoots the data, so a monotone run of samples yields a
/// monotone interpolant.
#[derive(Debug, Clone, PartialEq)]
pub struct Pchip {
    x: Vec<f64>,
    y: Vec<f64>,
    slopes: Vec<f64>,
}

impl Pchip {
    /// Builds the interpolant. `x` must be finite and strictly increasing.
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Result<Self> {
        if x.len() != y.len() {
            bail!(
                "Interpolation abscissa and ordinate lengths differ ({} vs {}).",
                x.len(),
                y.len()
            );
        }
        if x.is_empty() {
            bail!("Interpolation requires at least one sample.");
        }
        if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
            bail!("Interpolation samples must be finite.");
        }
        if x.windows(2).any(|w| w[1] <= w[0]) {
            bail!("Interpolation abscissa must be strictly increasing.");
        }
        let slopes = pchip_slopes(&x, &y);
        Ok(Self { x, y, slopes })
    }

    pub fn domain(&self) -> (f64, f64) {
        (self.x[0], self.x[self.x.len() - 1])
    }

    pub fn evaluate(&self, t: f64) -> f64 {
        let n = self.x.len();
        if n == 1 {
            return self.y[0];
        }
        // interval k with x[k] <= t < x[k+1], clamped to the end intervals
        let k = self.x.partition_point(|&xi| xi <= t).clamp(1, n - 1) - 1;

        let h = self.x[k + 1] - self.x[k];
        let s = (t - self.x[k]) / h;
        let s2 = s * s;
        let s3 = s2 * s;
        let h00 = 2.0 * s3 - 3.0 * s2 + 1.0;
        let h10 = s3 - 2.0 * s2 + s;
        let h01 = -2.0 * s3 + 3.0 * s2;
        let h11 = s3 - s2;
        h00 * self.y[k] + h10 * h * self.slopes[k] + h01 * self.y[k + 1] + h11 * h * self.slopes[k + 1]
    }

    pub fn evaluate_many(&self, points: &[f64]) -> Vec<f64> {
        points.iter().map(|&t| self.evaluate(t)).collect()
    }
}

fn pchip_slopes(x: &[f64], y: &[f64]) -> Vec<f64> {
    let n = x.len();
    if n == 1 {
        return vec![0.0];
    }
    let h: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();
    let delta: Vec<f64> = (0..n - 1).map(|k| (y[k + 1] - y[k]) / h[k]).collect();
    if n == 2 {
        return vec![delta[0], delta[0]];
    }

    let mut slopes = vec![0.0; n];
    for k in 1..n - 1 {
        if delta[k - 1] * delta[k] <= 0.0 {
            slopes[k] = 0.0;
        } else {
            // weighted harmonic mean
            let w1 = 2.0 * h[k] + h[k - 1];
            let w2 = h[k] + 2.0 * h[k - 1];
            slopes[k] = (w1 + w2) / (w1 / delta[k - 1] + w2 / delta[k]);
        }
    }
    slopes[0] = end_slope(h[0], h[1], delta[0], delta[1]);
    slopes[n - 1] = end_slope(h[n - 2], h[n - 3], delta[n - 2], delta[n - 3]);
    slopes
}

/// One-sided three-point slope, limited so the end interval stays shape preserving.
fn end_slope(h0: f64, h1: f64, d0: f64, d1: f64) -> f64 {
    let slope = ((2.0 * h0 + h1) * d0 - h0 * d1) / (h0 + h1);
    if slope.signum() != d0.signum() || d0 == 0.0 {
        0.0
    } else if d0.signum() != d1.signum() && slope.abs() > 3.0 * d0.abs() {
        3.0 * d0
    } else {
        slope
    }
}
