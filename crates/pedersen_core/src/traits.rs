use anyhow::Result;
use num_traits::{Float, FromPrimitive};
use std::fmt::Debug;

/// A trait for types the speed law can be evaluated in.
/// Must support basic arithmetic, debug printing, and conversion from f64.
pub trait Scalar: Float + FromPrimitive + Debug + 'static {}

impl<T: Float + FromPrimitive + Debug + 'static> Scalar for T {}

/// n^2 linear law: c(z) = c0 / sqrt(1 + 2 g0 z / c0), z measured down from the surface.
///
/// Generic over [`Scalar`] so the law can also fill single-precision buffers; the ray models
/// evaluate it at `f64`.
pub fn n2_linear_speed<T: Scalar>(surface_speed: T, surface_gradient: T, depth: T) -> T {
    let two = T::one() + T::one();
    surface_speed / (T::one() + two * surface_gradient * depth / surface_speed).sqrt()
}

/// A depth-dependent sound speed law expressed in the model's own position coordinate
/// (depth for flat models, radius from the centre of curvature for curved ones).
pub trait SoundSpeedModel: Sync {
    /// Speed of sound at `position` (m/s).
    fn speed(&self, position: f64) -> f64;

    /// Snell's law scale factor at `position`: 1 in flat coordinates, the radius in curved ones.
    fn scale(&self, position: f64) -> f64;

    /// Position of the ocean surface, the outer end of every vertex bracket.
    fn surface_position(&self) -> f64;

    fn position_at_depth(&self, depth: f64) -> f64;

    fn depth_at_position(&self, position: f64) -> f64;

    /// Rejects depths outside the domain where the speed law is real and positive.
    fn check_depth(&self, depth: f64) -> Result<()>;

    /// Evaluates the speed law over a batch of positions.
    fn speeds(&self, positions: &[f64]) -> Vec<f64> {
        positions.iter().map(|&p| self.speed(p)).collect()
    }

    /// Cosine of the local grazing angle for a ray with `ray_parameter` at `position`.
    fn cosine(&self, ray_parameter: f64, position: f64) -> f64 {
        ray_parameter * self.speed(position) / self.scale(position)
    }

    /// Snell's law invariant for a ray launched at `angle_deg` from `position`.
    fn ray_parameter(&self, position: f64, angle_deg: f64) -> f64 {
        self.scale(position) * angle_deg.to_radians().cos() / self.speed(position)
    }
}
