//! The two coordinate conventions of the n^2 linear profile.
//!
//! The flat model works in depth below the surface. The curved model works in radius from the
//! centre of curvature and applies a flat-earth correction, so both describe the same ocean and
//! their ray geometry agrees to well under a metre over a few kilometres of range.

use crate::cycle::CycleSolution;
use crate::traits::{n2_linear_speed, SoundSpeedModel};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Radius of curvature used for curved-earth comparisons (m).
pub const EARTH_RADIUS: f64 = 6366.71e3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfileParams {
    /// Speed of sound at the ocean surface (m/s).
    pub surface_speed: f64,
    /// Sound speed gradient factor at the surface ((m/s)/m).
    pub surface_gradient: f64,
}

impl Default for ProfileParams {
    fn default() -> Self {
        Self {
            surface_speed: 1550.0,
            surface_gradient: 1.2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ProfileError {
    #[error("surface speed must be finite and positive, got {0}")]
    InvalidSurfaceSpeed(f64),
    #[error("surface gradient must be finite, got {0}")]
    InvalidSurfaceGradient(f64),
    #[error("earth radius must be finite and positive, got {0}")]
    InvalidEarthRadius(f64),
}

impl ProfileParams {
    pub fn validate(&self) -> Result<(), ProfileError> {
        if !self.surface_speed.is_finite() || self.surface_speed <= 0.0 {
            return Err(ProfileError::InvalidSurfaceSpeed(self.surface_speed));
        }
        if !self.surface_gradient.is_finite() {
            return Err(ProfileError::InvalidSurfaceGradient(self.surface_gradient));
        }
        Ok(())
    }

    pub fn speed_at_depth(&self, depth: f64) -> f64 {
        n2_linear_speed(self.surface_speed, self.surface_gradient, depth)
    }

    fn check_depth(&self, depth: f64) -> Result<()> {
        if !depth.is_finite() {
            bail!("Depth must be finite, got {depth}.");
        }
        if depth < 0.0 {
            bail!("Depth must be at or below the surface, got {depth}.");
        }
        let index_term = 1.0 + 2.0 * self.surface_gradient * depth / self.surface_speed;
        if index_term <= 0.0 {
            bail!(
                "Depth {} lies outside the valid domain of the speed law (1 + 2 g0 z / c0 = {}).",
                depth,
                index_term
            );
        }
        Ok(())
    }
}

/// Flat-earth n^2 linear profile, positions are depths below the surface (m).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CartesianProfile {
    params: ProfileParams,
}

impl CartesianProfile {
    pub fn new(params: ProfileParams) -> Result<Self, ProfileError> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &ProfileParams {
        &self.params
    }

    /// Closed-form cycle for the flat profile.
    ///
    /// With ray parameter m, the quantity 1/c(z)^2 - m^2 = A + B z is linear in depth, so the
    /// range integral of m / sqrt(A + B z) and the time integral of
    /// (A + B z + m^2) / sqrt(A + B z) have elementary antiderivatives. The vertex sits where
    /// A + B z vanishes, or at the surface when that depth is above it.
    pub fn closed_form_cycle(&self, anchor_depth: f64, angle_deg: f64) -> Result<CycleSolution> {
        self.check_depth(anchor_depth)?;
        if !angle_deg.is_finite() || angle_deg.abs() >= 90.0 {
            bail!("Launch angle must be finite and inside (-90, 90) degrees, got {angle_deg}.");
        }
        let c0 = self.params.surface_speed;
        let gradient = self.params.surface_gradient;
        if gradient == 0.0 {
            bail!("Closed-form cycle requires a non-zero surface gradient.");
        }

        let ray_parameter = self.ray_parameter(anchor_depth, angle_deg);
        let a = 1.0 / (c0 * c0) - ray_parameter * ray_parameter;
        let b = 2.0 * gradient / (c0 * c0 * c0);

        let vertex_depth = if a >= 0.0 { 0.0 } else { (-a / b).min(anchor_depth) };

        let root = |z: f64| (a + b * z).max(0.0).sqrt();
        let range_at = |z: f64| 2.0 * ray_parameter * root(z) / b;
        let time_at = |z: f64| {
            let r = root(z);
            2.0 * r * r * r / (3.0 * b) + 2.0 * ray_parameter * ray_parameter * r / b
        };

        Ok(CycleSolution {
            range: 2.0 * (range_at(anchor_depth) - range_at(vertex_depth)),
            travel_time: 2.0 * (time_at(anchor_depth) - time_at(vertex_depth)),
            vertex_position: vertex_depth,
            ray_parameter,
            converged: true,
        })
    }
}

impl SoundSpeedModel for CartesianProfile {
    fn speed(&self, position: f64) -> f64 {
        self.params.speed_at_depth(position)
    }

    fn scale(&self, _position: f64) -> f64 {
        1.0
    }

    fn surface_position(&self) -> f64 {
        0.0
    }

    fn position_at_depth(&self, depth: f64) -> f64 {
        depth
    }

    fn depth_at_position(&self, position: f64) -> f64 {
        position
    }

    fn check_depth(&self, depth: f64) -> Result<()> {
        self.params.check_depth(depth)
    }
}

/// Curved-earth n^2 linear profile, positions are radii from the centre of curvature (m).
///
/// c(r) = c0 / sqrt(1 + 2 g0 (R - r) / c0) * r / R
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphericalProfile {
    params: ProfileParams,
    earth_radius: f64,
}

impl SphericalProfile {
    pub fn new(params: ProfileParams, earth_radius: f64) -> Result<Self, ProfileError> {
        params.validate()?;
        if !earth_radius.is_finite() || earth_radius <= 0.0 {
            return Err(ProfileError::InvalidEarthRadius(earth_radius));
        }
        Ok(Self {
            params,
            earth_radius,
        })
    }

    pub fn params(&self) -> &ProfileParams {
        &self.params
    }

    pub fn earth_radius(&self) -> f64 {
        self.earth_radius
    }
}

impl SoundSpeedModel for SphericalProfile {
    fn speed(&self, position: f64) -> f64 {
        self.params.speed_at_depth(self.earth_radius - position) * position / self.earth_radius
    }

    fn scale(&self, position: f64) -> f64 {
        position
    }

    fn surface_position(&self) -> f64 {
        self.earth_radius
    }

    fn position_at_depth(&self, depth: f64) -> f64 {
        self.earth_radius - depth
    }

    fn depth_at_position(&self, position: f64) -> f64 {
        self.earth_radius - position
    }

    fn check_depth(&self, depth: f64) -> Result<()> {
        self.params.check_depth(depth)?;
        if depth >= self.earth_radius {
            bail!(
                "Depth {} reaches the centre of curvature (earth radius {}).",
                depth,
                self.earth_radius
            );
        }
        Ok(())
    }
}
