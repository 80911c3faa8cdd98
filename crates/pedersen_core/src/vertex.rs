use crate::traits::SoundSpeedModel;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VertexSettings {
    /// Absolute position tolerance of the bracketed search (m).
    pub tolerance: f64,
    pub max_steps: usize,
}

impl Default for VertexSettings {
    fn default() -> Self {
        Self {
            tolerance: 1e-12,
            max_steps: 200,
        }
    }
}

impl VertexSettings {
    pub fn validate(&self) -> Result<()> {
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            bail!("Vertex tolerance must be finite and positive.");
        }
        if self.max_steps == 0 {
            bail!("Vertex max_steps must be greater than zero.");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VertexKind {
    /// The ray turns horizontal strictly between the surface and the anchor.
    Turning,
    /// No turning point before the surface; the vertex is truncated to the surface.
    Surface,
    /// The ray is already horizontal at the anchor.
    Anchor,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub position: f64,
    pub kind: VertexKind,
    pub iterations: usize,
}

/// 1 - cos(a) at `position`: positive on the anchor side of the vertex, negative beyond it.
pub fn vertex_difference<M: SoundSpeedModel + ?Sized>(
    model: &M,
    ray_parameter: f64,
    position: f64,
) -> f64 {
    1.0 - model.cosine(ray_parameter, position)
}

/// Locates the turning point of a ray between the surface and `anchor`.
///
/// The returned position always lies on the anchor side of the true root, so the local sine
/// stays real over the whole integration interval.
pub fn find_vertex<M: SoundSpeedModel + ?Sized>(
    model: &M,
    ray_parameter: f64,
    anchor: f64,
    settings: &VertexSettings,
) -> Vertex {
    let surface = model.surface_position();
    let at_surface = vertex_difference(model, ray_parameter, surface);
    let at_anchor = vertex_difference(model, ray_parameter, anchor);

    // horizontal at the anchor, to within rounding of cos(a) = 1
    if at_anchor <= 4.0 * f64::EPSILON {
        return Vertex {
            position: anchor,
            kind: VertexKind::Anchor,
            iterations: 0,
        };
    }
    if at_surface >= 0.0 {
        tracing::trace!(ray_parameter, "vertex truncated to surface");
        return Vertex {
            position: surface,
            kind: VertexKind::Surface,
            iterations: 0,
        };
    }

    // f(beyond) < 0 < f(inside)
    let mut beyond = surface;
    let mut inside = anchor;
    let mut iterations = 0usize;
    while iterations < settings.max_steps {
        if (inside - beyond).abs() <= settings.tolerance {
            break;
        }
        let mid = 0.5 * (beyond + inside);
        if mid == beyond || mid == inside {
            break;
        }
        iterations += 1;
        if vertex_difference(model, ray_parameter, mid) < 0.0 {
            beyond = mid;
        } else {
            inside = mid;
        }
    }

    Vertex {
        position: inside,
        kind: VertexKind::Turning,
        iterations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{CartesianProfile, ProfileParams, SphericalProfile, EARTH_RADIUS};

    fn cartesian() -> CartesianProfile {
        CartesianProfile::new(ProfileParams::default()).expect("profile")
    }

    #[test]
    fn settings_validation_rejects_bad_values() {
        let zero_tol = VertexSettings {
            tolerance: 0.0,
            ..VertexSettings::default()
        };
        assert!(zero_tol.validate().is_err());
        let no_steps = VertexSettings {
            max_steps: 0,
            ..VertexSettings::default()
        };
        assert!(no_steps.validate().is_err());
        assert!(VertexSettings::default().validate().is_ok());
    }

    #[test]
    fn finds_turning_point_matching_closed_form() {
        let profile = cartesian();
        let exact = profile.closed_form_cycle(75.0, 5.0).expect("closed form");
        let vertex = find_vertex(&profile, exact.ray_parameter, 75.0, &VertexSettings::default());
        assert_eq!(vertex.kind, VertexKind::Turning);
        assert!((vertex.position - exact.vertex_position).abs() < 1e-9);
        assert!(vertex_difference(&profile, exact.ray_parameter, vertex.position) >= 0.0);
        assert!(vertex.iterations > 0);
    }

    #[test]
    fn steep_rays_truncate_to_surface() {
        let profile = cartesian();
        let ray_parameter = profile.ray_parameter(75.0, 23.0);
        let vertex = find_vertex(&profile, ray_parameter, 75.0, &VertexSettings::default());
        assert_eq!(vertex.kind, VertexKind::Surface);
        assert_eq!(vertex.position, 0.0);
    }

    #[test]
    fn horizontal_launch_stays_at_anchor() {
        let profile = cartesian();
        let ray_parameter = profile.ray_parameter(75.0, 0.0);
        let vertex = find_vertex(&profile, ray_parameter, 75.0, &VertexSettings::default());
        assert_eq!(vertex.kind, VertexKind::Anchor);
        assert_eq!(vertex.position, 75.0);
    }

    #[test]
    fn spherical_vertex_lies_between_anchor_and_surface() {
        let profile = SphericalProfile::new(ProfileParams::default(), EARTH_RADIUS).expect("profile");
        let anchor = profile.position_at_depth(1000.0);
        let ray_parameter = profile.ray_parameter(anchor, 30.0);
        let vertex = find_vertex(&profile, ray_parameter, anchor, &VertexSettings::default());
        assert_eq!(vertex.kind, VertexKind::Turning);
        assert!(vertex.position > anchor && vertex.position < EARTH_RADIUS);
        let depth = profile.depth_at_position(vertex.position);
        let flat = cartesian()
            .closed_form_cycle(1000.0, 30.0)
            .expect("closed form");
        assert!((depth - flat.vertex_position).abs() < 1.0);
    }

    #[test]
    fn repeated_search_is_bit_identical() {
        let profile = cartesian();
        let ray_parameter = profile.ray_parameter(1000.0, 40.0);
        let settings = VertexSettings::default();
        let first = find_vertex(&profile, ray_parameter, 1000.0, &settings);
        let second = find_vertex(&profile, ray_parameter, 1000.0, &settings);
        assert_eq!(first, second);
    }
}
