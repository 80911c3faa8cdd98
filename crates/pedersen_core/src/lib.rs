//! The `pedersen_core` crate computes closed-form ray geometry for the n^2 linear sound speed
//! profile and builds eigenrays from it, as a reference for numerical propagation models.
//!
//! Key components:
//! - **Profile**: `CartesianProfile` (flat earth) and `SphericalProfile` (curved earth) speed laws.
//! - **Vertex**: bracketed bisection for the ray turning point, truncated at the surface.
//! - **Cycle**: cycle range and travel time from singularity-aware Gauss-Kronrod quadrature.
//! - **Eigenray**: Snell mapping to the target, fold detection, and monotone interpolation of
//!   the direct and folded branches onto target ranges.
pub mod compare;
pub mod cycle;
pub mod eigenray;
pub mod interpolate;
pub mod profile;
pub mod quadrature;
pub mod traits;
pub mod vertex;

pub use cycle::{analytic_cycle, CycleSolution, CycleTable, SolverSettings};
pub use eigenray::{solve_eigenrays, EigenrayBranch, EigenrayRequest, EigenraySolution};
pub use profile::{CartesianProfile, ProfileError, ProfileParams, SphericalProfile, EARTH_RADIUS};
pub use traits::SoundSpeedModel;
