//! WASM bindings exposing the analytic n^2 linear solver to the plotting front end.

mod eigenray;
mod profile;

pub use eigenray::compare_coordinate_systems;
pub use profile::WasmProfile;
