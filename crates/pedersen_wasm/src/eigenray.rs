//! Cycle and eigenray runners.

use crate::profile::{to_js_error, WasmProfile};
use pedersen_core::compare::compare_coordinate_systems as core_compare;
use pedersen_core::cycle::{analytic_cycle, CycleTable, SolverSettings};
use pedersen_core::eigenray::{solve_eigenrays, EigenrayRequest};
use pedersen_core::profile::ProfileParams;
use pedersen_core::traits::SoundSpeedModel;
use serde::Serialize;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

/// Cycle table with vertices reported as depths, whatever the model's coordinate.
#[derive(Serialize)]
struct CycleOutput {
    range: Vec<f64>,
    travel_time: Vec<f64>,
    vertex_depth: Vec<f64>,
    ray_parameter: Vec<f64>,
    converged: Vec<bool>,
}

impl CycleOutput {
    fn from_table(model: &dyn SoundSpeedModel, table: CycleTable) -> Self {
        let vertex_depth = table
            .vertex_position
            .iter()
            .map(|&p| model.depth_at_position(p))
            .collect();
        Self {
            range: table.range,
            travel_time: table.travel_time,
            vertex_depth,
            ray_parameter: table.ray_parameter,
            converged: table.converged,
        }
    }
}

fn parse_settings(settings: JsValue) -> Result<SolverSettings, JsValue> {
    if settings.is_undefined() || settings.is_null() {
        return Ok(SolverSettings::default());
    }
    from_value(settings).map_err(|e| to_js_error("Invalid solver settings", e))
}

fn serialize<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    to_value(value).map_err(|e| to_js_error("Serialization error", e))
}

#[wasm_bindgen]
impl WasmProfile {
    /// One refraction cycle per launch angle from `anchor_depth`.
    pub fn analytic_cycle(
        &self,
        anchor_depth: f64,
        angles: Vec<f64>,
        settings: JsValue,
    ) -> Result<JsValue, JsValue> {
        let settings = parse_settings(settings)?;
        let model = self.kind.model();
        let table = analytic_cycle(model, anchor_depth, &angles, settings)
            .map_err(|e| to_js_error("Cycle solve failed", e))?;
        serialize(&CycleOutput::from_table(model, table))
    }

    /// Direct and folded eigenrays from a source to targets at one depth.
    pub fn eigenrays(
        &self,
        source_depth: f64,
        launch_angles: Vec<f64>,
        target_depth: f64,
        target_ranges: Vec<f64>,
        settings: JsValue,
    ) -> Result<JsValue, JsValue> {
        let settings = parse_settings(settings)?;
        let request = EigenrayRequest {
            source_depth,
            launch_angles,
            target_depth,
            target_ranges,
        };
        let solution = solve_eigenrays(self.kind.model(), &request, settings)
            .map_err(|e| to_js_error("Eigenray solve failed", e))?;
        serialize(&solution)
    }
}

/// Maximum flat-versus-curved cycle differences over a sweep.
#[wasm_bindgen]
pub fn compare_coordinate_systems(
    surface_speed: f64,
    surface_gradient: f64,
    earth_radius: f64,
    anchor_depth: f64,
    angles: Vec<f64>,
    settings: JsValue,
) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();
    let settings = parse_settings(settings)?;
    let params = ProfileParams {
        surface_speed,
        surface_gradient,
    };
    let comparison = core_compare(params, earth_radius, anchor_depth, &angles, settings)
        .map_err(|e| to_js_error("Comparison failed", e))?;
    serialize(&comparison)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pedersen_core::compare::CycleComparison;
    use pedersen_core::eigenray::EigenraySolution;
    use pedersen_core::profile::EARTH_RADIUS;
    use serde_wasm_bindgen::from_value;
    use wasm_bindgen_test::wasm_bindgen_test;

    fn sweep(start: f64, step: f64, count: usize) -> Vec<f64> {
        (0..count).map(|i| start + step * i as f64).collect()
    }

    #[wasm_bindgen_test]
    fn rejects_unknown_coordinates() {
        let result = WasmProfile::new("polar", 1550.0, 1.2, EARTH_RADIUS);
        let message = result
            .err()
            .and_then(|err| err.as_string())
            .unwrap_or_default();
        assert!(message.contains("Unknown coordinate system"));
    }

    #[wasm_bindgen_test]
    fn rejects_non_physical_profile() {
        let result = WasmProfile::new("spherical", 1550.0, 1.2, 0.0);
        let message = result
            .err()
            .and_then(|err| err.as_string())
            .unwrap_or_default();
        assert!(message.contains("earth radius"));
    }

    #[wasm_bindgen_test]
    fn eigenrays_round_trip_through_js() {
        let profile = WasmProfile::new("cartesian", 1550.0, 1.2, EARTH_RADIUS).expect("profile");
        let value = profile
            .eigenrays(
                75.0,
                sweep(1.0, 0.5, 48),
                75.0,
                sweep(500.0, 10.0, 50),
                JsValue::UNDEFINED,
            )
            .expect("eigenrays");
        let solution: EigenraySolution = from_value(value).expect("solution");
        assert!(!solution.direct.is_empty());
        assert!(solution.fold.is_some());
    }

    #[wasm_bindgen_test]
    fn cycle_vertices_are_reported_as_depths() {
        let profile = WasmProfile::new("spherical", 1550.0, 1.2, EARTH_RADIUS).expect("profile");
        let value = profile
            .analytic_cycle(1000.0, vec![30.0], JsValue::NULL)
            .expect("cycle");
        let depth = js_sys::Reflect::get(&value, &JsValue::from_str("vertex_depth"))
            .expect("vertex_depth");
        let depths: Vec<f64> = from_value(depth).expect("depths");
        assert!(depths[0] > 0.0 && depths[0] < 1000.0);
    }

    #[wasm_bindgen_test]
    fn comparison_reports_sub_metre_agreement() {
        let value = compare_coordinate_systems(
            1550.0,
            1.2,
            EARTH_RADIUS,
            75.0,
            sweep(1.0, 2.0, 12),
            JsValue::UNDEFINED,
        )
        .expect("compare");
        let comparison: CycleComparison = from_value(value).expect("comparison");
        assert!(comparison.within(0.5, 0.5e-3));
    }

    #[wasm_bindgen_test]
    fn sound_speed_rejects_depth_above_surface() {
        let profile = WasmProfile::new("cartesian", 1550.0, 1.2, EARTH_RADIUS).expect("profile");
        assert!(profile.sound_speed(vec![-10.0]).is_err());
        let speeds = profile.sound_speed(vec![0.0]).expect("speeds");
        assert_eq!(speeds.to_vec(), vec![1550.0]);
    }
}
