//! Profile wrapper and depth-domain helpers.

use anyhow::{bail, Context};
use js_sys::Float64Array;
use pedersen_core::profile::{CartesianProfile, ProfileParams, SphericalProfile};
use pedersen_core::traits::SoundSpeedModel;
use wasm_bindgen::prelude::*;

pub(crate) enum ProfileKind {
    Cartesian(CartesianProfile),
    Spherical(SphericalProfile),
}

impl ProfileKind {
    pub(crate) fn model(&self) -> &dyn SoundSpeedModel {
        match self {
            ProfileKind::Cartesian(profile) => profile,
            ProfileKind::Spherical(profile) => profile,
        }
    }
}

fn build_profile(
    coordinates: &str,
    surface_speed: f64,
    surface_gradient: f64,
    earth_radius: f64,
) -> anyhow::Result<ProfileKind> {
    let params = ProfileParams {
        surface_speed,
        surface_gradient,
    };
    let kind = match coordinates {
        "cartesian" => {
            ProfileKind::Cartesian(CartesianProfile::new(params).context("Invalid profile")?)
        }
        "spherical" => ProfileKind::Spherical(
            SphericalProfile::new(params, earth_radius).context("Invalid profile")?,
        ),
        other => bail!("Unknown coordinate system: {other}"),
    };
    Ok(kind)
}

#[wasm_bindgen]
pub struct WasmProfile {
    pub(crate) kind: ProfileKind,
}

pub(crate) fn to_js_error(context: &str, err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&format!("{context}: {err:#}"))
}

#[wasm_bindgen]
impl WasmProfile {
    /// `coordinates` is "cartesian" or "spherical"; `earth_radius` is ignored for cartesian.
    #[wasm_bindgen(constructor)]
    pub fn new(
        coordinates: &str,
        surface_speed: f64,
        surface_gradient: f64,
        earth_radius: f64,
    ) -> Result<WasmProfile, JsValue> {
        console_error_panic_hook::set_once();

        let kind = build_profile(coordinates, surface_speed, surface_gradient, earth_radius)
            .map_err(|e| JsValue::from_str(&format!("{e:#}")))?;
        Ok(WasmProfile { kind })
    }

    pub fn coordinates(&self) -> String {
        match self.kind {
            ProfileKind::Cartesian(_) => "cartesian".to_string(),
            ProfileKind::Spherical(_) => "spherical".to_string(),
        }
    }

    /// Sound speed (m/s) at each depth below the surface (m).
    pub fn sound_speed(&self, depths: Vec<f64>) -> Result<Float64Array, JsValue> {
        let model = self.kind.model();
        let mut positions = Vec::with_capacity(depths.len());
        for depth in depths {
            model
                .check_depth(depth)
                .map_err(|e| to_js_error("Sound speed failed", e))?;
            positions.push(model.position_at_depth(depth));
        }
        let speeds = model.speeds(&positions);
        Ok(Float64Array::from(speeds.as_slice()))
    }
}
