//! Phase synthesis laws.

use std::f64::consts::PI;

use nalgebra::Vector3;

use raybench_core::errors::{ErrorInfo, RbError};

use crate::config::{ControlConfig, RisConfig};
use crate::geometry::PanelGeometry;

/// Per-element phase values in radians, row-major `[ny][nx]`, each wrapped
/// into `(−π, π]`.
pub type PhaseMap = Vec<Vec<f64>>;

/// Wraps an angle into the interval `(−π, π]`.
pub fn wrap_phase(angle_rad: f64) -> f64 {
    let two_pi = 2.0 * PI;
    let mut wrapped = angle_rad.rem_euclid(two_pi);
    if wrapped > PI {
        wrapped -= two_pi;
    }
    wrapped
}

/// Synthesizes the per-element phase map for the configured control law.
///
/// All laws are closed-form and deterministic:
/// - steer: `φ = −k·(sin(el)·p_x + cos(el)·sin(az)·p_y) + φ₀`
/// - uniform: constant
/// - focus: `φ = k·‖p − F‖`, the conjugate of the `e^{−jkd}` propagation
///   phase, so coherent reradiation converges on `F`
/// - gradient: `φ = k·(‖p − S‖ + ‖p − T‖)`, the reflector-mode conjugate of
///   the source-to-target path
pub fn synthesize_phase(config: &RisConfig, geometry: &PanelGeometry) -> Result<PhaseMap, RbError> {
    let k = 2.0 * PI / config.wavelength_m();
    let map = match &config.control {
        ControlConfig::Steer {
            az_deg,
            el_deg,
            phase_offset_deg,
        } => {
            let az = az_deg.to_radians();
            let el = el_deg.to_radians();
            let offset = phase_offset_deg.to_radians();
            map_elements(geometry, |_, offsets| {
                let [p_x, p_y] = *offsets;
                -k * (el.sin() * p_x + el.cos() * az.sin() * p_y) + offset
            })
        }
        ControlConfig::Uniform { phase_deg } => {
            let phase = phase_deg.to_radians();
            map_elements(geometry, |_, _| phase)
        }
        ControlConfig::Focus { focal_point } => {
            let focal = Vector3::from_column_slice(focal_point);
            map_elements(geometry, |center, _| k * (center - focal).norm())
        }
        ControlConfig::Gradient { sources, targets } => {
            let source = single_point("ris_gradient_source", sources)?;
            let target = single_point("ris_gradient_target", targets)?;
            map_elements(geometry, |center, _| {
                k * ((center - source).norm() + (center - target).norm())
            })
        }
    };
    Ok(map)
}

fn single_point(code: &str, points: &[[f64; 3]]) -> Result<Vector3<f64>, RbError> {
    match points {
        [point] => Ok(Vector3::from_column_slice(point)),
        _ => Err(RbError::Config(ErrorInfo::new(
            code,
            "gradient control takes exactly one source and one target",
        ))),
    }
}

fn map_elements<F>(geometry: &PanelGeometry, mut phase_at: F) -> PhaseMap
where
    F: FnMut(&Vector3<f64>, &[f64; 2]) -> f64,
{
    geometry
        .centers
        .iter()
        .zip(geometry.local_offsets.iter())
        .map(|(row, offsets)| {
            row.iter()
                .zip(offsets.iter())
                .map(|(center, offset)| wrap_phase(phase_at(center, offset)))
                .collect()
        })
        .collect()
}
