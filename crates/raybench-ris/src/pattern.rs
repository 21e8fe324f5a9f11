//! Principal-cut pattern sweep.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use raybench_core::errors::{ErrorInfo, RbError};

use crate::config::{ExperimentConfig, Normalization, SweepRange};
use crate::geometry::PanelGeometry;
use crate::phase::PhaseMap;

/// Floor applied before converting linear power to dB.
pub const DB_FLOOR: f64 = 1e-12;

/// Result of a receiver-angle sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepResult {
    /// Swept receiver angles in degrees.
    pub theta_deg: Vec<f64>,
    /// Pattern in linear power units (normalized per the config).
    pub pattern_linear: Vec<f64>,
    /// Pattern in dB, `10·log10(max(linear, 1e-12))`.
    pub pattern_db: Vec<f64>,
    /// Normalization that produced `pattern_linear`.
    pub normalization: Normalization,
}

/// Sweeps the panel response over the principal cut.
///
/// The cut is the plane spanned by the panel normal and its local y axis, the
/// azimuth plane of the steering law: `d̂(θ) = cos θ·ẑ + sin θ·ŷ`. The
/// transmitter sits in the same cut at `tx_angle_deg`. For each angle the
/// pattern is `|Σ A(i,j)·exp(j·(φ(i,j) + k·(p·d̂_rx − p·d̂_tx)))|²` scaled by
/// the link budget, with a uniform amplitude profile unless `amplitude`
/// supplies a per-element array.
pub fn pattern_sweep(
    geometry: &PanelGeometry,
    phase: &PhaseMap,
    sweep: &SweepRange,
    experiment: &ExperimentConfig,
    normalization: Normalization,
    amplitude: Option<&Vec<Vec<f64>>>,
) -> Result<SweepResult, RbError> {
    check_shape("phase", phase, geometry)?;
    if let Some(profile) = amplitude {
        check_shape("amplitude", profile, geometry)?;
    }
    if !(sweep.step > 0.0) || sweep.stop < sweep.start {
        return Err(RbError::Config(ErrorInfo::new(
            "sweep_range",
            "rx_sweep_deg requires stop >= start and step > 0",
        )));
    }

    let wavelength = crate::config::SPEED_OF_LIGHT_M_S / experiment.frequency_hz;
    let k = 2.0 * PI / wavelength;
    let theta_deg = sweep_angles(sweep);

    // Elements lie in the panel plane, so only the ŷ projection of each
    // element enters the cut phase: p·d̂(θ) = p_y·sin θ.
    let tx = experiment.tx_angle_deg.to_radians();
    let sin_tx = tx.sin();

    let link_scale = link_budget_scale(experiment, wavelength);
    let mut pattern_linear = Vec::with_capacity(theta_deg.len());
    for theta in &theta_deg {
        let sin_rx = theta.to_radians().sin();
        let mut re = 0.0;
        let mut im = 0.0;
        for (j, row) in phase.iter().enumerate() {
            for (i, &element_phase) in row.iter().enumerate() {
                let p_y = geometry.local_offsets[j][i][1];
                let total = element_phase + k * p_y * (sin_rx - sin_tx);
                let amp = amplitude.map_or(1.0, |profile| profile[j][i]);
                re += amp * total.cos();
                im += amp * total.sin();
            }
        }
        pattern_linear.push(link_scale * (re * re + im * im));
    }

    if normalization == Normalization::Peak0db {
        let peak = pattern_linear.iter().cloned().fold(0.0f64, f64::max);
        if peak > 0.0 {
            for value in &mut pattern_linear {
                *value /= peak;
            }
        }
    }

    let pattern_db = pattern_linear
        .iter()
        .map(|&value| 10.0 * value.max(DB_FLOOR).log10())
        .collect();

    Ok(SweepResult {
        theta_deg,
        pattern_linear,
        pattern_db,
        normalization,
    })
}

fn sweep_angles(sweep: &SweepRange) -> Vec<f64> {
    let count = (((sweep.stop - sweep.start) / sweep.step) + 0.5).ceil() as usize;
    (0..count.max(1))
        .map(|idx| sweep.start + idx as f64 * sweep.step)
        .collect()
}

fn link_budget_scale(experiment: &ExperimentConfig, wavelength: f64) -> f64 {
    let tx_power_lin = 10f64.powf(experiment.tx_power_dbm / 10.0);
    let tx_gain_lin = 10f64.powf(experiment.tx_gain_dbi / 10.0);
    let rx_gain_lin = 10f64.powf(experiment.rx_gain_dbi / 10.0);
    let spread_tx = wavelength / (4.0 * PI * experiment.tx_distance_m);
    let spread_rx = wavelength / (4.0 * PI * experiment.rx_distance_m);
    tx_power_lin
        * tx_gain_lin
        * rx_gain_lin
        * experiment.reflection_coeff
        * spread_tx
        * spread_tx
        * spread_rx
        * spread_rx
}

fn check_shape(name: &str, map: &[Vec<f64>], geometry: &PanelGeometry) -> Result<(), RbError> {
    let rows_ok = map.len() == geometry.ny;
    let cols_ok = map.iter().all(|row| row.len() == geometry.nx);
    if rows_ok && cols_ok {
        Ok(())
    } else {
        Err(RbError::Config(
            ErrorInfo::new("map_shape", format!("{name} map does not match panel shape"))
                .with_context("expected", format!("{}x{}", geometry.ny, geometry.nx)),
        ))
    }
}
