//! RIS Lab configuration schema.
//!
//! The accepted config is the unit of reproducibility: it is snapshotted
//! verbatim into every run directory and its canonical JSON encoding feeds
//! `config_hash`. Unknown fields are rejected everywhere so a typo cannot
//! silently fall back to a default.

use serde::{Deserialize, Serialize};

use raybench_core::errors::{ErrorInfo, RbError};
use raybench_core::serde::from_yaml_slice;

/// Propagation speed used to convert frequency to wavelength, in m/s.
pub const SPEED_OF_LIGHT_M_S: f64 = 299_792_458.0;

/// Highest supported quantizer resolution in bits.
pub const MAX_QUANTIZATION_BITS: u8 = 4;

fn config_error(code: &str, message: impl Into<String>) -> RbError {
    RbError::Config(ErrorInfo::new(code, message))
}

/// Top-level RIS Lab configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RisConfig {
    /// Schema version of the config document.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    /// Panel geometry.
    pub geometry: GeometryConfig,
    /// Phase control law.
    #[serde(default)]
    pub control: ControlConfig,
    /// Phase quantizer settings.
    #[serde(default)]
    pub quantization: QuantizationConfig,
    /// Pattern-mode sweep settings.
    #[serde(default)]
    pub pattern_mode: PatternModeConfig,
    /// Link-mode settings.
    #[serde(default)]
    pub link_mode: LinkModeConfig,
    /// Experiment-level RF parameters.
    #[serde(default)]
    pub experiment: ExperimentConfig,
}

fn default_schema_version() -> u32 {
    1
}

/// Reflectarray panel geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeometryConfig {
    /// Element count along the local x axis.
    pub nx: usize,
    /// Element count along the local y axis.
    pub ny: usize,
    /// Element pitch along x in meters.
    pub dx: f64,
    /// Element pitch along y in meters.
    pub dy: f64,
    /// Panel center in scene coordinates.
    #[serde(default = "default_origin")]
    pub origin: [f64; 3],
    /// Panel normal (need not be unit length).
    #[serde(default = "default_normal")]
    pub normal: [f64; 3],
    /// Hint fixing the in-plane x axis; must not be parallel to `normal`.
    #[serde(default = "default_x_axis_hint")]
    pub x_axis_hint: [f64; 3],
    /// Permit element pitch below λ/10. Only honored while the quantizer is
    /// disabled (`quantization.bits == 0`).
    #[serde(default)]
    pub allow_subwavelength: bool,
}

fn default_origin() -> [f64; 3] {
    [0.0, 0.0, 0.0]
}

fn default_normal() -> [f64; 3] {
    [0.0, 0.0, 1.0]
}

fn default_x_axis_hint() -> [f64; 3] {
    [1.0, 0.0, 0.0]
}

/// Phase control law applied across the panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case", deny_unknown_fields)]
pub enum ControlConfig {
    /// Far-field beam steering toward an azimuth/elevation pair.
    Steer {
        /// Azimuth of the target direction, degrees.
        az_deg: f64,
        /// Elevation of the target direction, degrees.
        el_deg: f64,
        /// Constant phase offset added to every element, degrees.
        #[serde(default)]
        phase_offset_deg: f64,
    },
    /// Constant phase across the panel.
    Uniform {
        /// Element phase, degrees.
        #[serde(default)]
        phase_deg: f64,
    },
    /// Near-field focusing toward a point.
    Focus {
        /// Focal point in scene coordinates.
        focal_point: [f64; 3],
    },
    /// Reflector-mode gradient between source and target points.
    Gradient {
        /// Source points; currently exactly one is supported.
        sources: Vec<[f64; 3]>,
        /// Target points; currently exactly one is supported.
        targets: Vec<[f64; 3]>,
    },
}

impl Default for ControlConfig {
    fn default() -> Self {
        ControlConfig::Uniform { phase_deg: 0.0 }
    }
}

/// Phase quantizer settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QuantizationConfig {
    /// Quantizer resolution; 0 keeps the continuous phase map.
    #[serde(default)]
    pub bits: u8,
}

impl Default for QuantizationConfig {
    fn default() -> Self {
        Self { bits: 0 }
    }
}

/// Pattern normalization policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    /// Divide by the sweep maximum so the peak sits at 0 dB.
    #[default]
    Peak0db,
    /// Keep the absolute link-budget scale.
    None,
}

/// Receiver sweep range in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SweepRange {
    /// First angle of the sweep.
    pub start: f64,
    /// Last angle of the sweep (inclusive when aligned with `step`).
    pub stop: f64,
    /// Angular increment; must be positive.
    pub step: f64,
}

impl Default for SweepRange {
    fn default() -> Self {
        Self {
            start: -90.0,
            stop: 90.0,
            step: 2.0,
        }
    }
}

/// Pattern-mode settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct PatternModeConfig {
    /// Normalization applied to the swept pattern.
    #[serde(default)]
    pub normalization: Normalization,
    /// Receiver angle sweep.
    #[serde(default)]
    pub rx_sweep_deg: SweepRange,
}

/// Link-mode settings: a single receiver angle instead of a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct LinkModeConfig {
    /// Receiver angle in the principal cut, degrees.
    #[serde(default)]
    pub rx_angle_deg: f64,
}

/// Experiment-level RF parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExperimentConfig {
    /// Carrier frequency in Hz.
    #[serde(default = "default_frequency_hz")]
    pub frequency_hz: f64,
    /// Transmitter angle in the principal cut, degrees.
    #[serde(default)]
    pub tx_angle_deg: f64,
    /// Transmitter distance from the panel, meters.
    #[serde(default = "default_link_distance_m")]
    pub tx_distance_m: f64,
    /// Receiver distance from the panel, meters.
    #[serde(default = "default_link_distance_m")]
    pub rx_distance_m: f64,
    /// Transmitter antenna gain, dBi.
    #[serde(default)]
    pub tx_gain_dbi: f64,
    /// Receiver antenna gain, dBi.
    #[serde(default)]
    pub rx_gain_dbi: f64,
    /// Transmit power, dBm.
    #[serde(default = "default_tx_power_dbm")]
    pub tx_power_dbm: f64,
    /// Panel amplitude reflection coefficient in [0, 1].
    #[serde(default = "default_reflection_coeff")]
    pub reflection_coeff: f64,
}

fn default_frequency_hz() -> f64 {
    28e9
}

fn default_link_distance_m() -> f64 {
    10.0
}

fn default_tx_power_dbm() -> f64 {
    30.0
}

fn default_reflection_coeff() -> f64 {
    1.0
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            frequency_hz: default_frequency_hz(),
            tx_angle_deg: 0.0,
            tx_distance_m: default_link_distance_m(),
            rx_distance_m: default_link_distance_m(),
            tx_gain_dbi: 0.0,
            rx_gain_dbi: 0.0,
            tx_power_dbm: default_tx_power_dbm(),
            reflection_coeff: default_reflection_coeff(),
        }
    }
}

impl RisConfig {
    /// Parses a YAML document and validates every invariant.
    pub fn from_yaml(bytes: &[u8]) -> Result<Self, RbError> {
        let config: RisConfig = from_yaml_slice(bytes)?;
        config.validate()?;
        Ok(config)
    }

    /// Returns the carrier wavelength in meters.
    pub fn wavelength_m(&self) -> f64 {
        SPEED_OF_LIGHT_M_S / self.experiment.frequency_hz
    }

    /// Checks the schema invariants, returning the first violation.
    pub fn validate(&self) -> Result<(), RbError> {
        let g = &self.geometry;
        if g.nx == 0 || g.ny == 0 {
            return Err(config_error("ris_geometry_count", "nx and ny must be positive"));
        }
        if !(g.dx > 0.0) || !(g.dy > 0.0) || !g.dx.is_finite() || !g.dy.is_finite() {
            return Err(config_error("ris_geometry_pitch", "dx and dy must be positive and finite"));
        }
        if norm3(&g.normal) <= 0.0 {
            return Err(config_error("ris_geometry_normal", "normal must be a non-zero vector"));
        }
        if norm3(&g.x_axis_hint) <= 0.0 {
            return Err(config_error(
                "ris_geometry_hint",
                "x_axis_hint must be a non-zero vector",
            ));
        }
        let cos = (dot3(&g.normal, &g.x_axis_hint) / (norm3(&g.normal) * norm3(&g.x_axis_hint))).abs();
        if cos > 0.99 {
            return Err(config_error(
                "ris_geometry_parallel",
                "normal and x_axis_hint must not be parallel",
            ));
        }

        if self.quantization.bits > MAX_QUANTIZATION_BITS {
            return Err(config_error(
                "ris_quantization_bits",
                format!("quantization.bits must be at most {MAX_QUANTIZATION_BITS}"),
            ));
        }

        let e = &self.experiment;
        if !(e.frequency_hz > 0.0) || !e.frequency_hz.is_finite() {
            return Err(config_error("ris_frequency", "frequency_hz must be positive"));
        }
        if !(e.tx_distance_m > 0.0) || !(e.rx_distance_m > 0.0) {
            return Err(config_error(
                "ris_link_distance",
                "tx_distance_m and rx_distance_m must be positive",
            ));
        }
        if !(0.0..=1.0).contains(&e.reflection_coeff) {
            return Err(config_error(
                "ris_reflection_coeff",
                "reflection_coeff must lie in [0, 1]",
            ));
        }

        let sweep = &self.pattern_mode.rx_sweep_deg;
        if !(sweep.step > 0.0) || sweep.stop < sweep.start {
            return Err(config_error(
                "ris_sweep",
                "rx_sweep_deg requires stop >= start and step > 0",
            ));
        }

        if let ControlConfig::Gradient { sources, targets } = &self.control {
            if sources.len() != 1 || targets.len() != 1 {
                return Err(config_error(
                    "ris_gradient_points",
                    "gradient control takes exactly one source and one target",
                ));
            }
        }

        let min_pitch_m = g.dx.min(g.dy);
        let pitch_floor_m = self.wavelength_m() / 10.0;
        let override_ok = g.allow_subwavelength && self.quantization.bits == 0;
        if min_pitch_m < pitch_floor_m && !override_ok {
            return Err(config_error(
                "ris_subwavelength_pitch",
                format!(
                    "element pitch {min_pitch_m:.6} m is below lambda/10 = {pitch_floor_m:.6} m"
                ),
            ));
        }

        Ok(())
    }
}

fn dot3(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn norm3(v: &[f64; 3]) -> f64 {
    dot3(v, v).sqrt()
}
