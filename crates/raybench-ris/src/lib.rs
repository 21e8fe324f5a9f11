#![doc = "Near-field reflectarray kernel: panel geometry, phase synthesis, quantization, principal-cut pattern sweep, side-lobe metrics and reference validation. All operations are pure and deterministic given their inputs."]

pub mod config;
pub mod geometry;
pub mod metrics;
pub mod pattern;
pub mod phase;
pub mod quantize;
pub mod validate;

pub use config::{
    ControlConfig, ExperimentConfig, GeometryConfig, LinkModeConfig, Normalization,
    PatternModeConfig, QuantizationConfig, RisConfig, SweepRange, SPEED_OF_LIGHT_M_S,
};
pub use geometry::{compute_frame, element_centers, PanelFrame, PanelGeometry};
pub use metrics::{sidelobe_metrics, SidelobeMetrics};
pub use pattern::{pattern_sweep, SweepResult, DB_FLOOR};
pub use phase::{synthesize_phase, wrap_phase, PhaseMap};
pub use quantize::{quantize, QUANTIZATION_CONVENTION};
pub use validate::{validate, ReferenceKind, ReferencePattern, ValidationReport};
