//! Sim run options.
//!
//! The resolved config (post profile overrides, post VRAM guard) is the
//! accepted config snapshotted into the run directory; workers re-read it
//! from there and never see the submission payload.

use serde::{Deserialize, Serialize};

use raybench_core::errors::{ErrorInfo, RbError};

/// Quality preset filling in sampling parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityPreset {
    /// Fast preview sampling.
    Preview,
    /// Default sampling.
    Standard,
    /// High-fidelity sampling.
    High,
    /// Benchmark-grade sampling.
    Benchmark,
}

/// Job profile selecting a fixed override set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimProfile {
    /// Fast path-only trace with reduced sampling.
    QuickTrace,
    /// Path trace at link quality.
    LinkTrace,
    /// Radio-map coverage run.
    CoverageMap,
}

/// Device placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceConfig {
    /// Position in scene coordinates.
    pub position: [f64; 3],
    /// Transmit power in dBm (transmitters only).
    #[serde(default = "default_power_dbm")]
    pub power_dbm: f64,
}

fn default_power_dbm() -> f64 {
    30.0
}

/// A RIS panel placed in the scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RisPanelConfig {
    /// Panel center position.
    pub position: [f64; 3],
    /// Whether the panel joins the radio-map auto-size bounding set.
    #[serde(default = "default_true")]
    pub map_eligible: bool,
}

fn default_true() -> bool {
    true
}

/// Scene description for a sim run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SceneConfig {
    /// Scene name (builtin identifier or file stem).
    #[serde(default = "default_scene_name")]
    pub name: String,
    /// Transmitter.
    pub tx: DeviceConfig,
    /// Receiver.
    pub rx: DeviceConfig,
    /// RIS panels present in the scene.
    #[serde(default)]
    pub ris_panels: Vec<RisPanelConfig>,
}

fn default_scene_name() -> String {
    "box".to_string()
}

/// Solver sampling parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationConfig {
    /// Carrier frequency in Hz.
    #[serde(default = "default_frequency_hz")]
    pub frequency_hz: f64,
    /// Maximum interaction depth.
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,
    /// Ray samples launched per source.
    #[serde(default = "default_samples")]
    pub samples_per_src: u64,
    /// Path cap per source.
    #[serde(default = "default_samples")]
    pub max_num_paths_per_src: u64,
}

fn default_frequency_hz() -> f64 {
    3.5e9
}

fn default_max_depth() -> u32 {
    3
}

fn default_samples() -> u64 {
    200_000
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            frequency_hz: default_frequency_hz(),
            max_depth: default_max_depth(),
            samples_per_src: default_samples(),
            max_num_paths_per_src: default_samples(),
        }
    }
}

/// Radio-map request attached to a sim run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RadioMapConfig {
    /// Whether to compute a radio map at all.
    #[serde(default)]
    pub enabled: bool,
    /// Requested map center; `z` is the measurement height.
    #[serde(default = "default_center")]
    pub center: [f64; 3],
    /// Requested map size before snapping.
    #[serde(default = "default_size")]
    pub size: [f64; 2],
    /// Cell size.
    #[serde(default = "default_cell_size")]
    pub cell_size: [f64; 2],
    /// Map plane orientation in radians.
    #[serde(default)]
    pub orientation: [f64; 3],
    /// Derive the requested rectangle from the device bounding set.
    #[serde(default)]
    pub auto_size: bool,
    /// Bounding-set inflation per side, meters.
    #[serde(default)]
    pub auto_padding: f64,
    /// Map ray samples per transmitter.
    #[serde(default = "default_samples")]
    pub samples_per_tx: u64,
    /// Maximum interaction depth for the map solver.
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,
}

fn default_center() -> [f64; 3] {
    [0.0, 0.0, 1.5]
}

fn default_size() -> [f64; 2] {
    [100.0, 100.0]
}

fn default_cell_size() -> [f64; 2] {
    [2.0, 2.0]
}

impl Default for RadioMapConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            center: default_center(),
            size: default_size(),
            cell_size: default_cell_size(),
            orientation: [0.0; 3],
            auto_size: false,
            auto_padding: 0.0,
            samples_per_tx: default_samples(),
            max_depth: default_max_depth(),
        }
    }
}

/// VRAM guard tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VramGuardConfig {
    /// Free-memory threshold below which the guard downgrades the job.
    #[serde(default = "default_vram_threshold_mb")]
    pub threshold_mb: u64,
    /// Multiplier applied to sampling parameters when the guard fires.
    #[serde(default = "default_vram_scale")]
    pub scale: f64,
}

fn default_vram_threshold_mb() -> u64 {
    9000
}

fn default_vram_scale() -> f64 {
    0.5
}

impl Default for VramGuardConfig {
    fn default() -> Self {
        Self {
            threshold_mb: default_vram_threshold_mb(),
            scale: default_vram_scale(),
        }
    }
}

/// Runtime policy for a sim run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Require the GPU ray-tracing backend; CPU fallback becomes a hard
    /// failure instead of a silent downgrade.
    #[serde(default)]
    pub require_gpu: bool,
    /// VRAM guard tuning.
    #[serde(default)]
    pub vram_guard: VramGuardConfig,
}

/// Full sim run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimConfig {
    /// Scene description.
    pub scene: SceneConfig,
    /// Solver sampling parameters.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Radio-map request.
    #[serde(default)]
    pub radio_map: RadioMapConfig,
    /// Runtime policy.
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

impl SimConfig {
    /// Applies a quality preset's sampling parameters.
    pub fn apply_quality_preset(&mut self, preset: QualityPreset) {
        let (depth, samples, map_samples) = match preset {
            QualityPreset::Preview => (2, 50_000, 80_000),
            QualityPreset::Standard => (3, 200_000, 200_000),
            QualityPreset::High => (5, 1_000_000, 2_000_000),
            QualityPreset::Benchmark => (6, 2_000_000, 4_000_000),
        };
        self.simulation.max_depth = depth;
        self.simulation.samples_per_src = samples;
        self.simulation.max_num_paths_per_src = samples;
        self.radio_map.samples_per_tx = map_samples;
        self.radio_map.max_depth = depth;
    }

    /// Applies the profile's fixed overrides.
    pub fn apply_profile(&mut self, profile: SimProfile) {
        match profile {
            SimProfile::QuickTrace => {
                self.radio_map.enabled = false;
                self.simulation.max_depth = 2;
                self.simulation.samples_per_src = 20_000;
                self.simulation.max_num_paths_per_src = 20_000;
            }
            SimProfile::LinkTrace => {
                self.radio_map.enabled = false;
                self.simulation.max_depth = 3;
                self.simulation.samples_per_src = 120_000;
                self.simulation.max_num_paths_per_src = 200_000;
            }
            SimProfile::CoverageMap => {
                self.radio_map.enabled = true;
            }
        }
    }

    /// Checks the schema invariants.
    pub fn validate(&self) -> Result<(), RbError> {
        if !(self.simulation.frequency_hz > 0.0) {
            return Err(RbError::Config(ErrorInfo::new(
                "sim_frequency",
                "simulation.frequency_hz must be positive",
            )));
        }
        if self.simulation.max_depth == 0 {
            return Err(RbError::Config(ErrorInfo::new(
                "sim_depth",
                "simulation.max_depth must be at least 1",
            )));
        }
        if self.radio_map.enabled {
            let [cx, cy] = self.radio_map.cell_size;
            if !(cx > 0.0) || !(cy > 0.0) {
                return Err(RbError::Config(ErrorInfo::new(
                    "sim_cell_size",
                    "radio_map.cell_size must be positive",
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.runtime.vram_guard.scale) {
            return Err(RbError::Config(ErrorInfo::new(
                "sim_vram_scale",
                "runtime.vram_guard.scale must lie in (0, 1]",
            )));
        }
        Ok(())
    }

    /// Positions of every device joining the radio-map bounding set.
    pub fn bounding_points(&self) -> Vec<[f64; 3]> {
        let mut points = vec![self.scene.tx.position, self.scene.rx.position];
        for panel in &self.scene.ris_panels {
            if panel.map_eligible {
                points.push(panel.position);
            }
        }
        points
    }
}
