//! Best-effort VRAM guard.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::simcfg::SimConfig;

/// Reports free device memory before dispatch.
pub trait VramProbe: Send + Sync {
    /// Free device memory in MB, or `None` when no device is visible.
    fn free_mb(&self) -> Option<u64>;
}

/// Probe for hosts without a GPU.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDeviceProbe;

impl VramProbe for NoDeviceProbe {
    fn free_mb(&self) -> Option<u64> {
        None
    }
}

/// Probe returning a fixed value, used in tests and forced-downgrade setups.
#[derive(Debug, Clone, Copy)]
pub struct FixedProbe(pub u64);

impl VramProbe for FixedProbe {
    fn free_mb(&self) -> Option<u64> {
        Some(self.0)
    }
}

/// One recorded parameter downgrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adjustment {
    /// Value before the guard fired.
    pub from: u64,
    /// Value after the guard fired.
    pub to: u64,
}

/// Outcome of the guard, recorded on the job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VramGuardReport {
    /// Free memory reported by the probe.
    pub vram_mb: Option<u64>,
    /// Threshold the job was checked against.
    pub threshold_mb: u64,
    /// Whether any downgrade was applied.
    pub applied: bool,
    /// Downgrades keyed by parameter name.
    #[serde(default)]
    pub adjustments: BTreeMap<String, Adjustment>,
}

const SAMPLE_FLOOR: u64 = 1000;

/// Downgrades sampling parameters when free VRAM is below the threshold.
///
/// Never blocks and never waits on another job: a missing probe reading
/// counts as headroom. Sampling counts scale by the configured factor with a
/// floor of 1000; interaction depths drop by one with a floor of 1.
pub fn apply_vram_guard(config: &mut SimConfig, probe: &dyn VramProbe) -> VramGuardReport {
    let threshold_mb = config.runtime.vram_guard.threshold_mb;
    let vram_mb = probe.free_mb();
    let below = matches!(vram_mb, Some(free) if free < threshold_mb);
    if !below {
        return VramGuardReport {
            vram_mb,
            threshold_mb,
            applied: false,
            adjustments: BTreeMap::new(),
        };
    }

    let scale = config.runtime.vram_guard.scale;
    let mut adjustments = BTreeMap::new();
    let mut scale_param = |name: &str, value: &mut u64| {
        let original = *value;
        *value = (((original as f64) * scale) as u64).max(SAMPLE_FLOOR);
        if *value != original {
            adjustments.insert(name.to_string(), Adjustment { from: original, to: *value });
        }
    };
    scale_param("samples_per_src", &mut config.simulation.samples_per_src);
    scale_param(
        "max_num_paths_per_src",
        &mut config.simulation.max_num_paths_per_src,
    );
    scale_param("samples_per_tx", &mut config.radio_map.samples_per_tx);

    let mut drop_depth = |name: &str, value: &mut u32| {
        let original = *value;
        *value = original.saturating_sub(1).max(1);
        if *value != original {
            adjustments.insert(
                name.to_string(),
                Adjustment {
                    from: u64::from(original),
                    to: u64::from(*value),
                },
            );
        }
    };
    drop_depth("max_depth", &mut config.simulation.max_depth);
    drop_depth("radio_map_max_depth", &mut config.radio_map.max_depth);

    VramGuardReport {
        vram_mb,
        threshold_mb,
        applied: true,
        adjustments,
    }
}
