//! Uniform phase quantization.

use std::f64::consts::PI;

use crate::phase::{wrap_phase, PhaseMap};

/// Human-readable statement of the bin convention, recorded in run metrics.
pub const QUANTIZATION_CONVENTION: &str = "floor-edge, lowest center -pi + pi/2^bits";

/// Quantizes a phase map onto `2^bits` uniform bins over `[−π, π)`.
///
/// `bits == 0` is the identity. Phases are wrapped into `[−π, π)` first, so
/// `+π` and `−π` land in the same (lowest) bin; each value maps to its bin
/// center, the lowest center being `−π + π/2^bits`.
pub fn quantize(phase: &PhaseMap, bits: u8) -> PhaseMap {
    if bits == 0 {
        return phase.clone();
    }
    let levels = 1u32 << bits;
    let step = 2.0 * PI / f64::from(levels);
    phase
        .iter()
        .map(|row| row.iter().map(|&value| quantize_one(value, levels, step)).collect())
        .collect()
}

fn quantize_one(value: f64, levels: u32, step: f64) -> f64 {
    let mut wrapped = wrap_phase(value);
    if wrapped >= PI {
        wrapped = -PI;
    }
    let mut index = ((wrapped + PI) / step).floor() as i64;
    if index < 0 {
        index = 0;
    }
    let top = i64::from(levels) - 1;
    if index > top {
        index = top;
    }
    -PI + (index as f64 + 0.5) * step
}
