//! Side-lobe metrics over a swept pattern.

use serde::{Deserialize, Serialize};

/// Depth below the peak a local minimum must reach to count as a null, dB.
const NULL_DEPTH_DB: f64 = 20.0;

/// Main-lobe and side-lobe figures extracted from a pattern cut.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SidelobeMetrics {
    /// Angle of the pattern maximum, degrees.
    pub peak_deg: f64,
    /// Pattern value at the peak, dB.
    pub peak_db: f64,
    /// Nearest qualifying null on either side of the peak, degrees.
    pub first_null_deg: Option<f64>,
    /// Highest side lobe relative to the peak, dB. `None` when the main lobe
    /// cannot be bounded by nulls on both sides.
    pub sll_db: Option<f64>,
}

/// Computes peak, first-null and side-lobe level for a pattern cut.
///
/// A null is a local minimum lying more than 20 dB below the peak; the side
/// lobe level is the maximum outside the two first nulls, relative to the
/// peak.
pub fn sidelobe_metrics(theta_deg: &[f64], pattern_db: &[f64]) -> SidelobeMetrics {
    assert_eq!(theta_deg.len(), pattern_db.len(), "angle and pattern lengths differ");
    let peak_idx = argmax(pattern_db);
    let peak_db = pattern_db[peak_idx];
    let peak_deg = theta_deg[peak_idx];

    let left_null = find_null(pattern_db, peak_idx, peak_db, Direction::Left);
    let right_null = find_null(pattern_db, peak_idx, peak_db, Direction::Right);

    let first_null_deg = match (left_null, right_null) {
        (Some(l), Some(r)) => {
            let dl = (theta_deg[l] - peak_deg).abs();
            let dr = (theta_deg[r] - peak_deg).abs();
            Some(if dl <= dr { theta_deg[l] } else { theta_deg[r] })
        }
        (Some(l), None) => Some(theta_deg[l]),
        (None, Some(r)) => Some(theta_deg[r]),
        (None, None) => None,
    };

    let sll_db = match (left_null, right_null) {
        (Some(l), Some(r)) => {
            let outside = pattern_db[..=l]
                .iter()
                .chain(pattern_db[r..].iter())
                .cloned()
                .fold(f64::NEG_INFINITY, f64::max);
            if outside.is_finite() {
                Some(outside - peak_db)
            } else {
                None
            }
        }
        _ => None,
    };

    SidelobeMetrics {
        peak_deg,
        peak_db,
        first_null_deg,
        sll_db,
    }
}

enum Direction {
    Left,
    Right,
}

fn find_null(pattern_db: &[f64], peak_idx: usize, peak_db: f64, dir: Direction) -> Option<usize> {
    let n = pattern_db.len();
    let indices: Box<dyn Iterator<Item = usize>> = match dir {
        Direction::Left => Box::new((1..peak_idx).rev()),
        Direction::Right => Box::new(peak_idx + 1..n.saturating_sub(1)),
    };
    for idx in indices {
        let value = pattern_db[idx];
        let is_local_min = value <= pattern_db[idx - 1] && value <= pattern_db[idx + 1];
        if is_local_min && value < peak_db - NULL_DEPTH_DB {
            return Some(idx);
        }
    }
    None
}

fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (idx, value) in values.iter().enumerate() {
        if *value > values[best] {
            best = idx;
        }
    }
    best
}
