//! Radio-map rectangle snapping.
//!
//! A requested map rectangle is snapped to a whole number of cells per axis
//! and recentered on the requested center. The emitted cell centers are the
//! sole placement ground truth for the solver, the artifact writer and the
//! viewer; no downstream component may re-derive them.

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use raybench_core::errors::{ErrorInfo, RbError};

/// Tolerance used to treat a requested size as an exact cell multiple.
const SNAP_EPS: f64 = 1e-9;

/// Request accepted by [`align`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridRequest {
    /// Requested rectangle size `(wx, wy)` in meters. Ignored when
    /// `auto_size` is present.
    pub requested_size: [f64; 2],
    /// Cell size `(cx, cy)` in meters.
    pub cell_size: [f64; 2],
    /// Requested map center; `z` is the fixed measurement height.
    pub center: [f64; 3],
    /// Map plane orientation in radians, carried through as metadata.
    #[serde(default)]
    pub orientation_rad: [f64; 3],
    /// Derive the requested rectangle from a device bounding set instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_size: Option<AutoSize>,
}

/// Bounding-set auto sizing parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoSize {
    /// Positions of every device of interest (transmitters, receivers, and
    /// map-eligible RIS panels).
    pub points: Vec<[f64; 3]>,
    /// Inflation applied on each side of the bounding box, in meters.
    #[serde(default)]
    pub padding: f64,
}

/// Canonical snapped grid metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadioMapGrid {
    /// Cell size `(cx, cy)` in meters.
    pub cell_size: [f64; 2],
    /// Map center after recentering.
    pub center: [f64; 3],
    /// Snapped rectangle size `(wx, wy)`; always a whole multiple of the
    /// cell size on both axes.
    pub size: [f64; 2],
    /// Orientation in radians `(rx, ry, rz)`.
    pub orientation_rad: [f64; 3],
    /// Cell count along x.
    pub nx: usize,
    /// Cell count along y.
    pub ny: usize,
}

impl RadioMapGrid {
    /// Returns the canonical cell-center list, row-major over y then x.
    ///
    /// `xs[i] = center.x − wx/2 + (i + 0.5)·cx`, similarly for `ys`; `z` is
    /// the map height from the center.
    pub fn cell_centers(&self) -> Vec<Vec<[f64; 3]>> {
        let [cx, cy] = self.cell_size;
        let [wx, wy] = self.size;
        let [x0, y0, z] = self.center;
        (0..self.ny)
            .map(|j| {
                let y = y0 - wy / 2.0 + (j as f64 + 0.5) * cy;
                (0..self.nx)
                    .map(|i| {
                        let x = x0 - wx / 2.0 + (i as f64 + 0.5) * cx;
                        [x, y, z]
                    })
                    .collect()
            })
            .collect()
    }

    /// Returns the grid shape as `(rows, cols)` = `(ny, nx)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.ny, self.nx)
    }
}

fn grid_error(code: &str, message: impl Into<String>) -> RbError {
    RbError::Grid(ErrorInfo::new(code, message))
}

/// Snaps the requested rectangle to whole cells and recenters it.
///
/// Side lengths round up so the snapped rectangle covers the requested one;
/// sizes already a whole multiple of the cell size are kept unchanged, and
/// every axis spans at least two cells.
pub fn align(request: &GridRequest) -> Result<RadioMapGrid, RbError> {
    let [cx, cy] = request.cell_size;
    if !(cx > 0.0) || !(cy > 0.0) || !cx.is_finite() || !cy.is_finite() {
        return Err(grid_error("grid_cell_size", "cell_size must be positive and finite"));
    }
    if request.center.iter().any(|c| !c.is_finite()) {
        return Err(grid_error("grid_center", "center coordinates must be finite"));
    }

    let (requested, center) = match &request.auto_size {
        Some(auto) => {
            let (size, bbox_center) = bounding_rectangle(auto)?;
            let center = [bbox_center[0], bbox_center[1], request.center[2]];
            (size, center)
        }
        None => (request.requested_size, request.center),
    };

    let [wx, wy] = requested;
    if !(wx > 0.0) || !(wy > 0.0) || !wx.is_finite() || !wy.is_finite() {
        return Err(grid_error("grid_size", "requested_size must be positive and finite"));
    }

    let (snapped_x, nx) = snap_axis(wx, cx);
    let (snapped_y, ny) = snap_axis(wy, cy);

    Ok(RadioMapGrid {
        cell_size: request.cell_size,
        center,
        size: [snapped_x, snapped_y],
        orientation_rad: request.orientation_rad,
        nx,
        ny,
    })
}

fn snap_axis(requested: f64, cell: f64) -> (f64, usize) {
    let ratio = requested / cell;
    let cells = if (ratio - ratio.round()).abs() < SNAP_EPS {
        ratio.round()
    } else {
        ratio.ceil()
    };
    let cells = cells.max(2.0);
    (cells * cell, cells as usize)
}

fn bounding_rectangle(auto: &AutoSize) -> Result<([f64; 2], [f64; 2]), RbError> {
    if auto.points.is_empty() {
        return Err(grid_error("grid_auto_empty", "auto_size requires at least one device"));
    }
    if !auto.padding.is_finite() || auto.padding < 0.0 {
        return Err(grid_error("grid_auto_padding", "padding must be finite and non-negative"));
    }
    let mut min = Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY);
    let mut max = Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
    for point in &auto.points {
        if point.iter().any(|c| !c.is_finite()) {
            return Err(grid_error("grid_auto_point", "device position must be finite"));
        }
        for axis in 0..3 {
            min[axis] = min[axis].min(point[axis]);
            max[axis] = max[axis].max(point[axis]);
        }
    }
    let size = [
        (max.x - min.x) + 2.0 * auto.padding,
        (max.y - min.y) + 2.0 * auto.padding,
    ];
    let center = [(min.x + max.x) * 0.5, (min.y + max.y) * 0.5];
    Ok((size, center))
}
