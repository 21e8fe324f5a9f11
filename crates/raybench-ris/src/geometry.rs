//! Panel frame and element placement.

use nalgebra::Vector3;

use raybench_core::errors::{ErrorInfo, RbError};

use crate::config::GeometryConfig;

/// Right-handed orthonormal frame of the panel surface.
///
/// `normal` is the unit surface normal; `x_axis` and `y_axis` span the panel
/// plane with `y_axis = normal × x_axis`.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelFrame {
    /// In-plane x axis.
    pub x_axis: Vector3<f64>,
    /// In-plane y axis.
    pub y_axis: Vector3<f64>,
    /// Unit surface normal.
    pub normal: Vector3<f64>,
}

/// Element centers of the panel in row-major order (`centers[j][i]` for row
/// `j` along y, column `i` along x), together with the local frame.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelGeometry {
    /// Element centers in scene coordinates.
    pub centers: Vec<Vec<Vector3<f64>>>,
    /// Local in-plane offsets `(p_x, p_y)` matching `centers`.
    pub local_offsets: Vec<Vec<[f64; 2]>>,
    /// Panel frame.
    pub frame: PanelFrame,
    /// Element count along x.
    pub nx: usize,
    /// Element count along y.
    pub ny: usize,
}

fn geometry_error(code: &str, message: impl Into<String>) -> RbError {
    RbError::Config(ErrorInfo::new(code, message))
}

/// Derives the panel frame from a normal and an in-plane hint.
///
/// A hint within ~8 degrees of the normal is rejected; the caller chooses a
/// different hint rather than the kernel silently picking an axis.
pub fn compute_frame(normal: &[f64; 3], x_axis_hint: &[f64; 3]) -> Result<PanelFrame, RbError> {
    let normal = Vector3::from_column_slice(normal);
    let hint = Vector3::from_column_slice(x_axis_hint);
    let normal_len = normal.norm();
    if normal_len <= 0.0 {
        return Err(geometry_error("frame_normal", "normal must be a non-zero vector"));
    }
    let hint_len = hint.norm();
    if hint_len <= 0.0 {
        return Err(geometry_error("frame_hint", "x_axis_hint must be a non-zero vector"));
    }
    let w = normal / normal_len;
    let h = hint / hint_len;
    if h.dot(&w).abs() > 0.99 {
        return Err(geometry_error(
            "frame_parallel",
            "x_axis_hint is parallel to the panel normal",
        ));
    }
    let in_plane = h - w * h.dot(&w);
    let x_axis = in_plane / in_plane.norm();
    let y_axis = w.cross(&x_axis);
    Ok(PanelFrame {
        x_axis,
        y_axis,
        normal: w,
    })
}

/// Computes element centers with stable row-major ordering.
///
/// `p(i, j) = origin + (i − (nx−1)/2)·dx·x̂ + (j − (ny−1)/2)·dy·ŷ`.
pub fn element_centers(geometry: &GeometryConfig) -> Result<PanelGeometry, RbError> {
    if geometry.nx == 0 || geometry.ny == 0 {
        return Err(geometry_error("frame_counts", "nx and ny must be positive"));
    }
    if !(geometry.dx > 0.0) || !(geometry.dy > 0.0) {
        return Err(geometry_error("frame_pitch", "dx and dy must be positive"));
    }
    let frame = compute_frame(&geometry.normal, &geometry.x_axis_hint)?;
    let origin = Vector3::from_column_slice(&geometry.origin);
    let half_x = (geometry.nx as f64 - 1.0) / 2.0;
    let half_y = (geometry.ny as f64 - 1.0) / 2.0;

    let mut centers = Vec::with_capacity(geometry.ny);
    let mut local_offsets = Vec::with_capacity(geometry.ny);
    for j in 0..geometry.ny {
        let p_y = (j as f64 - half_y) * geometry.dy;
        let mut row = Vec::with_capacity(geometry.nx);
        let mut offsets = Vec::with_capacity(geometry.nx);
        for i in 0..geometry.nx {
            let p_x = (i as f64 - half_x) * geometry.dx;
            row.push(origin + frame.x_axis * p_x + frame.y_axis * p_y);
            offsets.push([p_x, p_y]);
        }
        centers.push(row);
        local_offsets.push(offsets);
    }

    Ok(PanelGeometry {
        centers,
        local_offsets,
        frame,
        nx: geometry.nx,
        ny: geometry.ny,
    })
}
