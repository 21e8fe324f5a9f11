//! Browser viewer blobs.
//!
//! Everything the viewer places in 3D space comes from these files; the
//! heatmap blob in particular carries the aligned grid metadata verbatim so
//! the viewer can never disagree with the solver about cell placement.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use raybench_core::errors::RbError;
use raybench_core::serde::to_canonical_json_pretty;
use raybench_grid::RadioMapGrid;
use raybench_store::RunStore;

/// `viewer/heatmap.json`: the radio map with its canonical grid metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapBlob {
    /// Name of the mapped metric (e.g. `rx_power_dbm`).
    pub metric: String,
    /// `(rows, cols)` of the value grid.
    pub grid_shape: [usize; 2],
    /// Metric values, row-major.
    pub values: Vec<Vec<f64>>,
    /// Canonical cell centers, `[rows][cols][3]`.
    pub cell_centers: Vec<Vec<[f64; 3]>>,
    /// Aligned map center.
    pub center: [f64; 3],
    /// Aligned map size.
    pub size: [f64; 2],
    /// Cell size.
    pub cell_size: [f64; 2],
    /// Map orientation in radians.
    pub orientation: [f64; 3],
}

impl HeatmapBlob {
    /// Builds a blob from an aligned grid and its metric values.
    pub fn from_grid(metric: impl Into<String>, grid: &RadioMapGrid, values: Vec<Vec<f64>>) -> Self {
        Self {
            metric: metric.into(),
            grid_shape: [grid.ny, grid.nx],
            values,
            cell_centers: grid.cell_centers(),
            center: grid.center,
            size: grid.size,
            cell_size: grid.cell_size,
            orientation: grid.orientation_rad,
        }
    }
}

/// `viewer/markers.json`: device positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Markers {
    /// Transmitter position.
    pub tx: [f64; 3],
    /// Receiver position.
    pub rx: [f64; 3],
    /// RIS panel positions.
    #[serde(default)]
    pub ris: Vec<[f64; 3]>,
}

/// One polyline in `viewer/paths.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathRow {
    /// Stable path identifier.
    pub path_id: u32,
    /// Polyline vertices from transmitter to receiver.
    pub points: Vec<[f64; 3]>,
    /// Interaction order (0 = line of sight).
    pub order: u32,
    /// Path type label (`los`, `specular`, ...).
    #[serde(rename = "type")]
    pub path_type: String,
    /// Geometric length in meters.
    pub path_length_m: f64,
    /// Propagation delay in seconds.
    pub delay_s: f64,
    /// Received power relative to transmit, dB.
    pub power_db: f64,
    /// Received power in linear units.
    pub power_linear: f64,
    /// Interaction labels along the path.
    #[serde(default)]
    pub interactions: Vec<String>,
}

/// `viewer/scene_manifest.json`: geometry sources for the viewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SceneManifest {
    /// Single mesh file name, when the scene ships one.
    pub mesh: Option<String>,
    /// Exported mesh files, relative to the viewer directory.
    #[serde(default)]
    pub mesh_files: Vec<String>,
    /// Proxy geometry description passed through from the scene config.
    pub proxy: Option<Value>,
}

/// One entry of `viewer/radio_map_plots.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadioMapPlot {
    /// Plot file name inside `plots/`.
    pub file: String,
    /// Display label.
    pub label: String,
}

fn write_blob<T: Serialize>(store: &RunStore, run_id: &str, rel: &str, blob: &T) -> Result<(), RbError> {
    let bytes = to_canonical_json_pretty(blob)?;
    store.write_atomic(run_id, rel, &bytes)
}

/// Writes `viewer/heatmap.json`.
pub fn write_heatmap(store: &RunStore, run_id: &str, blob: &HeatmapBlob) -> Result<(), RbError> {
    write_blob(store, run_id, "viewer/heatmap.json", blob)
}

/// Writes `viewer/markers.json`.
pub fn write_markers(store: &RunStore, run_id: &str, markers: &Markers) -> Result<(), RbError> {
    write_blob(store, run_id, "viewer/markers.json", markers)
}

/// Writes `viewer/paths.json`.
pub fn write_paths(store: &RunStore, run_id: &str, rows: &[PathRow]) -> Result<(), RbError> {
    write_blob(store, run_id, "viewer/paths.json", &rows)
}

/// Writes `viewer/scene_manifest.json`.
pub fn write_scene_manifest(
    store: &RunStore,
    run_id: &str,
    manifest: &SceneManifest,
) -> Result<(), RbError> {
    write_blob(store, run_id, "viewer/scene_manifest.json", manifest)
}

/// Writes `viewer/radio_map_plots.json`.
pub fn write_radio_map_plots(
    store: &RunStore,
    run_id: &str,
    plots: &[RadioMapPlot],
) -> Result<(), RbError> {
    let blob = serde_json::json!({ "plots": plots });
    write_blob(store, run_id, "viewer/radio_map_plots.json", &blob)
}
