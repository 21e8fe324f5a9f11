//! Fixed artifact sets per run kind.

use serde_json::json;

use raybench_core::errors::{ErrorInfo, RbError};
use raybench_core::provenance::utc_timestamp_millis;
use raybench_grid::RadioMapGrid;
use raybench_ris::{PhaseMap, SidelobeMetrics, SweepResult, ValidationReport, QUANTIZATION_CONVENTION};
use raybench_store::RunStore;

use crate::npy::{npy_bytes_1d, npy_bytes_2d, npy_bytes_points, npz_bytes, NpzMember};
use crate::render::Renderer;
use crate::snapshot::{write_metrics, write_summary};
use crate::viewer::{
    write_heatmap, write_markers, write_paths, write_radio_map_plots, write_scene_manifest,
    HeatmapBlob, Markers, PathRow, RadioMapPlot, SceneManifest,
};

/// Inputs for the RIS pattern-mode artifact set.
#[derive(Debug)]
pub struct RisPatternInputs<'a> {
    /// Quantized phase map that produced the sweep.
    pub phase_map: &'a PhaseMap,
    /// Sweep result.
    pub sweep: &'a SweepResult,
    /// Side-lobe figures.
    pub metrics: &'a SidelobeMetrics,
    /// Hash of the accepted config.
    pub config_hash: &'a str,
    /// Quantizer resolution used.
    pub quantization_bits: u8,
}

/// Writes the pattern-mode artifact set for a RIS run.
pub fn write_ris_pattern(
    store: &RunStore,
    run_id: &str,
    inputs: &RisPatternInputs<'_>,
    renderer: &dyn Renderer,
) -> Result<(), RbError> {
    store.write_atomic(run_id, "data/phase_map.npy", &npy_bytes_2d(inputs.phase_map)?)?;
    store.write_atomic(run_id, "data/theta_deg.npy", &npy_bytes_1d(&inputs.sweep.theta_deg)?)?;
    store.write_atomic(
        run_id,
        "data/pattern_linear.npy",
        &npy_bytes_1d(&inputs.sweep.pattern_linear)?,
    )?;
    store.write_atomic(run_id, "data/pattern_db.npy", &npy_bytes_1d(&inputs.sweep.pattern_db)?)?;

    let plots_dir = run_plots_dir(store, run_id)?;
    let mut plots = renderer.phase_map(&plots_dir, inputs.phase_map)?;
    plots.extend(renderer.pattern(&plots_dir, &inputs.sweep.theta_deg, &inputs.sweep.pattern_db)?);

    let metrics = json!({
        "run_id": run_id,
        "mode": "pattern",
        "config_hash": inputs.config_hash,
        "normalization": inputs.sweep.normalization,
        "peak_deg": inputs.metrics.peak_deg,
        "peak_db": inputs.metrics.peak_db,
        "first_null_deg": inputs.metrics.first_null_deg,
        "sll_db": inputs.metrics.sll_db,
        "quantization": {
            "bits": inputs.quantization_bits,
            "convention": QUANTIZATION_CONVENTION,
        },
    });
    write_metrics(store, run_id, &metrics)?;

    let summary = json!({
        "schema_version": 1,
        "kind": "ris",
        "mode": "pattern",
        "config": { "hash_sha256": inputs.config_hash },
        "plots": plots,
        "created_at": utc_timestamp_millis(),
    });
    write_summary(store, run_id, &summary)
}

/// Inputs for the RIS validation artifact set.
#[derive(Debug)]
pub struct RisValidationInputs<'a> {
    /// Quantized phase map under validation.
    pub phase_map: &'a PhaseMap,
    /// Sweep computed on the reference angles.
    pub sweep: &'a SweepResult,
    /// Reference values resampled for the overlay plot, in dB.
    pub reference_db: &'a [f64],
    /// Validation verdict.
    pub report: &'a ValidationReport,
    /// Path of the reference file, recorded in metrics.
    pub reference_path: &'a str,
    /// Hash of the accepted config.
    pub config_hash: &'a str,
    /// Quantizer resolution used.
    pub quantization_bits: u8,
}

/// Writes the validation-mode artifact set for a RIS run.
pub fn write_ris_validation(
    store: &RunStore,
    run_id: &str,
    inputs: &RisValidationInputs<'_>,
    renderer: &dyn Renderer,
) -> Result<(), RbError> {
    store.write_atomic(run_id, "data/phase_map.npy", &npy_bytes_2d(inputs.phase_map)?)?;
    store.write_atomic(run_id, "data/theta_deg.npy", &npy_bytes_1d(&inputs.sweep.theta_deg)?)?;
    store.write_atomic(run_id, "data/pattern_db.npy", &npy_bytes_1d(&inputs.sweep.pattern_db)?)?;

    let plots_dir = run_plots_dir(store, run_id)?;
    let mut plots = renderer.phase_map(&plots_dir, inputs.phase_map)?;
    plots.extend(renderer.validation_overlay(
        &plots_dir,
        &inputs.sweep.theta_deg,
        &inputs.sweep.pattern_db,
        inputs.reference_db,
    )?);

    let metrics = json!({
        "run_id": run_id,
        "mode": "validate",
        "config_hash": inputs.config_hash,
        "reference_path": inputs.reference_path,
        "rmse_db": inputs.report.rmse_db,
        "peak_deg_error": inputs.report.peak_deg_error,
        "peak_db_error": inputs.report.peak_db_error,
        "pass": inputs.report.pass,
        "thresholds": {
            "rmse_db_max": raybench_ris::validate::RMSE_DB_MAX,
            "peak_deg_err_max": raybench_ris::validate::PEAK_DEG_ERR_MAX,
        },
        "quantization": {
            "bits": inputs.quantization_bits,
            "convention": QUANTIZATION_CONVENTION,
        },
    });
    write_metrics(store, run_id, &metrics)?;

    let summary = json!({
        "schema_version": 1,
        "kind": "ris",
        "mode": "validate",
        "config": { "hash_sha256": inputs.config_hash },
        "plots": plots,
        "pass": inputs.report.pass,
        "created_at": utc_timestamp_millis(),
    });
    write_summary(store, run_id, &summary)
}

/// Radio-map value planes computed by the tracer.
#[derive(Debug, Clone)]
pub struct RadioMapValues {
    /// Path gain, linear.
    pub path_gain_linear: Vec<Vec<f64>>,
    /// Path gain in dB.
    pub path_gain_db: Vec<Vec<f64>>,
    /// Received power in dBm.
    pub rx_power_dbm: Vec<Vec<f64>>,
    /// Path loss in dB.
    pub path_loss_db: Vec<Vec<f64>>,
}

/// Inputs for the sim artifact set.
#[derive(Debug)]
pub struct SimInputs<'a> {
    /// Aligned grid and values, when the run computed a radio map.
    pub radio_map: Option<(&'a RadioMapGrid, &'a RadioMapValues)>,
    /// Traced path rows.
    pub paths: &'a [PathRow],
    /// Device markers.
    pub markers: Markers,
    /// Scene manifest for the viewer.
    pub scene_manifest: SceneManifest,
    /// Hash of the accepted config.
    pub config_hash: &'a str,
    /// Backend verdict string recorded in the summary.
    pub rt_backend: &'a str,
}

/// Writes the artifact set for a sim run.
pub fn write_sim(
    store: &RunStore,
    run_id: &str,
    inputs: &SimInputs<'_>,
    renderer: &dyn Renderer,
) -> Result<(), RbError> {
    write_paths_csv(store, run_id, inputs.paths)?;
    write_markers(store, run_id, &inputs.markers)?;
    write_paths(store, run_id, inputs.paths)?;
    write_scene_manifest(store, run_id, &inputs.scene_manifest)?;

    let mut plots: Vec<String> = Vec::new();
    let mut radio_map_stats = None;
    if let Some((grid, values)) = &inputs.radio_map {
        let cell_centers = grid.cell_centers();
        let npz = npz_bytes(&[
            NpzMember { name: "path_gain_linear", bytes: npy_bytes_2d(&values.path_gain_linear)? },
            NpzMember { name: "path_gain_db", bytes: npy_bytes_2d(&values.path_gain_db)? },
            NpzMember { name: "rx_power_dbm", bytes: npy_bytes_2d(&values.rx_power_dbm)? },
            NpzMember { name: "path_loss_db", bytes: npy_bytes_2d(&values.path_loss_db)? },
            NpzMember { name: "cell_centers", bytes: npy_bytes_points(&cell_centers)? },
        ])?;
        store.write_atomic(run_id, "data/radio_map.npz", &npz)?;
        store.write_atomic(run_id, "viewer/heatmap.npz", &npz)?;
        write_radio_map_csv(store, run_id, &values.path_gain_db, &cell_centers)?;

        let blob = HeatmapBlob::from_grid("rx_power_dbm", grid, values.rx_power_dbm.clone());
        write_heatmap(store, run_id, &blob)?;

        let plots_dir = run_plots_dir(store, run_id)?;
        for (metric, plane) in [
            ("path_gain_db", &values.path_gain_db),
            ("rx_power_dbm", &values.rx_power_dbm),
            ("path_loss_db", &values.path_loss_db),
        ] {
            plots.extend(renderer.radio_map(&plots_dir, metric, plane)?);
        }
        radio_map_stats = Some(plane_stats(values));
    }
    let plot_entries: Vec<RadioMapPlot> = plots
        .iter()
        .map(|file| RadioMapPlot {
            file: file.clone(),
            label: file.trim_end_matches(".svg").trim_end_matches(".png").to_string(),
        })
        .collect();
    write_radio_map_plots(store, run_id, &plot_entries)?;

    let summary = json!({
        "schema_version": 1,
        "kind": "sim",
        "config": { "hash_sha256": inputs.config_hash },
        "runtime": { "rt_backend": inputs.rt_backend },
        "metrics": {
            "num_paths": inputs.paths.len(),
            "radio_map": radio_map_stats,
        },
        "plots": plots,
        "created_at": utc_timestamp_millis(),
    });
    write_summary(store, run_id, &summary)
}

fn run_plots_dir(store: &RunStore, run_id: &str) -> Result<std::path::PathBuf, RbError> {
    let handle = store.open(run_id)?;
    Ok(handle.paths.plots_dir())
}

fn write_paths_csv(store: &RunStore, run_id: &str, rows: &[PathRow]) -> Result<(), RbError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record([
            "path_id",
            "order",
            "type",
            "path_length_m",
            "delay_s",
            "power_linear",
            "power_db",
            "interactions",
        ])
        .map_err(|err| csv_error("paths_header", err))?;
    for row in rows {
        writer
            .write_record([
                row.path_id.to_string(),
                row.order.to_string(),
                row.path_type.clone(),
                format!("{:.6}", row.path_length_m),
                format!("{:.9e}", row.delay_s),
                format!("{:.6e}", row.power_linear),
                format!("{:.3}", row.power_db),
                row.interactions.join(";"),
            ])
            .map_err(|err| csv_error("paths_row", err))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| RbError::Serde(ErrorInfo::new("paths_flush", err.to_string())))?;
    store.write_atomic(run_id, "data/paths.csv", &bytes)
}

fn write_radio_map_csv(
    store: &RunStore,
    run_id: &str,
    path_gain_db: &[Vec<f64>],
    cell_centers: &[Vec<[f64; 3]>],
) -> Result<(), RbError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(["x", "y", "z", "path_gain_db"])
        .map_err(|err| csv_error("radio_map_header", err))?;
    for (value_row, center_row) in path_gain_db.iter().zip(cell_centers.iter()) {
        for (value, center) in value_row.iter().zip(center_row.iter()) {
            writer
                .write_record([
                    center[0].to_string(),
                    center[1].to_string(),
                    center[2].to_string(),
                    format!("{value:.6}"),
                ])
                .map_err(|err| csv_error("radio_map_row", err))?;
        }
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| RbError::Serde(ErrorInfo::new("radio_map_flush", err.to_string())))?;
    store.write_atomic(run_id, "data/radio_map.csv", &bytes)
}

fn csv_error(code: &str, err: csv::Error) -> RbError {
    RbError::Serde(ErrorInfo::new(code, err.to_string()))
}

fn plane_stats(values: &RadioMapValues) -> serde_json::Value {
    fn stats(plane: &[Vec<f64>]) -> serde_json::Value {
        let flat: Vec<f64> = plane.iter().flatten().copied().collect();
        let count = flat.len().max(1) as f64;
        let min = flat.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = flat.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let mean = flat.iter().sum::<f64>() / count;
        json!({ "min": min, "mean": mean, "max": max })
    }
    json!({
        "path_gain_db": stats(&values.path_gain_db),
        "rx_power_dbm": stats(&values.rx_power_dbm),
        "path_loss_db": stats(&values.path_loss_db),
        "grid_shape": [values.path_gain_db.len(), values.path_gain_db.first().map_or(0, Vec::len)],
    })
}
