//! Worker bodies for the two job families.
//!
//! A worker re-reads the accepted config from its run directory, computes,
//! writes artifacts through the store, and reports progress through a
//! [`ProgressSink`]. Run as a subprocess the sink prints `PROGRESS` lines
//! for the scheduler's capturer; run in-process it updates the journal
//! directly.

use std::path::Path;

use raybench_artifacts::{
    write_ris_pattern, write_ris_validation, write_sim, Markers, PathRow, RadioMapValues,
    Renderer, RisPatternInputs, RisValidationInputs, SceneManifest, SimInputs,
};
use raybench_core::errors::RbError;
use raybench_core::serde::from_json_slice;
use raybench_grid::{align, AutoSize, GridRequest};
use raybench_ris::{
    element_centers, pattern_sweep, quantize, sidelobe_metrics, synthesize_phase, validate,
    Normalization, ReferencePattern, RisConfig, SweepRange, DB_FLOOR,
};
use raybench_store::{ProgressJournal, ProgressRecord, RunStore};
use serde::{Deserialize, Serialize};

use crate::progress_line::format_progress_line;
use crate::simcfg::SimConfig;
use crate::tracer::{RtBackend, Tracer};

/// RIS job action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RisAction {
    /// Execute the configured mode.
    Run,
    /// Compare the computed pattern against a reference.
    Validate,
}

/// RIS pattern-family mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RisMode {
    /// Full receiver-angle sweep.
    Pattern,
    /// Single-angle link budget.
    Link,
}

/// Terminal outcome of a worker, mapped onto process exit codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerOutcome {
    /// Exit 0.
    Success,
    /// Exit 2: schema or invariant violation.
    InvalidConfig(String),
    /// Exit 3: VRAM exhaustion or required backend unavailable.
    ResourceExhausted(String),
    /// Exit 1: anything else.
    Failure(String),
}

impl WorkerOutcome {
    /// Process exit code for this outcome.
    pub fn exit_code(&self) -> i32 {
        match self {
            WorkerOutcome::Success => 0,
            WorkerOutcome::InvalidConfig(_) => 2,
            WorkerOutcome::ResourceExhausted(_) => 3,
            WorkerOutcome::Failure(_) => 1,
        }
    }

    fn from_error(err: &RbError) -> Self {
        match err {
            RbError::Config(_) | RbError::Grid(_) => WorkerOutcome::InvalidConfig(err.to_string()),
            RbError::Backend(_) => WorkerOutcome::ResourceExhausted(err.to_string()),
            _ => WorkerOutcome::Failure(err.to_string()),
        }
    }
}

/// Progress reporting seam between worker and supervisor.
pub trait ProgressSink {
    /// Reports a progress transition.
    fn update(&self, record: &ProgressRecord);
    /// Emits an opaque log line.
    fn log(&self, line: &str);
}

/// Sink for subprocess workers: structured lines on stdout, captured by the
/// scheduler.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl ProgressSink for StdoutSink {
    fn update(&self, record: &ProgressRecord) {
        println!("{}", format_progress_line(record));
    }

    fn log(&self, line: &str) {
        println!("{line}");
    }
}

/// Sink for in-process execution: writes the journal directly.
pub struct JournalSink<'a> {
    journal: &'a ProgressJournal,
    run_id: String,
}

impl<'a> JournalSink<'a> {
    /// Creates a sink bound to one run.
    pub fn new(journal: &'a ProgressJournal, run_id: &str) -> Self {
        Self {
            journal,
            run_id: run_id.to_string(),
        }
    }
}

impl ProgressSink for JournalSink<'_> {
    fn update(&self, record: &ProgressRecord) {
        if let Err(err) = self.journal.update(&self.run_id, record) {
            tracing::warn!(run_id = %self.run_id, error = %err, "progress update failed");
        }
    }

    fn log(&self, line: &str) {
        if let Err(err) = self.journal.append_log(&self.run_id, line) {
            tracing::warn!(run_id = %self.run_id, error = %err, "log append failed");
        }
    }
}

fn read_config<T: serde::de::DeserializeOwned>(store: &RunStore, run_id: &str) -> Result<T, RbError> {
    let handle = store.open(run_id)?;
    let bytes = handle.read("config.json")?;
    from_json_slice(&bytes)
}

fn read_config_hash(store: &RunStore, run_id: &str) -> Result<String, RbError> {
    let handle = store.open(run_id)?;
    let bytes = handle.read("config_hash")?;
    Ok(String::from_utf8_lossy(&bytes).trim().to_string())
}

fn fail(sink: &dyn ProgressSink, outcome: WorkerOutcome) -> WorkerOutcome {
    let message = match &outcome {
        WorkerOutcome::Success => return outcome,
        WorkerOutcome::InvalidConfig(m)
        | WorkerOutcome::ResourceExhausted(m)
        | WorkerOutcome::Failure(m) => m.clone(),
    };
    sink.log(&message);
    sink.update(&ProgressRecord::failed(message));
    outcome
}

/// Executes a sim run against the given tracer.
pub fn run_sim_worker(
    store: &RunStore,
    run_id: &str,
    tracer: &dyn Tracer,
    renderer: &dyn Renderer,
    sink: &dyn ProgressSink,
) -> WorkerOutcome {
    let config: SimConfig = match read_config(store, run_id) {
        Ok(config) => config,
        Err(err) => return fail(sink, WorkerOutcome::from_error(&err)),
    };
    if let Err(err) = config.validate() {
        return fail(sink, WorkerOutcome::from_error(&err));
    }
    let config_hash = match read_config_hash(store, run_id) {
        Ok(hash) => hash,
        Err(err) => return fail(sink, WorkerOutcome::from_error(&err)),
    };

    let backend = tracer.backend();
    sink.log(backend.verdict());
    if config.runtime.require_gpu && backend == RtBackend::CpuLlvm {
        return fail(sink, WorkerOutcome::ResourceExhausted(backend.verdict().to_string()));
    }

    let with_map = config.radio_map.enabled;
    let total_steps = if with_map { 4 } else { 3 };
    sink.update(&ProgressRecord::running(0, "Build scene", total_steps));

    sink.update(&ProgressRecord::running(1, "Ray trace paths", total_steps));
    let traced = match tracer.trace_paths(&config.scene, &config.simulation) {
        Ok(paths) => paths,
        Err(err) => return fail(sink, WorkerOutcome::from_error(&err)),
    };
    let tx_power_dbm = config.scene.tx.power_dbm;
    let paths: Vec<PathRow> = traced
        .iter()
        .enumerate()
        .map(|(idx, path)| PathRow {
            path_id: idx as u32,
            points: path.points.clone(),
            order: path.order,
            path_type: path.path_type.clone(),
            path_length_m: path.length_m,
            delay_s: path.delay_s,
            power_db: 10.0 * path.gain_linear.max(DB_FLOOR).log10() + tx_power_dbm,
            power_linear: path.gain_linear,
            interactions: path.interactions.clone(),
        })
        .collect();

    let mut radio_map = None;
    if with_map {
        sink.update(&ProgressRecord::running(2, "Radio map", total_steps));
        let request = GridRequest {
            requested_size: config.radio_map.size,
            cell_size: config.radio_map.cell_size,
            center: config.radio_map.center,
            orientation_rad: config.radio_map.orientation,
            auto_size: config.radio_map.auto_size.then(|| AutoSize {
                points: config.bounding_points(),
                padding: config.radio_map.auto_padding,
            }),
        };
        let grid = match align(&request) {
            Ok(grid) => grid,
            Err(err) => return fail(sink, WorkerOutcome::from_error(&err)),
        };
        let gain = match tracer.radio_map(&config.scene, &config.simulation, &grid) {
            Ok(gain) => gain,
            Err(err) => return fail(sink, WorkerOutcome::from_error(&err)),
        };
        let path_gain_db: Vec<Vec<f64>> = gain
            .iter()
            .map(|row| row.iter().map(|&g| 10.0 * g.max(DB_FLOOR).log10()).collect())
            .collect();
        let values = RadioMapValues {
            rx_power_dbm: path_gain_db
                .iter()
                .map(|row| row.iter().map(|db| db + tx_power_dbm).collect())
                .collect(),
            path_loss_db: path_gain_db
                .iter()
                .map(|row| row.iter().map(|db| -db).collect())
                .collect(),
            path_gain_db,
            path_gain_linear: gain,
        };
        radio_map = Some((grid, values));
    }

    let write_step = if with_map { 3 } else { 2 };
    sink.update(&ProgressRecord::running(write_step, "Write artifacts", total_steps));
    let markers = Markers {
        tx: config.scene.tx.position,
        rx: config.scene.rx.position,
        ris: config.scene.ris_panels.iter().map(|p| p.position).collect(),
    };
    let inputs = SimInputs {
        radio_map: radio_map.as_ref().map(|(grid, values)| (grid, values)),
        paths: &paths,
        markers,
        scene_manifest: SceneManifest::default(),
        config_hash: &config_hash,
        rt_backend: backend.label(),
    };
    if let Err(err) = write_sim(store, run_id, &inputs, renderer) {
        return fail(sink, WorkerOutcome::from_error(&err));
    }

    sink.update(&ProgressRecord::completed(total_steps));
    WorkerOutcome::Success
}

/// Executes a RIS Lab run.
pub fn run_ris_worker(
    store: &RunStore,
    run_id: &str,
    action: RisAction,
    mode: RisMode,
    reference: Option<&Path>,
    renderer: &dyn Renderer,
    sink: &dyn ProgressSink,
) -> WorkerOutcome {
    let config: RisConfig = match read_config(store, run_id) {
        Ok(config) => config,
        Err(err) => return fail(sink, WorkerOutcome::from_error(&err)),
    };
    if let Err(err) = config.validate() {
        return fail(sink, WorkerOutcome::from_error(&err));
    }
    let config_hash = match read_config_hash(store, run_id) {
        Ok(hash) => hash,
        Err(err) => return fail(sink, WorkerOutcome::from_error(&err)),
    };

    let total_steps = 3;
    sink.update(&ProgressRecord::running(0, "Synthesize phase", total_steps));
    let panel = match element_centers(&config.geometry) {
        Ok(panel) => panel,
        Err(err) => return fail(sink, WorkerOutcome::from_error(&err)),
    };
    let phase = match synthesize_phase(&config, &panel) {
        Ok(phase) => quantize(&phase, config.quantization.bits),
        Err(err) => return fail(sink, WorkerOutcome::from_error(&err)),
    };

    let result = match action {
        RisAction::Validate => {
            let Some(reference_path) = reference else {
                return fail(
                    sink,
                    WorkerOutcome::InvalidConfig("validate action requires a reference file".into()),
                );
            };
            sink.update(&ProgressRecord::running(1, "Validate pattern", total_steps));
            run_validation(store, run_id, &config, &panel, &phase, reference_path, &config_hash, renderer)
        }
        RisAction::Run => match mode {
            RisMode::Pattern => {
                sink.update(&ProgressRecord::running(1, "Pattern sweep", total_steps));
                run_pattern(store, run_id, &config, &panel, &phase, &config_hash, renderer)
            }
            RisMode::Link => {
                sink.update(&ProgressRecord::running(1, "Link budget", total_steps));
                run_link(store, run_id, &config, &panel, &phase, &config_hash, renderer)
            }
        },
    };
    if let Err(err) = result {
        return fail(sink, WorkerOutcome::from_error(&err));
    }

    sink.update(&ProgressRecord::completed(total_steps));
    WorkerOutcome::Success
}

#[allow(clippy::too_many_arguments)]
fn run_validation(
    store: &RunStore,
    run_id: &str,
    config: &RisConfig,
    panel: &raybench_ris::PanelGeometry,
    phase: &raybench_ris::PhaseMap,
    reference_path: &Path,
    config_hash: &str,
    renderer: &dyn Renderer,
) -> Result<(), RbError> {
    let reference = ReferencePattern::from_csv(reference_path)?;
    let sweep = pattern_sweep(
        panel,
        phase,
        &config.pattern_mode.rx_sweep_deg,
        &config.experiment,
        config.pattern_mode.normalization,
        None,
    )?;
    let report = validate(&sweep, &reference)?;
    let reference_db = reference.resampled_db(&sweep.theta_deg);
    write_ris_validation(
        store,
        run_id,
        &RisValidationInputs {
            phase_map: phase,
            sweep: &sweep,
            reference_db: &reference_db,
            report: &report,
            reference_path: &reference_path.display().to_string(),
            config_hash,
            quantization_bits: config.quantization.bits,
        },
        renderer,
    )
}

fn run_pattern(
    store: &RunStore,
    run_id: &str,
    config: &RisConfig,
    panel: &raybench_ris::PanelGeometry,
    phase: &raybench_ris::PhaseMap,
    config_hash: &str,
    renderer: &dyn Renderer,
) -> Result<(), RbError> {
    let sweep = pattern_sweep(
        panel,
        phase,
        &config.pattern_mode.rx_sweep_deg,
        &config.experiment,
        config.pattern_mode.normalization,
        None,
    )?;
    let metrics = sidelobe_metrics(&sweep.theta_deg, &sweep.pattern_db);
    write_ris_pattern(
        store,
        run_id,
        &RisPatternInputs {
            phase_map: phase,
            sweep: &sweep,
            metrics: &metrics,
            config_hash,
            quantization_bits: config.quantization.bits,
        },
        renderer,
    )
}

fn run_link(
    store: &RunStore,
    run_id: &str,
    config: &RisConfig,
    panel: &raybench_ris::PanelGeometry,
    phase: &raybench_ris::PhaseMap,
    config_hash: &str,
    renderer: &dyn Renderer,
) -> Result<(), RbError> {
    let rx_angle = config.link_mode.rx_angle_deg;
    let sweep = pattern_sweep(
        panel,
        phase,
        &SweepRange {
            start: rx_angle,
            stop: rx_angle,
            step: 1.0,
        },
        &config.experiment,
        Normalization::None,
        None,
    )?;
    let link_gain_linear = sweep.pattern_linear[0];
    let link_gain_db = sweep.pattern_db[0];

    store.write_atomic(
        run_id,
        "data/phase_map.npy",
        &raybench_artifacts::npy_bytes_2d(phase)?,
    )?;
    let handle = store.open(run_id)?;
    let plots = renderer.phase_map(&handle.paths.plots_dir(), phase)?;

    let metrics = serde_json::json!({
        "run_id": run_id,
        "mode": "link",
        "config_hash": config_hash,
        "rx_angle_deg": rx_angle,
        "link_gain_linear": link_gain_linear,
        "link_gain_db": link_gain_db,
    });
    raybench_artifacts::write_metrics(store, run_id, &metrics)?;

    let summary = serde_json::json!({
        "schema_version": 1,
        "kind": "ris",
        "mode": "link",
        "config": { "hash_sha256": config_hash },
        "plots": plots,
        "created_at": raybench_core::provenance::utc_timestamp_millis(),
    });
    raybench_artifacts::write_summary(store, run_id, &summary)
}
