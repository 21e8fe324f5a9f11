use raybench_artifacts::{
    write_ris_pattern, write_ris_validation, write_sim, HeatmapBlob, Markers, PathRow,
    RadioMapValues, RisPatternInputs, RisValidationInputs, SceneManifest, SimInputs, SvgRenderer,
};
use raybench_grid::{align, GridRequest};
use raybench_ris::{
    element_centers, pattern_sweep, quantize, sidelobe_metrics, synthesize_phase, validate,
    ReferenceKind, ReferencePattern, RisConfig,
};
use raybench_store::{RunKind, RunStore};

const RIS_YAML: &[u8] = br#"
geometry:
  nx: 8
  ny: 8
  dx: 4.9e-3
  dy: 4.9e-3
  normal: [1.0, 0.0, 0.0]
  x_axis_hint: [0.0, 1.0, 0.0]
control:
  mode: steer
  az_deg: 20.0
  el_deg: 0.0
quantization:
  bits: 2
"#;

fn computed() -> (RisConfig, Vec<Vec<f64>>, raybench_ris::SweepResult) {
    let config = RisConfig::from_yaml(RIS_YAML).expect("config");
    let panel = element_centers(&config.geometry).expect("panel");
    let phase = quantize(
        &synthesize_phase(&config, &panel).expect("phase"),
        config.quantization.bits,
    );
    let sweep = pattern_sweep(
        &panel,
        &phase,
        &config.pattern_mode.rx_sweep_deg,
        &config.experiment,
        config.pattern_mode.normalization,
        None,
    )
    .expect("sweep");
    (config, phase, sweep)
}

#[test]
fn ris_pattern_set_is_complete() {
    let temp = tempfile::tempdir().expect("tmp");
    let store = RunStore::new(temp.path()).expect("store");
    let run = store.allocate(RunKind::Ris).expect("allocate");
    let (_config, phase, sweep) = computed();
    let metrics = sidelobe_metrics(&sweep.theta_deg, &sweep.pattern_db);

    write_ris_pattern(
        &store,
        &run.run_id,
        &RisPatternInputs {
            phase_map: &phase,
            sweep: &sweep,
            metrics: &metrics,
            config_hash: "deadbeef",
            quantization_bits: 2,
        },
        &SvgRenderer::default(),
    )
    .expect("write");

    let handle = store.open(&run.run_id).expect("open");
    for artifact in [
        "data/phase_map.npy",
        "data/theta_deg.npy",
        "data/pattern_linear.npy",
        "data/pattern_db.npy",
        "plots/phase_map.svg",
        "plots/pattern_cartesian.svg",
        "plots/pattern_polar.svg",
        "metrics.json",
        "summary.json",
    ] {
        assert!(handle.exists(artifact), "missing {artifact}");
    }

    let metrics_json = handle.read_json("metrics.json").expect("metrics");
    assert_eq!(metrics_json["mode"], "pattern");
    assert_eq!(metrics_json["config_hash"], "deadbeef");
    assert_eq!(metrics_json["quantization"]["bits"], 2);
    assert!(metrics_json["quantization"]["convention"]
        .as_str()
        .unwrap()
        .contains("pi/2^bits"));

    let summary = handle.read_json("summary.json").expect("summary");
    assert_eq!(summary["kind"], "ris");
    assert_eq!(summary["plots"].as_array().unwrap().len(), 3);
}

#[test]
fn ris_validation_set_records_the_verdict() {
    let temp = tempfile::tempdir().expect("tmp");
    let store = RunStore::new(temp.path()).expect("store");
    let run = store.allocate(RunKind::Ris).expect("allocate");
    let (_config, phase, sweep) = computed();
    let reference = ReferencePattern {
        theta_deg: sweep.theta_deg.clone(),
        values: sweep.pattern_db.clone(),
        kind: ReferenceKind::PatternDb,
    };
    let report = validate(&sweep, &reference).expect("validate");
    assert!(report.pass);

    write_ris_validation(
        &store,
        &run.run_id,
        &RisValidationInputs {
            phase_map: &phase,
            sweep: &sweep,
            reference_db: &reference.values,
            report: &report,
            reference_path: "refs/lab_chamber.csv",
            config_hash: "deadbeef",
            quantization_bits: 2,
        },
        &SvgRenderer::default(),
    )
    .expect("write");

    let handle = store.open(&run.run_id).expect("open");
    assert!(handle.exists("plots/validation_overlay.svg"));
    let metrics = handle.read_json("metrics.json").expect("metrics");
    assert_eq!(metrics["mode"], "validate");
    assert_eq!(metrics["pass"], true);
    assert_eq!(metrics["thresholds"]["rmse_db_max"], 3.0);
    assert_eq!(metrics["reference_path"], "refs/lab_chamber.csv");
}

#[test]
fn sim_set_carries_the_aligned_grid_verbatim() {
    let temp = tempfile::tempdir().expect("tmp");
    let store = RunStore::new(temp.path()).expect("store");
    let run = store.allocate(RunKind::Sim).expect("allocate");

    let grid = align(&GridRequest {
        requested_size: [4.0, 2.0],
        cell_size: [1.0, 1.0],
        center: [10.0, 2.0, 1.5],
        orientation_rad: [0.0; 3],
        auto_size: None,
    })
    .expect("grid");
    let plane = vec![vec![-60.0, -61.0, -62.0, -63.0], vec![-64.0, -65.0, -66.0, -67.0]];
    let values = RadioMapValues {
        path_gain_linear: plane.iter().map(|row| row.iter().map(|v| 10f64.powf(v / 10.0)).collect()).collect(),
        path_gain_db: plane.clone(),
        rx_power_dbm: plane.iter().map(|row| row.iter().map(|v| v + 30.0).collect()).collect(),
        path_loss_db: plane.iter().map(|row| row.iter().map(|v| -v).collect()).collect(),
    };
    let paths = vec![PathRow {
        path_id: 0,
        points: vec![[0.0, 0.0, 10.0], [10.0, 2.0, 1.5]],
        order: 0,
        path_type: "los".to_string(),
        path_length_m: 13.1,
        delay_s: 4.4e-8,
        power_db: -72.5,
        power_linear: 5.6e-8,
        interactions: vec![],
    }];

    write_sim(
        &store,
        &run.run_id,
        &SimInputs {
            radio_map: Some((&grid, &values)),
            paths: &paths,
            markers: Markers {
                tx: [0.0, 0.0, 10.0],
                rx: [10.0, 2.0, 1.5],
                ris: vec![],
            },
            scene_manifest: SceneManifest::default(),
            config_hash: "cafe",
            rt_backend: "cpu/llvm",
        },
        &SvgRenderer::default(),
    )
    .expect("write");

    let handle = store.open(&run.run_id).expect("open");
    for artifact in [
        "data/paths.csv",
        "data/radio_map.csv",
        "data/radio_map.npz",
        "viewer/heatmap.json",
        "viewer/heatmap.npz",
        "viewer/markers.json",
        "viewer/paths.json",
        "viewer/scene_manifest.json",
        "viewer/radio_map_plots.json",
        "summary.json",
    ] {
        assert!(handle.exists(artifact), "missing {artifact}");
    }

    let heatmap: HeatmapBlob =
        serde_json::from_value(handle.read_json("viewer/heatmap.json").expect("heatmap")).expect("blob");
    assert_eq!(heatmap.grid_shape, [2, 4]);
    assert_eq!(heatmap.cell_centers, grid.cell_centers());
    assert_eq!(heatmap.center, [10.0, 2.0, 1.5]);
    assert_eq!(heatmap.metric, "rx_power_dbm");

    let csv = String::from_utf8(handle.read("data/paths.csv").expect("csv")).unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next().unwrap(),
        "path_id,order,type,path_length_m,delay_s,power_linear,power_db,interactions"
    );
    assert!(lines.next().unwrap().starts_with("0,0,los,13.1"));
}
