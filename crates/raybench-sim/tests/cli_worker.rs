//! Worker subcommand contract: exit codes and artifact output.

use std::process::Command;

use raybench_artifacts::snapshot_config;
use raybench_store::{RunKind, RunStore};
use serde_json::json;

fn binary() -> Command {
    Command::new(env!("CARGO_BIN_EXE_raybench-sim"))
}

fn ris_config(bits: u32) -> serde_json::Value {
    json!({
        "geometry": {
            "nx": 8, "ny": 8, "dx": 4.9e-3, "dy": 4.9e-3,
            "normal": [1.0, 0.0, 0.0], "x_axis_hint": [0.0, 1.0, 0.0]
        },
        "control": {"mode": "steer", "az_deg": 20.0, "el_deg": 0.0},
        "quantization": {"bits": bits}
    })
}

#[test]
fn ris_worker_exits_zero_and_emits_progress_lines() {
    let temp = tempfile::tempdir().expect("tmp");
    let store = RunStore::new(temp.path()).expect("store");
    let run = store.allocate(RunKind::Ris).expect("allocate");
    snapshot_config(&store, &run.run_id, &ris_config(2)).expect("snapshot");

    let output = binary()
        .args(["worker", "--kind", "ris", "--action", "run", "--mode", "pattern"])
        .arg("--run-dir")
        .arg(run.paths.dir())
        .output()
        .expect("spawn");
    assert_eq!(output.status.code(), Some(0), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8_lossy(&output.stdout);
    let progress_lines: Vec<&str> = stdout
        .lines()
        .filter(|line| line.starts_with("PROGRESS "))
        .collect();
    assert!(progress_lines.len() >= 2, "stdout: {stdout}");
    assert!(progress_lines.last().unwrap().contains("\"completed\""));

    let handle = store.open(&run.run_id).expect("open");
    assert!(handle.exists("metrics.json"));
    assert!(handle.exists("data/pattern_db.npy"));
}

#[test]
fn invalid_config_exits_two() {
    let temp = tempfile::tempdir().expect("tmp");
    let store = RunStore::new(temp.path()).expect("store");
    let run = store.allocate(RunKind::Ris).expect("allocate");
    let mut config = ris_config(2);
    config["geometry"]["x_axis_hint"] = json!([1.0, 0.0, 0.0]);
    snapshot_config(&store, &run.run_id, &config).expect("snapshot");

    let output = binary()
        .args(["worker", "--kind", "ris", "--action", "run"])
        .arg("--run-dir")
        .arg(run.paths.dir())
        .output()
        .expect("spawn");
    assert_eq!(output.status.code(), Some(2));
    assert!(!output.stderr.is_empty());
}

#[test]
fn gpu_requirement_on_cpu_backend_exits_three() {
    let temp = tempfile::tempdir().expect("tmp");
    let store = RunStore::new(temp.path()).expect("store");
    let run = store.allocate(RunKind::Sim).expect("allocate");
    let config = json!({
        "scene": {
            "tx": {"position": [0.0, 0.0, 10.0]},
            "rx": {"position": [20.0, 0.0, 1.5]}
        },
        "runtime": {"require_gpu": true}
    });
    snapshot_config(&store, &run.run_id, &config).expect("snapshot");

    let output = binary()
        .args(["worker", "--kind", "sim", "--backend", "cpu"])
        .arg("--run-dir")
        .arg(run.paths.dir())
        .output()
        .expect("spawn");
    assert_eq!(output.status.code(), Some(3));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("RT backend is CPU/LLVM"), "stdout: {stdout}");
}

#[test]
fn gpu_backend_satisfies_requirement() {
    let temp = tempfile::tempdir().expect("tmp");
    let store = RunStore::new(temp.path()).expect("store");
    let run = store.allocate(RunKind::Sim).expect("allocate");
    let config = json!({
        "scene": {
            "tx": {"position": [0.0, 0.0, 10.0]},
            "rx": {"position": [20.0, 0.0, 1.5]}
        },
        "runtime": {"require_gpu": true}
    });
    snapshot_config(&store, &run.run_id, &config).expect("snapshot");

    let output = binary()
        .args(["worker", "--kind", "sim", "--backend", "cuda"])
        .arg("--run-dir")
        .arg(run.paths.dir())
        .output()
        .expect("spawn");
    assert_eq!(output.status.code(), Some(0), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("RT backend is CUDA/OptiX"));
}
