use raybench_artifacts::snapshot_config;
use raybench_store::{RunKind, RunStore};
use serde_json::json;

#[test]
fn snapshot_writes_all_three_files() {
    let temp = tempfile::tempdir().expect("tmp");
    let store = RunStore::new(temp.path()).expect("store");
    let run = store.allocate(RunKind::Ris).expect("allocate");
    let config = json!({"geometry": {"nx": 4, "ny": 4, "dx": 0.01, "dy": 0.01}});

    let hash = snapshot_config(&store, &run.run_id, &config).expect("snapshot");
    let handle = store.open(&run.run_id).expect("open");
    assert!(handle.exists("config.yaml"));
    let json_bytes = handle.read("config.json").expect("config.json");
    let hash_file = String::from_utf8(handle.read("config_hash").expect("config_hash")).unwrap();
    assert_eq!(hash_file.trim(), hash);
    assert_eq!(hash, raybench_core::hash::hash_bytes(&json_bytes));
}

#[test]
fn semantically_equal_configs_hash_identically() {
    let temp = tempfile::tempdir().expect("tmp");
    let store = RunStore::new(temp.path()).expect("store");
    let run_a = store.allocate(RunKind::Ris).expect("allocate a");
    let run_b = store.allocate(RunKind::Ris).expect("allocate b");

    let ordered = json!({"a": 1, "b": {"c": 2.5, "d": [1, 2]}});
    let reordered = json!({"b": {"d": [1, 2], "c": 2.5}, "a": 1});
    let hash_a = snapshot_config(&store, &run_a.run_id, &ordered).expect("a");
    let hash_b = snapshot_config(&store, &run_b.run_id, &reordered).expect("b");
    assert_eq!(hash_a, hash_b);

    // The canonical JSON bytes are identical too, not just the digests.
    let bytes_a = store.open(&run_a.run_id).unwrap().read("config.json").unwrap();
    let bytes_b = store.open(&run_b.run_id).unwrap().read("config.json").unwrap();
    assert_eq!(bytes_a, bytes_b);
}

#[test]
fn different_configs_hash_differently() {
    let temp = tempfile::tempdir().expect("tmp");
    let store = RunStore::new(temp.path()).expect("store");
    let run_a = store.allocate(RunKind::Ris).expect("allocate a");
    let run_b = store.allocate(RunKind::Ris).expect("allocate b");
    let hash_a = snapshot_config(&store, &run_a.run_id, &json!({"bits": 1})).expect("a");
    let hash_b = snapshot_config(&store, &run_b.run_id, &json!({"bits": 2})).expect("b");
    assert_ne!(hash_a, hash_b);
}
