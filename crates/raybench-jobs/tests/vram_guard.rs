use raybench_jobs::{
    apply_vram_guard, DeviceConfig, FixedProbe, NoDeviceProbe, SceneConfig, SimConfig,
};

fn base_config() -> SimConfig {
    let yaml = serde_json::json!({
        "scene": {
            "tx": {"position": [0.0, 0.0, 10.0]},
            "rx": {"position": [40.0, 0.0, 1.5]}
        },
        "radio_map": {"enabled": true}
    });
    serde_json::from_value(yaml).expect("config")
}

#[test]
fn headroom_leaves_the_config_untouched() {
    let mut config = base_config();
    let before = config.clone();
    let report = apply_vram_guard(&mut config, &FixedProbe(16_000));
    assert!(!report.applied);
    assert!(report.adjustments.is_empty());
    assert_eq!(config, before);
}

#[test]
fn missing_probe_counts_as_headroom() {
    let mut config = base_config();
    let report = apply_vram_guard(&mut config, &NoDeviceProbe);
    assert!(!report.applied);
    assert_eq!(report.vram_mb, None);
}

#[test]
fn low_memory_downgrades_samples_and_depth() {
    let mut config = base_config();
    let report = apply_vram_guard(&mut config, &FixedProbe(4_000));
    assert!(report.applied);
    assert_eq!(report.vram_mb, Some(4_000));
    assert_eq!(report.threshold_mb, 9_000);

    assert_eq!(config.simulation.samples_per_src, 100_000);
    assert_eq!(config.simulation.max_num_paths_per_src, 100_000);
    assert_eq!(config.radio_map.samples_per_tx, 100_000);
    assert_eq!(config.simulation.max_depth, 2);
    assert_eq!(config.radio_map.max_depth, 2);

    let adjustment = report.adjustments.get("samples_per_src").expect("recorded");
    assert_eq!(adjustment.from, 200_000);
    assert_eq!(adjustment.to, 100_000);
    assert!(report.adjustments.contains_key("max_depth"));
}

#[test]
fn downgrades_respect_the_floors() {
    let mut config = base_config();
    config.simulation.samples_per_src = 1_200;
    config.simulation.max_depth = 1;
    let report = apply_vram_guard(&mut config, &FixedProbe(100));
    assert!(report.applied);
    assert_eq!(config.simulation.samples_per_src, 1_000);
    assert_eq!(config.simulation.max_depth, 1);
    // No adjustment entry for a depth already at its floor.
    assert!(!report.adjustments.contains_key("max_depth"));
}

#[test]
fn scene_config_round_trips_with_defaults() {
    let config = base_config();
    assert_eq!(config.scene.tx.power_dbm, 30.0);
    assert_eq!(config.simulation.max_depth, 3);
    assert!(config.radio_map.enabled);
    let SceneConfig { tx: DeviceConfig { position, .. }, .. } = config.scene;
    assert_eq!(position, [0.0, 0.0, 10.0]);
}
