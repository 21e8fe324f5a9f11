//! Config snapshot with content hash.

use serde::Serialize;

use raybench_core::errors::RbError;
use raybench_core::hash::hash_bytes;
use raybench_core::serde::{to_canonical_json_bytes, to_canonical_json_pretty, to_yaml_string};
use raybench_store::layout::{CONFIG_HASH, CONFIG_JSON, CONFIG_YAML, METRICS_JSON, SUMMARY_JSON};
use raybench_store::RunStore;

/// Snapshots the accepted config into a run directory.
///
/// Writes `config.yaml`, the canonical `config.json`, and `config_hash`
/// (lowercase hex SHA-256 of exactly the `config.json` bytes). Returns the
/// hash. Bit-identical configs produce bit-identical snapshots on every
/// platform.
pub fn snapshot_config<T: Serialize>(
    store: &RunStore,
    run_id: &str,
    config: &T,
) -> Result<String, RbError> {
    let canonical = to_canonical_json_bytes(config)?;
    let hash = hash_bytes(&canonical);
    let yaml = to_yaml_string(config)?;
    store.write_atomic(run_id, CONFIG_YAML, yaml.as_bytes())?;
    store.write_atomic(run_id, CONFIG_JSON, &canonical)?;
    store.write_atomic(run_id, CONFIG_HASH, format!("{hash}\n").as_bytes())?;
    Ok(hash)
}

/// Writes `summary.json` (pretty canonical JSON).
pub fn write_summary<T: Serialize>(store: &RunStore, run_id: &str, summary: &T) -> Result<(), RbError> {
    let bytes = to_canonical_json_pretty(summary)?;
    store.write_atomic(run_id, SUMMARY_JSON, &bytes)
}

/// Writes `metrics.json` (pretty canonical JSON).
pub fn write_metrics<T: Serialize>(store: &RunStore, run_id: &str, metrics: &T) -> Result<(), RbError> {
    let bytes = to_canonical_json_pretty(metrics)?;
    store.write_atomic(run_id, METRICS_JSON, &bytes)
}
