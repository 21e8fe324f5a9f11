use raybench_core::errors::{ErrorInfo, RbError};

fn sample_info(code: &str, message: &str) -> ErrorInfo {
    ErrorInfo::new(code, message)
        .with_context("run_id", "20260101-000000-00000")
        .with_context("reason", "example")
}

#[test]
fn config_error_surface() {
    let err = RbError::Config(sample_info("CFG001", "unknown field"));
    assert_eq!(err.info().code, "CFG001");
    assert!(err.info().context.contains_key("reason"));
}

#[test]
fn not_found_error_surface() {
    let err = RbError::NotFound(sample_info("NF001", "run missing"));
    assert_eq!(err.info().code, "NF001");
    assert!(err.info().context.contains_key("run_id"));
}

#[test]
fn collision_error_surface() {
    let err = RbError::Collision(sample_info("COL001", "run dir exists"));
    assert_eq!(err.info().code, "COL001");
}

#[test]
fn grid_error_surface() {
    let err = RbError::Grid(sample_info("GRD001", "cell size must be positive"));
    assert_eq!(err.info().code, "GRD001");
}

#[test]
fn backend_error_surface() {
    let err = RbError::Backend(sample_info("BKD001", "RT backend is CPU/LLVM"));
    assert_eq!(err.info().code, "BKD001");
}

#[test]
fn display_includes_hint() {
    let err = RbError::Io(sample_info("IO001", "write failed").with_hint("check permissions"));
    let rendered = err.to_string();
    assert!(rendered.contains("IO001"));
    assert!(rendered.contains("check permissions"));
}

#[test]
fn error_round_trips_through_json() {
    let err = RbError::Worker(sample_info("WRK001", "exit 9"));
    let bytes = serde_json::to_vec(&err).expect("serialize");
    let back: RbError = serde_json::from_slice(&bytes).expect("deserialize");
    assert_eq!(err, back);
}
