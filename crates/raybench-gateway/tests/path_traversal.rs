#![cfg(unix)]

use raybench_gateway::safe_resolve;

#[test]
fn resolves_regular_files() {
    let temp = tempfile::tempdir().expect("tmp");
    let nested = temp.path().join("viewer");
    std::fs::create_dir(&nested).expect("dir");
    std::fs::write(nested.join("heatmap.json"), b"{}").expect("file");

    let resolved = safe_resolve(temp.path(), "viewer/heatmap.json").expect("resolve");
    assert!(resolved.ends_with("viewer/heatmap.json"));
}

#[test]
fn rejects_parent_traversal() {
    let temp = tempfile::tempdir().expect("tmp");
    std::fs::write(temp.path().join("inside.txt"), b"x").expect("file");
    assert!(safe_resolve(temp.path(), "../outside.txt").is_err());
    assert!(safe_resolve(temp.path(), "a/../../outside.txt").is_err());
    assert!(safe_resolve(temp.path(), "/etc/passwd").is_err());
}

#[test]
fn rejects_symlink_escape() {
    let root = tempfile::tempdir().expect("root");
    let outside = tempfile::tempdir().expect("outside");
    let secret = outside.path().join("secret.txt");
    std::fs::write(&secret, b"secret").expect("secret");
    std::os::unix::fs::symlink(&secret, root.path().join("leak.txt")).expect("symlink");

    let err = safe_resolve(root.path(), "leak.txt").unwrap_err();
    assert!(matches!(err, raybench_core::RbError::NotFound(_)));
}

#[test]
fn rejects_directories_and_missing_files() {
    let temp = tempfile::tempdir().expect("tmp");
    std::fs::create_dir(temp.path().join("data")).expect("dir");
    assert!(safe_resolve(temp.path(), "data").is_err());
    assert!(safe_resolve(temp.path(), "missing.json").is_err());
}
