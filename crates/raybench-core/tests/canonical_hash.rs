use raybench_core::hash::stable_hash_string;
use raybench_core::serde::to_canonical_json_bytes;
use serde_json::json;

#[test]
fn reordered_keys_hash_identically() {
    let a = json!({"geometry": {"nx": 20, "ny": 20}, "quantization": {"bits": 1}});
    let b = json!({"quantization": {"bits": 1}, "geometry": {"ny": 20, "nx": 20}});
    let hash_a = stable_hash_string(&a).expect("hash a");
    let hash_b = stable_hash_string(&b).expect("hash b");
    assert_eq!(hash_a, hash_b);
}

#[test]
fn nested_arrays_preserve_order() {
    let a = json!({"origin": [0.0, 1.0, 2.0]});
    let b = json!({"origin": [2.0, 1.0, 0.0]});
    assert_ne!(
        stable_hash_string(&a).unwrap(),
        stable_hash_string(&b).unwrap()
    );
}

#[test]
fn canonical_bytes_are_stable_across_calls() {
    let value = json!({"b": 1, "a": {"d": 2.5, "c": [true, null]}});
    let first = to_canonical_json_bytes(&value).expect("encode");
    let second = to_canonical_json_bytes(&value).expect("encode");
    assert_eq!(first, second);
    assert_eq!(
        String::from_utf8(first).unwrap(),
        r#"{"a":{"c":[true,null],"d":2.5},"b":1}"#
    );
}

#[test]
fn float_formatting_round_trips() {
    // 0.1 must encode to a representation that parses back to the same bits.
    let value = json!({"cell": 0.1, "size": 37.3});
    let bytes = to_canonical_json_bytes(&value).expect("encode");
    let back: serde_json::Value = serde_json::from_slice(&bytes).expect("parse");
    assert_eq!(back["cell"].as_f64(), Some(0.1));
    assert_eq!(back["size"].as_f64(), Some(37.3));
}

#[test]
fn hash_is_lowercase_hex() {
    let hash = stable_hash_string(&json!({"k": 1})).expect("hash");
    assert_eq!(hash.len(), 64);
    assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
}
