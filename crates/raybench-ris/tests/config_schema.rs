use raybench_ris::{ControlConfig, Normalization, RisConfig};

fn base_yaml() -> String {
    r#"
geometry:
  nx: 20
  ny: 20
  dx: 4.9e-3
  dy: 4.9e-3
  normal: [1.0, 0.0, 0.0]
  x_axis_hint: [0.0, 1.0, 0.0]
control:
  mode: steer
  az_deg: 30.0
  el_deg: 0.0
quantization:
  bits: 1
experiment:
  frequency_hz: 28.0e9
"#
    .to_string()
}

#[test]
fn resolves_with_defaults() {
    let config = RisConfig::from_yaml(base_yaml().as_bytes()).expect("parse");
    assert_eq!(config.schema_version, 1);
    assert_eq!(config.quantization.bits, 1);
    assert_eq!(config.pattern_mode.normalization, Normalization::Peak0db);
    let sweep = config.pattern_mode.rx_sweep_deg;
    assert_eq!((sweep.start, sweep.stop, sweep.step), (-90.0, 90.0, 2.0));
    assert_eq!(config.experiment.tx_angle_deg, 0.0);
    match config.control {
        ControlConfig::Steer { az_deg, el_deg, phase_offset_deg } => {
            assert_eq!(az_deg, 30.0);
            assert_eq!(el_deg, 0.0);
            assert_eq!(phase_offset_deg, 0.0);
        }
        other => panic!("unexpected control {other:?}"),
    }
}

#[test]
fn unknown_fields_are_rejected() {
    let mut yaml = base_yaml();
    yaml.push_str("unknown_section:\n  value: 1\n");
    assert!(RisConfig::from_yaml(yaml.as_bytes()).is_err());

    let nested = base_yaml().replace("  bits: 1", "  bits: 1\n  rounding: nearest");
    assert!(RisConfig::from_yaml(nested.as_bytes()).is_err());
}

#[test]
fn parallel_axis_hint_is_rejected() {
    let yaml = base_yaml().replace(
        "x_axis_hint: [0.0, 1.0, 0.0]",
        "x_axis_hint: [1.0, 0.0, 0.0]",
    );
    let err = RisConfig::from_yaml(yaml.as_bytes()).unwrap_err();
    assert_eq!(err.info().code, "ris_geometry_parallel");
}

#[test]
fn zero_normal_is_rejected() {
    let yaml = base_yaml().replace("normal: [1.0, 0.0, 0.0]", "normal: [0.0, 0.0, 0.0]");
    assert!(RisConfig::from_yaml(yaml.as_bytes()).is_err());
}

#[test]
fn subwavelength_pitch_needs_override_and_continuous_phase() {
    // lambda/10 at 28 GHz is about 1.07 mm; 0.5 mm pitch is below it.
    let tight = base_yaml()
        .replace("dx: 4.9e-3", "dx: 0.5e-3")
        .replace("dy: 4.9e-3", "dy: 0.5e-3");
    let err = RisConfig::from_yaml(tight.as_bytes()).unwrap_err();
    assert_eq!(err.info().code, "ris_subwavelength_pitch");

    // Override alone is not enough while the quantizer is active.
    let with_override = tight.replace(
        "  x_axis_hint: [0.0, 1.0, 0.0]",
        "  x_axis_hint: [0.0, 1.0, 0.0]\n  allow_subwavelength: true",
    );
    assert!(RisConfig::from_yaml(with_override.as_bytes()).is_err());

    let continuous = with_override.replace("  bits: 1", "  bits: 0");
    let config = RisConfig::from_yaml(continuous.as_bytes()).expect("override accepted");
    assert!(config.geometry.allow_subwavelength);
}

#[test]
fn quantizer_resolution_is_bounded() {
    let yaml = base_yaml().replace("  bits: 1", "  bits: 9");
    let err = RisConfig::from_yaml(yaml.as_bytes()).unwrap_err();
    assert_eq!(err.info().code, "ris_quantization_bits");
}

#[test]
fn reflection_coeff_range_is_enforced() {
    let yaml = base_yaml().replace(
        "  frequency_hz: 28.0e9",
        "  frequency_hz: 28.0e9\n  reflection_coeff: 1.2",
    );
    let err = RisConfig::from_yaml(yaml.as_bytes()).unwrap_err();
    assert_eq!(err.info().code, "ris_reflection_coeff");
}

#[test]
fn gradient_control_takes_one_source_and_target() {
    let yaml = base_yaml().replace(
        "control:\n  mode: steer\n  az_deg: 30.0\n  el_deg: 0.0",
        "control:\n  mode: gradient\n  sources: [[0.0, 0.0, 5.0], [1.0, 0.0, 5.0]]\n  targets: [[2.0, 1.0, 1.5]]",
    );
    let err = RisConfig::from_yaml(yaml.as_bytes()).unwrap_err();
    assert_eq!(err.info().code, "ris_gradient_points");
}

#[test]
fn wavelength_follows_frequency() {
    let config = RisConfig::from_yaml(base_yaml().as_bytes()).expect("parse");
    let lambda = config.wavelength_m();
    assert!((lambda - 0.010707).abs() < 1e-5, "lambda = {lambda}");
}
