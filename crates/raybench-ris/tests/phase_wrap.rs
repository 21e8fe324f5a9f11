use std::f64::consts::PI;

use raybench_ris::{
    element_centers, synthesize_phase, wrap_phase, ControlConfig, GeometryConfig, RisConfig,
};

fn geometry() -> GeometryConfig {
    GeometryConfig {
        nx: 20,
        ny: 20,
        dx: 4.9e-3,
        dy: 4.9e-3,
        origin: [0.0, 0.0, 0.0],
        normal: [1.0, 0.0, 0.0],
        x_axis_hint: [0.0, 1.0, 0.0],
        allow_subwavelength: false,
    }
}

fn config_with(control: ControlConfig) -> RisConfig {
    let yaml = b"geometry: {nx: 20, ny: 20, dx: 4.9e-3, dy: 4.9e-3, normal: [1.0, 0.0, 0.0], x_axis_hint: [0.0, 1.0, 0.0]}";
    let mut config = RisConfig::from_yaml(yaml).expect("base config");
    config.control = control;
    config
}

#[test]
fn frame_is_right_handed_and_orthonormal() {
    let panel = element_centers(&geometry()).expect("geometry");
    let f = &panel.frame;
    assert!((f.x_axis.norm() - 1.0).abs() < 1e-12);
    assert!((f.y_axis.norm() - 1.0).abs() < 1e-12);
    assert!((f.normal.norm() - 1.0).abs() < 1e-12);
    assert!(f.x_axis.dot(&f.normal).abs() < 1e-12);
    assert!((f.normal.cross(&f.x_axis) - f.y_axis).norm() < 1e-12);
}

#[test]
fn element_centers_are_centered_on_the_origin() {
    let panel = element_centers(&geometry()).expect("geometry");
    assert_eq!(panel.centers.len(), 20);
    assert_eq!(panel.centers[0].len(), 20);
    let mut sum = nalgebra::Vector3::zeros();
    for row in &panel.centers {
        for center in row {
            sum += center;
        }
    }
    assert!((sum / 400.0).norm() < 1e-12);

    // Corner element: offsets (0 - 9.5) * dx along both in-plane axes.
    let corner = panel.centers[0][0];
    let expected = panel.frame.x_axis * (-9.5 * 4.9e-3) + panel.frame.y_axis * (-9.5 * 4.9e-3);
    assert!((corner - expected).norm() < 1e-12);
}

#[test]
fn wrap_lands_in_half_open_interval() {
    for raw in [-7.0 * PI, -PI, -1e-9, 0.0, 1.0, PI, PI + 1e-9, 9.75 * PI] {
        let wrapped = wrap_phase(raw);
        assert!(wrapped > -PI && wrapped <= PI, "{raw} wrapped to {wrapped}");
    }
    assert_eq!(wrap_phase(PI), PI);
    assert!((wrap_phase(-PI) - PI).abs() < 1e-12);
    assert!((wrap_phase(3.0 * PI) - PI).abs() < 1e-9);
}

#[test]
fn every_control_law_emits_wrapped_phases() {
    let panel = element_centers(&geometry()).expect("geometry");
    let controls = [
        ControlConfig::Steer {
            az_deg: 30.0,
            el_deg: 10.0,
            phase_offset_deg: 45.0,
        },
        ControlConfig::Uniform { phase_deg: 170.0 },
        ControlConfig::Focus {
            focal_point: [1.0, 0.0, 0.8],
        },
        ControlConfig::Gradient {
            sources: vec![[0.0, 0.0, 5.0]],
            targets: vec![[2.0, 1.0, 1.5]],
        },
    ];
    for control in controls {
        let config = config_with(control.clone());
        let phase = synthesize_phase(&config, &panel).expect("synthesize");
        assert_eq!(phase.len(), 20);
        for row in &phase {
            assert_eq!(row.len(), 20);
            for &value in row {
                assert!(value > -PI && value <= PI, "{control:?} emitted {value}");
            }
        }
    }
}

#[test]
fn synthesis_is_deterministic() {
    let panel = element_centers(&geometry()).expect("geometry");
    let config = config_with(ControlConfig::Focus {
        focal_point: [1.0, 0.0, 0.8],
    });
    let first = synthesize_phase(&config, &panel).expect("first");
    let second = synthesize_phase(&config, &panel).expect("second");
    assert_eq!(first, second);
}

#[test]
fn uniform_law_is_constant() {
    let panel = element_centers(&geometry()).expect("geometry");
    let config = config_with(ControlConfig::Uniform { phase_deg: 90.0 });
    let phase = synthesize_phase(&config, &panel).expect("synthesize");
    for row in &phase {
        for &value in row {
            assert!((value - PI / 2.0).abs() < 1e-12);
        }
    }
}
