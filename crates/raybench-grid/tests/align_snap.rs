use raybench_grid::{align, AutoSize, GridRequest, RadioMapGrid};

fn request(size: [f64; 2], cell: [f64; 2], center: [f64; 3]) -> GridRequest {
    GridRequest {
        requested_size: size,
        cell_size: cell,
        center,
        orientation_rad: [0.0; 3],
        auto_size: None,
    }
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

#[test]
fn snaps_up_to_cover_requested_rectangle() {
    let grid = align(&request([37.3, 18.7], [1.0, 0.5], [10.0, 2.0, 1.5])).expect("align");
    assert_close(grid.size[0], 38.0);
    assert_close(grid.size[1], 19.0);
    assert_eq!(grid.nx, 38);
    assert_eq!(grid.ny, 38);

    let centers = grid.cell_centers();
    assert_eq!(centers.len(), grid.ny);
    assert_eq!(centers[0].len(), grid.nx);
    let first = centers[0][0];
    assert_close(first[0], 10.0 - 19.0 + 0.5);
    assert_close(first[1], 2.0 - 9.5 + 0.25);
    assert_close(first[2], 1.5);
}

#[test]
fn exact_multiples_are_kept_unchanged() {
    let grid = align(&request([38.0, 19.0], [1.0, 0.5], [0.0, 0.0, 1.5])).expect("align");
    assert_close(grid.size[0], 38.0);
    assert_close(grid.size[1], 19.0);
}

#[test]
fn snap_is_idempotent() {
    let cases = [
        ([37.3, 18.7], [1.0, 0.5]),
        ([0.7, 0.9], [0.25, 0.25]),
        ([120.0, 80.0], [2.0, 2.0]),
        ([5.01, 4.99], [1.0, 1.0]),
    ];
    for (size, cell) in cases {
        let first = align(&request(size, cell, [0.0, 0.0, 1.5])).expect("first");
        let second = align(&request(first.size, cell, first.center)).expect("second");
        assert_eq!(first, second, "align not idempotent for {size:?}/{cell:?}");
    }
}

#[test]
fn snapped_size_is_positive_cell_multiple() {
    let grid = align(&request([3.2, 7.9], [0.5, 0.3], [1.0, -2.0, 0.0])).expect("align");
    for axis in 0..2 {
        let cells = grid.size[axis] / grid.cell_size[axis];
        assert!((cells - cells.round()).abs() < 1e-9);
        assert!(cells.round() >= 2.0);
    }
}

#[test]
fn tiny_requests_get_two_cells_minimum() {
    let grid = align(&request([0.1, 0.1], [1.0, 1.0], [0.0, 0.0, 0.0])).expect("align");
    assert_close(grid.size[0], 2.0);
    assert_close(grid.size[1], 2.0);
    assert_eq!(grid.shape(), (2, 2));
}

#[test]
fn invalid_inputs_are_rejected() {
    assert!(align(&request([10.0, 10.0], [0.0, 1.0], [0.0, 0.0, 0.0])).is_err());
    assert!(align(&request([10.0, 10.0], [-1.0, 1.0], [0.0, 0.0, 0.0])).is_err());
    assert!(align(&request([0.0, 10.0], [1.0, 1.0], [0.0, 0.0, 0.0])).is_err());
    assert!(align(&request([10.0, 10.0], [1.0, 1.0], [f64::NAN, 0.0, 0.0])).is_err());
    assert!(align(&request([f64::INFINITY, 10.0], [1.0, 1.0], [0.0, 0.0, 0.0])).is_err());
}

#[test]
fn auto_size_covers_device_bounding_box() {
    let mut req = request([1.0, 1.0], [1.0, 1.0], [0.0, 0.0, 1.5]);
    req.auto_size = Some(AutoSize {
        points: vec![[-4.0, -2.0, 10.0], [6.0, 3.0, 1.5], [1.0, 0.0, 2.0]],
        padding: 1.0,
    });
    let grid = align(&req).expect("align");
    // bbox is 10 x 5, padded by 1 per side -> 12 x 7, already whole cells.
    assert_close(grid.size[0], 12.0);
    assert_close(grid.size[1], 7.0);
    // recentered on the bbox midpoint, height kept from the request.
    assert_close(grid.center[0], 1.0);
    assert_close(grid.center[1], 0.5);
    assert_close(grid.center[2], 1.5);
}

#[test]
fn auto_size_with_no_devices_is_rejected() {
    let mut req = request([1.0, 1.0], [1.0, 1.0], [0.0, 0.0, 1.5]);
    req.auto_size = Some(AutoSize {
        points: vec![],
        padding: 1.0,
    });
    assert!(align(&req).is_err());
}

#[test]
fn grid_metadata_serializes_for_the_viewer() {
    let grid = align(&request([4.0, 2.0], [1.0, 1.0], [0.0, 0.0, 1.5])).expect("align");
    let value = serde_json::to_value(&grid).expect("serialize");
    assert_eq!(value["size"], serde_json::json!([4.0, 2.0]));
    let back: RadioMapGrid = serde_json::from_value(value).expect("deserialize");
    assert_eq!(back, grid);
}
