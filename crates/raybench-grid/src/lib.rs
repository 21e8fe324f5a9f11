#![doc = "Grid alignment kernel: snaps requested radio-map rectangles to whole cells and emits canonical cell centers."]

mod align;

pub use align::{align, AutoSize, GridRequest, RadioMapGrid};
