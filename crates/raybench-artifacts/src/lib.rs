#![doc = "Artifact rendering for runs: config snapshots with content hashes, NPY/NPZ arrays, viewer JSON blobs, and the plot renderer hook. All writes go through the run store's atomic replace."]

pub mod npy;
pub mod render;
pub mod snapshot;
pub mod viewer;
pub mod writer;

pub use npy::{npy_bytes, npy_bytes_1d, npy_bytes_2d, npy_bytes_points, npz_bytes, NpzMember};
pub use render::{NullRenderer, Renderer, SvgRenderer};
pub use snapshot::{snapshot_config, write_metrics, write_summary};
pub use viewer::{HeatmapBlob, Markers, PathRow, RadioMapPlot, SceneManifest};
pub use writer::{
    write_ris_pattern, write_ris_validation, write_sim, RadioMapValues, RisPatternInputs,
    RisValidationInputs, SimInputs,
};
