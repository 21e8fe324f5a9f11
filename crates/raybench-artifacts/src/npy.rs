//! Minimal NPY / NPZ writers.
//!
//! Arrays are emitted as NPY format version 1.0, little-endian `f8`, C
//! order, which is what the viewer tooling and diffing scripts consume. An
//! NPZ container is a ZIP of NPY members stored without compression so the
//! byte layout is reproducible.

use std::io::{Cursor, Write};

use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use raybench_core::errors::{ErrorInfo, RbError};

const NPY_MAGIC: &[u8] = b"\x93NUMPY";

fn npy_error(code: &str, message: impl Into<String>) -> RbError {
    RbError::Serde(ErrorInfo::new(code, message))
}

/// Encodes a flat buffer with the given shape as NPY bytes.
pub fn npy_bytes(shape: &[usize], values: &[f64]) -> Result<Vec<u8>, RbError> {
    let expected: usize = shape.iter().product();
    if expected != values.len() {
        return Err(npy_error(
            "npy_shape",
            format!("shape {:?} needs {expected} values, got {}", shape, values.len()),
        ));
    }

    let shape_repr = match shape {
        [n] => format!("({n},)"),
        dims => {
            let joined = dims
                .iter()
                .map(|d| d.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            format!("({joined})")
        }
    };
    let mut header = format!("{{'descr': '<f8', 'fortran_order': False, 'shape': {shape_repr}, }}");
    // Pad so that magic + version + length prefix + header is 64-aligned.
    let unpadded = NPY_MAGIC.len() + 2 + 2 + header.len() + 1;
    let padding = (64 - unpadded % 64) % 64;
    header.extend(std::iter::repeat(' ').take(padding));
    header.push('\n');

    let mut bytes = Vec::with_capacity(unpadded + padding + values.len() * 8);
    bytes.extend_from_slice(NPY_MAGIC);
    bytes.extend_from_slice(&[1, 0]);
    let header_len = u16::try_from(header.len())
        .map_err(|_| npy_error("npy_header", "header exceeds the v1.0 length field"))?;
    bytes.extend_from_slice(&header_len.to_le_bytes());
    bytes.extend_from_slice(header.as_bytes());
    for value in values {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    Ok(bytes)
}

/// Encodes a 1-D array.
pub fn npy_bytes_1d(values: &[f64]) -> Result<Vec<u8>, RbError> {
    npy_bytes(&[values.len()], values)
}

/// Encodes a rectangular 2-D array (row-major).
pub fn npy_bytes_2d(rows: &[Vec<f64>]) -> Result<Vec<u8>, RbError> {
    let cols = rows.first().map_or(0, Vec::len);
    if rows.iter().any(|row| row.len() != cols) {
        return Err(npy_error("npy_ragged", "2-D array rows have unequal lengths"));
    }
    let flat: Vec<f64> = rows.iter().flatten().copied().collect();
    npy_bytes(&[rows.len(), cols], &flat)
}

/// Encodes an array of 3-vectors laid out `[rows][cols][3]`.
pub fn npy_bytes_points(rows: &[Vec<[f64; 3]>]) -> Result<Vec<u8>, RbError> {
    let cols = rows.first().map_or(0, Vec::len);
    if rows.iter().any(|row| row.len() != cols) {
        return Err(npy_error("npy_ragged", "point grid rows have unequal lengths"));
    }
    let mut flat = Vec::with_capacity(rows.len() * cols * 3);
    for row in rows {
        for point in row {
            flat.extend_from_slice(point);
        }
    }
    npy_bytes(&[rows.len(), cols, 3], &flat)
}

/// A named member of an NPZ container.
pub struct NpzMember<'a> {
    /// Member name without the `.npy` suffix.
    pub name: &'a str,
    /// Encoded NPY payload.
    pub bytes: Vec<u8>,
}

/// Assembles an NPZ container from encoded members.
pub fn npz_bytes(members: &[NpzMember<'_>]) -> Result<Vec<u8>, RbError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Stored);
    for member in members {
        writer
            .start_file(format!("{}.npy", member.name), options)
            .map_err(|err| npy_error("npz_entry", err.to_string()))?;
        writer
            .write_all(&member.bytes)
            .map_err(|err| npy_error("npz_write", err.to_string()))?;
    }
    let cursor = writer
        .finish()
        .map_err(|err| npy_error("npz_finish", err.to_string()))?;
    Ok(cursor.into_inner())
}
