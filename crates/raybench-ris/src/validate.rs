//! Reference-pattern validation.

use std::path::Path;

use serde::{Deserialize, Serialize};

use raybench_core::errors::{ErrorInfo, RbError};

use crate::pattern::{SweepResult, DB_FLOOR};

/// RMSE ceiling for a passing validation, dB. Contractual: downstream UIs
/// key off this threshold.
pub const RMSE_DB_MAX: f64 = 3.0;

/// Peak-angle error ceiling for a passing validation, degrees.
pub const PEAK_DEG_ERR_MAX: f64 = 2.0;

/// Unit of the values column in a reference file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    /// Values are already in dB.
    PatternDb,
    /// Values are linear power.
    PatternLinear,
}

/// A measured or simulated reference cut.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferencePattern {
    /// Reference angles, degrees.
    pub theta_deg: Vec<f64>,
    /// Reference values in the unit given by `kind`.
    pub values: Vec<f64>,
    /// Unit of `values`.
    pub kind: ReferenceKind,
}

/// Outcome of comparing a computed pattern against a reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Root-mean-square error over the common grid, dB.
    pub rmse_db: f64,
    /// Signed difference between computed and reference peak angles, degrees.
    pub peak_deg_error: f64,
    /// Absolute difference between normalized peak levels, dB.
    pub peak_db_error: f64,
    /// `rmse_db <= 3.0` and `|peak_deg_error| <= 2.0`.
    pub pass: bool,
}

fn ref_error(code: &str, message: impl Into<String>) -> RbError {
    RbError::Config(ErrorInfo::new(code, message))
}

impl ReferencePattern {
    /// Loads a reference cut from a CSV file with a `theta_deg` column and
    /// either a `pattern_db` or `pattern_linear` column.
    pub fn from_csv(path: &Path) -> Result<Self, RbError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|err| {
                RbError::NotFound(
                    ErrorInfo::new("ref_open", "failed to open reference CSV")
                        .with_context("path", path.display().to_string())
                        .with_hint(err.to_string()),
                )
            })?;
        let headers = reader
            .headers()
            .map_err(|err| ref_error("ref_header", err.to_string()))?
            .clone();
        let theta_col = headers
            .iter()
            .position(|name| name == "theta_deg")
            .ok_or_else(|| ref_error("ref_theta_column", "reference CSV missing theta_deg column"))?;
        let (value_col, kind) = if let Some(col) = headers.iter().position(|n| n == "pattern_db") {
            (col, ReferenceKind::PatternDb)
        } else if let Some(col) = headers.iter().position(|n| n == "pattern_linear") {
            (col, ReferenceKind::PatternLinear)
        } else {
            return Err(ref_error(
                "ref_value_column",
                "reference CSV missing pattern_db or pattern_linear column",
            ));
        };

        let mut rows: Vec<(f64, f64)> = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|err| ref_error("ref_record", err.to_string()))?;
            let theta: f64 = parse_field(&record, theta_col, "theta_deg")?;
            let value: f64 = parse_field(&record, value_col, "pattern value")?;
            rows.push((theta, value));
        }
        if rows.len() < 2 {
            return Err(ref_error("ref_rows", "reference CSV needs at least two rows"));
        }
        rows.sort_by(|a, b| a.0.total_cmp(&b.0));
        Ok(Self {
            theta_deg: rows.iter().map(|(t, _)| *t).collect(),
            values: rows.iter().map(|(_, v)| *v).collect(),
            kind,
        })
    }

    fn to_db(&self) -> Vec<f64> {
        match self.kind {
            ReferenceKind::PatternDb => self.values.clone(),
            ReferenceKind::PatternLinear => self
                .values
                .iter()
                .map(|&v| 10.0 * v.max(DB_FLOOR).log10())
                .collect(),
        }
    }

    /// Peak-normalized dB values resampled onto the given angle grid, as used
    /// by the validation comparison and the overlay plot.
    pub fn resampled_db(&self, grid: &[f64]) -> Vec<f64> {
        resample(&self.theta_deg, &peak_normalize(&self.to_db()), grid)
    }
}

fn parse_field(record: &csv::StringRecord, col: usize, label: &str) -> Result<f64, RbError> {
    record
        .get(col)
        .and_then(|raw| raw.parse::<f64>().ok())
        .ok_or_else(|| ref_error("ref_parse", format!("reference CSV has a non-numeric {label}")))
}

/// Compares a computed sweep against a reference cut.
///
/// Both patterns are peak-normalized in dB; the reference is resampled onto
/// the computed θ grid by linear interpolation with edge clamping.
pub fn validate(computed: &SweepResult, reference: &ReferencePattern) -> Result<ValidationReport, RbError> {
    if computed.theta_deg.len() < 2 {
        return Err(ref_error("ref_sweep", "computed sweep needs at least two samples"));
    }
    let sim_db = peak_normalize(&computed.pattern_db);
    let ref_db = peak_normalize(&reference.to_db());
    let resampled = resample(&reference.theta_deg, &ref_db, &computed.theta_deg);

    let mut sum_sq = 0.0;
    for (sim, reference) in sim_db.iter().zip(resampled.iter()) {
        let diff = sim - reference;
        sum_sq += diff * diff;
    }
    let rmse_db = (sum_sq / sim_db.len() as f64).sqrt();

    let sim_peak = argmax(&sim_db);
    let ref_peak = argmax(&resampled);
    let peak_deg_error = computed.theta_deg[sim_peak] - computed.theta_deg[ref_peak];
    let peak_db_error = (sim_db[sim_peak] - resampled[ref_peak]).abs();
    let pass = rmse_db <= RMSE_DB_MAX && peak_deg_error.abs() <= PEAK_DEG_ERR_MAX;

    Ok(ValidationReport {
        rmse_db,
        peak_deg_error,
        peak_db_error,
        pass,
    })
}

fn peak_normalize(values: &[f64]) -> Vec<f64> {
    let peak = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    values.iter().map(|v| v - peak).collect()
}

/// Linear interpolation onto `grid`, clamping beyond the reference edges.
fn resample(theta: &[f64], values: &[f64], grid: &[f64]) -> Vec<f64> {
    grid.iter()
        .map(|&t| {
            if t <= theta[0] {
                return values[0];
            }
            if t >= theta[theta.len() - 1] {
                return values[values.len() - 1];
            }
            let upper = theta.partition_point(|&x| x < t).max(1);
            let (t0, t1) = (theta[upper - 1], theta[upper]);
            let (v0, v1) = (values[upper - 1], values[upper]);
            if t1 == t0 {
                v0
            } else {
                v0 + (v1 - v0) * (t - t0) / (t1 - t0)
            }
        })
        .collect()
}

fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (idx, value) in values.iter().enumerate() {
        if *value > values[best] {
            best = idx;
        }
    }
    best
}
