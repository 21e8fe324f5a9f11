//! Plot rendering hook.
//!
//! Rasterization lives outside the core: the artifact writer hands the hook
//! well-specified arrays and records whatever files it produced. The
//! built-in renderer emits deterministic SVG documents; deployments that
//! need PNGs plug a rasterizer in through the same trait.

use std::path::Path;

use raybench_core::errors::{ErrorInfo, RbError};
use raybench_core::fsio::atomic_write_bytes;

fn render_error(code: &str, err: impl ToString) -> RbError {
    RbError::Io(ErrorInfo::new(code, err.to_string()))
}

/// Hook invoked by the artifact writer for every plot in the fixed set.
///
/// Each method writes its files into `plots_dir` and returns the file names
/// it produced, which end up in `summary.json` under `plots`.
pub trait Renderer: Send + Sync {
    /// Renders the per-element phase map.
    fn phase_map(&self, plots_dir: &Path, phase: &[Vec<f64>]) -> Result<Vec<String>, RbError>;

    /// Renders the swept pattern, cartesian and polar.
    fn pattern(
        &self,
        plots_dir: &Path,
        theta_deg: &[f64],
        pattern_db: &[f64],
    ) -> Result<Vec<String>, RbError>;

    /// Renders the computed-vs-reference overlay.
    fn validation_overlay(
        &self,
        plots_dir: &Path,
        theta_deg: &[f64],
        computed_db: &[f64],
        reference_db: &[f64],
    ) -> Result<Vec<String>, RbError>;

    /// Renders a radio-map heatmap for one metric.
    fn radio_map(
        &self,
        plots_dir: &Path,
        metric: &str,
        values: &[Vec<f64>],
    ) -> Result<Vec<String>, RbError>;
}

/// Renderer that produces nothing. Useful where plots are not wanted.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn phase_map(&self, _: &Path, _: &[Vec<f64>]) -> Result<Vec<String>, RbError> {
        Ok(Vec::new())
    }

    fn pattern(&self, _: &Path, _: &[f64], _: &[f64]) -> Result<Vec<String>, RbError> {
        Ok(Vec::new())
    }

    fn validation_overlay(
        &self,
        _: &Path,
        _: &[f64],
        _: &[f64],
        _: &[f64],
    ) -> Result<Vec<String>, RbError> {
        Ok(Vec::new())
    }

    fn radio_map(&self, _: &Path, _: &str, _: &[Vec<f64>]) -> Result<Vec<String>, RbError> {
        Ok(Vec::new())
    }
}

/// Built-in deterministic SVG renderer.
#[derive(Debug, Clone, Copy)]
pub struct SvgRenderer {
    /// Canvas width in pixels.
    pub width: u32,
    /// Canvas height in pixels.
    pub height: u32,
}

impl Default for SvgRenderer {
    fn default() -> Self {
        Self {
            width: 640,
            height: 400,
        }
    }
}

impl SvgRenderer {
    fn write(&self, path: &Path, svg: &str) -> Result<(), RbError> {
        atomic_write_bytes(path, svg.as_bytes())
    }
}

impl Renderer for SvgRenderer {
    fn phase_map(&self, plots_dir: &Path, phase: &[Vec<f64>]) -> Result<Vec<String>, RbError> {
        let svg = render_heatmap_svg(phase, self.width, self.width, -std::f64::consts::PI, std::f64::consts::PI);
        self.write(&plots_dir.join("phase_map.svg"), &svg)?;
        Ok(vec!["phase_map.svg".to_string()])
    }

    fn pattern(
        &self,
        plots_dir: &Path,
        theta_deg: &[f64],
        pattern_db: &[f64],
    ) -> Result<Vec<String>, RbError> {
        let cartesian = render_line_svg(theta_deg, &[("#005f73", pattern_db)], self.width, self.height);
        self.write(&plots_dir.join("pattern_cartesian.svg"), &cartesian)?;
        let polar = render_polar_svg(theta_deg, pattern_db, self.height);
        self.write(&plots_dir.join("pattern_polar.svg"), &polar)?;
        Ok(vec![
            "pattern_cartesian.svg".to_string(),
            "pattern_polar.svg".to_string(),
        ])
    }

    fn validation_overlay(
        &self,
        plots_dir: &Path,
        theta_deg: &[f64],
        computed_db: &[f64],
        reference_db: &[f64],
    ) -> Result<Vec<String>, RbError> {
        let svg = render_line_svg(
            theta_deg,
            &[("#9b2226", reference_db), ("#005f73", computed_db)],
            self.width,
            self.height,
        );
        self.write(&plots_dir.join("validation_overlay.svg"), &svg)?;
        Ok(vec!["validation_overlay.svg".to_string()])
    }

    fn radio_map(
        &self,
        plots_dir: &Path,
        metric: &str,
        values: &[Vec<f64>],
    ) -> Result<Vec<String>, RbError> {
        let (min, max) = bounds(values.iter().flatten().copied());
        let svg = render_heatmap_svg(values, self.width, self.width, min, max);
        let name = format!("radio_map_{metric}.svg");
        self.write(&plots_dir.join(&name), &svg)?;
        Ok(vec![name])
    }
}

fn bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for value in values {
        min = min.min(value);
        max = max.max(value);
    }
    if !min.is_finite() || !max.is_finite() {
        (0.0, 1.0)
    } else {
        (min, max)
    }
}

fn render_line_svg(xs: &[f64], series: &[(&str, &[f64])], width: u32, height: u32) -> String {
    let (x_min, x_max) = bounds(xs.iter().copied());
    let (y_min, y_max) = bounds(series.iter().flat_map(|(_, ys)| ys.iter().copied()));
    let x_span = (x_max - x_min).max(1e-9);
    let y_span = (y_max - y_min).max(1e-9);
    let mut parts = vec![format!(
        "<svg xmlns='http://www.w3.org/2000/svg' width='{width}' height='{height}'>"
    )];
    for (color, ys) in series {
        let points = xs
            .iter()
            .zip(ys.iter())
            .map(|(x, y)| {
                let px = (x - x_min) / x_span * f64::from(width);
                let py = f64::from(height) - (y - y_min) / y_span * f64::from(height);
                format!("{px:.2},{py:.2}")
            })
            .collect::<Vec<_>>()
            .join(" ");
        parts.push(format!(
            "<polyline fill='none' stroke='{color}' stroke-width='2' points='{points}' />"
        ));
    }
    parts.push("</svg>".to_string());
    parts.join("")
}

fn render_polar_svg(theta_deg: &[f64], pattern_db: &[f64], size: u32) -> String {
    let (floor, peak) = bounds(pattern_db.iter().copied());
    let span = (peak - floor).max(1e-9);
    let half = f64::from(size) / 2.0;
    let points = theta_deg
        .iter()
        .zip(pattern_db.iter())
        .map(|(theta, db)| {
            let radius = (db - floor) / span * (half - 4.0);
            let angle = theta.to_radians();
            // Zero degrees points up; positive angles sweep clockwise.
            let px = half + radius * angle.sin();
            let py = half - radius * angle.cos();
            format!("{px:.2},{py:.2}")
        })
        .collect::<Vec<_>>()
        .join(" ");
    format!(
        "<svg xmlns='http://www.w3.org/2000/svg' width='{size}' height='{size}'>\
<circle cx='{half}' cy='{half}' r='{r:.2}' fill='none' stroke='#cbd5e1' />\
<polyline fill='none' stroke='#0a9396' stroke-width='2' points='{points}' /></svg>",
        r = half - 4.0
    )
}

fn render_heatmap_svg(values: &[Vec<f64>], width: u32, height: u32, min: f64, max: f64) -> String {
    let rows = values.len().max(1);
    let cols = values.first().map_or(1, |row| row.len().max(1));
    let cell_w = f64::from(width) / cols as f64;
    let cell_h = f64::from(height) / rows as f64;
    let span = (max - min).max(1e-9);
    let mut parts = vec![format!(
        "<svg xmlns='http://www.w3.org/2000/svg' width='{width}' height='{height}'>"
    )];
    for (j, row) in values.iter().enumerate() {
        for (i, value) in row.iter().enumerate() {
            let t = ((value - min) / span).clamp(0.0, 1.0);
            // Blue -> red ramp, drawn with the first row at the bottom.
            let red = (t * 255.0).round() as u8;
            let blue = 255 - red;
            let x = cell_w * i as f64;
            let y = f64::from(height) - cell_h * (j + 1) as f64;
            parts.push(format!(
                "<rect x='{x:.2}' y='{y:.2}' width='{w:.2}' height='{h:.2}' fill='rgb({red},64,{blue})' />",
                w = cell_w.max(1.0),
                h = cell_h.max(1.0),
            ));
        }
    }
    parts.push("</svg>".to_string());
    parts.join("")
}
