//! Timeline chart rendering.
//!
//! The renderer draws smoothed counts against the bucket second. Axis bounds
//! come from the series itself. An empty series is a defined outcome, not an
//! error: nothing is written and the caller is told there was no data.

use std::path::Path;

use plotters::prelude::*;

use crate::error::{Result, TimelineError};
use crate::timeseries::{TimeBucket, Timeline};

/// What `render` did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderOutcome {
    Rendered,
    EmptySeries,
}

/// Plot ranges derived from a bucket series.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SeriesBounds {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl SeriesBounds {
    /// `None` for an empty series. Degenerate ranges are widened by one unit so
    /// the chart always has a non-zero extent.
    pub fn from_buckets(buckets: &[TimeBucket]) -> Option<Self> {
        let first = buckets.first()?;
        let mut bounds = Self {
            x_min: first.second as f64,
            x_max: first.second as f64,
            y_min: first.smoothed_count.min(0.0),
            y_max: first.smoothed_count,
        };
        for bucket in &buckets[1..] {
            bounds.x_min = bounds.x_min.min(bucket.second as f64);
            bounds.x_max = bounds.x_max.max(bucket.second as f64);
            bounds.y_min = bounds.y_min.min(bucket.smoothed_count);
            bounds.y_max = bounds.y_max.max(bucket.smoothed_count);
        }
        if bounds.x_max <= bounds.x_min {
            bounds.x_max = bounds.x_min + 1.0;
        }
        if bounds.y_max <= bounds.y_min {
            bounds.y_max = bounds.y_min + 1.0;
        }
        Some(bounds)
    }
}

/// Chart title and axis labels for one class.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChartLabels {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
}

impl ChartLabels {
    pub fn for_class(class_name: &str) -> Self {
        let class = capitalize(class_name);
        Self {
            title: format!("Number of {} Detections Over Video Duration", class),
            x_label: "Duration (seconds)".to_string(),
            y_label: format!("Number of {} Detections (Smoothed)", class),
        }
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub trait ChartRenderer {
    fn render(&self, timeline: &Timeline, destination: &Path) -> Result<RenderOutcome>;
}

/// PNG line chart via the plotters bitmap backend.
#[derive(Clone, Copy, Debug)]
pub struct PlottersRenderer {
    pub width: u32,
    pub height: u32,
}

impl Default for PlottersRenderer {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 600,
        }
    }
}

impl ChartRenderer for PlottersRenderer {
    fn render(&self, timeline: &Timeline, destination: &Path) -> Result<RenderOutcome> {
        let Some(bounds) = SeriesBounds::from_buckets(&timeline.buckets) else {
            log::warn!(
                "no '{}' detections found for plotting; no chart written",
                timeline.class_name
            );
            return Ok(RenderOutcome::EmptySeries);
        };

        if let Some(parent) = destination.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        draw(self, timeline, &bounds, destination).map_err(|e| TimelineError::Chart(e.to_string()))?;
        log::info!("chart saved to {}", destination.display());
        Ok(RenderOutcome::Rendered)
    }
}

fn draw(
    renderer: &PlottersRenderer,
    timeline: &Timeline,
    bounds: &SeriesBounds,
    destination: &Path,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let labels = ChartLabels::for_class(&timeline.class_name);
    let root = BitMapBackend::new(destination, (renderer.width, renderer.height)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(&labels.title, ("sans-serif", 22))
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(bounds.x_min..bounds.x_max, bounds.y_min..bounds.y_max)?;

    chart
        .configure_mesh()
        .x_desc(labels.x_label.as_str())
        .y_desc(labels.y_label.as_str())
        .draw()?;

    let points: Vec<(f64, f64)> = timeline
        .buckets
        .iter()
        .map(|b| (b.second as f64, b.smoothed_count))
        .collect();

    chart.draw_series(LineSeries::new(points.iter().copied(), &BLUE))?;
    chart.draw_series(
        points
            .iter()
            .map(|&(x, y)| Circle::new((x, y), 3, BLUE.filled())),
    )?;

    root.present()?;
    Ok(())
}
