//! Grouped simple linear regression with scatter-plus-fit plots.
//!
//! [`RegressionPlotter`] loads a CSV file, fits `y = slope * x + intercept` for the whole table
//! or for every value of a grouping column, and writes one PNG per fitted group. Plots are plain
//! [`Plot`] values, so the fitting and drawing can be inspected without touching the GPU.

use kurbo::{Cap, Line, Point, Size, Stroke};
use parley::FontWeight;

use crate::render::{Align, DrawText, Render};

mod axes;
mod bounds;
pub mod config;
pub mod dataset;
pub mod error;
mod legend;
pub mod plotter;
pub mod regression;
mod render;
pub mod theme;

pub use axes::{Axes, LineAxes, LineOptions, ScatterAxes, ScatterOptions};
pub use bounds::{Bounds, NiceTicksIter, Range};
pub use config::PlotterConfig;
pub use dataset::Dataset;
pub use error::{DataLoadError, PartitionError, RegressError, RenderError};
pub use legend::{LegendItem, LegendKind};
pub use plotter::{
  PartitionFit, PlotArtifact, RegressionPlotter, RegressionReport, SkippedPartition,
};
pub use regression::{RegressionResult, linregress};
pub use render::{PngWriter, RenderConfig};

/// A single chart: axes titles, a list of series and a legend built from their labels.
#[derive(Debug, Default)]
pub struct Plot {
  title: Option<String>,
  pub x: Axis,
  pub y: Axis,

  axes: Vec<Axes>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Axis {
  title: Option<String>,
  min:   Option<f64>,
  max:   Option<f64>,
}

impl Axis {
  pub fn title(&mut self, title: &str) -> &mut Self {
    self.title = Some(title.to_string());
    self
  }

  pub fn min(&mut self, min: f64) -> &mut Self {
    self.min = Some(min);
    self
  }

  pub fn max(&mut self, max: f64) -> &mut Self {
    self.max = Some(max);
    self
  }

  pub fn get_title(&self) -> Option<&str> { self.title.as_deref() }

  fn clamp(&self, range: Range) -> Range {
    Range::new(self.min.unwrap_or(range.min), self.max.unwrap_or(range.max))
  }
}

impl Plot {
  pub fn new() -> Plot { Plot::default() }

  pub fn title(&mut self, title: &str) -> &mut Self {
    self.title = Some(title.to_string());
    self
  }

  pub fn get_title(&self) -> Option<&str> { self.title.as_deref() }

  pub fn axes(&self) -> &[Axes] { &self.axes }

  /// Data space shown by the plot: every series, padded by 5%, then the axis limits.
  pub fn data_bounds(&self) -> Bounds {
    let bounds = self
      .axes
      .iter()
      .filter_map(Axes::data_bounds)
      .reduce(|a, b| a.union(b))
      .unwrap_or(Bounds::new(Range::new(0.0, 1.0), Range::new(0.0, 1.0)))
      .non_degenerate()
      .expand_by(0.05);

    Bounds::new(self.x.clamp(bounds.x), self.y.clamp(bounds.y)).non_degenerate()
  }

  pub(crate) fn draw(&self, render: &mut Render, size: Size) {
    const MARGIN: f64 = 100.0;
    const TICKS: u32 = 10;

    let border_stroke = Stroke::new(2.0);
    let tick_stroke = border_stroke.clone().with_caps(Cap::Butt);

    // y runs bottom to top, so `y.min` is the bottom edge on the canvas.
    let viewport =
      Bounds::new(Range::new(0.0, size.width), Range::new(size.height, 0.0)).shrink(MARGIN);
    let center = Point::new(size.width / 2.0, size.height / 2.0);

    if let Some(title) = &self.title {
      render.draw_text(DrawText {
        text: title,
        size: 32.0,
        weight: FontWeight::BOLD,
        position: Point { x: center.x, y: viewport.y.max - 30.0 },
        horizontal_align: Align::Center,
        vertical_align: Align::End,
        ..Default::default()
      });
    }

    if let Some(x_label) = &self.x.title {
      render.draw_text(DrawText {
        text: x_label,
        size: 24.0,
        position: Point { x: center.x, y: viewport.y.min + 45.0 },
        horizontal_align: Align::Center,
        vertical_align: Align::Start,
        ..Default::default()
      });
    }

    if let Some(y_label) = &self.y.title {
      render.draw_text(DrawText {
        text: y_label,
        size: 24.0,
        position: Point { x: viewport.x.min - 60.0, y: center.y },
        transform: kurbo::Affine::rotate(-std::f64::consts::FRAC_PI_2),
        horizontal_align: Align::Center,
        vertical_align: Align::End,
        ..Default::default()
      });
    }

    render.stroke(
      &Line::new(
        Point::new(viewport.x.min, viewport.y.min),
        Point::new(viewport.x.max, viewport.y.min),
      ),
      kurbo::Affine::IDENTITY,
      theme::AXIS_COLOR,
      &border_stroke,
    );
    render.stroke(
      &Line::new(
        Point::new(viewport.x.min, viewport.y.min),
        Point::new(viewport.x.min, viewport.y.max),
      ),
      kurbo::Affine::IDENTITY,
      theme::AXIS_COLOR,
      &border_stroke,
    );

    let data_bounds = self.data_bounds();
    let transform = data_bounds.transform_to(viewport);

    let iter = data_bounds.y.nice_ticks(TICKS);
    let precision = iter.precision();
    for (y, vy) in iter
      .map(|v| (v, (transform * Point::new(0.0, v)).y))
      .filter(|(_, vy)| viewport.y.contains(vy))
    {
      render.stroke(
        &Line::new(Point::new(viewport.x.min, vy), Point::new(viewport.x.min - 10.0, vy)),
        kurbo::Affine::IDENTITY,
        theme::AXIS_COLOR,
        &tick_stroke,
      );
      render.draw_text(DrawText {
        text: &format!("{y:.precision$}"),
        size: 14.0,
        position: Point { x: viewport.x.min - 15.0, y: vy },
        horizontal_align: Align::End,
        vertical_align: Align::Center,
        ..Default::default()
      });
    }

    let iter = data_bounds.x.nice_ticks(TICKS);
    let precision = iter.precision();
    for (x, vx) in iter
      .map(|v| (v, (transform * Point::new(v, 0.0)).x))
      .filter(|(_, vx)| viewport.x.contains(vx))
    {
      render.stroke(
        &Line::new(Point::new(vx, viewport.y.min), Point::new(vx, viewport.y.min + 10.0)),
        kurbo::Affine::IDENTITY,
        theme::AXIS_COLOR,
        &tick_stroke,
      );
      render.draw_text(DrawText {
        text: &format!("{x:.precision$}"),
        size: 14.0,
        position: Point { x: vx, y: viewport.y.min + 15.0 },
        horizontal_align: Align::Center,
        vertical_align: Align::Start,
        ..Default::default()
      });
    }

    for ax in &self.axes {
      ax.draw(render, transform);
    }

    self.draw_legend(render, viewport);
  }
}

pub(crate) trait ResultExt<T> {
  /// Logs the error and discards it.
  fn log_err(self) -> Option<T>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for Result<T, E> {
  fn log_err(self) -> Option<T> {
    match self {
      Ok(v) => Some(v),
      Err(e) => {
        log::error!("{e}");
        None
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sample_plot() -> Plot {
    let mut plot = Plot::new();
    plot.x.title("Petal Length (cm)");
    plot.y.title("Sepal Length (cm)");
    plot
      .scatter([Point::new(1.0, 2.0), Point::new(2.0, 4.0), Point::new(3.0, 6.0)])
      .label("Data points");
    plot.line([Point::new(1.0, 2.0), Point::new(3.0, 6.0)]).label("Fitted line");
    plot
  }

  #[test]
  fn legend_lists_labelled_series() {
    let plot = sample_plot();
    let items = plot.legend_items();

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].label, "Data points");
    assert_eq!(items[0].kind, LegendKind::Marker);
    assert_eq!(items[1].label, "Fitted line");
    assert_eq!(items[1].kind, LegendKind::Line);
  }

  #[test]
  fn unlabelled_series_are_not_in_legend() {
    let mut plot = Plot::new();
    plot.scatter([Point::new(0.0, 0.0)]);
    assert!(plot.legend_items().is_empty());
  }

  #[test]
  fn data_bounds_pad_all_series() {
    let plot = sample_plot();
    let bounds = plot.data_bounds();

    assert!((bounds.x.min - 0.9).abs() < 1e-12);
    assert!((bounds.x.max - 3.1).abs() < 1e-12);
    assert!((bounds.y.min - 1.8).abs() < 1e-12);
    assert!((bounds.y.max - 6.2).abs() < 1e-12);
  }

  #[test]
  fn axis_limits_override_data() {
    let mut plot = sample_plot();
    plot.y.min(0.0);
    let bounds = plot.data_bounds();
    assert_eq!(bounds.y.min, 0.0);
  }

  #[test]
  fn empty_plot_has_unit_bounds() {
    let bounds = Plot::new().data_bounds();
    assert!(bounds.width() > 0.0);
    assert!(bounds.height() > 0.0);
  }

  #[test]
  fn single_point_plot_is_drawable() {
    let mut plot = Plot::new();
    plot.scatter([Point::new(3.0, 3.0)]);
    let bounds = plot.data_bounds();
    assert!(bounds.width() > 0.0);
    assert!(bounds.height() > 0.0);
  }

  #[test]
  fn scenes_are_built_per_call() {
    let config = RenderConfig { width: 640, height: 480 };
    let plot = sample_plot();
    let first = plot.build_scene(config).scene.encoding().n_paths;
    assert!(first > 0);

    // Inside the existing bounds, so ticks and labels are unchanged.
    let mut denser = sample_plot();
    denser.scatter([Point::new(2.0, 5.0)]);
    assert_eq!(denser.build_scene(config).scene.encoding().n_paths, first + 1);

    assert_eq!(plot.build_scene(config).scene.encoding().n_paths, first);
  }
}
