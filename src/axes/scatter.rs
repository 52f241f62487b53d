use kurbo::{Affine, Circle, Point};
use peniko::Color;

use crate::{Bounds, render::Render, theme};

#[derive(Debug)]
pub struct ScatterAxes {
  pub(crate) points:  Vec<Point>,
  pub(crate) options: ScatterOptions,
}

#[derive(Debug)]
pub struct ScatterOptions {
  /// Marker radius in canvas pixels.
  pub size:  f64,
  pub color: Color,
  pub label: Option<String>,
}

impl Default for ScatterOptions {
  fn default() -> Self {
    ScatterOptions { size: 5.0, color: theme::ROCKET.sample(0.0), label: None }
  }
}

impl ScatterAxes {
  pub(crate) fn new(points: Vec<Point>) -> Self {
    ScatterAxes { points, options: ScatterOptions::default() }
  }

  pub(crate) fn data_bounds(&self) -> Option<Bounds> { Bounds::from_points(&self.points) }

  pub fn points(&self) -> &[Point] { &self.points }
  pub fn options(&self) -> &ScatterOptions { &self.options }

  pub fn color(&mut self, color: Color) -> &mut Self {
    self.options.color = color;
    self
  }

  pub fn label(&mut self, label: &str) -> &mut Self {
    self.options.label = Some(label.to_string());
    self
  }

  pub(crate) fn draw(&self, render: &mut Render, transform: Affine) {
    // Markers are placed in data space but sized in pixels.
    for point in self.points.iter().filter(|p| p.is_finite()).map(|p| transform * *p) {
      render.fill(&Circle::new(point, self.options.size), Affine::IDENTITY, self.options.color);
    }
  }
}
