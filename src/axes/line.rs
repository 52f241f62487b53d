use kurbo::{Affine, BezPath, Point, Stroke};
use peniko::Color;

use crate::{Bounds, render::Render, theme};

#[derive(Debug)]
pub struct LineAxes {
  pub(crate) points:  Vec<Point>,
  pub(crate) options: LineOptions,
}

#[derive(Debug)]
pub struct LineOptions {
  pub width: f64,
  pub color: Color,
  pub label: Option<String>,
}

impl Default for LineOptions {
  fn default() -> Self {
    LineOptions { width: 2.0, color: theme::ROCKET.sample(1.0), label: None }
  }
}

impl LineAxes {
  pub(crate) fn new(points: Vec<Point>) -> Self {
    LineAxes { points, options: LineOptions::default() }
  }

  pub(crate) fn data_bounds(&self) -> Option<Bounds> { Bounds::from_points(&self.points) }

  pub fn points(&self) -> &[Point] { &self.points }
  pub fn options(&self) -> &LineOptions { &self.options }

  pub fn width(&mut self, width: f64) -> &mut Self {
    self.options.width = width;
    self
  }

  pub fn color(&mut self, color: Color) -> &mut Self {
    self.options.color = color;
    self
  }

  pub fn label(&mut self, label: &str) -> &mut Self {
    self.options.label = Some(label.to_string());
    self
  }

  pub(crate) fn draw(&self, render: &mut Render, transform: Affine) {
    let mut shape = BezPath::new();

    for (i, point) in self.points.iter().map(|p| transform * *p).enumerate() {
      if i == 0 {
        shape.move_to(point);
      } else {
        shape.line_to(point);
      }
    }

    render.stroke(&shape, Affine::IDENTITY, self.options.color, &Stroke::new(self.options.width));
  }
}
