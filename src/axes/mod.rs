mod line;
mod scatter;

use kurbo::{Affine, Point};
pub use line::{LineAxes, LineOptions};
pub use scatter::{ScatterAxes, ScatterOptions};

use crate::{Bounds, Plot, render::Render};

#[derive(Debug)]
pub enum Axes {
  Scatter(ScatterAxes),
  Line(LineAxes),
}

impl Axes {
  pub(crate) fn data_bounds(&self) -> Option<Bounds> {
    match self {
      Axes::Scatter(sa) => sa.data_bounds(),
      Axes::Line(la) => la.data_bounds(),
    }
  }

  pub(crate) fn draw(&self, render: &mut Render, transform: Affine) {
    match self {
      Axes::Scatter(sa) => sa.draw(render, transform),
      Axes::Line(la) => la.draw(render, transform),
    }
  }
}

impl Plot {
  pub fn scatter(&mut self, points: impl IntoIterator<Item = Point>) -> &mut ScatterAxes {
    self.axes.push(Axes::Scatter(ScatterAxes::new(points.into_iter().collect())));
    match self.axes.last_mut() {
      Some(Axes::Scatter(sa)) => sa,
      _ => unreachable!(),
    }
  }

  pub fn line(&mut self, points: impl IntoIterator<Item = Point>) -> &mut LineAxes {
    self.axes.push(Axes::Line(LineAxes::new(points.into_iter().collect())));
    match self.axes.last_mut() {
      Some(Axes::Line(la)) => la,
      _ => unreachable!(),
    }
  }
}
