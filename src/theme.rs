use color::{HueDirection, Oklch, OpaqueColor, Srgb};
use peniko::Color;

pub const TEXT_COLOR: Color = Color::from_rgb8(32, 32, 32);
pub const AXIS_COLOR: Color = Color::from_rgb8(128, 128, 128);
pub const BACKGROUND: Color = Color::WHITE;

/// Colours interpolated in Oklch between two endpoints.
pub struct LinearPalette {
  start: OpaqueColor<Oklch>,
  end:   OpaqueColor<Oklch>,
}

pub const ROCKET: LinearPalette =
  LinearPalette::new(OpaqueColor::new([0.7, 0.13, 50.0]), OpaqueColor::new([0.7, 0.13, 290.0]));

impl LinearPalette {
  pub const fn new(start: OpaqueColor<Oklch>, end: OpaqueColor<Oklch>) -> Self {
    Self { start, end }
  }

  pub fn sample(&self, t: f32) -> Color {
    let t = t.clamp(0.0, 1.0);
    self.start.lerp(self.end, t, HueDirection::Shorter).convert::<Srgb>().with_alpha(1.0)
  }
}
