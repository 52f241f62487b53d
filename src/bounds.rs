use kurbo::{Affine, Point};

/// Axis-aligned region, either in data space or in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
  pub x: Range,
  pub y: Range,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range {
  pub min: f64,
  pub max: f64,
}

impl Bounds {
  pub const fn empty() -> Self { Bounds { x: Range::empty(), y: Range::empty() } }
  pub const fn new(x: Range, y: Range) -> Self { Bounds { x, y } }

  /// Smallest bounds holding every point, or `None` for no points.
  pub fn from_points(points: &[Point]) -> Option<Self> {
    let x = Range::from_values(points.iter().map(|p| p.x))?;
    let y = Range::from_values(points.iter().map(|p| p.y))?;
    Some(Bounds { x, y })
  }

  pub fn width(&self) -> f64 { self.x.size() }
  pub fn height(&self) -> f64 { self.y.size() }

  pub const fn shrink(self, amount: f64) -> Self {
    Bounds { x: self.x.shrink(amount), y: self.y.shrink(amount) }
  }

  pub const fn expand_by(self, fract: f64) -> Self {
    Bounds { x: self.x.expand_by(fract), y: self.y.expand_by(fract) }
  }

  pub fn union(&self, other: Bounds) -> Bounds {
    Bounds { x: self.x.union(other.x), y: self.y.union(other.y) }
  }

  /// Widens zero-sized ranges so the bounds can be mapped onto a viewport.
  pub fn non_degenerate(self) -> Bounds {
    Bounds { x: self.x.non_degenerate(), y: self.y.non_degenerate() }
  }

  pub(crate) fn transform_to(&self, viewport: Bounds) -> Affine {
    let scale_x = viewport.x.size() / self.x.size();
    let scale_y = viewport.y.size() / self.y.size();
    let translate_x = viewport.x.min - self.x.min * scale_x;
    let translate_y = viewport.y.min - self.y.min * scale_y;

    Affine::new([scale_x, 0.0, 0.0, scale_y, translate_x, translate_y])
  }
}

impl Default for Range {
  fn default() -> Self { Range::empty() }
}

impl Range {
  pub const fn empty() -> Self { Range { min: 0.0, max: 0.0 } }
  pub const fn new(min: f64, max: f64) -> Self { Range { min, max } }
  pub const fn size(&self) -> f64 { self.max - self.min }

  pub fn from_values(values: impl IntoIterator<Item = f64>) -> Option<Range> {
    values.into_iter().filter(|v| v.is_finite()).fold(None, |range, v| match range {
      None => Some(Range::new(v, v)),
      Some(r) => Some(Range::new(r.min.min(v), r.max.max(v))),
    })
  }

  pub const fn shrink(self, amount: f64) -> Self { self.expand(-amount) }
  pub const fn expand(self, amount: f64) -> Self {
    Range {
      min: self.min - amount * self.size().signum(),
      max: self.max + amount * self.size().signum(),
    }
  }
  pub const fn expand_by(self, fract: f64) -> Self { self.expand(self.size() * fract) }

  pub const fn contains(&self, value: &f64) -> bool {
    (*value >= self.min && *value <= self.max) || (*value <= self.min && *value >= self.max)
  }

  pub fn union(&self, other: Range) -> Range {
    Range { min: self.min.min(other.min), max: self.max.max(other.max) }
  }

  pub fn non_degenerate(self) -> Range {
    if self.size() == 0.0 { Range::new(self.min - 0.5, self.max + 0.5) } else { self }
  }

  /// Evenly spaced tick values on a 1, 2, 2.5 or 5 times a power of ten grid.
  pub fn nice_ticks(&self, count: u32) -> NiceTicksIter {
    let step = (self.max - self.min) / f64::from(count);
    let k = step.log10().floor();
    let base = step / 10f64.powf(k);

    let nice_base = match base {
      b if b < 1.0 => 1.0,
      b if b < 2.0 => 2.0,
      b if b < 2.5 => 2.5,
      b if b < 5.0 => 5.0,
      _ => 10.0,
    };
    let (nice_base, k) = if nice_base == 10.0 { (1.0, k + 1.0) } else { (nice_base, k) };

    let step = nice_base * 10f64.powf(k);
    let lo = (self.min / step).floor() * step;
    let hi = (self.max / step).ceil() * step;

    // Digits after the decimal point needed to tell neighbouring ticks apart.
    let extra = if nice_base == 2.5 { 1 } else { 0 };
    let precision = (-k as i32 + extra).max(0) as usize;
    NiceTicksIter::new(lo, hi, step, precision)
  }
}

pub struct NiceTicksIter {
  current:   f64,
  step:      f64,
  hi:        f64,
  precision: usize,
}

impl NiceTicksIter {
  fn new(lo: f64, hi: f64, step: f64, precision: usize) -> Self {
    NiceTicksIter { current: lo, step, hi, precision }
  }

  pub fn precision(&self) -> usize { self.precision }
}

impl Iterator for NiceTicksIter {
  type Item = f64;
  fn next(&mut self) -> Option<Self::Item> {
    if self.step.is_finite() && self.step > 0.0 && self.current < self.hi + self.step * 0.5 {
      let p = 10f64.powi(self.precision as i32 + 2);
      let result = (self.current * p).round() / p;
      self.current += self.step;
      Some(result)
    } else {
      None
    }
  }
}
