use kurbo::{Affine, Point, Shape, Stroke, Vec2};
use parley::{Alignment, FontWeight, Layout, PositionedLayoutItem, StyleProperty};
use peniko::{Brush, BrushRef, Color, Fill};
use vello::wgpu;

use crate::{Plot, error::RenderError, theme};

mod texture;

pub use texture::PngWriter;

/// A fresh drawing surface. Every plot gets its own, so nothing leaks between images.
pub(crate) struct Render {
  pub(crate) scene:      vello::Scene,
  pub(crate) background: Color,
  font:                  parley::FontContext,
  layout:                parley::LayoutContext<Brush>,
}

pub(crate) struct GpuHandle {
  pub(crate) device: wgpu::Device,
  pub(crate) queue:  wgpu::Queue,
}

/// Output image size in pixels, each side in `1..=RenderConfig::MAX_SIDE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderConfig {
  pub width:  u32,
  pub height: u32,
}

impl Default for RenderConfig {
  fn default() -> Self { RenderConfig { width: 1024, height: 1024 } }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
  #[default]
  Start,
  Center,
  End,
}

pub(crate) struct DrawText<'a> {
  pub text:             &'a str,
  pub size:             f32,
  pub weight:           FontWeight,
  pub brush:            Brush,
  pub position:         Point,
  /// Applied around `position`, after alignment.
  pub transform:        Affine,
  pub horizontal_align: Align,
  pub vertical_align:   Align,
}

impl Default for DrawText<'_> {
  fn default() -> Self {
    DrawText {
      text:             "",
      size:             16.0,
      weight:           FontWeight::NORMAL,
      brush:            Brush::Solid(theme::TEXT_COLOR),
      position:         Point::ZERO,
      transform:        Affine::IDENTITY,
      horizontal_align: Align::Start,
      vertical_align:   Align::Start,
    }
  }
}

impl Plot {
  pub(crate) fn build_scene(&self, config: RenderConfig) -> Render {
    let mut render = Render::new();
    self.draw(&mut render, kurbo::Size::new(f64::from(config.width), f64::from(config.height)));
    render
  }
}

impl Render {
  pub(crate) fn new() -> Self {
    Render {
      scene:      vello::Scene::new(),
      background: theme::BACKGROUND,
      font:       parley::FontContext::new(),
      layout:     parley::LayoutContext::new(),
    }
  }

  pub(crate) fn fill<'b>(
    &mut self,
    shape: &impl Shape,
    transform: Affine,
    brush: impl Into<BrushRef<'b>>,
  ) {
    self.scene.fill(Fill::NonZero, transform, brush, None, shape);
  }

  pub(crate) fn stroke<'b>(
    &mut self,
    shape: &impl Shape,
    transform: Affine,
    brush: impl Into<BrushRef<'b>>,
    stroke: &Stroke,
  ) {
    self.scene.stroke(stroke, transform, brush, None, shape);
  }

  pub(crate) fn layout_text(&mut self, text: &DrawText) -> Layout<Brush> {
    const DISPLAY_SCALE: f32 = 1.0;
    let mut builder = self.layout.ranged_builder(&mut self.font, text.text, DISPLAY_SCALE, true);

    builder.push_default(StyleProperty::FontSize(text.size));
    builder.push_default(StyleProperty::Brush(text.brush.clone()));
    builder.push_default(StyleProperty::FontWeight(text.weight));

    let mut layout = builder.build(text.text);
    layout.break_all_lines(None);
    layout.align(None, Alignment::Start, Default::default());
    layout
  }

  pub(crate) fn draw_text(&mut self, text: DrawText) {
    let layout = self.layout_text(&text);
    self.draw_text_layout(layout, text);
  }

  pub(crate) fn draw_text_layout(&mut self, layout: Layout<Brush>, text: DrawText) {
    let offset = Vec2::new(
      align_offset(text.horizontal_align, f64::from(layout.width())),
      align_offset(text.vertical_align, f64::from(layout.height())),
    );
    let transform =
      Affine::translate(text.position.to_vec2()) * text.transform * Affine::translate(offset);
    let hint = text.transform == Affine::IDENTITY;

    for line in layout.lines() {
      for item in line.items() {
        let PositionedLayoutItem::GlyphRun(glyph_run) = item else { continue };

        let run = glyph_run.run();
        let mut x = glyph_run.offset();
        let baseline = glyph_run.baseline();

        self
          .scene
          .draw_glyphs(run.font())
          .brush(&glyph_run.style().brush)
          .hint(hint)
          .transform(transform)
          .glyph_transform(
            run.synthesis().skew().map(|angle| Affine::skew(angle.to_radians().tan() as f64, 0.0)),
          )
          .font_size(run.font_size())
          .normalized_coords(run.normalized_coords())
          .draw(
            Fill::NonZero,
            glyph_run.glyphs().map(|glyph| {
              let gx = x + glyph.x;
              let gy = baseline + glyph.y;
              x += glyph.advance;
              vello::Glyph { id: glyph.id.into(), x: gx, y: gy }
            }),
          );
      }
    }
  }
}

fn align_offset(align: Align, extent: f64) -> f64 {
  match align {
    Align::Start => 0.0,
    Align::Center => -extent / 2.0,
    Align::End => -extent,
  }
}

impl GpuHandle {
  pub(crate) fn new() -> Result<Self, RenderError> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
    let adapter =
      pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions::default()))
        .map_err(|e| RenderError::Adapter(e.to_string()))?;

    let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
      label:             Some("regplot"),
      required_features: wgpu::Features::empty(),
      required_limits:   wgpu::Limits::defaults(),
      memory_hints:      wgpu::MemoryHints::MemoryUsage,
      trace:             wgpu::Trace::Off,
    }))
    .map_err(|e| RenderError::Device(e.to_string()))?;

    Ok(GpuHandle { device, queue })
  }
}

impl RenderConfig {
  /// Largest side the default GPU limits can hold as a 2D texture.
  pub const MAX_SIDE: u32 = 8192;

  pub fn validate(&self) -> Result<(), RenderError> {
    let valid = 1..=Self::MAX_SIDE;
    if valid.contains(&self.width) && valid.contains(&self.height) {
      Ok(())
    } else {
      Err(RenderError::Size { width: self.width, height: self.height })
    }
  }

  pub(crate) fn extent_3d(&self) -> wgpu::Extent3d {
    wgpu::Extent3d { width: self.width, height: self.height, depth_or_array_layers: 1 }
  }
}
