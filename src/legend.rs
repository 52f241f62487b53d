use kurbo::{Affine, Circle, Point, Rect, RoundedRect, Size, Stroke, Vec2};
use peniko::Color;

use crate::{
  Axes, Bounds, Plot,
  render::{Align, DrawText, Render},
  theme,
};

#[derive(Debug, Clone)]
pub struct LegendItem {
  pub label: String,
  pub color: Color,
  pub kind:  LegendKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegendKind {
  Marker,
  Line,
}

impl Plot {
  /// Entries for every labelled series, in drawing order.
  pub fn legend_items(&self) -> Vec<LegendItem> {
    self
      .axes
      .iter()
      .filter_map(|ax| match ax {
        Axes::Scatter(sa) => sa.options.label.as_ref().map(|label| LegendItem {
          label: label.clone(),
          color: sa.options.color,
          kind:  LegendKind::Marker,
        }),
        Axes::Line(la) => la.options.label.as_ref().map(|label| LegendItem {
          label: label.clone(),
          color: la.options.color,
          kind:  LegendKind::Line,
        }),
      })
      .collect()
  }

  pub(crate) fn draw_legend(&self, render: &mut Render, viewport: Bounds) {
    let items = self.legend_items();
    if items.is_empty() {
      return;
    }

    const MARGIN: f64 = 20.0;
    const PADDING: f64 = 10.0;
    const FONT_SIZE: f32 = 20.0;
    const LINE_HEIGHT: f64 = 26.0;
    const MARKER_WIDTH: f64 = 40.0;

    let mut inner_width = 0.0_f64;
    let mut layouts = vec![];
    for item in &items {
      let text = DrawText {
        text: &item.label,
        size: FONT_SIZE,
        vertical_align: Align::Center,
        ..Default::default()
      };
      let layout = render.layout_text(&text);
      inner_width = inner_width.max(f64::from(layout.width()));
      layouts.push((layout, text));
    }

    inner_width += MARKER_WIDTH;
    let inner_height = items.len() as f64 * LINE_HEIGHT;

    // The viewport's y axis points up, so `y.max` is the top edge on the canvas.
    let rect = Rect::new(
      viewport.x.max - inner_width - MARGIN - PADDING * 2.0,
      viewport.y.max + MARGIN,
      viewport.x.max - MARGIN,
      viewport.y.max + MARGIN + inner_height + PADDING * 2.0,
    );
    let background = RoundedRect::from_rect(rect, 5.0);
    render.fill(&background, Affine::IDENTITY, Color::from_rgba8(255, 255, 255, 200));
    render.stroke(&background, Affine::IDENTITY, theme::AXIS_COLOR, &Stroke::new(2.0));

    for (i, (item, (layout, mut text))) in items.iter().zip(layouts).enumerate() {
      let pos = Point::new(
        rect.x0 + PADDING,
        rect.y0 + i as f64 * LINE_HEIGHT + PADDING + LINE_HEIGHT / 2.0,
      );

      match item.kind {
        LegendKind::Line => {
          let marker_rect =
            Rect::from_origin_size(pos - Vec2::new(0.0, 1.0), Size::new(MARKER_WIDTH - 10.0, 2.0));
          render.fill(&marker_rect, Affine::IDENTITY, item.color);
        }
        LegendKind::Marker => {
          let center = pos + Vec2::new((MARKER_WIDTH - 10.0) / 2.0, 0.0);
          render.fill(&Circle::new(center, 5.0), Affine::IDENTITY, item.color);
        }
      }

      text.position = pos + Vec2::new(MARKER_WIDTH, 0.0);
      render.draw_text_layout(layout, text);
    }
  }
}
