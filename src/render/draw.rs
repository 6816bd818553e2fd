use std::collections::HashMap;

use parley::FontWeight;
use vello::{
  kurbo::{Affine, BezPath, Cap, Circle, Line, Point, Rect, Stroke},
  peniko::{Brush, Color, ImageBrush},
};

use crate::{
  bounds::{Bounds, Range},
  config::Chrome,
  icons::{ICON_SIZE, IconCache},
  render::{Align, DrawText, Render, image_brush},
  scene::{Bar, Scene},
  theme::{self, ROCKET},
};

const TICKS: u32 = 8;
const BAR_HEIGHT: f64 = 0.8;
const NAME_GAP: f64 = 10.0;

/// Draws scenes onto a [`Render`], with the chrome and icons shared by every frame.
pub(crate) struct Painter<'a> {
  chrome: &'a Chrome,
  icons:  HashMap<String, ImageBrush>,
}

/// Space kept around the plot area, in pixels.
struct Margins {
  left:   f64,
  right:  f64,
  top:    f64,
  bottom: f64,
}

impl<'a> Painter<'a> {
  pub fn new(chrome: &'a Chrome, icons: &IconCache) -> Self {
    let icons =
      icons.iter().map(|(code, image)| (code.to_string(), image_brush(image))).collect::<HashMap<_, _>>();
    Painter { chrome, icons }
  }

  pub fn draw(&self, render: &mut Render, scene: &Scene, width: u32, height: u32) {
    let (width, height) = (f64::from(width), f64::from(height));
    let margins = if scene.is_bar_chart() {
      Margins { left: 220.0, right: 110.0, top: 70.0, bottom: 70.0 }
    } else {
      Margins { left: 100.0, right: 110.0, top: 70.0, bottom: 90.0 }
    };
    let viewport = Bounds::new(
      Range::new(margins.left, width - margins.right),
      Range::new(height - margins.bottom, margins.top),
    );
    let transform = scene.bounds.transform_to(viewport);

    self.draw_chrome(render, viewport, width);
    self.draw_grid(render, scene, viewport, transform);

    render.scene.push_clip_layer(
      Affine::IDENTITY,
      &Rect::new(viewport.x.min, viewport.y.max, viewport.x.max, viewport.y.min),
    );
    for series in &scene.series {
      let color = ROCKET.color(series.hue, 1.0);
      let mut shape = BezPath::new();
      for (i, point) in series.points.iter().enumerate() {
        if i == 0 {
          shape.move_to(*point);
        } else {
          shape.line_to(*point);
        }
      }
      // The path is built in data space, so the stroke width has to be applied after it.
      let shape = transform * shape;
      render.stroke(&shape, Affine::IDENTITY, color, &Stroke::new(2.0));

      if series.markers {
        for point in &series.points {
          render.fill(&Circle::new(transform * *point, 4.0), Affine::IDENTITY, color);
        }
      }
    }
    for bar in &scene.bars {
      self.draw_bar(render, bar, transform);
    }
    render.scene.pop_layer();

    for bar in &scene.bars {
      self.draw_bar_name(render, bar, viewport, transform);
    }

    for label in &scene.labels {
      let at = transform * label.at;
      if scene.is_bar_chart() {
        render.draw_text(DrawText {
          text: &label.text,
          size: 14.0,
          weight: FontWeight::BOLD,
          position: Point::new(at.x + 5.0, at.y),
          vertical_align: Align::Center,
          ..Default::default()
        });
      } else {
        let brush = label.hue.map_or(theme::TEXT_COLOR, |hue| ROCKET.color(hue, 1.0));
        render.draw_text_boxed(
          DrawText {
            text: &label.text,
            size: 14.0,
            brush: Brush::Solid(brush),
            position: Point::new(at.x + 10.0, at.y - 10.0),
            vertical_align: Align::End,
            ..Default::default()
          },
          theme::LABEL_BACKGROUND,
          4.0,
        );
      }
    }

    for annotation in &scene.annotations {
      let position = Point::new(
        viewport.x.min + annotation.position.x * viewport.x.size(),
        viewport.y.min + annotation.position.y * viewport.y.size(),
      );
      render.draw_text_boxed(
        DrawText {
          text: &annotation.text,
          size: 18.0,
          weight: FontWeight::BOLD,
          position,
          vertical_align: Align::Center,
          ..Default::default()
        },
        theme::LABEL_BACKGROUND,
        5.0,
      );
    }
  }

  fn draw_chrome(&self, render: &mut Render, viewport: Bounds, width: f64) {
    if let Some(title) = &self.chrome.title {
      render.draw_text(DrawText {
        text: title,
        size: 28.0,
        weight: FontWeight::BOLD,
        position: Point::new(width / 2.0, viewport.y.max - 20.0),
        horizontal_align: Align::Center,
        vertical_align: Align::End,
        ..Default::default()
      });
    }

    if let Some(x_label) = &self.chrome.x_label {
      render.draw_text(DrawText {
        text: x_label,
        size: 20.0,
        position: Point::new(viewport.x.min + viewport.x.size() / 2.0, viewport.y.min + 45.0),
        horizontal_align: Align::Center,
        ..Default::default()
      });
    }

    if let Some(y_label) = &self.chrome.y_label {
      let center = viewport.y.min + viewport.y.size() / 2.0;
      render.draw_text(DrawText {
        text: y_label,
        size: 20.0,
        transform: Affine::rotate_about(-std::f64::consts::FRAC_PI_2, Point::new(30.0, center)),
        position: Point::new(30.0, center),
        horizontal_align: Align::Center,
        vertical_align: Align::Center,
        ..Default::default()
      });
    }

    let border = Stroke::new(2.0);
    render.stroke(
      &Line::new((viewport.x.min, viewport.y.min), (viewport.x.max, viewport.y.min)),
      Affine::IDENTITY,
      theme::LINE_COLOR,
      &border,
    );
    render.stroke(
      &Line::new((viewport.x.min, viewport.y.min), (viewport.x.min, viewport.y.max)),
      Affine::IDENTITY,
      theme::LINE_COLOR,
      &border,
    );
  }

  /// Ticks along the bottom, and along the left for line charts, with a dashed grid.
  fn draw_grid(&self, render: &mut Render, scene: &Scene, viewport: Bounds, transform: Affine) {
    let tick = Stroke::new(2.0).with_start_cap(Cap::Butt);
    let grid = Stroke::new(1.0).with_dashes(0.0, [4.0, 4.0]);

    let iter = scene.bounds.x.nice_ticks(TICKS);
    let precision = iter.precision();
    for (x, vx) in
      iter.map(|v| (v, (transform * Point::new(v, 0.0)).x)).filter(|(_, vx)| viewport.x.contains(vx))
    {
      render.stroke(
        &Line::new((vx, viewport.y.min), (vx, viewport.y.max)),
        Affine::IDENTITY,
        theme::GRID_COLOR,
        &grid,
      );
      render.stroke(
        &Line::new((vx, viewport.y.min), (vx, viewport.y.min + 8.0)),
        Affine::IDENTITY,
        theme::LINE_COLOR,
        &tick,
      );
      render.draw_text(DrawText {
        text: &scene.x_unit.format_tick(x, precision),
        size: 12.0,
        position: Point::new(vx, viewport.y.min + 12.0),
        horizontal_align: Align::Center,
        ..Default::default()
      });
    }

    if scene.is_bar_chart() {
      return;
    }

    let iter = scene.bounds.y.nice_ticks(TICKS);
    let precision = iter.precision();
    for (y, vy) in
      iter.map(|v| (v, (transform * Point::new(0.0, v)).y)).filter(|(_, vy)| viewport.y.contains(vy))
    {
      render.stroke(
        &Line::new((viewport.x.min, vy), (viewport.x.max, vy)),
        Affine::IDENTITY,
        theme::GRID_COLOR,
        &grid,
      );
      render.stroke(
        &Line::new((viewport.x.min, vy), (viewport.x.min - 8.0, vy)),
        Affine::IDENTITY,
        theme::LINE_COLOR,
        &tick,
      );
      render.draw_text(DrawText {
        text: &format!("{:.*}", precision.saturating_sub(3), y),
        size: 12.0,
        position: Point::new(viewport.x.min - 12.0, vy),
        horizontal_align: Align::End,
        vertical_align: Align::Center,
        ..Default::default()
      });
    }
  }

  fn draw_bar(&self, render: &mut Render, bar: &Bar, transform: Affine) {
    let slot = bar.slot as f64;
    let rect = Rect::new(0.0, slot - BAR_HEIGHT / 2.0, bar.value, slot + BAR_HEIGHT / 2.0);
    render.fill(&transform.transform_rect_bbox(rect), Affine::IDENTITY, bar_color(bar));
  }

  /// The entity name left of the axis, with its icon between the name and the axis.
  fn draw_bar_name(&self, render: &mut Render, bar: &Bar, viewport: Bounds, transform: Affine) {
    let y = (transform * Point::new(0.0, bar.slot as f64)).y;
    let icon_width = f64::from(ICON_SIZE.0);

    if let Some(icon) = bar.code.as_deref().and_then(|code| self.icons.get(code)) {
      let left = viewport.x.min - NAME_GAP / 2.0 - icon_width;
      let top = y - f64::from(icon.image.height) / 2.0;
      render.draw_image(icon, Affine::translate((left, top)));
    }

    render.draw_text(DrawText {
      text: &bar.entity,
      size: 14.0,
      position: Point::new(viewport.x.min - NAME_GAP - icon_width, y),
      horizontal_align: Align::End,
      vertical_align: Align::Center,
      ..Default::default()
    });
  }
}

fn bar_color(bar: &Bar) -> Color { ROCKET.color(bar.hue, theme::BAR_ALPHA) }

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::*;
  use crate::{FrameConfig, Record, TimeSeriesTable, frame};

  fn table() -> TimeSeriesTable {
    let date = |d| NaiveDate::from_ymd_opt(2020, 1, d).unwrap();
    TimeSeriesTable::new(vec![
      Record::new(date(1), 10.0).with_entity("AMD"),
      Record::new(date(1), 30.0).with_entity("INTEL"),
      Record::new(date(2), 12.0).with_entity("AMD"),
      Record::new(date(2), 25.0).with_entity("INTEL"),
    ])
  }

  #[test]
  fn clipped_layers_are_balanced() {
    let chrome = Chrome::new("Prices").x_label("Date").y_label("Price ($)");
    let icons = IconCache::new();
    let painter = Painter::new(&chrome, &icons);

    for config in [FrameConfig::cumulative().markers(), FrameConfig::snapshot(10)] {
      let scene = frame::render(&table(), 1, &config).unwrap();
      let mut render = Render::new();
      painter.draw(&mut render, &scene, 400, 300);

      let encoding = render.scene.encoding();
      assert!(!encoding.is_empty());
      assert_eq!(encoding.n_open_clips, 0);
    }
  }
}
