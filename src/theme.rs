use color::{Oklch, OpaqueColor, Srgb};
use peniko::Color;

pub struct LinearPalette {
  start: OpaqueColor<Oklch>,
  end:   OpaqueColor<Oklch>,
}

pub const ROCKET: LinearPalette =
  LinearPalette::new(OpaqueColor::new([0.7, 0.13, 50.0]), OpaqueColor::new([0.7, 0.13, 290.0]));

pub const TEXT_COLOR: Color = Color::from_rgb8(32, 32, 32);
pub const LINE_COLOR: Color = Color::from_rgb8(128, 128, 128);
pub const GRID_COLOR: Color = Color::from_rgba8(128, 128, 128, 90);
pub const LABEL_BACKGROUND: Color = Color::from_rgba8(255, 255, 255, 178);
pub const BACKGROUND: Color = Color::WHITE;

/// Bars are drawn translucent so the grid shows through.
pub const BAR_ALPHA: f32 = 0.3;

impl LinearPalette {
  pub const fn new(start: OpaqueColor<Oklch>, end: OpaqueColor<Oklch>) -> Self {
    Self { start, end }
  }

  pub fn sample(&self, t: f32) -> OpaqueColor<Oklch> {
    let t = t.clamp(0.0, 1.0);
    self.start.lerp(self.end, t, color::HueDirection::Shorter)
  }

  pub fn color(&self, t: f32, alpha: f32) -> Color {
    self.sample(t).convert::<Srgb>().with_alpha(alpha)
  }
}

/// Spreads `count` items evenly over the palette.
pub fn hue(index: usize, count: usize) -> f32 {
  if count <= 1 { 0.0 } else { index as f32 / (count - 1) as f32 }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn hue_spans_palette() {
    assert_eq!(hue(0, 1), 0.0);
    assert_eq!(hue(0, 3), 0.0);
    assert_eq!(hue(1, 3), 0.5);
    assert_eq!(hue(2, 3), 1.0);
  }

  #[test]
  fn colors_are_stable() {
    assert_eq!(ROCKET.color(0.25, 1.0), ROCKET.color(0.25, 1.0));
    assert_ne!(ROCKET.color(0.0, 1.0), ROCKET.color(1.0, 1.0));
  }
}
