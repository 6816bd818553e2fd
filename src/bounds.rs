use kurbo::Affine;

use crate::table::x_to_timestamp;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
  pub x: Range,
  pub y: Range,
}

/// What the numbers along an axis mean, for tick labelling.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RangeUnit {
  #[default]
  Absolute,
  /// Days since the common era.
  Date,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Range {
  pub min: f64,
  pub max: f64,
}

impl Bounds {
  pub const fn new(x: Range, y: Range) -> Self { Bounds { x, y } }

  pub(crate) fn transform_to(&self, viewport: Bounds) -> Affine {
    let scale_x = viewport.x.size() / self.x.size();
    let scale_y = viewport.y.size() / self.y.size();
    let translate_x = viewport.x.min - self.x.min * scale_x;
    let translate_y = viewport.y.min - self.y.min * scale_y;

    Affine::new([scale_x, 0.0, 0.0, scale_y, translate_x, translate_y])
  }
}

impl Default for Range {
  fn default() -> Self { Range::new(0.0, 0.0) }
}

impl Range {
  pub const fn new(min: f64, max: f64) -> Self { Range { min, max } }
  pub const fn size(&self) -> f64 { self.max - self.min }

  /// The smallest range holding every value, or `None` when there are no values.
  pub fn of(values: impl IntoIterator<Item = f64>) -> Option<Range> {
    values.into_iter().fold(None, |acc, v| match acc {
      None => Some(Range::new(v, v)),
      Some(r) => Some(Range::new(r.min.min(v), r.max.max(v))),
    })
  }

  /// Multiplies each end by its own factor: `scale(0.95, 1.05)` leaves a 5% margin around
  /// positive data.
  pub const fn scale(self, min_factor: f64, max_factor: f64) -> Self {
    Range { min: self.min * min_factor, max: self.max * max_factor }
  }

  /// Widens a degenerate range so it can be mapped onto a viewport.
  pub fn non_empty(self) -> Self {
    if self.size() == 0.0 { Range::new(self.min - 1.0, self.max + 1.0) } else { self }
  }

  /// Works for flipped ranges too, as used by screen-space y axes.
  pub const fn contains(&self, value: &f64) -> bool {
    (*value >= self.min && *value <= self.max) || (*value <= self.min && *value >= self.max)
  }

  pub fn nice_ticks(&self, count: u32) -> NiceTicksIter {
    let step = (self.max - self.min) / f64::from(count);
    if !step.is_finite() || step <= 0.0 {
      return NiceTicksIter::new(0.0, -1.0, 1.0, 0);
    }
    let k = step.log10().floor();
    let base = step / 10f64.powf(k);

    let nice_base = match base {
      b if b <= 1.0 => 1.0,
      b if b <= 2.0 => 2.0,
      b if b <= 2.5 => 2.5,
      b if b <= 5.0 => 5.0,
      _ => 10.0,
    };

    let step = nice_base * 10f64.powf(k);
    let lo = (self.min / step).floor() * step;
    let hi = (self.max / step).ceil() * step;

    let precision = (-k as i32 + 4).max(0) as usize;
    NiceTicksIter::new(lo, hi, step, precision)
  }
}

impl RangeUnit {
  pub fn format_tick(&self, value: f64, precision: usize) -> String {
    match self {
      RangeUnit::Absolute => format!("{:.*}", precision.saturating_sub(3), value),
      RangeUnit::Date => match x_to_timestamp(value) {
        Some(date) => date.format("%m/%d/%Y").to_string(),
        None => String::new(),
      },
    }
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
    if self.current < self.hi + self.step * 0.5 {
      let p = 10f64.powi(self.precision as i32);
      let result = (self.current * p).round() / p;
      self.current += self.step;
      Some(result)
    } else {
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn of_finds_extremes() {
    assert_eq!(Range::of([3.0, -1.0, 7.5]), Some(Range::new(-1.0, 7.5)));
    assert_eq!(Range::of([]), None);
  }

  #[test]
  fn nice_ticks_cover_range() {
    let ticks: Vec<_> = Range::new(0.0, 100.0).nice_ticks(10).collect();
    assert_eq!(ticks.first(), Some(&0.0));
    assert_eq!(ticks.last(), Some(&100.0));
    assert_eq!(ticks.len(), 11);
  }

  #[test]
  fn exact_steps_are_kept() {
    let ticks: Vec<_> = Range::new(0.0, 50.0).nice_ticks(5).collect();
    assert_eq!(ticks, [0.0, 10.0, 20.0, 30.0, 40.0, 50.0]);

    let ticks: Vec<_> = Range::new(0.0, 10.0).nice_ticks(2).collect();
    assert_eq!(ticks, [0.0, 5.0, 10.0]);
  }

  #[test]
  fn flipped_ranges_contain_values() {
    assert!(Range::new(500.0, 0.0).contains(&250.0));
    assert!(!Range::new(500.0, 0.0).contains(&501.0));
  }

  #[test]
  fn degenerate_ticks_terminate() {
    assert_eq!(Range::new(5.0, 5.0).nice_ticks(10).count(), 0);
  }

  #[test]
  fn non_empty_widens_points() {
    assert_eq!(Range::new(0.0, 0.0).non_empty(), Range::new(-1.0, 1.0));
    assert_eq!(Range::new(1.0, 2.0).non_empty(), Range::new(1.0, 2.0));
  }

  #[test]
  fn transform_maps_corners() {
    let data = Bounds::new(Range::new(0.0, 10.0), Range::new(0.0, 1.0));
    let viewport = Bounds::new(Range::new(100.0, 200.0), Range::new(500.0, 0.0));
    let t = data.transform_to(viewport);

    let p = t * kurbo::Point::new(10.0, 1.0);
    assert!((p.x - 200.0).abs() < 1e-9);
    assert!(p.y.abs() < 1e-9);
  }

  #[test]
  fn date_ticks_are_formatted() {
    let x = crate::table::timestamp_to_x(chrono::NaiveDate::from_ymd_opt(2020, 1, 2).unwrap());
    assert_eq!(RangeUnit::Date.format_tick(x, 4), "01/02/2020");
    assert_eq!(RangeUnit::Absolute.format_tick(2.5, 4), "2.5");
  }
}
