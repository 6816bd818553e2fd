use kurbo::Point;

use crate::{
  bounds::{Bounds, RangeUnit},
  table::{Record, Timestamp},
};

/// Everything drawn for a single frame.
///
/// A scene is derived from the table, the frame index and the frame config alone. Nothing
/// carries over from the previous frame: backends clear their surface and draw the scene
/// from scratch.
#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
  pub frame:       usize,
  /// The time step this frame shows: the last revealed record, or the snapshot timestamp.
  pub timestamp:   Timestamp,
  /// Visible records. Cumulative frames keep table order, snapshot frames are ranked.
  pub records:     Vec<Record>,
  /// Axis bounds in data space.
  pub bounds:      Bounds,
  pub x_unit:      RangeUnit,
  pub series:      Vec<SeriesPath>,
  pub bars:        Vec<Bar>,
  pub labels:      Vec<ValueLabel>,
  pub annotations: Vec<Annotation>,
}

/// A line through one series' visible points, x in days since the common era.
#[derive(Clone, Debug, PartialEq)]
pub struct SeriesPath {
  pub name:    Option<String>,
  pub points:  Vec<Point>,
  pub hue:     f32,
  pub markers: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Bar {
  /// 0 for the largest value.
  pub rank:   usize,
  /// Vertical slot, counted from the bottom of the axis.
  pub slot:   usize,
  pub entity: String,
  pub value:  f64,
  /// Key into the icon cache, if the entity has one.
  pub code:   Option<String>,
  pub hue:    f32,
}

/// Text pinned to a data point.
#[derive(Clone, Debug, PartialEq)]
pub struct ValueLabel {
  pub at:   Point,
  pub text: String,
  pub hue:  Option<f32>,
}

/// Text placed in axes-fraction coordinates, `(0, 0)` bottom left and `(1, 1)` top right.
#[derive(Clone, Debug, PartialEq)]
pub struct Annotation {
  pub position: Point,
  pub text:     String,
}

impl Scene {
  pub fn is_bar_chart(&self) -> bool { !self.bars.is_empty() }

  /// Codes of every icon the scene wants drawn, top bar first.
  pub fn icon_codes(&self) -> impl Iterator<Item = &str> {
    self.bars.iter().filter_map(|b| b.code.as_deref())
  }
}
