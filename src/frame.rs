//! Turns a table and a frame index into a [`Scene`].
//!
//! Cumulative frames reveal a growing prefix of the table and draw it as one path per
//! series. Snapshot frames pick the records at one distinct timestamp and rank them into a
//! bar race.

use chrono::Datelike;
use kurbo::Point;

use crate::{
  Error, Result,
  bounds::{Bounds, Range, RangeUnit},
  config::{BarAxis, FrameConfig, Mode, XAxis, YAxis},
  scene::{Annotation, Bar, Scene, SeriesPath, ValueLabel},
  table::{Record, TimeSeriesTable, Timestamp, timestamp_to_x},
  theme,
};

const MARGIN_LOW: f64 = 0.95;
const MARGIN_HIGH: f64 = 1.05;

pub fn frame_count(table: &TimeSeriesTable, config: &FrameConfig) -> usize {
  match config.mode {
    Mode::Cumulative => table.len(),
    Mode::Snapshot { .. } => table.distinct_timestamps().len(),
  }
}

/// Renders a single frame.
///
/// The result depends only on the arguments, so rendering the same frame twice gives equal
/// scenes.
pub fn render(table: &TimeSeriesTable, frame: usize, config: &FrameConfig) -> Result<Scene> {
  let index = TableIndex::new(table, config);
  index.check(frame, config)?;
  Ok(index.render(frame, config))
}

/// Lookups shared by every frame of one animation.
#[derive(Clone)]
struct TableIndex<'a> {
  table:      &'a TimeSeriesTable,
  timestamps: Vec<Timestamp>,
  entities:   Vec<&'a str>,
}

impl<'a> TableIndex<'a> {
  fn new(table: &'a TimeSeriesTable, config: &FrameConfig) -> Self {
    let timestamps = match config.mode {
      Mode::Cumulative => Vec::new(),
      Mode::Snapshot { .. } => table.distinct_timestamps(),
    };
    TableIndex { table, timestamps, entities: table.entities() }
  }

  fn frame_count(&self, config: &FrameConfig) -> usize {
    match config.mode {
      Mode::Cumulative => self.table.len(),
      Mode::Snapshot { .. } => self.timestamps.len(),
    }
  }

  fn check(&self, frame: usize, config: &FrameConfig) -> Result<()> {
    let count = self.frame_count(config);
    if frame >= count { Err(Error::FrameOutOfRange { frame, count }) } else { Ok(()) }
  }

  fn hue(&self, entity: Option<&str>) -> f32 {
    let Some(entity) = entity else { return 0.0 };
    let index = self.entities.iter().position(|e| *e == entity).unwrap_or(0);
    theme::hue(index, self.entities.len())
  }

  fn render(&self, frame: usize, config: &FrameConfig) -> Scene {
    match config.mode {
      Mode::Cumulative => self.cumulative(frame, config),
      Mode::Snapshot { top_n } => self.snapshot(frame, top_n, config),
    }
  }

  fn cumulative(&self, frame: usize, config: &FrameConfig) -> Scene {
    let all = self.table.records();
    let visible = &all[..=frame];
    let timestamp = visible[frame].timestamp;

    // Series keys in order of first appearance over the whole table, so colours and
    // drawing order never change between frames.
    let mut keys: Vec<Option<&str>> = Vec::new();
    for record in all {
      let key = record.entity.as_deref();
      if !keys.contains(&key) {
        keys.push(key);
      }
    }

    let mut series = Vec::new();
    let mut labels = Vec::new();
    for key in keys {
      let points: Vec<Point> = visible
        .iter()
        .filter(|r| r.entity.as_deref() == key)
        .map(|r| Point::new(timestamp_to_x(r.timestamp), r.value))
        .collect();
      let Some(last) = points.last().copied() else { continue };

      let hue = self.hue(key);
      let text = match key {
        Some(name) => format!("{name} {}", format_currency(last.y)),
        None => format_currency(last.y),
      };
      labels.push(ValueLabel { at: last, text, hue: Some(hue) });
      series.push(SeriesPath {
        name: key.map(str::to_string),
        points,
        hue,
        markers: config.markers,
      });
    }

    let y = match config.y_axis {
      YAxis::Visible => value_range(visible).scale(MARGIN_LOW, MARGIN_HIGH),
      YAxis::Global => value_range(all).scale(MARGIN_LOW, MARGIN_HIGH),
      YAxis::Fixed { min, max } => Range::new(min, max),
    };

    let x = match config.x_axis {
      XAxis::Full => time_range(all),
      XAxis::Trailing { buffer } => {
        let range = time_range(visible);
        Range::new(range.min, range.max + range.size() * buffer)
      }
    };

    Scene {
      frame,
      timestamp,
      records: visible.to_vec(),
      bounds: Bounds::new(x.non_empty(), y.non_empty()),
      x_unit: RangeUnit::Date,
      series,
      bars: Vec::new(),
      labels,
      annotations: Vec::new(),
    }
  }

  fn snapshot(&self, frame: usize, top_n: usize, config: &FrameConfig) -> Scene {
    let timestamp = self.timestamps[frame];

    let mut ranked: Vec<&Record> = self.table.at(timestamp).iter().collect();
    // Stable: equal values and names keep their table order.
    ranked.sort_by(|a, b| b.value.total_cmp(&a.value).then_with(|| a.entity.cmp(&b.entity)));
    ranked.truncate(top_n);

    let bars: Vec<Bar> = ranked
      .iter()
      .enumerate()
      .map(|(rank, r)| Bar {
        rank,
        slot: top_n - 1 - rank,
        entity: r.entity.clone().unwrap_or_default(),
        value: r.value,
        code: r.code.clone(),
        hue: self.hue(r.entity.as_deref()),
      })
      .collect();

    let labels = bars
      .iter()
      .map(|b| ValueLabel {
        at:   Point::new(b.value, b.slot as f64),
        text: format_thousands(b.value),
        hue:  None,
      })
      .collect();

    let annotations = vec![
      Annotation { position: Point::new(0.75, 0.15), text: format!("Year: {}", timestamp.year()) },
      Annotation {
        position: Point::new(0.75, 0.09),
        text:     format!("Month: {}", timestamp.format("%B")),
      },
    ];

    let max = match config.bar_axis {
      BarAxis::Visible => ranked.iter().map(|r| r.value).fold(0.0, f64::max) * MARGIN_HIGH,
      BarAxis::Fixed { max } => max,
    };

    Scene {
      frame,
      timestamp,
      records: ranked.into_iter().cloned().collect(),
      bounds: Bounds::new(
        Range::new(0.0, max).non_empty(),
        Range::new(-0.5, top_n as f64 - 0.5),
      ),
      x_unit: RangeUnit::Absolute,
      series: Vec::new(),
      bars,
      labels,
      annotations,
    }
  }
}

fn value_range(records: &[Record]) -> Range {
  Range::of(records.iter().map(|r| r.value)).unwrap_or_default()
}

fn time_range(records: &[Record]) -> Range {
  Range::of(records.iter().map(|r| timestamp_to_x(r.timestamp))).unwrap_or_default()
}

/// `$1234.50`, with the sign ahead of the symbol.
pub fn format_currency(value: f64) -> String {
  if value < 0.0 { format!("-${:.2}", -value) } else { format!("${value:.2}") }
}

/// `1,234,567.89`
pub fn format_thousands(value: f64) -> String {
  let text = format!("{:.2}", value.abs());
  let (int, frac) = text.split_once('.').unwrap_or((&text, "00"));

  let mut grouped = String::with_capacity(int.len() + int.len() / 3);
  for (i, c) in int.chars().enumerate() {
    if i > 0 && (int.len() - i) % 3 == 0 {
      grouped.push(',');
    }
    grouped.push(c);
  }

  let sign = if value < 0.0 { "-" } else { "" };
  format!("{sign}{grouped}.{frac}")
}

/// A lazy, finite sequence of scenes, one per frame, in ascending order.
///
/// Scenes depend only on the table and the frame index, so cloning the iterator (or calling
/// [`TimeSeriesTable::frames`] again) replays the same animation.
#[derive(Clone)]
pub struct Frames<'a> {
  index:  TableIndex<'a>,
  config: &'a FrameConfig,
  next:   usize,
  end:    usize,
}

impl<'a> Frames<'a> {
  pub fn new(table: &'a TimeSeriesTable, config: &'a FrameConfig) -> Self {
    let index = TableIndex::new(table, config);
    let end = index.frame_count(config);
    Frames { index, config, next: 0, end }
  }

  /// Total number of frames, regardless of how many have been consumed.
  pub fn frame_count(&self) -> usize { self.end }

  /// Renders any frame without advancing the iterator.
  pub fn scene(&self, frame: usize) -> Result<Scene> {
    self.index.check(frame, self.config)?;
    Ok(self.index.render(frame, self.config))
  }
}

impl Iterator for Frames<'_> {
  type Item = Scene;

  fn next(&mut self) -> Option<Scene> {
    if self.next >= self.end {
      return None;
    }
    let scene = self.index.render(self.next, self.config);
    self.next += 1;
    Some(scene)
  }

  fn size_hint(&self) -> (usize, Option<usize>) {
    let remaining = self.end - self.next;
    (remaining, Some(remaining))
  }
}

impl ExactSizeIterator for Frames<'_> {}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::*;

  fn date(y: i32, m: u32, d: u32) -> Timestamp { NaiveDate::from_ymd_opt(y, m, d).unwrap() }

  fn prices() -> TimeSeriesTable {
    TimeSeriesTable::new(vec![
      Record::new(date(2020, 1, 1), 10.0),
      Record::new(date(2020, 1, 2), 12.0),
      Record::new(date(2020, 1, 3), 9.0),
    ])
  }

  fn close(a: f64, b: f64) -> bool { (a - b).abs() < 1e-9 }

  #[test]
  fn cumulative_frame_shows_prefix() {
    let scene = render(&prices(), 1, &FrameConfig::cumulative()).unwrap();

    let dates: Vec<_> = scene.records.iter().map(|r| r.timestamp).collect();
    assert_eq!(dates, [date(2020, 1, 1), date(2020, 1, 2)]);
    assert!(close(scene.bounds.y.min, 9.5));
    assert!(close(scene.bounds.y.max, 12.6));
    assert_eq!(scene.timestamp, date(2020, 1, 2));
  }

  #[test]
  fn cumulative_x_axis_covers_whole_table() {
    let scene = render(&prices(), 0, &FrameConfig::cumulative()).unwrap();
    assert_eq!(scene.bounds.x.min, timestamp_to_x(date(2020, 1, 1)));
    assert_eq!(scene.bounds.x.max, timestamp_to_x(date(2020, 1, 3)));
  }

  #[test]
  fn trailing_x_axis_follows_visible_range() {
    let config = FrameConfig::cumulative().x_axis(XAxis::Trailing { buffer: 0.1 });
    let scene = render(&prices(), 1, &config).unwrap();

    let start = timestamp_to_x(date(2020, 1, 1));
    assert_eq!(scene.bounds.x.min, start);
    assert!(close(scene.bounds.x.max, start + 1.0 + 0.1));
  }

  #[test]
  fn global_y_axis_ignores_frame() {
    let config = FrameConfig::cumulative().y_axis(YAxis::Global);
    let first = render(&prices(), 0, &config).unwrap();
    let last = render(&prices(), 2, &config).unwrap();
    assert_eq!(first.bounds.y, last.bounds.y);
    assert!(close(first.bounds.y.min, 9.0 * 0.95));
  }

  #[test]
  fn single_value_frame_has_usable_bounds() {
    let table = TimeSeriesTable::new(vec![Record::new(date(2020, 1, 1), 0.0)]);
    let scene = render(&table, 0, &FrameConfig::cumulative()).unwrap();
    assert!(scene.bounds.x.size() > 0.0);
    assert!(scene.bounds.y.size() > 0.0);
  }

  #[test]
  fn cumulative_label_sits_on_latest_point() {
    let scene = render(&prices(), 2, &FrameConfig::cumulative()).unwrap();
    assert_eq!(scene.series.len(), 1);
    assert_eq!(scene.series[0].points.len(), 3);
    assert_eq!(scene.labels.len(), 1);
    assert_eq!(scene.labels[0].text, "$9.00");
    assert_eq!(scene.labels[0].at, Point::new(timestamp_to_x(date(2020, 1, 3)), 9.0));
  }

  #[test]
  fn cumulative_growth_is_monotone() {
    let table = prices();
    let config = FrameConfig::cumulative();
    let scenes: Vec<_> = table.frames(&config).collect();
    for pair in scenes.windows(2) {
      assert!(pair[0].records.iter().all(|r| pair[1].records.contains(r)));
      assert_eq!(pair[0].records.len() + 1, pair[1].records.len());
    }
  }

  #[test]
  fn cumulative_series_keep_their_names() {
    let table = TimeSeriesTable::new(vec![
      Record::new(date(2020, 1, 1), 80.0).with_entity("AMD"),
      Record::new(date(2020, 1, 1), 400.0).with_entity("NVIDIA"),
      Record::new(date(2020, 1, 2), 82.5).with_entity("AMD"),
    ]);
    let scene = render(&table, 2, &FrameConfig::cumulative()).unwrap();

    let names: Vec<_> = scene.series.iter().map(|s| s.name.as_deref().unwrap()).collect();
    assert_eq!(names, ["AMD", "NVIDIA"]);
    assert_eq!(scene.series[0].points.len(), 2);
    assert_eq!(scene.labels[0].text, "AMD $82.50");
    assert_eq!(scene.labels[1].text, "NVIDIA $400.00");
    assert_ne!(scene.series[0].hue, scene.series[1].hue);
  }

  fn population() -> TimeSeriesTable {
    let month = date(2020, 1, 1);
    TimeSeriesTable::new(vec![
      Record::new(month, 50.0).with_entity("Italy").with_code("ITA"),
      Record::new(month, 40.0).with_entity("Germany").with_code("DEU"),
      Record::new(month, 30.0).with_entity("Turkey").with_code("TUR"),
      Record::new(month, 20.0).with_entity("Spain").with_code("ESP"),
      Record::new(month, 10.0).with_entity("France").with_code("FRA"),
      Record::new(date(2020, 2, 1), 5.0).with_entity("Italy"),
    ])
  }

  #[test]
  fn snapshot_keeps_ranked_order() {
    let config = FrameConfig::snapshot(10);
    let scene = render(&population(), 0, &config).unwrap();

    let values: Vec<_> = scene.records.iter().map(|r| r.value).collect();
    assert_eq!(values, [50.0, 40.0, 30.0, 20.0, 10.0]);
    let slots: Vec<_> = scene.bars.iter().map(|b| b.slot).collect();
    assert_eq!(slots, [9, 8, 7, 6, 5]);
    assert_eq!(scene.bounds.y, Range::new(-0.5, 9.5));
    assert!(close(scene.bounds.x.max, 52.5));
  }

  #[test]
  fn snapshot_truncates_to_top_n() {
    let config = FrameConfig::snapshot(3);
    let scene = render(&population(), 0, &config).unwrap();
    assert_eq!(scene.bars.len(), 3);
    assert_eq!(scene.bars[0].entity, "Italy");
    assert_eq!(scene.bars[2].entity, "Turkey");
    assert_eq!(scene.bars[2].slot, 0);
  }

  #[test]
  fn snapshot_frame_count_is_distinct_timestamps() {
    let table = population();
    let config = FrameConfig::snapshot(10);
    assert_eq!(table.frame_count(&config), 2);

    let last = render(&table, 1, &config).unwrap();
    assert_eq!(last.bars.len(), 1);
    assert_eq!(last.bars[0].code, None);
    assert!(matches!(render(&table, 2, &config), Err(Error::FrameOutOfRange { frame: 2, count: 2 })));
  }

  #[test]
  fn snapshot_ties_break_by_name() {
    let month = date(2021, 12, 1);
    let table = TimeSeriesTable::new(vec![
      Record::new(month, 7.0).with_entity("Zambia"),
      Record::new(month, 7.0).with_entity("Austria"),
      Record::new(month, 9.0).with_entity("Peru"),
    ]);
    let scene = render(&table, 0, &FrameConfig::snapshot(10)).unwrap();
    let names: Vec<_> = scene.bars.iter().map(|b| b.entity.as_str()).collect();
    assert_eq!(names, ["Peru", "Austria", "Zambia"]);
  }

  #[test]
  fn snapshot_annotations_and_labels() {
    let table = TimeSeriesTable::new(vec![
      Record::new(date(1999, 12, 1), 12345.0).with_entity("Italy"),
    ]);
    let scene = render(&table, 0, &FrameConfig::snapshot(10)).unwrap();
    assert_eq!(scene.labels[0].text, "12,345.00");
    assert_eq!(scene.annotations[0].text, "Year: 1999");
    assert_eq!(scene.annotations[1].text, "Month: December");
  }

  #[test]
  fn fixed_bar_axis() {
    let config = FrameConfig::snapshot(10).bar_axis(BarAxis::Fixed { max: 150000.0 });
    let scene = render(&population(), 0, &config).unwrap();
    assert_eq!(scene.bounds.x, Range::new(0.0, 150000.0));
  }

  #[test]
  fn entity_keeps_hue_across_frames() {
    let table = population();
    let config = FrameConfig::snapshot(10);
    let first = render(&table, 0, &config).unwrap();
    let second = render(&table, 1, &config).unwrap();
    assert_eq!(first.bars[0].hue, second.bars[0].hue);
  }

  #[test]
  fn rendering_is_idempotent() {
    let table = population();
    for config in [FrameConfig::snapshot(10), FrameConfig::cumulative()] {
      for frame in 0..table.frame_count(&config) {
        assert_eq!(render(&table, frame, &config).unwrap(), render(&table, frame, &config).unwrap());
      }
    }
  }

  #[test]
  fn frames_match_render_and_restart() {
    let table = prices();
    let config = FrameConfig::cumulative();
    let frames = table.frames(&config);
    assert_eq!(frames.len(), 3);

    let replay = frames.clone();
    let scenes: Vec<_> = frames.collect();
    assert_eq!(scenes, replay.collect::<Vec<_>>());
    for (i, scene) in scenes.iter().enumerate() {
      assert_eq!(scene.frame, i);
      assert_eq!(*scene, render(&table, i, &config).unwrap());
    }
  }

  #[test]
  fn empty_table_has_no_frames() {
    let table = TimeSeriesTable::default();
    let config = FrameConfig::cumulative();
    assert_eq!(table.frames(&config).count(), 0);
    assert!(matches!(render(&table, 0, &config), Err(Error::FrameOutOfRange { .. })));
  }

  #[test]
  fn formats_numbers() {
    assert_eq!(format_thousands(1234567.891), "1,234,567.89");
    assert_eq!(format_thousands(999.0), "999.00");
    assert_eq!(format_thousands(-1000.0), "-1,000.00");
    assert_eq!(format_currency(3.14159), "$3.14");
    assert_eq!(format_currency(-2.5), "-$2.50");
  }
}
