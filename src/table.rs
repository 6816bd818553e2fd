use chrono::{Datelike, NaiveDate};

use crate::{
  bounds::Range,
  config::FrameConfig,
  frame::{self, Frames},
};

/// Timestamps are calendar dates. Year/month sources map onto the first day of the month.
pub type Timestamp = NaiveDate;

#[derive(Clone, Debug, PartialEq)]
pub struct Record {
  pub timestamp: Timestamp,
  pub value:     f64,
  pub entity:    Option<String>,
  pub code:      Option<String>,
}

impl Record {
  pub fn new(timestamp: Timestamp, value: f64) -> Self {
    Record { timestamp, value, entity: None, code: None }
  }

  pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
    self.entity = Some(entity.into());
    self
  }

  pub fn with_code(mut self, code: impl Into<String>) -> Self {
    self.code = Some(code.into());
    self
  }
}

/// An ordered table of records, sorted ascending by timestamp.
///
/// Records that share a timestamp keep the order they were loaded in. The table is
/// read-only once built.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TimeSeriesTable {
  records: Vec<Record>,
}

impl TimeSeriesTable {
  pub fn new(mut records: Vec<Record>) -> Self {
    records.sort_by_key(|r| r.timestamp);
    TimeSeriesTable { records }
  }

  /// Merges several tables into one, keeping the input order for equal timestamps.
  pub fn concat(tables: impl IntoIterator<Item = TimeSeriesTable>) -> Self {
    TimeSeriesTable::new(tables.into_iter().flat_map(|t| t.records).collect())
  }

  pub fn records(&self) -> &[Record] { &self.records }
  pub fn len(&self) -> usize { self.records.len() }
  pub fn is_empty(&self) -> bool { self.records.is_empty() }

  /// Smallest and largest value over every record, or `None` for an empty table.
  pub fn value_range(&self) -> Option<Range> { Range::of(self.records.iter().map(|r| r.value)) }

  /// Every distinct timestamp in the table, ascending.
  pub fn distinct_timestamps(&self) -> Vec<Timestamp> {
    let mut out: Vec<Timestamp> = Vec::new();
    for record in &self.records {
      if out.last() != Some(&record.timestamp) {
        out.push(record.timestamp);
      }
    }
    out
  }

  /// Distinct entities in order of first appearance.
  pub fn entities(&self) -> Vec<&str> {
    let mut out: Vec<&str> = Vec::new();
    for entity in self.records.iter().filter_map(|r| r.entity.as_deref()) {
      if !out.contains(&entity) {
        out.push(entity);
      }
    }
    out
  }

  /// Records sharing `timestamp`, in table order.
  pub fn at(&self, timestamp: Timestamp) -> &[Record] {
    let start = self.records.partition_point(|r| r.timestamp < timestamp);
    let end = self.records.partition_point(|r| r.timestamp <= timestamp);
    &self.records[start..end]
  }

  pub fn frame_count(&self, config: &FrameConfig) -> usize { frame::frame_count(self, config) }

  pub fn frames<'a>(&'a self, config: &'a FrameConfig) -> Frames<'a> { Frames::new(self, config) }
}

/// Days since the common era, used as the x coordinate of a timestamp.
pub fn timestamp_to_x(timestamp: Timestamp) -> f64 { f64::from(timestamp.num_days_from_ce()) }

pub fn x_to_timestamp(x: f64) -> Option<Timestamp> {
  NaiveDate::from_num_days_from_ce_opt(x.round() as i32)
}
