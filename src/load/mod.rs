//! Reading delimited files into a [`TimeSeriesTable`].
//!
//! Every field is read as text through polars and typed here. That keeps conversion
//! failures precise: a malformed date or price is reported with its row and column rather
//! than as a generic cast error.

use std::{
  collections::HashMap,
  path::{Path, PathBuf},
};

use chrono::NaiveDate;
use log::{debug, info};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  table::{Record, TimeSeriesTable, Timestamp},
};

mod cache;
mod lookup;

pub use cache::{load_or_prepare, read_cache, write_cache};
pub use lookup::Lookup;

/// Where the timestamp of each row comes from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimestampColumns {
  /// A single date column in a strftime `format`, e.g. `%m/%d/%Y`.
  Date { column: String, format: String },
  /// Integer year and month columns.
  YearMonth { year: String, month: String },
  /// An integer year column with the same month for every row.
  Year { column: String, month: u32 },
}

/// Where the entity (series or category name) of each row comes from.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum EntitySource {
  #[default]
  None,
  Column(String),
  /// Every row belongs to the same named series, e.g. one file per stock.
  Literal(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CsvSource {
  pub path:      PathBuf,
  pub separator: u8,
  pub timestamp: TimestampColumns,
  /// The measure column. A leading currency symbol is stripped before parsing.
  pub value:     String,
  pub entity:    EntitySource,
  /// A column that already holds lookup codes, as in a cleaned cache file.
  pub code:      Option<String>,
}

impl CsvSource {
  pub fn new(path: impl Into<PathBuf>, timestamp: TimestampColumns, value: &str) -> Self {
    CsvSource {
      path: path.into(),
      separator: b',',
      timestamp,
      value: value.to_string(),
      entity: EntitySource::None,
      code: None,
    }
  }

  pub fn separator(mut self, separator: u8) -> Self {
    self.separator = separator;
    self
  }

  pub fn entity_column(mut self, column: &str) -> Self {
    self.entity = EntitySource::Column(column.to_string());
    self
  }

  pub fn entity_literal(mut self, name: &str) -> Self {
    self.entity = EntitySource::Literal(name.to_string());
    self
  }

  pub fn code_column(mut self, column: &str) -> Self {
    self.code = Some(column.to_string());
    self
  }

  fn columns(&self) -> Vec<&str> {
    let mut columns = match &self.timestamp {
      TimestampColumns::Date { column, .. } => vec![column.as_str()],
      TimestampColumns::YearMonth { year, month } => vec![year.as_str(), month.as_str()],
      TimestampColumns::Year { column, .. } => vec![column.as_str()],
    };
    columns.push(&self.value);
    if let EntitySource::Column(column) = &self.entity {
      columns.push(column);
    }
    if let Some(column) = &self.code {
      columns.push(column);
    }
    columns
  }
}

impl TimestampColumns {
  pub fn date(column: &str, format: &str) -> Self {
    TimestampColumns::Date { column: column.to_string(), format: format.to_string() }
  }

  pub fn year_month(year: &str, month: &str) -> Self {
    TimestampColumns::YearMonth { year: year.to_string(), month: month.to_string() }
  }

  pub fn year(column: &str, month: u32) -> Self {
    TimestampColumns::Year { column: column.to_string(), month }
  }
}

/// Loads, types and sorts a table. When a lookup is given, every record's entity is joined
/// to a code; misses are logged and leave the code unset.
pub fn load_table(source: &CsvSource, lookup: Option<&Lookup>) -> Result<TimeSeriesTable> {
  let mut records = load_records(source)?;
  if let Some(lookup) = lookup {
    lookup.attach(&mut records);
  }
  info!("loaded {} records from {}", records.len(), source.path.display());
  Ok(TimeSeriesTable::new(records))
}

/// Rows to drop while cleaning a raw dataset. Rows without an entity are always dropped.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Aggregation {
  /// Entities containing any of these substrings are dropped.
  pub exclude_containing: Vec<String>,
  /// Entities equal to any of these are dropped.
  pub exclude:            Vec<String>,
}

impl Aggregation {
  fn keeps(&self, entity: Option<&str>) -> bool {
    let Some(entity) = entity else { return false };
    !self.exclude.iter().any(|e| e == entity)
      && !self.exclude_containing.iter().any(|e| entity.contains(e.as_str()))
  }
}

/// Cleans a raw snapshot dataset: drops rows without an entity or with an excluded one,
/// sums the measure per `(timestamp, entity)` and joins the lookup codes.
///
/// Groups keep the order in which they first appear in the file.
pub fn prepare_snapshot(
  source: &CsvSource,
  aggregation: &Aggregation,
  lookup: Option<&Lookup>,
) -> Result<TimeSeriesTable> {
  let raw = load_records(source)?;
  let raw_len = raw.len();

  let mut groups: HashMap<(Timestamp, Option<String>), usize> = HashMap::new();
  let mut records: Vec<Record> = Vec::new();
  for record in raw.into_iter().filter(|r| aggregation.keeps(r.entity.as_deref())) {
    let key = (record.timestamp, record.entity.clone());
    match groups.get(&key) {
      Some(&i) => records[i].value += record.value,
      None => {
        groups.insert(key, records.len());
        records.push(Record { code: None, ..record });
      }
    }
  }

  if let Some(lookup) = lookup {
    lookup.attach(&mut records);
  }
  info!("aggregated {raw_len} raw rows into {} records", records.len());
  Ok(TimeSeriesTable::new(records))
}

/// Reads only the named columns of a delimited file, every value as text.
pub(crate) fn read_text_frame(path: &Path, separator: u8, columns: &[&str]) -> Result<DataFrame> {
  std::fs::metadata(path)?;

  let mut frame = LazyCsvReader::new(PlPath::new(&path.to_string_lossy()))
    .with_separator(separator)
    .with_has_header(true)
    .with_infer_schema_length(Some(0))
    .finish()?;

  let schema = frame.collect_schema()?;
  if let Some(missing) = columns.iter().find(|c| !schema.contains(c)) {
    return Err(Error::MissingColumn(missing.to_string()));
  }

  Ok(frame.select(columns.iter().map(|c| col(*c)).collect::<Vec<_>>()).collect()?)
}

pub(crate) fn text_values(frame: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
  let column = frame
    .column(name)
    .map_err(|_| Error::MissingColumn(name.to_string()))?
    .cast(&DataType::String)?;
  let values = column.as_materialized_series().str()?;
  Ok(values.into_iter().map(|v| v.map(str::to_string)).collect())
}

fn load_records(source: &CsvSource) -> Result<Vec<Record>> {
  let frame = read_text_frame(&source.path, source.separator, &source.columns())?;
  debug!("read {} rows from {}", frame.height(), source.path.display());

  let timestamps = parse_timestamps(&frame, &source.timestamp)?;
  let values = text_values(&frame, &source.value)?
    .into_iter()
    .enumerate()
    .map(|(row, v)| {
      parse_measure(v.as_deref().unwrap_or_default())
        .ok_or_else(|| parse_error(row, &source.value, v.as_deref(), "not a number"))
    })
    .collect::<Result<Vec<_>>>()?;

  let entities = match &source.entity {
    EntitySource::None => vec![None; frame.height()],
    EntitySource::Column(column) => text_values(&frame, column)?,
    EntitySource::Literal(name) => vec![Some(name.clone()); frame.height()],
  };
  let codes = match &source.code {
    Some(column) => text_values(&frame, column)?,
    None => vec![None; frame.height()],
  };

  Ok(
    timestamps
      .into_iter()
      .zip(values)
      .zip(entities.into_iter().zip(codes))
      .map(|((timestamp, value), (entity, code))| Record { timestamp, value, entity, code })
      .collect(),
  )
}

fn parse_timestamps(frame: &DataFrame, columns: &TimestampColumns) -> Result<Vec<Timestamp>> {
  match columns {
    TimestampColumns::Date { column, format } => text_values(frame, column)?
      .into_iter()
      .enumerate()
      .map(|(row, v)| {
        let text = v.as_deref().unwrap_or_default().trim();
        NaiveDate::parse_from_str(text, format)
          .map_err(|e| parse_error(row, column, v.as_deref(), &e.to_string()))
      })
      .collect(),
    TimestampColumns::YearMonth { year, month } => {
      let years = text_values(frame, year)?;
      let months = text_values(frame, month)?;
      years
        .into_iter()
        .zip(months)
        .enumerate()
        .map(|(row, (y, m))| {
          let y_num = parse_int(y.as_deref())
            .ok_or_else(|| parse_error(row, year, y.as_deref(), "not a year"))?;
          let m_num = parse_int(m.as_deref())
            .ok_or_else(|| parse_error(row, month, m.as_deref(), "not a month"))?;
          first_of_month(y_num, m_num).ok_or_else(|| parse_error(row, month, m.as_deref(), "no such month"))
        })
        .collect()
    }
    TimestampColumns::Year { column, month } => text_values(frame, column)?
      .into_iter()
      .enumerate()
      .map(|(row, v)| {
        parse_int(v.as_deref())
          .and_then(|y| first_of_month(y, i64::from(*month)))
          .ok_or_else(|| parse_error(row, column, v.as_deref(), "not a year"))
      })
      .collect(),
  }
}

fn first_of_month(year: i64, month: i64) -> Option<Timestamp> {
  NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, u32::try_from(month).ok()?, 1)
}

fn parse_int(text: Option<&str>) -> Option<i64> {
  let text = text?.trim();
  // Integer columns sometimes come out of spreadsheets as `2020.0`.
  text.parse::<i64>().ok().or_else(|| {
    let value = text.parse::<f64>().ok()?;
    (value.fract() == 0.0).then_some(value as i64)
  })
}

/// Parses a measure, ignoring a leading currency symbol or code: `$12.50`, `-$3`, `CHF 7.1`.
///
/// At most one sign is accepted, before or after the currency. Non-finite values are
/// rejected.
pub fn parse_measure(text: &str) -> Option<f64> {
  let (outer, text) = split_sign(text.trim());
  let (inner, text) = split_sign(strip_currency(text).trim_start());
  if outer.is_some() && inner.is_some() {
    return None;
  }
  if !text.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
    return None;
  }

  let value: f64 = text.parse().ok()?;
  let value = if outer.or(inner) == Some('-') { -value } else { value };
  value.is_finite().then_some(value)
}

fn split_sign(text: &str) -> (Option<char>, &str) {
  match text.chars().next() {
    Some(sign @ ('-' | '+')) => (Some(sign), &text[1..]),
    _ => (None, text),
  }
}

/// Strips a three letter currency code followed by a space, or a run of currency symbols.
fn strip_currency(text: &str) -> &str {
  let code = text.chars().take_while(char::is_ascii_uppercase).count();
  if code == 3 && text[3..].starts_with(char::is_whitespace) {
    return &text[3..];
  }
  text.trim_start_matches(|c: char| {
    !c.is_alphanumeric() && !c.is_whitespace() && !matches!(c, '-' | '+' | '.')
  })
}

fn parse_error(row: usize, column: &str, value: Option<&str>, reason: &str) -> Error {
  Error::Parse {
    row:    row + 1,
    column: column.to_string(),
    value:  value.unwrap_or_default().to_string(),
    reason: reason.to_string(),
  }
}
