use std::{fs::File, path::Path};

use log::info;
use polars::prelude::*;

use crate::{
  Result,
  load::{CsvSource, TimestampColumns, load_table},
  table::TimeSeriesTable,
};

const SEPARATOR: u8 = b';';
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Loads the cleaned table at `path` if it exists. Otherwise runs `prepare` and stores its
/// result at `path` for the next run.
pub fn load_or_prepare(
  path: impl AsRef<Path>,
  prepare: impl FnOnce() -> Result<TimeSeriesTable>,
) -> Result<TimeSeriesTable> {
  let path = path.as_ref();
  if path.is_file() {
    info!("using cached table {}", path.display());
    return read_cache(path);
  }

  let table = prepare()?;
  write_cache(&table, path)?;
  Ok(table)
}

/// Writes `date;entity;value;code`, one row per record in table order. Values are written
/// with their shortest exact representation so reading them back is lossless.
pub fn write_cache(table: &TimeSeriesTable, path: impl AsRef<Path>) -> Result<()> {
  let path = path.as_ref();
  if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
    std::fs::create_dir_all(parent)?;
  }

  let records = table.records();
  let mut frame = DataFrame::new(vec![
    Column::new(
      "date".into(),
      records.iter().map(|r| r.timestamp.format(DATE_FORMAT).to_string()).collect::<Vec<_>>(),
    ),
    Column::new("entity".into(), records.iter().map(|r| r.entity.clone()).collect::<Vec<_>>()),
    Column::new("value".into(), records.iter().map(|r| r.value.to_string()).collect::<Vec<_>>()),
    Column::new("code".into(), records.iter().map(|r| r.code.clone()).collect::<Vec<_>>()),
  ])?;

  let mut file = File::create(path)?;
  CsvWriter::new(&mut file).include_header(true).with_separator(SEPARATOR).finish(&mut frame)?;
  info!("cached {} records in {}", records.len(), path.display());
  Ok(())
}

pub fn read_cache(path: impl AsRef<Path>) -> Result<TimeSeriesTable> {
  let source = CsvSource::new(path.as_ref(), TimestampColumns::date("date", DATE_FORMAT), "value")
    .separator(SEPARATOR)
    .entity_column("entity")
    .code_column("code");
  load_table(&source, None)
}
