use std::{
  collections::{HashMap, HashSet},
  path::Path,
};

use log::{info, warn};

use crate::{
  Error, Result,
  load::{read_text_frame, text_values},
  table::Record,
};

/// Maps entity names to short codes, e.g. `"Italien" -> "ITA"`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Lookup {
  codes: HashMap<String, String>,
}

impl Lookup {
  /// Reads the `key` and `value` columns of a delimited file. Rows with either side empty
  /// are ignored.
  pub fn load(path: impl AsRef<Path>, separator: u8, key: &str, value: &str) -> Result<Self> {
    let path = path.as_ref();
    let frame = read_text_frame(path, separator, &[key, value])?;
    let lookup = Lookup::from_pairs(
      text_values(&frame, key)?
        .into_iter()
        .zip(text_values(&frame, value)?)
        .filter_map(|(k, v)| Some((k?, v?))),
    );
    info!("loaded {} lookup codes from {}", lookup.len(), path.display());
    Ok(lookup)
  }

  pub fn from_pairs<K: Into<String>, V: Into<String>>(pairs: impl IntoIterator<Item = (K, V)>) -> Self {
    Lookup { codes: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect() }
  }

  pub fn len(&self) -> usize { self.codes.len() }
  pub fn is_empty(&self) -> bool { self.codes.is_empty() }

  pub fn code(&self, entity: &str) -> Result<&str> {
    self.codes.get(entity).map(String::as_str).ok_or_else(|| Error::MissingJoin(entity.to_string()))
  }

  /// Sets the code of every record that has an entity. Misses are logged once per entity
  /// and leave the code unset.
  pub fn attach(&self, records: &mut [Record]) {
    let mut reported = HashSet::new();
    for record in records.iter_mut() {
      let Some(entity) = record.entity.as_deref() else { continue };
      record.code = match self.code(entity) {
        Ok(code) => Some(code.to_string()),
        Err(e) => {
          if reported.insert(entity.to_string()) {
            warn!("{e}");
          }
          None
        }
      };
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::*;

  #[test]
  fn misses_keep_the_record() {
    let lookup = Lookup::from_pairs([("Italien", "ITA"), ("Deutschland", "DEU")]);
    let date = NaiveDate::from_ymd_opt(2020, 12, 1).unwrap();
    let mut records = vec![
      Record::new(date, 1.0).with_entity("Italien"),
      Record::new(date, 2.0).with_entity("Atlantis"),
      Record::new(date, 3.0).with_entity("Atlantis"),
      Record::new(date, 4.0),
    ];

    lookup.attach(&mut records);

    assert_eq!(records.len(), 4);
    assert_eq!(records[0].code.as_deref(), Some("ITA"));
    assert_eq!(records[1].code, None);
    assert_eq!(records[2].code, None);
    assert_eq!(records[3].code, None);
  }

  #[test]
  fn missing_code_is_a_non_fatal_error() {
    let err = Lookup::default().code("Atlantis").unwrap_err();
    assert!(matches!(err, Error::MissingJoin(ref e) if e == "Atlantis"));
    assert!(!err.is_fatal());
  }
}
