use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A timestamp or measure field could not be converted. Fatal: the load is aborted.
  #[error("row {row}, column `{column}`: cannot parse {value:?} ({reason})")]
  Parse { row: usize, column: String, value: String, reason: String },

  #[error("missing column `{0}`")]
  MissingColumn(String),

  /// An icon asset could not be loaded. The icon is skipped.
  #[error("missing asset for `{code}`: {reason}")]
  MissingAsset { code: String, reason: String },

  /// No lookup code exists for an entity. The record keeps an unset code.
  #[error("no lookup code for `{0}`")]
  MissingJoin(String),

  #[error("frame {frame} is out of range ({count} frames)")]
  FrameOutOfRange { frame: usize, count: usize },

  #[error("frames must be exported in order: expected {expected}, got {got}")]
  FrameOrder { expected: usize, got: usize },

  #[error("invalid configuration: {0}")]
  Config(String),

  #[error("render error: {0}")]
  Render(String),

  #[error(transparent)]
  Io(#[from] std::io::Error),

  #[error(transparent)]
  Polars(#[from] polars::prelude::PolarsError),

  #[error(transparent)]
  Image(#[from] image::ImageError),

  #[error(transparent)]
  Json(#[from] serde_json::Error),
}

impl Error {
  /// Fatal errors abort the run. Everything else degrades a single visual element.
  pub fn is_fatal(&self) -> bool {
    !matches!(self, Error::MissingAsset { .. } | Error::MissingJoin(_))
  }
}

pub type Result<T> = std::result::Result<T, Error>;
