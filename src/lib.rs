//! Animated charts from time-series tables.
//!
//! A [`TimeSeriesTable`] is loaded from delimited text (see [`load`]), then turned into one
//! [`Scene`] per frame by [`frame::render`]. Scenes are plain values: show them in a window with
//! [`Animation::show`], or encode them with [`Animation::save_gif`] and friends.
//!
//! ```no_run
//! use neilanim::{Animation, AnimationConfig, load};
//!
//! let source = load::CsvSource::new(
//!   "data/AMD.csv",
//!   load::TimestampColumns::date("Date", "%m/%d/%Y"),
//!   "Close/Last",
//! );
//! let table = load::load_table(&source, None)?;
//! Animation::new(&table, AnimationConfig::default()).show()?;
//! # Ok::<(), neilanim::Error>(())
//! ```

use std::path::Path;

use log::warn;

pub mod bounds;
pub mod config;
mod error;
pub mod export;
pub mod frame;
pub mod icons;
pub mod load;
pub mod playback;
pub mod render;
pub mod scene;
pub mod table;
pub mod theme;

pub use config::{AnimationConfig, Chrome, FrameConfig};
pub use error::{Error, Result};
pub use frame::{Frames, render};
pub use icons::IconCache;
pub use scene::Scene;
pub use table::{Record, TimeSeriesTable, Timestamp};

use crate::{
  export::{GifSink, PngSequenceSink},
  render::{texture::GpuRasterizer, window},
};

/// Logs non-fatal errors instead of propagating them.
pub trait ResultExt<T> {
  fn log_err(self) -> Option<T>;
}

impl<T> ResultExt<T> for Result<T> {
  fn log_err(self) -> Option<T> {
    match self {
      Ok(value) => Some(value),
      Err(e) => {
        warn!("{e}");
        None
      }
    }
  }
}

/// A table plus everything needed to play or export it.
pub struct Animation<'a> {
  table:  &'a TimeSeriesTable,
  config: AnimationConfig,
  icons:  IconCache,
}

impl<'a> Animation<'a> {
  pub fn new(table: &'a TimeSeriesTable, config: AnimationConfig) -> Self {
    Animation { table, config, icons: IconCache::new() }
  }

  pub fn icons(mut self, icons: IconCache) -> Self {
    self.icons = icons;
    self
  }

  pub fn frames(&self) -> Frames<'_> { self.table.frames(&self.config.frame) }

  /// Plays the animation in a window until it is closed.
  pub fn show(&self) -> Result<()> {
    self.config.validate()?;
    let output = &self.config.output;
    window::play(
      self.frames(),
      &self.config.playback.playback(),
      &self.config.chrome,
      &self.icons,
      (output.width, output.height),
    )
  }

  /// Writes an animated GIF, returning the number of frames.
  pub fn save_gif(&self, path: impl AsRef<Path>) -> Result<usize> {
    self.config.validate()?;
    let output = &self.config.output;
    let mut sink = GifSink::create(path, output.fps, self.config.playback.repeat)?;
    let mut rasterizer = self.rasterizer()?;
    export::export(self.frames(), &mut rasterizer, &mut sink)
  }

  /// Writes `frame_00000.png`, `frame_00001.png`, ... into `dir`.
  pub fn save_png_sequence(&self, dir: impl AsRef<Path>) -> Result<usize> {
    self.config.validate()?;
    let mut sink = PngSequenceSink::create(dir.as_ref(), "frame_")?;
    let mut rasterizer = self.rasterizer()?;
    export::export(self.frames(), &mut rasterizer, &mut sink)
  }

  fn rasterizer(&self) -> Result<GpuRasterizer<'_>> {
    let output = &self.config.output;
    GpuRasterizer::new(output.width, output.height, &self.config.chrome, &self.icons)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn log_err_keeps_values() {
    assert_eq!(Ok::<_, Error>(3).log_err(), Some(3));
    assert_eq!(Err::<i32, _>(Error::MissingJoin("Atlantis".into())).log_err(), None);
  }

  #[test]
  fn animation_frames_follow_config() {
    let date = chrono::NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    let table = TimeSeriesTable::new(vec![
      Record::new(date, 1.0).with_entity("A"),
      Record::new(date, 2.0).with_entity("B"),
    ]);

    let cumulative = Animation::new(&table, AnimationConfig::default());
    assert_eq!(cumulative.frames().len(), 2);

    let config = AnimationConfig { frame: FrameConfig::snapshot(5), ..AnimationConfig::default() };
    assert_eq!(Animation::new(&table, config).frames().len(), 1);
  }
}
