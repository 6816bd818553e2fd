//! Encoding an animation to disk.
//!
//! [`export`] walks the frames in order, hands each [`Scene`] to a [`Rasterize`]r and passes
//! the pixels on to a [`FrameSink`].

use std::{
  fs::File,
  io::BufWriter,
  path::{Path, PathBuf},
};

use image::{
  Delay, Frame, RgbaImage,
  codecs::gif::{GifEncoder, Repeat as GifRepeat},
};
use log::{debug, info};

use crate::{Error, Result, playback::Repeat, scene::Scene};

/// Turns a scene into pixels.
pub trait Rasterize {
  fn rasterize(&mut self, scene: &Scene) -> Result<RgbaImage>;
}

/// Collects rendered frames, in order.
pub trait FrameSink {
  fn push(&mut self, frame: usize, image: RgbaImage) -> Result<()>;

  fn finish(&mut self) -> Result<()> { Ok(()) }
}

/// Renders every frame exactly once, in ascending order, and returns how many were written.
///
/// Fails with [`Error::FrameOrder`] if the scenes skip, repeat or reorder a frame, e.g. when
/// handed a partially consumed iterator.
pub fn export(
  frames: impl IntoIterator<Item = Scene>,
  rasterizer: &mut impl Rasterize,
  sink: &mut impl FrameSink,
) -> Result<usize> {
  let mut expected = 0;
  for scene in frames {
    if scene.frame != expected {
      return Err(Error::FrameOrder { expected, got: scene.frame });
    }
    let image = rasterizer.rasterize(&scene)?;
    sink.push(scene.frame, image)?;
    debug!("exported frame {}", scene.frame);
    expected += 1;
  }
  sink.finish()?;
  info!("exported {expected} frames");
  Ok(expected)
}

/// Writes an animated GIF.
pub struct GifSink {
  encoder: GifEncoder<BufWriter<File>>,
  delay:   Delay,
}

impl GifSink {
  pub fn create(path: impl AsRef<Path>, fps: u32, repeat: Repeat) -> Result<Self> {
    if fps == 0 {
      return Err(Error::Config("fps must be at least 1".into()));
    }
    let file = File::create(path)?;
    let mut encoder = GifEncoder::new_with_speed(BufWriter::new(file), 10);
    encoder.set_repeat(match repeat {
      Repeat::Loop => GifRepeat::Infinite,
      Repeat::Once => GifRepeat::Finite(0),
    })?;
    Ok(GifSink { encoder, delay: Delay::from_numer_denom_ms(1000, fps) })
  }
}

impl FrameSink for GifSink {
  fn push(&mut self, _frame: usize, image: RgbaImage) -> Result<()> {
    self.encoder.encode_frame(Frame::from_parts(image, 0, 0, self.delay))?;
    Ok(())
  }
}

/// Writes `<prefix><frame>.png` files into a directory.
pub struct PngSequenceSink {
  dir:    PathBuf,
  prefix: String,
}

impl PngSequenceSink {
  pub fn create(dir: impl Into<PathBuf>, prefix: &str) -> Result<Self> {
    let dir = dir.into();
    std::fs::create_dir_all(&dir)?;
    Ok(PngSequenceSink { dir, prefix: prefix.to_string() })
  }

  pub fn frame_path(&self, frame: usize) -> PathBuf {
    self.dir.join(format!("{}{frame:05}.png", self.prefix))
  }
}

impl FrameSink for PngSequenceSink {
  fn push(&mut self, frame: usize, image: RgbaImage) -> Result<()> {
    image.save(self.frame_path(frame))?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::*;
  use crate::{
    config::FrameConfig,
    table::{Record, TimeSeriesTable},
  };

  struct Blank;

  impl Rasterize for Blank {
    fn rasterize(&mut self, _: &Scene) -> Result<RgbaImage> { Ok(RgbaImage::new(2, 2)) }
  }

  #[derive(Default)]
  struct Collect {
    frames:   Vec<usize>,
    finished: bool,
  }

  impl FrameSink for Collect {
    fn push(&mut self, frame: usize, _: RgbaImage) -> Result<()> {
      self.frames.push(frame);
      Ok(())
    }

    fn finish(&mut self) -> Result<()> {
      self.finished = true;
      Ok(())
    }
  }

  fn table() -> TimeSeriesTable {
    let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    TimeSeriesTable::new(
      (0..5).map(|i| Record::new(start + chrono::Days::new(i), i as f64 + 1.0)).collect(),
    )
  }

  #[test]
  fn visits_every_frame_once_in_order() {
    let table = table();
    let config = FrameConfig::cumulative();
    let mut sink = Collect::default();

    let written = export(table.frames(&config), &mut Blank, &mut sink).unwrap();

    assert_eq!(written, 5);
    assert_eq!(sink.frames, [0, 1, 2, 3, 4]);
    assert!(sink.finished);
  }

  #[test]
  fn rejects_partial_sequences() {
    let table = table();
    let config = FrameConfig::cumulative();
    let mut frames = table.frames(&config);
    frames.next();

    let err = export(frames, &mut Blank, &mut Collect::default()).unwrap_err();
    assert!(matches!(err, Error::FrameOrder { expected: 0, got: 1 }));
  }

  #[test]
  fn png_sequence_names() {
    let dir = tempfile::tempdir().unwrap();
    let sink = PngSequenceSink::create(dir.path().join("frames"), "frame_").unwrap();
    assert_eq!(sink.frame_path(12), dir.path().join("frames").join("frame_00012.png"));
  }
}
