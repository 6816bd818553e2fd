use std::{
  collections::HashMap,
  path::{Path, PathBuf},
};

use image::RgbaImage;
use log::info;

use crate::{Error, Result, ResultExt};

/// Icons are shrunk to fit this box, keeping their aspect ratio.
pub const ICON_SIZE: (u32, u32) = (50, 30);

/// Per-entity icons, keyed by code and loaded once per run.
///
/// An icon that can't be loaded is logged and left out; callers just see `None` for that
/// code and draw everything else.
#[derive(Clone, Debug, Default)]
pub struct IconCache {
  icons: HashMap<String, RgbaImage>,
}

impl IconCache {
  pub fn new() -> Self { IconCache::default() }

  /// Loads `<dir>/<code>.png` for every distinct code.
  pub fn load<'a>(dir: impl AsRef<Path>, codes: impl IntoIterator<Item = &'a str>) -> Self {
    let dir = dir.as_ref();
    let mut cache = IconCache::new();
    for code in codes {
      if cache.icons.contains_key(code) {
        continue;
      }
      if let Some(icon) = load_icon(&icon_path(dir, code), code).log_err() {
        cache.icons.insert(code.to_string(), icon);
      }
    }
    info!("loaded {} icons from {}", cache.len(), dir.display());
    cache
  }

  pub fn get(&self, code: &str) -> Option<&RgbaImage> { self.icons.get(code) }
  pub fn iter(&self) -> impl Iterator<Item = (&str, &RgbaImage)> {
    self.icons.iter().map(|(code, icon)| (code.as_str(), icon))
  }
  pub fn len(&self) -> usize { self.icons.len() }
  pub fn is_empty(&self) -> bool { self.icons.is_empty() }
}

fn icon_path(dir: &Path, code: &str) -> PathBuf { dir.join(format!("{code}.png")) }

fn load_icon(path: &Path, code: &str) -> Result<RgbaImage> {
  let image = image::open(path)
    .map_err(|e| Error::MissingAsset { code: code.to_string(), reason: e.to_string() })?;
  Ok(image.thumbnail(ICON_SIZE.0, ICON_SIZE.1).to_rgba8())
}

#[cfg(test)]
mod tests {
  use image::Rgba;

  use super::*;

  #[test]
  fn missing_icons_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    RgbaImage::from_pixel(100, 60, Rgba([255, 0, 0, 255])).save(dir.path().join("ITA.png")).unwrap();

    let cache = IconCache::load(dir.path(), ["ITA", "DEU", "ITA"]);

    assert_eq!(cache.len(), 1);
    assert!(cache.get("DEU").is_none());
    let icon = cache.get("ITA").unwrap();
    assert_eq!(icon.dimensions(), (50, 30));
  }

  #[test]
  fn missing_asset_is_not_fatal() {
    let err = load_icon(Path::new("/nonexistent/XYZ.png"), "XYZ").unwrap_err();
    assert!(matches!(err, Error::MissingAsset { ref code, .. } if code == "XYZ"));
    assert!(!err.is_fatal());
  }
}
