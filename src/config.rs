//! Animation settings, loadable from JSON.
//!
//! Every field has a default, so a config file only needs to name what it changes:
//!
//! ```json
//! { "frame": { "mode": { "kind": "snapshot", "top_n": 10 } }, "playback": { "interval_ms": 600, "repeat": "once" } }
//! ```

use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  playback::{Playback, Repeat},
};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
  pub frame:    FrameConfig,
  pub playback: PlaybackConfig,
  pub output:   OutputConfig,
  pub chrome:   Chrome,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
  pub mode:     Mode,
  pub x_axis:   XAxis,
  pub y_axis:   YAxis,
  pub bar_axis: BarAxis,
  pub markers:  bool,
}

/// How frames map onto the table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Mode {
  /// Frame `i` reveals every record up to and including position `i`.
  #[default]
  Cumulative,
  /// Frame `i` shows the top `top_n` records at the `i`-th distinct timestamp.
  Snapshot { top_n: usize },
}

/// Horizontal bounds of a cumulative chart.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum XAxis {
  /// The full date range of the table, fixed for every frame.
  #[default]
  Full,
  /// The visible date range, with `buffer` times its span added on the right.
  Trailing { buffer: f64 },
}

/// Vertical bounds of a cumulative chart.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum YAxis {
  /// `min * 0.95 ..= max * 1.05` of the visible values, recomputed per frame.
  #[default]
  Visible,
  /// Same margins, over the whole table.
  Global,
  Fixed { min: f64, max: f64 },
}

/// Value axis of a bar race.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BarAxis {
  #[default]
  Visible,
  Fixed { max: f64 },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
  pub interval_ms: u64,
  pub repeat:      Repeat,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
  pub width:  u32,
  pub height: u32,
  pub fps:    u32,
}

/// Static text around the plot area.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Chrome {
  pub title:   Option<String>,
  pub x_label: Option<String>,
  pub y_label: Option<String>,
}

pub const DEFAULT_TOP_N: usize = 10;

impl Default for PlaybackConfig {
  fn default() -> Self { PlaybackConfig { interval_ms: 50, repeat: Repeat::Loop } }
}

impl Default for OutputConfig {
  fn default() -> Self { OutputConfig { width: 1200, height: 600, fps: 20 } }
}

impl FrameConfig {
  pub fn cumulative() -> Self { FrameConfig::default() }

  pub fn snapshot(top_n: usize) -> Self {
    FrameConfig { mode: Mode::Snapshot { top_n }, ..FrameConfig::default() }
  }

  pub fn x_axis(mut self, x_axis: XAxis) -> Self {
    self.x_axis = x_axis;
    self
  }

  pub fn y_axis(mut self, y_axis: YAxis) -> Self {
    self.y_axis = y_axis;
    self
  }

  pub fn bar_axis(mut self, bar_axis: BarAxis) -> Self {
    self.bar_axis = bar_axis;
    self
  }

  pub fn markers(mut self) -> Self {
    self.markers = true;
    self
  }
}

impl PlaybackConfig {
  pub fn playback(&self) -> Playback {
    Playback { interval: Duration::from_millis(self.interval_ms), repeat: self.repeat }
  }
}

impl Chrome {
  pub fn new(title: &str) -> Self { Chrome { title: Some(title.to_string()), ..Chrome::default() } }

  pub fn x_label(mut self, label: &str) -> Self {
    self.x_label = Some(label.to_string());
    self
  }

  pub fn y_label(mut self, label: &str) -> Self {
    self.y_label = Some(label.to_string());
    self
  }
}

impl AnimationConfig {
  pub fn load(path: impl AsRef<Path>) -> Result<Self> {
    let content = std::fs::read_to_string(path)?;
    Self::from_json(&content)
  }

  pub fn from_json(json: &str) -> Result<Self> {
    let config: AnimationConfig = serde_json::from_str(json)?;
    config.validate()?;
    Ok(config)
  }

  pub fn validate(&self) -> Result<()> {
    if let Mode::Snapshot { top_n: 0 } = self.frame.mode {
      return Err(Error::Config("top_n must be at least 1".into()));
    }
    if let YAxis::Fixed { min, max } = self.frame.y_axis {
      if !(min < max) {
        return Err(Error::Config(format!("fixed y axis {min}..{max} is empty")));
      }
    }
    if let XAxis::Trailing { buffer } = self.frame.x_axis {
      if !(buffer >= 0.0) {
        return Err(Error::Config(format!("trailing buffer {buffer} is negative")));
      }
    }
    if self.output.fps == 0 {
      return Err(Error::Config("fps must be at least 1".into()));
    }
    if self.output.width == 0 || self.output.height == 0 {
      return Err(Error::Config("output size must be non-zero".into()));
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_json_is_default() {
    let config = AnimationConfig::from_json("{}").unwrap();
    assert_eq!(config, AnimationConfig::default());
    assert_eq!(config.playback.playback().interval, Duration::from_millis(50));
  }

  #[test]
  fn parses_bar_race() {
    let config = AnimationConfig::from_json(
      r#"{
        "frame": { "mode": { "kind": "snapshot", "top_n": 10 }, "bar_axis": { "kind": "fixed", "max": 150000.0 } },
        "playback": { "interval_ms": 600, "repeat": "once" },
        "output": { "fps": 5 },
        "chrome": { "title": "Top 10 nationalities", "x_label": "population" }
      }"#,
    )
    .unwrap();

    assert_eq!(config.frame.mode, Mode::Snapshot { top_n: 10 });
    assert_eq!(config.frame.bar_axis, BarAxis::Fixed { max: 150000.0 });
    assert_eq!(config.playback.repeat, Repeat::Once);
    assert_eq!(config.output.fps, 5);
    assert_eq!(config.output.width, 1200);
    assert_eq!(config.chrome.x_label.as_deref(), Some("population"));
  }

  #[test]
  fn rejects_zero_top_n() {
    let err = AnimationConfig::from_json(r#"{ "frame": { "mode": { "kind": "snapshot", "top_n": 0 } } }"#)
      .unwrap_err();
    assert!(matches!(err, Error::Config(_)));
  }

  #[test]
  fn rejects_zero_fps() {
    let err = AnimationConfig::from_json(r#"{ "output": { "fps": 0 } }"#).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
  }

  #[test]
  fn rejects_malformed_json() {
    assert!(matches!(AnimationConfig::from_json("{ frame"), Err(Error::Json(_))));
  }
}
