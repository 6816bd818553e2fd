use std::time::Duration;

use serde::{Deserialize, Serialize};

/// What happens after the last frame has been shown.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Repeat {
  #[default]
  Loop,
  Once,
}

/// Pacing for interactive playback.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Playback {
  pub interval: Duration,
  pub repeat:   Repeat,
}

impl Default for Playback {
  fn default() -> Self { Playback { interval: Duration::from_millis(50), repeat: Repeat::Loop } }
}

impl Playback {
  pub fn new(interval: Duration, repeat: Repeat) -> Self { Playback { interval, repeat } }

  pub fn cursor(&self, frame_count: usize) -> PlaybackCursor {
    PlaybackCursor { next: 0, frame_count, repeat: self.repeat }
  }
}

/// Hands out frame indices in playback order.
///
/// With [`Repeat::Loop`] the cursor wraps back to frame 0 forever; with [`Repeat::Once`] it
/// stops after the last frame. An empty animation never yields anything.
#[derive(Clone, Debug)]
pub struct PlaybackCursor {
  next:        usize,
  frame_count: usize,
  repeat:      Repeat,
}

impl PlaybackCursor {
  pub fn frame_count(&self) -> usize { self.frame_count }

  pub fn is_finished(&self) -> bool {
    self.frame_count == 0 || (self.repeat == Repeat::Once && self.next >= self.frame_count)
  }
}

impl Iterator for PlaybackCursor {
  type Item = usize;

  fn next(&mut self) -> Option<usize> {
    if self.frame_count == 0 {
      return None;
    }
    if self.next >= self.frame_count {
      match self.repeat {
        Repeat::Loop => self.next = 0,
        Repeat::Once => return None,
      }
    }
    let frame = self.next;
    self.next += 1;
    Some(frame)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn once_stops_after_last_frame() {
    let frames: Vec<_> = Playback::new(Duration::from_millis(600), Repeat::Once).cursor(3).collect();
    assert_eq!(frames, [0, 1, 2]);
  }

  #[test]
  fn loop_wraps_around() {
    let frames: Vec<_> = Playback::default().cursor(3).take(7).collect();
    assert_eq!(frames, [0, 1, 2, 0, 1, 2, 0]);
  }

  #[test]
  fn empty_animation_yields_nothing() {
    let mut cursor = Playback::default().cursor(0);
    assert!(cursor.is_finished());
    assert_eq!(cursor.next(), None);
  }

  #[test]
  fn once_reports_finished() {
    let mut cursor = Playback::new(Duration::from_millis(5), Repeat::Once).cursor(1);
    assert!(!cursor.is_finished());
    assert_eq!(cursor.next(), Some(0));
    assert!(cursor.is_finished());
  }
}
