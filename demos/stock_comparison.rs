use neilanim::{
  Animation, AnimationConfig, Chrome, FrameConfig, TimeSeriesTable,
  config::{PlaybackConfig, YAxis},
  load::{self, CsvSource, TimestampColumns},
  playback::Repeat,
};

const STOCKS: [(&str, &str); 3] = [("AMD", "amd.csv"), ("NVIDIA", "nvidia.csv"), ("INTEL", "intel.csv")];

fn main() -> neilanim::Result<()> {
  env_logger::init();

  let dir = std::env::args().nth(1).unwrap_or_else(|| ".".to_string());
  let output = std::env::args().nth(2).unwrap_or_else(|| "animation.gif".to_string());

  let load_column = |column: &str| {
    let tables = STOCKS
      .iter()
      .map(|(name, file)| {
        let source = CsvSource::new(
          std::path::Path::new(&dir).join(file),
          TimestampColumns::date("Date", "%m/%d/%Y"),
          column,
        )
        .entity_literal(name);
        load::load_table(&source, None)
      })
      .collect::<neilanim::Result<Vec<_>>>()?;
    Ok::<_, neilanim::Error>(TimeSeriesTable::concat(tables))
  };
  let table = load_column("Close/Last")?;

  // The shared axis spans the intraday extremes, not just the closing prices.
  let low = load_column("Low")?.value_range();
  let high = load_column("High")?.value_range();
  let y_axis = match (low, high) {
    (Some(low), Some(high)) => YAxis::Fixed { min: low.min * 0.95, max: high.max * 1.05 },
    _ => YAxis::Global,
  };

  let mut config = AnimationConfig {
    frame: FrameConfig::cumulative().y_axis(y_axis),
    playback: PlaybackConfig { interval_ms: 5, repeat: Repeat::Once },
    chrome: Chrome::new("Semiconductor Stock Prices Comparison")
      .x_label("Date")
      .y_label("Price ($)"),
    ..AnimationConfig::default()
  };
  config.output.fps = 60;

  let written = Animation::new(&table, config).save_gif(&output)?;
  println!("wrote {written} frames to {output}");
  Ok(())
}
