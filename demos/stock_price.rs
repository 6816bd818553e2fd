use neilanim::{
  Animation, AnimationConfig, Chrome, FrameConfig,
  config::XAxis,
  load::{self, CsvSource, TimestampColumns},
};

fn main() -> neilanim::Result<()> {
  env_logger::init();

  let mut args = std::env::args().skip(1);
  let path = args.next().unwrap_or_else(|| "historical_data.csv".to_string());
  let trailing = args.any(|arg| arg == "--trailing");

  let source = CsvSource::new(path, TimestampColumns::date("Date", "%m/%d/%Y"), "Close/Last");
  let table = load::load_table(&source, None)?;

  // The trailing window follows the newest prices, so each point gets a marker.
  let frame = if trailing {
    FrameConfig::cumulative().x_axis(XAxis::Trailing { buffer: 0.1 }).markers()
  } else {
    FrameConfig::cumulative()
  };

  let config = AnimationConfig {
    frame,
    chrome: Chrome::new("Stock Price Over Time").x_label("Date").y_label("Price ($)"),
    ..AnimationConfig::default()
  };

  Animation::new(&table, config).show()
}
