use neilanim::{
  Animation, AnimationConfig, Chrome, FrameConfig, IconCache,
  config::{DEFAULT_TOP_N, PlaybackConfig},
  load::{self, Aggregation, CsvSource, Lookup, TimestampColumns},
  playback::Repeat,
};

const CLEANED: &str = "./data/100126_cleaned.csv";
const COUNTRIES: &str = "./data/countries.csv";
const FLAGS: &str = "./flags";

fn main() -> neilanim::Result<()> {
  env_logger::init();

  let raw = std::env::args().nth(1).unwrap_or_else(|| "./data/100126.csv".to_string());
  let output = std::env::args().nth(2).unwrap_or_else(|| "outputs/population_bs_animation.gif".to_string());

  let table = load::load_or_prepare(CLEANED, || {
    let source = CsvSource::new(&raw, TimestampColumns::year("jahr", 12), "anzahl")
      .separator(b';')
      .entity_column("staatsangehoerigkeit");
    let aggregation = Aggregation {
      exclude_containing: vec!["unbekannt".to_string()],
      exclude:            vec!["Staat unbekannt oder nicht angegeben".to_string()],
    };
    let lookup = Lookup::load(COUNTRIES, b';', "german", "iso3_code")?;
    load::prepare_snapshot(&source, &aggregation, Some(&lookup))
  })?;

  let icons = IconCache::load(FLAGS, table.records().iter().filter_map(|r| r.code.as_deref()));

  let mut config = AnimationConfig {
    frame: FrameConfig::snapshot(DEFAULT_TOP_N),
    playback: PlaybackConfig { interval_ms: 600, repeat: Repeat::Once },
    chrome: Chrome::new("Top 10 nationalities in Basel/Switzerland").x_label("population"),
    ..AnimationConfig::default()
  };
  config.output.fps = 5;

  if let Some(dir) = std::path::Path::new(&output).parent() {
    std::fs::create_dir_all(dir)?;
  }
  let animation = Animation::new(&table, config).icons(icons);
  let written = animation.save_gif(&output)?;
  println!("wrote {written} frames to {output}");

  animation.show()
}
