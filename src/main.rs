//! Headless storm replay.
//!
//! ```text
//! squall <bundle.json> [--site ID] [--frames-per-index N] [--config FILE]
//!        [--yaw DEG] [--baseline SITE=M]... [--no-anomaly]
//! ```
//!
//! Runs a session over every time step of the bundle at 60 fps of simulated
//! time and logs what the scene looks like at each step. Set `RUST_LOG=debug`
//! for per-step sample details.

use anyhow::{Context, Result};
use clap::Parser;
use squall::prelude::*;
use std::path::PathBuf;

const FRAME_DT: f32 = 1.0 / 60.0;

#[derive(Parser, Debug)]
#[command(name = "squall")]
#[command(about = "Replay a storm bundle through a headless weather session", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Storm bundle JSON file
    pub bundle: PathBuf,

    /// Site to replay (defaults to the first site in the bundle)
    #[arg(short, long)]
    pub site: Option<String>,

    /// Simulated frames per time step
    #[arg(
        short,
        long,
        default_value_t = 60,
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
    )]
    pub frames_per_index: usize,

    /// Session config JSON file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Rotation from data north to world +Z, degrees
    #[arg(long, allow_negative_numbers = true)]
    pub yaw: Option<f32>,

    /// Water level baseline for a site, as SITE=METERS (repeatable)
    #[arg(long = "baseline", value_name = "SITE=M", value_parser = parse_baseline)]
    pub baselines: Vec<(String, f64)>,

    /// Show absolute water levels instead of anomalies
    #[arg(long)]
    pub no_anomaly: bool,
}

impl Cli {
    /// `base` with this command line's calibration flags applied on top.
    pub fn calibration(&self, base: StormConfig) -> StormConfig {
        let mut config = base;
        if self.no_anomaly {
            config = config.anomaly(false);
        }
        for (site, meters) in &self.baselines {
            config = config.baseline(site.clone(), *meters);
        }
        if let Some(yaw) = self.yaw {
            config = config.world_yaw(yaw);
        }
        config
    }
}

fn parse_baseline(arg: &str) -> Result<(String, f64), String> {
    let (site, meters) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected SITE=METERS, got `{}`", arg))?;
    let site = site.trim();
    if site.is_empty() {
        return Err(format!("missing site id in `{}`", arg));
    }
    let meters: f64 = meters
        .trim()
        .parse()
        .map_err(|e| format!("bad baseline `{}`: {}", meters, e))?;
    if !meters.is_finite() {
        return Err(format!("baseline for {} must be finite", site));
    }
    Ok((site.to_string(), meters))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => SessionConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => SessionConfig::default(),
    };
    let storm = open_storm(&cli, &config)?;

    replay(&storm, config, cli.frames_per_index);
    Ok(())
}

fn open_storm(cli: &Cli, config: &SessionConfig) -> Result<StormData> {
    let mut storm = StormData::load(&cli.bundle)
        .with_context(|| format!("failed to load storm bundle {}", cli.bundle.display()))?;
    if let Some(site) = &cli.site {
        storm.select_site(site).with_context(|| {
            let known: Vec<&str> = storm.site_ids().collect();
            format!("available sites: {}", known.join(", "))
        })?;
    }
    storm.set_config(cli.calibration(config.storm.clone()));
    Ok(storm)
}

fn replay(storm: &StormData, config: SessionConfig, frames_per_index: usize) {
    let site = storm.site();
    log::info!(
        "replaying site {} ({:.3}, {:.3}), {} steps x {} frames, yaw {:.1}°, anomaly {}",
        site.id,
        site.lat,
        site.lon,
        storm.len(),
        frames_per_index,
        storm.world_yaw_deg(),
        storm.use_anomaly()
    );

    let mut session = StormSession::new(config);
    let mut clock = FrameClock::default();
    clock.set_fixed_delta(Some(FRAME_DT));
    let ground = GroundPlane::new(session.config().default_floor);
    let mut poses = PoseBuffer::new();

    for index in 0..storm.len() {
        let mut hits = 0;
        for _ in 0..frames_per_index {
            let report = session.tick(&mut clock, storm.frame_input(index), storm, &ground);
            hits += report.rain.hits;
        }
        session.publish(&mut poses);

        log::info!(
            "t={} rain {:5.1} mm/h: {:4} drops, {:4} hits, {:3} splashes, water {:+.2} m, fog {:.2}",
            storm.time_utc(index),
            session.sample().rain_mm_per_hour,
            session.rain().active_count(),
            hits,
            poses.visible_count(ProxyLayer::Splash),
            session.water().height(),
            session.fog().alpha()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use squall::storm::NEW_ORLEANS_SITE;

    const BUNDLE: &str = r#"{
        "time_utc": [0, 3600],
        "sites": [
            {
                "id": "grand_isle", "lat": 29.26, "lon": -89.96,
                "zeta_m": [0.4, 0.9], "rain_mm_h": [12.0, 30.0],
                "wind_speed_mps": [18.0, 27.0], "wind_dir_deg": [90.0, 90.0]
            },
            {
                "id": "new_orleans_french_quarter", "lat": 29.96, "lon": -90.06,
                "zeta_m": [7.5, 8.25], "rain_mm_h": [20.0, 40.0],
                "wind_speed_mps": [15.0, 25.0], "wind_dir_deg": [90.0, 90.0]
            }
        ]
    }"#;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["squall", "storm.json"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    fn storm(cli: &Cli, site: &str) -> StormData {
        let mut storm = StormData::from_json_str(BUNDLE).unwrap();
        storm.select_site(site).unwrap();
        storm.set_config(cli.calibration(StormConfig::default()));
        storm
    }

    fn bearing_after_one_frame(storm: &StormData) -> f32 {
        let mut session = StormSession::new(SessionConfig::default().seed(1));
        let ground = GroundPlane::new(0.0);
        session.step(FRAME_DT, storm.frame_input(0), storm, &ground);
        session.rain().params().bearing_deg
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&[]);
        assert_eq!(cli.bundle, PathBuf::from("storm.json"));
        assert_eq!(cli.site, None);
        assert_eq!(cli.frames_per_index, 60);
        assert_eq!(cli.config, None);
        assert_eq!(cli.yaw, None);
        assert!(cli.baselines.is_empty());
        assert!(!cli.no_anomaly);
        assert_eq!(cli.calibration(StormConfig::default()), StormConfig::default());
    }

    #[test]
    fn test_all_flags_parse() {
        let cli = parse(&[
            "--site",
            "grand_isle",
            "--frames-per-index",
            "10",
            "--config",
            "session.json",
            "--yaw",
            "-30",
            "--baseline",
            "grand_isle=0.25",
            "--baseline",
            "levee=1.5",
            "--no-anomaly",
        ]);
        assert_eq!(cli.site.as_deref(), Some("grand_isle"));
        assert_eq!(cli.frames_per_index, 10);
        assert_eq!(cli.config, Some(PathBuf::from("session.json")));
        assert_eq!(cli.yaw, Some(-30.0));
        assert_eq!(
            cli.baselines,
            vec![("grand_isle".to_string(), 0.25), ("levee".to_string(), 1.5)]
        );
        assert!(cli.no_anomaly);
    }

    #[test]
    fn test_rejects_bad_arguments() {
        assert!(Cli::try_parse_from(["squall"]).is_err());
        assert!(Cli::try_parse_from(["squall", "s.json", "--frames-per-index", "0"]).is_err());
        assert!(Cli::try_parse_from(["squall", "s.json", "--frames-per-index", "many"]).is_err());
        assert!(Cli::try_parse_from(["squall", "s.json", "--baseline", "levee"]).is_err());
        assert!(Cli::try_parse_from(["squall", "s.json", "--baseline", "=1.0"]).is_err());
        assert!(Cli::try_parse_from(["squall", "s.json", "--baseline", "levee=high"]).is_err());
        assert!(Cli::try_parse_from(["squall", "s.json", "--baseline", "levee=inf"]).is_err());
    }

    #[test]
    fn test_parse_baseline() {
        assert_eq!(parse_baseline("levee=1.5"), Ok(("levee".to_string(), 1.5)));
        assert_eq!(parse_baseline(" levee = -0.5 "), Ok(("levee".to_string(), -0.5)));
        assert!(parse_baseline("levee:1.5").is_err());
    }

    #[test]
    fn test_french_quarter_baseline_ships_by_default() {
        let storm = storm(&parse(&[]), NEW_ORLEANS_SITE);
        assert!((storm.water_level(0) - 0.5).abs() < 1e-9);
        assert!((storm.water_level(1) - 1.25).abs() < 1e-9);
    }

    #[test]
    fn test_no_anomaly_shows_absolute_levels() {
        let storm = storm(&parse(&["--no-anomaly"]), NEW_ORLEANS_SITE);
        assert!(!storm.use_anomaly());
        assert!((storm.water_level(0) - 7.5).abs() < 1e-9);
    }

    #[test]
    fn test_baseline_flag_sets_site_baseline() {
        let cli = parse(&["--baseline", "grand_isle=0.25"]);
        let isle = storm(&cli, "grand_isle");
        assert!((isle.water_level(1) - 0.65).abs() < 1e-9);
        assert!((storm(&parse(&[]), "grand_isle").water_level(1) - 0.9).abs() < 1e-9);

        let cli = parse(&["--baseline", "new_orleans_french_quarter=7.25"]);
        let quarter = storm(&cli, NEW_ORLEANS_SITE);
        assert!((quarter.water_level(0) - 0.25).abs() < 1e-9);

        // Without anomaly mode baselines are ignored.
        let cli = parse(&["--baseline", "grand_isle=0.25", "--no-anomaly"]);
        assert!((storm(&cli, "grand_isle").water_level(1) - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_yaw_flag_rotates_rain_bearing() {
        // Wind from the east moves rain west.
        let plain = storm(&parse(&[]), "grand_isle");
        assert_eq!(plain.frame_input(0).world_yaw_deg, 0.0);
        assert_eq!(bearing_after_one_frame(&plain), 270.0);

        let yawed = storm(&parse(&["--yaw", "45"]), "grand_isle");
        assert_eq!(yawed.frame_input(1).world_yaw_deg, 45.0);
        assert_eq!(bearing_after_one_frame(&yawed), 315.0);

        let negative = storm(&parse(&["--yaw", "-90"]), "grand_isle");
        assert_eq!(bearing_after_one_frame(&negative), 180.0);
    }

    #[test]
    fn test_flags_override_config_calibration() {
        let base = StormConfig::default().anomaly(true).world_yaw(10.0).baseline("levee", 1.0);
        let cli = parse(&["--baseline", "levee=2.0"]);
        let merged = cli.calibration(base.clone());
        assert_eq!(merged.world_yaw_deg, 10.0);
        assert_eq!(merged.baselines["levee"], 2.0);
        assert_eq!(merged.baselines[NEW_ORLEANS_SITE], 7.0);

        let merged = parse(&["--yaw", "5", "--no-anomaly"]).calibration(base);
        assert_eq!(merged.world_yaw_deg, 5.0);
        assert!(!merged.use_anomaly);
    }

    #[test]
    fn test_unknown_site_lists_known_ids() {
        let path = std::env::temp_dir().join(format!("squall-cli-{}.json", std::process::id()));
        std::fs::write(&path, BUNDLE).unwrap();
        let cli = Cli::try_parse_from([
            "squall",
            path.to_str().unwrap(),
            "--site",
            "atlantis",
        ])
        .unwrap();
        let err = open_storm(&cli, &SessionConfig::default()).unwrap_err();
        let _ = std::fs::remove_file(&path);
        let message = format!("{:#}", err);
        assert!(message.contains("grand_isle, new_orleans_french_quarter"), "{}", message);
        assert!(message.contains("atlantis"), "{}", message);
    }
}
