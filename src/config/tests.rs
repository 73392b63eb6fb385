use super::validation::{parse_cutoff, validate_config};
use super::*;
use crate::common::constants::test_constants::*;
use chrono::NaiveTime;
use serial_test::serial;
use std::fs;
use tempfile::tempdir;

fn create_test_config() -> Config {
    Config {
        segments: Some(TEST_SEGMENTS.to_vec()),
        step_delay: Some(TEST_STEP_DELAY),
        hold_duration: Some(TEST_HOLD_DURATION),
        poll_interval: Some(TEST_POLL_INTERVAL),
        latitude: Some(TEST_LATITUDE),
        longitude: Some(TEST_LONGITUDE),
        ..Config::default()
    }
}

fn error_of(config: &Config) -> String {
    format!("{:#}", validate_config(config).unwrap_err())
}

#[test]
#[serial]
fn test_config_load_default_creation() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("stairlight").join("stairlight.toml");

    // Save and restore XDG_CONFIG_HOME
    let original = std::env::var("XDG_CONFIG_HOME").ok();
    unsafe {
        std::env::set_var("XDG_CONFIG_HOME", temp_dir.path());
    }

    let result = Config::load();

    unsafe {
        match original {
            Some(val) => std::env::set_var("XDG_CONFIG_HOME", val),
            None => std::env::remove_var("XDG_CONFIG_HOME"),
        }
    }

    if let Err(e) = &result {
        eprintln!("Config::load() failed: {:?}", e);
    }
    let config = result.unwrap();
    assert!(config_path.exists());

    // The generated file spells out every default
    assert_eq!(config.segments(), DEFAULT_SEGMENTS.to_vec());
    assert_eq!(config.startup_mode().unwrap(), OperatingMode::MotionWhenDark);
    assert_eq!(config.motion_sources().len(), 2);
}

#[test]
fn test_default_config_round_trips_to_defaults() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("stairlight.toml");
    create_default_config(&path).unwrap();

    let loaded = load_from_path(&path).unwrap();
    let empty = Config::default();

    assert_eq!(loaded.segments(), empty.segments());
    assert_eq!(loaded.active_low(), empty.active_low());
    assert_eq!(loaded.driver(), empty.driver());
    assert_eq!(loaded.gpio_root(), empty.gpio_root());
    assert_eq!(loaded.step_delay(), empty.step_delay());
    assert_eq!(loaded.hold_duration(), empty.hold_duration());
    assert_eq!(loaded.poll_interval(), empty.poll_interval());
    assert_eq!(loaded.diagnostic_step_delay(), empty.diagnostic_step_delay());
    assert_eq!(loaded.motion_poll_interval(), empty.motion_poll_interval());
    assert_eq!(loaded.latitude(), empty.latitude());
    assert_eq!(loaded.longitude(), empty.longitude());
    assert_eq!(loaded.cutoff().unwrap(), empty.cutoff().unwrap());
    assert_eq!(loaded.motion_sources(), empty.motion_sources());
}

#[test]
fn test_load_from_path_parses_motion_tables() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("stairlight.toml");
    fs::write(
        &path,
        r#"
segments = [5, 6, 13]
active_low = false
driver = "simulated"
step_delay = 120
cutoff = "22:30"
startup_mode = "dark_then_motion"

[[motion]]
location = "bottom"
pin = 16
"#,
    )
    .unwrap();

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.segments(), vec![5, 6, 13]);
    assert!(!config.active_low());
    assert_eq!(config.driver(), DriverKind::Simulated);
    assert_eq!(config.step_delay(), Duration::from_millis(120));
    assert_eq!(
        config.cutoff().unwrap(),
        NaiveTime::from_hms_opt(22, 30, 0).unwrap()
    );
    assert_eq!(config.startup_mode().unwrap(), OperatingMode::DarkThenMotion);
    assert_eq!(
        config.motion_sources(),
        vec![MotionSourceConfig {
            location: MotionLocation::Bottom,
            pin: 16
        }]
    );
}

#[test]
fn test_empty_motion_list_disables_sensors() {
    let config: Config = toml::from_str("motion = []").unwrap();
    assert!(config.motion_sources().is_empty());
    assert!(validate_config(&config).is_ok());
}

#[test]
fn test_unknown_key_is_rejected() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("stairlight.toml");
    fs::write(&path, "step_dealy = 100\n").unwrap();

    let err = format!("{:#}", load_from_path(&path).unwrap_err());
    assert!(err.contains("step_dealy"), "{err}");
}

#[test]
fn test_load_from_missing_path_does_not_create_file() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("absent.toml");

    assert!(load_from_path(&path).is_err());
    assert!(!path.exists());
}

#[test]
fn test_config_validation_basic() {
    assert!(validate_config(&create_test_config()).is_ok());
    assert!(validate_config(&Config::default()).is_ok());
}

#[test]
fn test_config_validation_segments() {
    let mut config = create_test_config();
    config.segments = Some(vec![]);
    assert!(error_of(&config).contains("at least one"));

    config.segments = Some(vec![17, 18, 17]);
    assert!(error_of(&config).contains("GPIO 17 more than once"));

    config.segments = Some((0..=MAXIMUM_SEGMENTS as u32).collect());
    assert!(error_of(&config).contains("at most"));

    config.segments = Some((0..MAXIMUM_SEGMENTS as u32).map(|p| p + 100).collect());
    assert!(validate_config(&config).is_ok());
}

#[test]
fn test_config_validation_timing_limits() {
    let mut config = create_test_config();
    config.step_delay = Some(0);
    assert!(error_of(&config).contains("step_delay"));

    config.step_delay = Some(MAXIMUM_STEP_DELAY);
    assert!(validate_config(&config).is_ok());

    config.hold_duration = Some(MAXIMUM_HOLD_DURATION + 1);
    assert!(error_of(&config).contains("hold_duration"));

    config.hold_duration = Some(MINIMUM_HOLD_DURATION);
    config.poll_interval = Some(MINIMUM_POLL_INTERVAL - 1);
    assert!(error_of(&config).contains("poll_interval"));

    config.poll_interval = None;
    config.motion_poll_interval = Some(MAXIMUM_MOTION_POLL_INTERVAL + 1);
    assert!(error_of(&config).contains("motion_poll_interval"));
}

#[test]
fn test_config_validation_coordinates() {
    let mut config = create_test_config();
    config.latitude = Some(90.5);
    assert!(error_of(&config).contains("latitude"));

    config.latitude = Some(-90.0);
    config.longitude = Some(-180.5);
    assert!(error_of(&config).contains("longitude"));
}

#[test]
fn test_config_validation_startup_mode() {
    let mut config = create_test_config();
    config.startup_mode = Some("party".to_string());
    let err = error_of(&config);
    assert!(err.contains("startup_mode"), "{err}");
    assert!(err.contains("always-on-when-dark"), "{err}");
}

#[test]
fn test_config_validation_cutoff() {
    let mut config = create_test_config();
    config.cutoff = Some("25:00".to_string());
    assert!(error_of(&config).contains("cutoff"));

    config.cutoff = Some("late".to_string());
    assert!(validate_config(&config).is_err());

    config.cutoff = Some("00:15".to_string());
    assert!(validate_config(&config).is_ok());
}

#[test]
fn test_parse_cutoff_formats() {
    assert_eq!(
        parse_cutoff("23:00").unwrap(),
        NaiveTime::from_hms_opt(23, 0, 0).unwrap()
    );
    assert_eq!(
        parse_cutoff(" 06:30:15 ").unwrap(),
        NaiveTime::from_hms_opt(6, 30, 15).unwrap()
    );
    assert!(parse_cutoff("6pm").is_err());
}

#[test]
fn test_config_validation_motion_sources() {
    let mut config = create_test_config();
    config.motion = Some(vec![
        MotionSourceConfig {
            location: MotionLocation::Top,
            pin: 21,
        },
        MotionSourceConfig {
            location: MotionLocation::Top,
            pin: 20,
        },
    ]);
    assert!(error_of(&config).contains("location 'top'"));

    config.motion = Some(vec![
        MotionSourceConfig {
            location: MotionLocation::Top,
            pin: 21,
        },
        MotionSourceConfig {
            location: MotionLocation::Bottom,
            pin: 21,
        },
    ]);
    assert!(error_of(&config).contains("more than once"));
}

#[test]
fn test_motion_pin_must_not_be_a_segment() {
    let mut config = create_test_config();
    config.motion = Some(vec![MotionSourceConfig {
        location: MotionLocation::Bottom,
        pin: TEST_SEGMENTS[0],
    }]);
    assert!(error_of(&config).contains("also listed in segments"));

    // Default sensor pins collide with a custom segment list too
    config.motion = None;
    config.segments = Some(vec![DEFAULT_TOP_MOTION_PIN, 3]);
    assert!(error_of(&config).contains("also listed in segments"));
}
