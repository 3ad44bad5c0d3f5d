mod common;

use common::*;
use std::path::Path;

#[test]
fn test_defaults() {
    let config = GaugeConfig::default();
    assert_eq!(config.detection.binary_threshold, 140);
    assert_eq!(config.detection.min_radius, 100);
    assert_eq!(config.detection.max_radius, 1000);
    assert_eq!(config.detection.param1, 60.0);
    assert_eq!(config.detection.param2, 30);
    assert_eq!(config.line_detection.hough_threshold, 25);
    assert_eq!(config.line_detection.min_line_length_factor, 0.25);
    assert_eq!(config.line_detection.line_center_distance_factor, 0.125);
    assert_eq!(config.line_detection.angle_grouping_threshold, 10.0);
    assert_eq!(config.pressure, PressureCalibration::default());
    assert_eq!(config.filtering.large_angle_threshold, 200.0);
    assert_eq!(config.paths.default_db_file, Path::new("gauge_data.db"));
}

#[test]
fn test_partial_file_overrides_only_given_keys() -> anyhow::Result<()> {
    let config = GaugeConfig::from_toml_str(
        r#"
[detection]
binary_threshold = 100
min_radius = 40

[pressure]
max_psi = 100.0
"#,
    )?;

    assert_eq!(config.detection.binary_threshold, 100);
    assert_eq!(config.detection.min_radius, 40);
    assert_eq!(config.detection.max_radius, 1000);
    assert_eq!(config.pressure.max_psi, 100.0);
    assert_eq!(config.pressure.max_bar, 4.0);
    assert_eq!(config.line_detection.canny_high, 150.0);
    Ok(())
}

#[test]
fn test_detection_config_carries_sections() -> anyhow::Result<()> {
    let config = GaugeConfig::from_toml_str(
        r#"
[detection]
binary_threshold = 90

[line_detection]
max_line_gap = 5.0

[pressure]
min_angle = 45.0
"#,
    )?;
    let detection = config.detection_config();
    assert_eq!(detection.circle.binary_threshold, 90);
    assert_eq!(detection.lines.max_line_gap, 5.0);
    assert_eq!(detection.pressure.min_angle, 45.0);
    Ok(())
}

#[test]
fn test_malformed_file_is_an_error() {
    assert!(GaugeConfig::from_toml_str("[detection]\nbinary_threshold = \"high\"").is_err());
    assert!(GaugeConfig::from_toml_str("[detection").is_err());
}

#[test]
fn test_load_explicit_path() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let path = dir.path().join("gauge_config.toml");
    std::fs::write(&path, "[filtering]\nlarge_angle_threshold = 250.0\n")?;

    let config = GaugeConfig::load(Some(&path))?;
    assert_eq!(config.filtering.large_angle_threshold, 250.0);
    assert_eq!(config.reporting.default_time_window, 7);
    Ok(())
}

#[test]
fn test_unusable_detection_parameters_are_rejected() {
    for contents in [
        "[detection]\nblur_sigma = 0.0\n",
        "[detection]\nblur_sigma = -1.5\n",
        "[detection]\nmin_radius = 300\nmax_radius = 200\n",
        "[line_detection]\nmax_line_gap = -1.0\n",
    ] {
        assert!(
            GaugeConfig::from_toml_str(contents).is_err(),
            "accepted {:?}",
            contents
        );
    }

    // a non-positive max_radius means "no upper bound"
    let open_ended = GaugeConfig::from_toml_str("[detection]\nmin_radius = 300\nmax_radius = 0\n");
    assert!(open_ended.is_ok());
}

#[test]
fn test_rejected_file_fails_to_load() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let path = dir.path().join("gauge_config.toml");
    std::fs::write(&path, "[detection]\nblur_sigma = 0.0\n")?;

    assert!(GaugeConfig::load(Some(&path)).is_err());
    Ok(())
}

#[test]
fn test_default_detection_config_is_valid() {
    assert!(DetectionConfig::default().validate().is_ok());
    assert!(GaugeConfig::default().detection_config().validate().is_ok());
}
