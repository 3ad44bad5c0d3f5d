use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Locations searched, in order, when no explicit config path is given
pub const DEFAULT_CONFIG_LOCATIONS: [&str; 3] = [
    "./gauge_config.toml",
    "~/.config/gauge/config.toml",
    "/etc/gauge/config.toml",
];

/// Full application configuration, one table per concern
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GaugeConfig {
    pub paths: PathsConfig,
    pub detection: CircleConfig,
    pub line_detection: LineConfig,
    pub pressure: PressureCalibration,
    pub reporting: ReportingConfig,
    pub repair: RepairDefaults,
    pub filtering: FilteringConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub default_image_dir: PathBuf,
    pub default_image_pattern: String,
    pub default_debug_dir: PathBuf,
    pub default_db_file: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            default_image_dir: PathBuf::from("dial_images"),
            default_image_pattern: "*.jpg".to_string(),
            default_debug_dir: PathBuf::from("debug"),
            default_db_file: PathBuf::from("gauge_data.db"),
        }
    }
}

/// Gauge face localization and binarization
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CircleConfig {
    pub binary_threshold: u8,
    pub min_radius: i32,
    pub max_radius: i32,
    /// Minimum |change| in degrees flagged as significant by the CLI
    pub change_threshold: f64,
    /// Canny high threshold for the circle search (low is half of it)
    pub param1: f32,
    /// Minimum accumulator votes for a circle
    pub param2: u32,
    pub min_center_distance: f64,
    pub blur_sigma: f32,
}

impl Default for CircleConfig {
    fn default() -> Self {
        Self {
            binary_threshold: 140,
            min_radius: 100,
            max_radius: 1000,
            change_threshold: 5.0,
            param1: 60.0,
            param2: 30,
            min_center_distance: 100.0,
            blur_sigma: 1.7,
        }
    }
}

/// Needle segment extraction, filtering and grouping
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LineConfig {
    pub canny_low: f32,
    pub canny_high: f32,
    pub hough_threshold: u32,
    pub hough_suppression_radius: u32,
    pub min_line_length_factor: f64,
    pub max_line_gap: f64,
    pub line_center_distance_factor: f64,
    pub angle_grouping_threshold: f64,
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            canny_low: 50.0,
            canny_high: 150.0,
            hough_threshold: 25,
            hough_suppression_radius: 8,
            min_line_length_factor: 0.25,
            max_line_gap: 20.0,
            line_center_distance_factor: 0.125,
            angle_grouping_threshold: 10.0,
        }
    }
}

/// Linear angle-to-pressure calibration
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct PressureCalibration {
    pub min_angle: f64,
    pub max_angle: f64,
    pub max_psi: f64,
    pub max_bar: f64,
}

impl Default for PressureCalibration {
    fn default() -> Self {
        Self {
            min_angle: 30.0,
            max_angle: 295.0,
            max_psi: 58.0,
            max_bar: 4.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportingConfig {
    /// Days of history shown by `report` unless `--all-time`
    pub default_time_window: i64,
    pub default_average_period: String,
    pub default_average_value: u32,
    pub default_pressure_unit: String,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            default_time_window: 7,
            default_average_period: "hour".to_string(),
            default_average_value: 1,
            default_pressure_unit: "psi".to_string(),
        }
    }
}

/// Substitutes for unusable geometry found in stored rows
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct RepairDefaults {
    pub default_center_x: i32,
    pub default_center_y: i32,
    pub default_radius: i32,
    pub default_angle: f64,
}

impl Default for RepairDefaults {
    fn default() -> Self {
        Self {
            default_center_x: 320,
            default_center_y: 240,
            default_radius: 200,
            default_angle: 0.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FilteringConfig {
    pub large_angle_threshold: f64,
}

impl Default for FilteringConfig {
    fn default() -> Self {
        Self {
            large_angle_threshold: 200.0,
        }
    }
}

/// Parameters for one detection run.
///
/// Passed by reference into every detection call, so runs with different
/// settings can proceed side by side.
#[derive(Debug, Clone, Default)]
pub struct DetectionConfig {
    pub circle: CircleConfig,
    pub lines: LineConfig,
    pub pressure: PressureCalibration,
}

impl GaugeConfig {
    pub fn detection_config(&self) -> DetectionConfig {
        DetectionConfig {
            circle: self.detection.clone(),
            lines: self.line_detection.clone(),
            pressure: self.pressure,
        }
    }

    /// Load configuration from `path`, or from the first default location that exists.
    ///
    /// Falls back to built-in defaults when no file is found. A file that exists
    /// but does not parse is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path.filter(|p| p.is_file()) {
            return Self::from_file(path);
        }
        if let Some(path) = path {
            warn!("Config file {} not found, searching default locations", path.display());
        }

        for location in DEFAULT_CONFIG_LOCATIONS {
            let candidate = expand_home(location);
            if candidate.is_file() {
                return Self::from_file(&candidate);
            }
        }

        warn!("No configuration file found, using defaults");
        Ok(Self::default())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.detection_config().validate()?;
        Ok(config)
    }
}

impl DetectionConfig {
    /// Reject parameters the image primitives cannot work with
    pub fn validate(&self) -> Result<()> {
        let circle = &self.circle;
        if !(circle.blur_sigma > 0.0 && circle.blur_sigma.is_finite()) {
            bail!("detection.blur_sigma must be positive, got {}", circle.blur_sigma);
        }
        if circle.max_radius > 0 && circle.min_radius > circle.max_radius {
            bail!(
                "detection.min_radius ({}) is larger than detection.max_radius ({})",
                circle.min_radius,
                circle.max_radius
            );
        }
        if self.lines.max_line_gap.is_nan() || self.lines.max_line_gap < 0.0 {
            bail!(
                "line_detection.max_line_gap must not be negative, got {}",
                self.lines.max_line_gap
            );
        }
        Ok(())
    }
}

fn expand_home(location: &str) -> PathBuf {
    if let Some(rest) = location.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")) {
            return Path::new(&home).join(rest);
        }
    }
    PathBuf::from(location)
}
