use gaugewatch::config::DetectionConfig;
use gaugewatch::models::{GaugeReading, LineCandidate, LineSegment, Point};
use image::{DynamicImage, GrayImage, Luma};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut};
use imageproc::rect::Rect;
use std::path::{Path, PathBuf};
use time::PrimitiveDateTime;

pub const GAUGE_CENTER: (i32, i32) = (100, 100);
pub const GAUGE_RADIUS: i32 = 50;

/// 200x200 dark image with a white gauge face at (100, 100), r = 50, and a
/// black needle running from the center straight up to the rim.
pub fn gauge_image() -> DynamicImage {
    let mut img = GrayImage::new(200, 200);
    draw_filled_circle_mut(&mut img, GAUGE_CENTER, GAUGE_RADIUS, Luma([255u8]));
    draw_filled_rect_mut(&mut img, Rect::at(98, 50).of_size(5, 51), Luma([0u8]));
    DynamicImage::ImageLuma8(img)
}

/// Uniform image without any circle
pub fn blank_image() -> DynamicImage {
    DynamicImage::ImageLuma8(GrayImage::from_pixel(200, 200, Luma([128u8])))
}

/// Detection settings scaled down for the 200x200 test images
pub fn small_gauge_config() -> DetectionConfig {
    let mut config = DetectionConfig::default();
    config.circle.min_radius = 30;
    config.circle.max_radius = 80;
    config
}

/// Save `img` as PNG under `dir` and return its path
pub fn write_png(dir: &Path, name: &str, img: &DynamicImage) -> PathBuf {
    let path = dir.join(name);
    img.save_with_format(&path, image::ImageFormat::Png)
        .expect("Failed to save test image");
    path
}

/// Reading with plausible geometry and no pressures
pub fn make_reading(name: &str, angle: f64, timestamp: PrimitiveDateTime) -> GaugeReading {
    GaugeReading::new(angle, Point::new(320, 240), 200, name, timestamp)
}

/// Candidate with the given orientation and direction; the segment is a placeholder
pub fn make_candidate(angle: f64, direction: f64) -> LineCandidate {
    LineCandidate {
        segment: LineSegment::new(0, 0, 10, 0),
        angle,
        direction,
        center_distance: 0.0,
    }
}

/// Fresh database in a temporary directory (keep the directory alive)
pub async fn create_test_db() -> (gaugewatch::core::db::GaugeDb, tempfile::TempDir) {
    let dir = tempfile::TempDir::new().expect("Failed to create temp directory");
    let db = gaugewatch::core::db::GaugeDb::open(dir.path().join("gauge_data.db"))
        .await
        .expect("Failed to open test database");
    (db, dir)
}
