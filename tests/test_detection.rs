//! Full needle reading, on synthetic images and with scripted primitives.

mod common;

use common::*;
use gaugewatch::debug::{DebugSink, DebugWriter};
use gaugewatch::detection::circles::CircleSearch;
use gaugewatch::detection::lines::SegmentSearch;
use gaugewatch::detection::vision::Vision;
use gaugewatch::detection::{self, GaugeDetector};
use gaugewatch::timestamp::FixedClock;
use image::{DynamicImage, GrayImage, Luma};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};
use std::sync::{Arc, Mutex};
use time::macros::datetime;

/// Vision stub returning fixed circles and segments
struct ScriptedVision {
    circles: Vec<Circle>,
    segments: Vec<LineSegment>,
}

impl Vision for ScriptedVision {
    fn blur(&self, gray: &GrayImage, _sigma: f32) -> GrayImage {
        gray.clone()
    }

    fn detect_circles(&self, _blurred: &GrayImage, _search: &CircleSearch) -> Vec<Circle> {
        self.circles.clone()
    }

    fn detect_edges(&self, img: &GrayImage, _low: f32, _high: f32) -> GrayImage {
        img.clone()
    }

    fn detect_segments(&self, _edges: &GrayImage, _search: &SegmentSearch) -> Vec<LineSegment> {
        self.segments.clone()
    }
}

#[derive(Default)]
struct RecordingSink {
    stages: Mutex<Vec<String>>,
}

impl DebugSink for RecordingSink {
    fn save(&self, _identifier: &str, stage: &str, _image: &DynamicImage) -> anyhow::Result<()> {
        self.stages.lock().unwrap().push(stage.to_string());
        Ok(())
    }
}

struct FailingSink;

impl DebugSink for FailingSink {
    fn save(&self, _identifier: &str, _stage: &str, _image: &DynamicImage) -> anyhow::Result<()> {
        anyhow::bail!("disk full")
    }
}

fn gauge_circle() -> Circle {
    Circle {
        center: Point::new(100, 100),
        radius: 50,
        votes: 100,
    }
}

fn scripted(circles: Vec<Circle>, segments: Vec<LineSegment>) -> GaugeDetector {
    GaugeDetector::new()
        .with_vision(Arc::new(ScriptedVision { circles, segments }))
        .with_clock(Arc::new(FixedClock(datetime!(2025-01-01 12:00))))
}

#[test]
fn test_reads_vertical_needle() -> anyhow::Result<()> {
    let config = small_gauge_config();
    let reading = detection::detect(&gauge_image(), "dial_240315_0930.png", &config)?;

    assert!((reading.angle() - 270.0).abs() <= 2.0, "angle {}", reading.angle());
    assert!((reading.center().x - 100).abs() <= 2, "center {:?}", reading.center());
    assert!((reading.center().y - 100).abs() <= 2, "center {:?}", reading.center());
    assert!((reading.radius() - 50).abs() <= 2, "radius {}", reading.radius());
    assert_eq!(reading.timestamp(), datetime!(2024-03-15 09:30));
    assert_eq!(reading.image_name(), "dial_240315_0930.png");

    let psi = reading.pressure_psi().unwrap();
    assert!(psi > 50.0 && psi < 55.0, "psi {}", psi);
    assert!(reading.pressure_bar().is_some());
    Ok(())
}

#[test]
fn test_reads_one_pixel_needle() -> anyhow::Result<()> {
    let mut img = GrayImage::new(200, 200);
    draw_filled_circle_mut(&mut img, (100, 100), 50, Luma([255u8]));
    draw_line_segment_mut(&mut img, (100.0, 100.0), (100.0, 50.0), Luma([0u8]));

    let reading = detection::detect(
        &DynamicImage::ImageLuma8(img),
        "dial_240315_0930.png",
        &small_gauge_config(),
    )?;
    assert!((reading.angle() - 270.0).abs() <= 2.0, "angle {}", reading.angle());
    Ok(())
}

#[test]
fn test_non_positive_blur_does_not_panic() {
    let mut config = small_gauge_config();
    for sigma in [0.0, -2.0] {
        config.circle.blur_sigma = sigma;
        assert!(config.validate().is_err());
        // a config built in code bypasses validation; detection still returns
        let _ = detection::detect(&gauge_image(), "dial.png", &config);
        let blank = detection::detect(&blank_image(), "blank.png", &config);
        assert!(matches!(blank, Err(DetectionFailure::NoGaugeFound)));
    }
}

#[test]
fn test_no_circle_leaves_history_unchanged() {
    let mut history = History::new();
    history.append(make_reading("before.jpg", 120.0, datetime!(2024-01-01 08:00)));

    let result = detection::detect(&blank_image(), "blank_240101_0900.png", &small_gauge_config());
    assert!(matches!(result, Err(DetectionFailure::NoGaugeFound)));
    if let Ok(reading) = result {
        history.append(reading);
    }
    assert_eq!(history.len(), 1);
}

#[test]
fn test_unreadable_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("broken.jpg");
    std::fs::write(&path, b"not an image").unwrap();

    let result = GaugeDetector::new().detect_path(&path, &small_gauge_config());
    match result {
        Err(DetectionFailure::ImageUnreadable { path: failed, .. }) => assert_eq!(failed, path),
        other => panic!("expected ImageUnreadable, got {:?}", other),
    }

    let missing = dir.path().join("missing.jpg");
    assert!(matches!(
        GaugeDetector::new().detect_path(&missing, &small_gauge_config()),
        Err(DetectionFailure::ImageUnreadable { .. })
    ));
}

#[test]
fn test_no_segments_is_no_lines_found() {
    let detector = scripted(vec![gauge_circle()], vec![]);
    let result = detector.detect(&blank_image(), "x.png", &DetectionConfig::default());
    assert!(matches!(result, Err(DetectionFailure::NoLinesFound)));
}

#[test]
fn test_segments_away_from_center_are_no_valid_lines() {
    let detector = scripted(
        vec![gauge_circle()],
        vec![LineSegment::new(60, 60, 140, 60), LineSegment::new(130, 60, 130, 140)],
    );
    let result = detector.detect(&blank_image(), "x.png", &DetectionConfig::default());
    assert!(matches!(result, Err(DetectionFailure::NoValidLines)));
}

#[test]
fn test_strongest_circle_is_used() {
    let weaker = Circle {
        center: Point::new(20, 20),
        radius: 10,
        votes: 40,
    };
    let detector = scripted(vec![gauge_circle(), weaker], vec![LineSegment::new(100, 100, 150, 100)]);
    let reading = detector.detect(&blank_image(), "x.png", &DetectionConfig::default()).unwrap();
    assert_eq!(reading.center(), Point::new(100, 100));
    assert_eq!(reading.radius(), 50);
    assert!(reading.angle().abs() < 1e-9);
}

#[test]
fn test_scripted_needle_and_clock_fallback() {
    let detector = scripted(
        vec![gauge_circle()],
        vec![
            LineSegment::new(100, 98, 100, 52),
            LineSegment::new(101, 100, 101, 55),
            // off-center
            LineSegment::new(60, 60, 140, 60),
        ],
    );
    let reading = detector
        .detect(&blank_image(), "camera/no_timestamp.png", &DetectionConfig::default())
        .unwrap();

    assert!((reading.angle() - 270.0).abs() < 1e-9);
    assert_eq!(reading.timestamp(), datetime!(2025-01-01 12:00));
    assert_eq!(reading.image_path(), "camera/no_timestamp.png");
}

#[test]
fn test_pressures_follow_calibration() {
    let detector = scripted(vec![gauge_circle()], vec![LineSegment::new(100, 100, 50, 100)]);
    let mut config = DetectionConfig::default();
    config.pressure = PressureCalibration {
        min_angle: 0.0,
        max_angle: 360.0,
        max_psi: 100.0,
        max_bar: 8.0,
    };
    let reading = detector.detect(&blank_image(), "x.png", &config).unwrap();
    assert!((reading.angle() - 180.0).abs() < 1e-9);
    assert_eq!(reading.pressure_psi(), Some(50.0));
    assert_eq!(reading.pressure_bar(), Some(4.0));
}

#[test]
fn test_debug_sink_sees_every_stage() {
    let sink = Arc::new(RecordingSink::default());
    let detector = scripted(vec![gauge_circle()], vec![LineSegment::new(100, 100, 100, 50)])
        .with_debug(sink.clone());
    detector
        .detect(&blank_image(), "x.png", &DetectionConfig::default())
        .unwrap();

    let stages = sink.stages.lock().unwrap().clone();
    assert_eq!(stages, ["1_binary", "2_all_lines", "result"]);
}

#[test]
fn test_debug_sink_failure_does_not_fail_detection() {
    let detector = scripted(vec![gauge_circle()], vec![LineSegment::new(100, 100, 100, 50)])
        .with_debug(Arc::new(FailingSink));
    assert!(
        detector
            .detect(&blank_image(), "x.png", &DetectionConfig::default())
            .is_ok()
    );
}

#[test]
fn test_debug_writer_creates_side_files() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let debug_dir = dir.path().join("debug").join("nested");
    let writer = DebugWriter::new(&debug_dir)?;
    assert!(debug_dir.is_dir());
    assert_eq!(
        writer.artifact_path("images/dial_240315_0930.png", "result"),
        debug_dir.join("dial_240315_0930.png_result.png")
    );

    let detector = GaugeDetector::new().with_debug(Arc::new(writer));
    detector.detect(&gauge_image(), "dial_240315_0930.png", &small_gauge_config())?;

    for stage in ["1_binary", "2_all_lines", "result"] {
        let path = debug_dir.join(format!("dial_240315_0930.png_{}.png", stage));
        assert!(path.is_file(), "missing {}", path.display());
    }
    Ok(())
}
