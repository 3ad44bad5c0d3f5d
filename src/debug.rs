use anyhow::Result;
use image::{DynamicImage, GrayImage, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_circle_mut, draw_line_segment_mut};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::models::{Circle, LineCandidate, Point};

const FACE: Rgb<u8> = Rgb([0, 255, 0]);
const SEGMENT: Rgb<u8> = Rgb([255, 0, 0]);
const NEEDLE: Rgb<u8> = Rgb([0, 0, 255]);

/// Receiver for intermediate images produced while reading a gauge
pub trait DebugSink: Send + Sync {
    /// Persist `image` for the image `identifier` at pipeline `stage`
    fn save(&self, identifier: &str, stage: &str, image: &DynamicImage) -> Result<()>;
}

/// Writes debug images as PNG side files into one directory
#[derive(Debug, Clone)]
pub struct DebugWriter {
    output_dir: PathBuf,
}

impl DebugWriter {
    /// Use `output_dir` for debug images, creating it if needed
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        if !output_dir.exists() {
            std::fs::create_dir_all(&output_dir)?;
        }
        Ok(Self { output_dir })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Side file path for `identifier` at `stage`, e.g. `dial_240101_0930.jpg_result.png`
    pub fn artifact_path(&self, identifier: &str, stage: &str) -> PathBuf {
        let name = Path::new(identifier)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(identifier);
        self.output_dir.join(format!("{}_{}.png", name, stage))
    }
}

impl DebugSink for DebugWriter {
    fn save(&self, identifier: &str, stage: &str, image: &DynamicImage) -> Result<()> {
        let path = self.artifact_path(identifier, stage);
        image
            .save(&path)
            .map_err(|e| anyhow::anyhow!("Failed to save debug image {}: {}", path.display(), e))?;
        debug!("Debug: saved {}", path.display());
        Ok(())
    }
}

/// Source image with the face outline and every candidate segment
pub fn render_candidates(gray: &GrayImage, circle: &Circle, candidates: &[LineCandidate]) -> DynamicImage {
    let mut canvas = base_canvas(gray, circle);
    for candidate in candidates {
        draw_segment(&mut canvas, candidate.segment.start, candidate.segment.end, SEGMENT);
    }
    DynamicImage::ImageRgb8(canvas)
}

/// Source image with the face, the winning group and the needle from center to tip
pub fn render_result(
    gray: &GrayImage,
    circle: &Circle,
    group: &[LineCandidate],
    tip: Point,
) -> DynamicImage {
    let mut canvas = base_canvas(gray, circle);
    for candidate in group {
        draw_segment(&mut canvas, candidate.segment.start, candidate.segment.end, SEGMENT);
    }
    draw_segment(&mut canvas, circle.center, tip, NEEDLE);
    draw_filled_circle_mut(&mut canvas, (tip.x, tip.y), 3, NEEDLE);
    DynamicImage::ImageRgb8(canvas)
}

fn base_canvas(gray: &GrayImage, circle: &Circle) -> RgbImage {
    let mut canvas = DynamicImage::ImageLuma8(gray.clone()).to_rgb8();
    draw_hollow_circle_mut(&mut canvas, (circle.center.x, circle.center.y), circle.radius, FACE);
    canvas
}

fn draw_segment(canvas: &mut RgbImage, from: Point, to: Point, color: Rgb<u8>) {
    draw_line_segment_mut(
        canvas,
        (from.x as f32, from.y as f32),
        (to.x as f32, to.y as f32),
        color,
    );
}
