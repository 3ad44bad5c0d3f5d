use image::GrayImage;

use crate::detection::circles::{CircleSearch, hough_circles};
use crate::detection::lines::{SegmentSearch, hough_segments};
use crate::detection::preprocessing;
use crate::models::{Circle, LineSegment};

/// Image primitives the needle pipeline is built on.
///
/// Swapping the implementation lets tests script the circle or segment
/// results without drawing images that produce them.
pub trait Vision: Send + Sync {
    fn blur(&self, gray: &GrayImage, sigma: f32) -> GrayImage;

    /// Circles in a blurred image, strongest first
    fn detect_circles(&self, blurred: &GrayImage, search: &CircleSearch) -> Vec<Circle>;

    fn detect_edges(&self, img: &GrayImage, low: f32, high: f32) -> GrayImage;

    fn detect_segments(&self, edges: &GrayImage, search: &SegmentSearch) -> Vec<LineSegment>;
}

/// Pure-Rust primitives on top of `imageproc`
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageprocVision;

impl Vision for ImageprocVision {
    fn blur(&self, gray: &GrayImage, sigma: f32) -> GrayImage {
        preprocessing::apply_blur(gray, sigma)
    }

    fn detect_circles(&self, blurred: &GrayImage, search: &CircleSearch) -> Vec<Circle> {
        hough_circles(blurred, search)
    }

    fn detect_edges(&self, img: &GrayImage, low: f32, high: f32) -> GrayImage {
        preprocessing::detect_edges(img, low, high)
    }

    fn detect_segments(&self, edges: &GrayImage, search: &SegmentSearch) -> Vec<LineSegment> {
        hough_segments(edges, search)
    }
}
