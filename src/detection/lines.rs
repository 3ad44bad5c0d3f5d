//! Straight segment extraction from an edge map.
//!
//! Lines come from imageproc's Hough transform in polar form. Each line is then
//! walked across the edge map and split wherever the edge support breaks for
//! longer than the allowed gap, which turns infinite lines into segments.

use image::GrayImage;
use imageproc::hough::{LineDetectionOptions, PolarLine, detect_lines};
use tracing::debug;

use crate::config::LineConfig;
use crate::models::{LineSegment, Point};

/// Parameters for one segment search
#[derive(Debug, Clone, Copy)]
pub struct SegmentSearch {
    pub vote_threshold: u32,
    pub suppression_radius: u32,
    pub min_line_length: f64,
    pub max_line_gap: f64,
}

impl SegmentSearch {
    /// Segment search scaled to a gauge of `radius` pixels
    pub fn for_radius(config: &LineConfig, radius: i32) -> Self {
        Self {
            vote_threshold: config.hough_threshold,
            suppression_radius: config.hough_suppression_radius,
            min_line_length: radius as f64 * config.min_line_length_factor,
            max_line_gap: config.max_line_gap,
        }
    }
}

pub fn hough_segments(edges: &GrayImage, search: &SegmentSearch) -> Vec<LineSegment> {
    let options = LineDetectionOptions {
        vote_threshold: search.vote_threshold,
        suppression_radius: search.suppression_radius,
    };
    let lines = detect_lines(edges, options);

    let mut segments = Vec::new();
    for line in &lines {
        trace_line(edges, line, search, &mut segments);
    }
    debug!("{} Hough lines split into {} segments", lines.len(), segments.len());
    segments
}

/// Walk `line` across the edge map and push every supported run long enough to keep
fn trace_line(edges: &GrayImage, line: &PolarLine, search: &SegmentSearch, out: &mut Vec<LineSegment>) {
    let (width, height) = edges.dimensions();
    let (sin, cos) = (line.angle_in_degrees as f64).to_radians().sin_cos();
    let r = line.r as f64;

    // Foot of the normal from the origin, and the unit direction along the line
    let (x0, y0) = (r * cos, r * sin);
    let (dx, dy) = (-sin, cos);
    let point_at = |t: f64, offset: f64| (x0 + t * dx + offset * cos, y0 + t * dy + offset * sin);

    // Hough distances are truncated to whole pixels, so look one pixel to each side
    let supported = |t: f64| {
        [-1.0, 0.0, 1.0].iter().any(|&offset| {
            let (x, y) = point_at(t, offset);
            let (x, y) = (x.round(), y.round());
            x >= 0.0
                && y >= 0.0
                && x < width as f64
                && y < height as f64
                && edges.get_pixel(x as u32, y as u32)[0] > 0
        })
    };

    let mut emit = |start: f64, end: f64| {
        let length = end - start;
        if length > 0.0 && length >= search.min_line_length {
            let (x1, y1) = point_at(start, 0.0);
            let (x2, y2) = point_at(end, 0.0);
            out.push(LineSegment {
                start: Point::new(x1.round() as i32, y1.round() as i32),
                end: Point::new(x2.round() as i32, y2.round() as i32),
            });
        }
    };

    let reach = ((width as f64).powi(2) + (height as f64).powi(2)).sqrt() + r.abs();
    let steps = (2.0 * reach).ceil() as i64;

    let mut run: Option<(f64, f64)> = None;
    for i in 0..=steps {
        let t = -reach + i as f64;
        if !supported(t) {
            continue;
        }
        run = match run {
            Some((start, last)) if t - last <= search.max_line_gap => Some((start, t)),
            Some((start, last)) => {
                emit(start, last);
                Some((t, t))
            }
            None => Some((t, t)),
        };
    }
    if let Some((start, last)) = run {
        emit(start, last);
    }
}
