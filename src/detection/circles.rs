//! Gauge face localization with a gradient Hough transform.
//!
//! Every Canny edge pixel votes along both directions of its Sobel gradient for
//! every radius in range. The face boundary's gradients all point through the
//! face center, so the center collects a peak of votes. Each peak above the
//! vote threshold then gets the radius best supported by edge pixel distances.

use image::GrayImage;
use imageproc::gradients::{horizontal_sobel, vertical_sobel};
use tracing::debug;

use crate::config::CircleConfig;
use crate::detection::preprocessing::detect_edges;
use crate::models::{Circle, Point};

/// Peaks examined for a radius, strongest first
const MAX_CENTER_CANDIDATES: usize = 32;

/// Parameters for one circle search
#[derive(Debug, Clone, Copy)]
pub struct CircleSearch {
    /// Canny high threshold; the low threshold is half of it
    pub edge_threshold: f32,
    /// Minimum votes for a center and minimum edge support for its radius
    pub vote_threshold: u32,
    pub min_radius: i32,
    /// Values `<= 0` mean the larger image dimension
    pub max_radius: i32,
    pub min_center_distance: f64,
}

impl From<&CircleConfig> for CircleSearch {
    fn from(config: &CircleConfig) -> Self {
        Self {
            edge_threshold: config.param1,
            vote_threshold: config.param2,
            min_radius: config.min_radius,
            max_radius: config.max_radius,
            min_center_distance: config.min_center_distance,
        }
    }
}

/// Find circles in a blurred grayscale image, strongest first
pub fn hough_circles(blurred: &GrayImage, search: &CircleSearch) -> Vec<Circle> {
    let (width, height) = blurred.dimensions();
    if width < 3 || height < 3 {
        return Vec::new();
    }

    let min_r = search.min_radius.max(1);
    let max_r = if search.max_radius <= 0 {
        width.max(height) as i32
    } else {
        search.max_radius
    };
    if max_r < min_r {
        return Vec::new();
    }

    let edges = detect_edges(blurred, search.edge_threshold / 2.0, search.edge_threshold);
    let edge_points: Vec<(u32, u32)> = edges
        .enumerate_pixels()
        .filter(|(_, _, p)| p[0] > 0)
        .map(|(x, y, _)| (x, y))
        .collect();
    if edge_points.is_empty() {
        return Vec::new();
    }

    let accum = accumulate_votes(blurred, &edge_points, min_r, max_r);
    let centers = find_peaks(&accum, width as usize, height as usize, search.vote_threshold);
    debug!(
        "Circle search: {} edge pixels, {} center peaks",
        edge_points.len(),
        centers.len()
    );

    let mut hist = vec![0u32; max_r as usize + 2];
    let mut circles: Vec<Circle> = Vec::new();

    for (idx, votes) in centers.into_iter().take(MAX_CENTER_CANDIDATES) {
        let center = Point::new((idx % width as usize) as i32, (idx / width as usize) as i32);
        if circles
            .iter()
            .any(|c| c.center.distance_to(center) < search.min_center_distance)
        {
            continue;
        }

        hist.fill(0);
        for &(x, y) in &edge_points {
            let r = center.distance_to(Point::new(x as i32, y as i32)).round() as i32;
            if r >= min_r && r <= max_r {
                hist[r as usize] += 1;
            }
        }

        if let Some((radius, support)) = best_radius(&hist, min_r, max_r) {
            if support >= search.vote_threshold {
                circles.push(Circle {
                    center,
                    radius,
                    votes,
                });
            }
        }
    }

    circles
}

fn accumulate_votes(blurred: &GrayImage, edge_points: &[(u32, u32)], min_r: i32, max_r: i32) -> Vec<u32> {
    let (width, height) = blurred.dimensions();
    let gx = horizontal_sobel(blurred);
    let gy = vertical_sobel(blurred);
    let stride = width as usize;
    let mut accum = vec![0u32; stride * height as usize];

    for &(x, y) in edge_points {
        let dx = gx.get_pixel(x, y)[0] as f64;
        let dy = gy.get_pixel(x, y)[0] as f64;
        let mag = (dx * dx + dy * dy).sqrt();
        if mag == 0.0 {
            continue;
        }
        let (ux, uy) = (dx / mag, dy / mag);

        for sign in [1.0, -1.0] {
            for r in min_r..=max_r {
                let cx = (x as f64 + sign * ux * r as f64).round();
                let cy = (y as f64 + sign * uy * r as f64).round();
                // A ray that leaves the image never comes back
                if cx < 0.0 || cy < 0.0 || cx >= width as f64 || cy >= height as f64 {
                    break;
                }
                accum[cy as usize * stride + cx as usize] += 1;
            }
        }
    }

    accum
}

/// Local maxima at or above `threshold`, sorted by votes descending
fn find_peaks(accum: &[u32], width: usize, height: usize, threshold: u32) -> Vec<(usize, u32)> {
    let mut peaks = Vec::new();
    if width < 3 || height < 3 {
        return peaks;
    }
    let threshold = threshold.max(1);

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let idx = y * width + x;
            let v = accum[idx];
            if v < threshold {
                continue;
            }
            // Strict on one side, inclusive on the other, so a plateau yields one peak
            if v > accum[idx - 1] && v >= accum[idx + 1] && v > accum[idx - width] && v >= accum[idx + width] {
                peaks.push((idx, v));
            }
        }
    }

    peaks.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    peaks
}

/// Radius whose three-pixel band holds the most edge pixels, with that band's count
fn best_radius(hist: &[u32], min_r: i32, max_r: i32) -> Option<(i32, u32)> {
    let band = |r: i32| -> u32 {
        let lo = (r - 1).max(min_r);
        let hi = (r + 1).min(max_r);
        (lo..=hi).map(|k| hist[k as usize]).sum()
    };

    let mut best: Option<(i32, u32)> = None;
    for r in min_r..=max_r {
        let support = band(r);
        if best.is_none_or(|(_, b)| support > b) {
            best = Some((r, support));
        }
    }
    let (r, support) = best?;
    if support == 0 {
        return None;
    }

    // Refine to the weighted mean inside the band
    let lo = (r - 1).max(min_r);
    let hi = (r + 1).min(max_r);
    let weighted: f64 = (lo..=hi).map(|k| hist[k as usize] as f64 * k as f64).sum();
    Some(((weighted / support as f64).round() as i32, support))
}
