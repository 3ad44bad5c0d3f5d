use image::{DynamicImage, GrayImage, Luma};
use imageproc::drawing::draw_filled_circle_mut;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;

use crate::models::Point;

/// Convert image to grayscale
pub fn to_grayscale(img: &DynamicImage) -> GrayImage {
    img.to_luma8()
}

/// Apply Gaussian blur to reduce noise; a sigma that is not positive leaves the image as is
pub fn apply_blur(img: &GrayImage, sigma: f32) -> GrayImage {
    if !(sigma > 0.0 && sigma.is_finite()) {
        return img.clone();
    }
    gaussian_blur_f32(img, sigma)
}

/// Detect edges using Canny edge detector
pub fn detect_edges(img: &GrayImage, low_threshold: f32, high_threshold: f32) -> GrayImage {
    canny(img, low_threshold, high_threshold)
}

/// Isolate dark needle pixels inside the gauge face.
///
/// Pixels outside the face circle are zeroed first, then an inverted binary
/// threshold is applied: values at or below `threshold` become 255, the rest 0.
/// The zeroed surroundings therefore come out as 255 too.
pub fn binarize_face(gray: &GrayImage, center: Point, radius: i32, threshold: u8) -> GrayImage {
    let (width, height) = gray.dimensions();

    let mut mask = GrayImage::new(width, height);
    draw_filled_circle_mut(&mut mask, (center.x, center.y), radius, Luma([255u8]));

    let mut binary = GrayImage::new(width, height);
    for (x, y, pixel) in gray.enumerate_pixels() {
        let value = if mask.get_pixel(x, y)[0] > 0 { pixel[0] } else { 0 };
        let out = if value <= threshold { 255 } else { 0 };
        binary.put_pixel(x, y, Luma([out]));
    }
    binary
}
