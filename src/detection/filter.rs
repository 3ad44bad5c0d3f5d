use crate::models::{LineCandidate, LineSegment, Point};

/// Describe `segment` relative to the gauge center.
///
/// Returns `None` for zero-length segments. The direction points from the
/// center to whichever endpoint lies farther away (the second one on a tie).
pub fn to_candidate(segment: &LineSegment, center: Point) -> Option<LineCandidate> {
    let center_distance = segment.distance_to_line(center)?;

    let outer = if center.distance_to(segment.start) > center.distance_to(segment.end) {
        segment.start
    } else {
        segment.end
    };

    Some(LineCandidate {
        segment: *segment,
        angle: segment.orientation(),
        direction: center.direction_to(outer),
        center_distance,
    })
}

/// Keep the segments whose supporting line passes within `radius * distance_factor` of the center
pub fn filter_candidates(
    segments: &[LineSegment],
    center: Point,
    radius: i32,
    distance_factor: f64,
) -> Vec<LineCandidate> {
    let max_distance = radius as f64 * distance_factor;
    segments
        .iter()
        .filter_map(|s| to_candidate(s, center))
        .filter(|c| c.center_distance < max_distance)
        .collect()
}
