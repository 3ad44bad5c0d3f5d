use crate::models::{LineCandidate, Point};

/// Where the needle points: its direction from the center and the tip pixel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeedleDirection {
    pub angle: f64,
    pub tip: Point,
}

/// Quadrant (0..=3) holding the most candidate directions; the lowest index wins a tie
pub fn majority_quadrant(candidates: &[LineCandidate]) -> usize {
    let mut quadrants = [0usize; 4];
    for candidate in candidates {
        let quadrant = ((candidate.direction / 90.0).floor() as usize).min(3);
        quadrants[quadrant] += 1;
    }

    let mut best = 0;
    for (i, &count) in quadrants.iter().enumerate() {
        if count > quadrants[best] {
            best = i;
        }
    }
    best
}

/// Coarse prior for the needle direction: the middle of the majority quadrant
pub fn likely_direction(candidates: &[LineCandidate]) -> f64 {
    majority_quadrant(candidates) as f64 * 90.0 + 45.0
}

/// Mean undirected orientation of a group
pub fn average_orientation(group: &[LineCandidate]) -> Option<f64> {
    if group.is_empty() {
        return None;
    }
    Some(group.iter().map(|c| c.angle).sum::<f64>() / group.len() as f64)
}

/// Shortest distance between two directions in degrees
pub fn circular_distance(a: f64, b: f64) -> f64 {
    let diff = a - b;
    diff.abs().min((diff + 360.0).abs()).min((diff - 360.0).abs())
}

/// Pick which end of the line through `center` at `orientation` the needle points to.
///
/// Both ends sit `radius` pixels from the center (truncated to whole pixels).
/// The first end only wins when it is strictly closer to `likely`.
pub fn disambiguate(center: Point, radius: i32, orientation: f64, likely: f64) -> NeedleDirection {
    let (uy, ux) = orientation.to_radians().sin_cos();
    let r = radius as f64;
    let (cx, cy) = (center.x as f64, center.y as f64);

    let back = Point::new((cx - r * ux) as i32, (cy - r * uy) as i32);
    let front = Point::new((cx + r * ux) as i32, (cy + r * uy) as i32);

    let back_angle = center.direction_to(back);
    let front_angle = center.direction_to(front);

    if circular_distance(back_angle, likely) < circular_distance(front_angle, likely) {
        NeedleDirection {
            angle: back_angle,
            tip: back,
        }
    } else {
        NeedleDirection {
            angle: front_angle,
            tip: front,
        }
    }
}

/// Needle direction from every filtered candidate (quadrant prior) and the best group (orientation)
pub fn resolve_needle(
    candidates: &[LineCandidate],
    best_group: &[LineCandidate],
    center: Point,
    radius: i32,
) -> Option<NeedleDirection> {
    let orientation = average_orientation(best_group)?;
    let likely = likely_direction(candidates);
    Some(disambiguate(center, radius, orientation, likely))
}
