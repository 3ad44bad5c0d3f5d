use crate::models::{LineCandidate, LineGroup};

/// Partition candidates into orientation groups.
///
/// Candidates are sorted by angle, then scanned once: each candidate joins the
/// current group if it is within `threshold` of the group's *first* member,
/// otherwise it opens a new group. Which group a candidate near the threshold
/// lands in depends on where the previous group was anchored.
pub fn group_by_angle(candidates: &[LineCandidate], threshold: f64) -> Vec<LineGroup> {
    let mut sorted = candidates.to_vec();
    sorted.sort_by(|a, b| a.angle.total_cmp(&b.angle));

    let mut groups: Vec<LineGroup> = Vec::new();
    let mut current: LineGroup = Vec::new();

    for candidate in sorted {
        match current.first() {
            Some(anchor) if (candidate.angle - anchor.angle).abs() < threshold => {
                current.push(candidate);
            }
            Some(_) => {
                groups.push(std::mem::take(&mut current));
                current.push(candidate);
            }
            None => current.push(candidate),
        }
    }
    if !current.is_empty() {
        groups.push(current);
    }

    groups
}

/// Sort groups by size, largest first; equal sizes keep their angle order
pub fn rank_groups(groups: &mut [LineGroup]) {
    groups.sort_by(|a, b| b.len().cmp(&a.len()));
}

/// The largest group, the lowest-angle one on a tie
pub fn best_group(candidates: &[LineCandidate], threshold: f64) -> Option<LineGroup> {
    let mut groups = group_by_angle(candidates, threshold);
    rank_groups(&mut groups);
    groups.into_iter().next()
}
