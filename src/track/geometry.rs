// Planar geometry over ordered position traces

use log::debug;

use super::types::{Direction, Point2D};
use crate::config::TrackConfig;
use crate::telemetry::signal::EPSILON;

/// Drops points closer than `tolerance` to the last kept point. The first point is always
/// kept and non-finite points are discarded.
pub fn dedup_points(points: &[Point2D], tolerance: f64) -> Vec<Point2D> {
    let mut kept: Vec<Point2D> = Vec::with_capacity(points.len());
    for point in points.iter().filter(|point| point.is_finite()) {
        match kept.last() {
            Some(last) if last.distance_to(point) < tolerance => {}
            _ => kept.push(*point),
        }
    }
    if kept.len() < points.len() {
        debug!(
            "Dropped {} of {} points closer than {}m",
            points.len() - kept.len(),
            points.len(),
            tolerance
        );
    }
    kept
}

/// Cumulative Euclidean distance along the points, starting at 0
pub fn cumulative_distances(points: &[Point2D]) -> Vec<f64> {
    let mut total = 0.0;
    let mut distances = Vec::with_capacity(points.len());
    for (i, point) in points.iter().enumerate() {
        if i > 0 {
            total += points[i - 1].distance_to(point);
        }
        distances.push(total);
    }
    distances
}

/// Absolute angle in radians between the incoming and outgoing segments at `current`.
/// `None` when either segment has zero length.
pub fn turn_angle(previous: Point2D, current: Point2D, next: Point2D) -> Option<f64> {
    let (ax, ay) = (current.x - previous.x, current.y - previous.y);
    let (bx, by) = (next.x - current.x, next.y - current.y);
    if ax.hypot(ay) < EPSILON || bx.hypot(by) < EPSILON {
        return None;
    }
    let cross = ax * by - ay * bx;
    let dot = ax * bx + ay * by;
    Some(cross.atan2(dot).abs())
}

/// Corner radius at every point from the chord spanning its neighbours and the turn angle.
/// Straight or degenerate stretches get `max_corner_radius`; end points copy their neighbour.
pub fn corner_radii(points: &[Point2D], config: &TrackConfig) -> Vec<f64> {
    let n = points.len();
    if n < 3 {
        return vec![config.max_corner_radius; n];
    }

    let mut radii = vec![config.max_corner_radius; n];
    for i in 1..n - 1 {
        let Some(angle) = turn_angle(points[i - 1], points[i], points[i + 1]) else {
            continue;
        };
        if angle < config.min_turn_angle {
            continue;
        }
        let chord = points[i - 1].distance_to(&points[i + 1]);
        let radius = chord / (2.0 * (angle / 2.0).sin());
        radii[i] = if radius.is_finite() {
            radius.min(config.max_corner_radius)
        } else {
            config.max_corner_radius
        };
    }
    radii[0] = radii[1];
    radii[n - 1] = radii[n - 2];
    radii
}

/// Shoelace area of the closed polygon through `points`, positive when counterclockwise
pub fn signed_area(points: &[Point2D]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let twice_area: f64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.x * b.y - b.x * a.y)
        .sum();
    twice_area / 2.0
}

/// Direction of travel judged from the leading `fraction` of the trace
pub fn direction_of_travel(points: &[Point2D], fraction: f64) -> Direction {
    let count = ((points.len() as f64 * fraction).ceil() as usize)
        .max(3)
        .min(points.len());
    if signed_area(&points[..count]) > 0.0 {
        Direction::Counterclockwise
    } else {
        Direction::Clockwise
    }
}
