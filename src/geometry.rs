//! Plane geometry helpers.

use std::f64::consts::PI;

pub use svg2polylines::CoordinatePair as Point;
pub use svg2polylines::Polyline;

/// A point from its polar coordinates.
pub fn polar_point(radius: f64, angle: f64) -> Point {
    Point {
        x: radius * angle.cos(),
        y: radius * angle.sin(),
    }
}

/// Return the distance between two points.
pub fn distance(left_point: Point, right_point: Point) -> f64 {
    let delta_x = left_point.x - right_point.x;
    let delta_y = left_point.y - right_point.y;
    delta_x.hypot(delta_y)
}

/// Wrap an angle into `[0, 2π)`.
pub fn wrap_angle(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(2.0 * PI);
    if wrapped >= 2.0 * PI {
        0.0
    } else {
        wrapped
    }
}

/// Append an arc around a center, from one point up to (but not including) another point.
///
/// The arc is split so no chord strays from the circle by more than the tolerance. The radius is
/// the average of the distances of the two points from the center.
pub fn arc_to(
    polyline: &mut Polyline,
    center: Point,
    from_point: Point,
    to_point: Point,
    tolerance: f64,
) {
    let from_vector = Point {
        x: from_point.x - center.x,
        y: from_point.y - center.y,
    };

    let to_vector = Point {
        x: to_point.x - center.x,
        y: to_point.y - center.y,
    };

    polyline.push(from_point);

    let dot = from_vector.x * to_vector.x + from_vector.y * to_vector.y;
    let from_radius = from_vector.x.hypot(from_vector.y);
    let to_radius = to_vector.x.hypot(to_vector.y);
    let radius = (from_radius + to_radius) / 2.0;
    if from_radius <= 0.0 || radius <= tolerance {
        return;
    }
    let det = from_vector.x * to_vector.y - from_vector.y * to_vector.x;

    let total_angle = det.atan2(dot);
    let max_step_angle = 2.0 * (1.0 - tolerance / radius).acos();
    let steps_count = (total_angle.abs() / max_step_angle).ceil() as usize;
    if steps_count < 2 {
        return;
    }
    let step_angle = total_angle / steps_count as f64;
    let radius_step = (to_radius - from_radius) / steps_count as f64;

    for step_index in 1..steps_count {
        let angle = step_angle * step_index as f64;
        let scale = (from_radius + radius_step * step_index as f64) / from_radius;

        let cosine = angle.cos() * scale;
        let sine = angle.sin() * scale;

        polyline.push(Point {
            x: center.x + from_vector.x * cosine - from_vector.y * sine,
            y: center.y + from_vector.x * sine + from_vector.y * cosine,
        });
    }
}

#[cfg(test)]
pub(crate) fn assert_point(point: Point, x: f64, y: f64) {
    assert_float_absolute_eq!(point.x, x, 1e-6);
    assert_float_absolute_eq!(point.y, y, 1e-6);
}

#[cfg(test)]
#[test]
fn test_arc_to() {
    let center = Point { x: 1.0, y: 1.0 };
    let bottom = Point { x: 1.0, y: 0.0 };
    let left = Point { x: 0.0, y: 1.0 };
    let right = Point { x: 2.0, y: 1.0 };
    let tolerance = 0.05;
    let small = 0.5;
    let large = 0.75_f64.sqrt();

    let mut left_polyline: Polyline = vec![];
    arc_to(&mut left_polyline, center, bottom, left, tolerance);
    assert!(left_polyline.len() == 3);
    assert_point(left_polyline[0], bottom.x, bottom.y);
    assert_point(left_polyline[1], 1.0 - small, 1.0 - large);
    assert_point(left_polyline[2], 1.0 - large, 1.0 - small);

    let mut right_polyline: Polyline = vec![];
    arc_to(&mut right_polyline, center, bottom, right, tolerance);
    assert!(right_polyline.len() == 3);
    assert_point(right_polyline[0], bottom.x, bottom.y);
    assert_point(right_polyline[1], 1.0 + small, 1.0 - large);
    assert_point(right_polyline[2], 1.0 + large, 1.0 - small);

    let mut tiny_polyline: Polyline = vec![];
    arc_to(&mut tiny_polyline, center, bottom, bottom, tolerance);
    assert!(tiny_polyline.len() == 1);
}

#[cfg(test)]
#[test]
fn test_polar() {
    assert_point(polar_point(2.0, PI / 2.0), 0.0, 2.0);
    assert_float_absolute_eq!(distance(polar_point(1.0, 0.0), polar_point(1.0, PI)), 2.0, 1e-12);
    assert_float_absolute_eq!(wrap_angle(-PI / 2.0), 1.5 * PI, 1e-12);
    assert_float_absolute_eq!(wrap_angle(5.0 * PI), PI, 1e-12);
    assert!(wrap_angle(0.0) == 0.0);
}
