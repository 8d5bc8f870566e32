//! Involute tooth flanks.
//!
//! Each tooth is built in a local frame where the anchor is the origin, the X axis runs against
//! the pitch curve direction and the Y axis points out of the gear. The involute of the local
//! circle of curvature gives the right flank; the left flank is its mirror image. Where the pitch
//! curve is flat the involute degenerates into the straight flank of a rack.

use crate::discretize::AnchorPoint;
use crate::discretize::GearSpec;
use crate::error::GearsError;
use crate::error::Result;
use crate::geometry::Point;
use crate::options::Progress;
use ordered_float::OrderedFloat;
use std::f64::consts::PI;

/// The involute of a circle of some radius, shifted so it starts at the origin and rises along Y.
pub fn involute(radius: f64, t: f64) -> Point {
    Point {
        x: radius * (t.sin() - t * t.cos()),
        y: radius * (t.cos() + t * t.sin()) - radius,
    }
}

/// A tabulated involute for nearest value lookups.
#[derive(Clone, Debug)]
pub struct InvoluteTable {
    rows: Vec<(f64, Point)>,
}

impl InvoluteTable {
    /// Tabulate the involute of a circle at parameters `k × step` below a quarter turn.
    pub fn new(radius: f64, step: f64) -> Self {
        let rows = (0..)
            .map(|index| index as f64 * step)
            .take_while(|t| *t < PI / 2.0)
            .map(|t| (t, involute(radius, t)))
            .collect();
        InvoluteTable { rows }
    }

    /// The parameter of the point whose Y is nearest to some value.
    pub fn closest_y(&self, y: f64) -> f64 {
        self.rows
            .iter()
            .min_by_key(|(_, point)| OrderedFloat((point.y - y).abs()))
            .map_or(0.0, |(t, _)| *t)
    }

    /// The parameter of the point with the largest X not above some value, if any.
    pub fn closest_x_down(&self, x: f64) -> Option<f64> {
        self.rows
            .iter()
            .filter(|(_, point)| point.x <= x)
            .max_by_key(|(_, point)| OrderedFloat(point.x))
            .map(|(t, _)| *t)
    }
}

/// The two flanks of one tooth, in gear coordinates.
#[derive(Clone, Debug)]
pub struct ToothProfile {
    /// The flank ahead of the anchor along the pitch curve, from base to tip.
    pub left: Vec<Point>,

    /// The flank behind the anchor along the pitch curve, from base to tip.
    pub right: Vec<Point>,

    /// The involute parameter at the tip.
    pub t_addendum: f64,

    /// The largest involute parameter for which the two flanks do not cross.
    pub t_clip: f64,

    /// Whether the tip was lowered to `t_clip`.
    pub clipped: bool,

    /// Whether the flanks are straight because the pitch curve is flat at the anchor. The
    /// involute parameters are zero then.
    pub straight: bool,
}

/// Builds tooth profiles for the anchors of one gear.
#[derive(Debug)]
pub struct ToothProfileBuilder<'a> {
    spec: &'a GearSpec,
    involute_step: f64,
}

impl<'a> ToothProfileBuilder<'a> {
    /// Prepare to build teeth for a gear.
    pub fn new(spec: &'a GearSpec, involute_step: f64) -> Self {
        ToothProfileBuilder {
            spec,
            involute_step,
        }
    }

    /// Build the tooth at an anchor.
    pub fn build(
        &self,
        index: usize,
        anchor: &AnchorPoint,
        observer: &mut dyn FnMut(&Progress),
    ) -> Result<ToothProfile> {
        let tangent_size = anchor.tangent_dx.hypot(anchor.tangent_dy);
        if !tangent_size.is_finite() || tangent_size == 0.0 {
            return Err(GearsError::DegenerateTangent { index });
        }

        let radius = anchor.curvature.abs();
        if radius.is_nan() || radius == 0.0 {
            return Err(GearsError::UnboundedCurvature { index });
        }

        let dx = anchor.tangent_dx / tangent_size;
        let dy = anchor.tangent_dy / tangent_size;
        let rotation = if dy < 0.0 {
            3.0 * PI / 2.0 + (dx / dy).atan()
        } else {
            PI / 2.0 + (dx / dy).atan()
        };
        let cosine = rotation.cos();
        let sine = rotation.sin();
        let place = |x: f64, y: f64| Point {
            x: anchor.x + x * cosine + y * sine,
            y: anchor.y - x * sine + y * cosine,
        };

        let slices = self.spec.tooth_slices;
        let mut left = Vec::with_capacity(slices);
        let mut right = Vec::with_capacity(slices);

        let height = self.spec.dedendum + self.spec.addendum;
        if radius.is_infinite() || involute(radius, self.involute_step).y >= height {
            let offset = self.spec.circular_pitch / 4.0;
            for slice in 0..slices {
                let y = height * slice as f64 / (slices - 1) as f64;
                left.push(place(-offset, y));
                right.push(place(offset, y));
            }
            return Ok(ToothProfile {
                left,
                right,
                t_addendum: 0.0,
                t_clip: 0.0,
                clipped: false,
                straight: true,
            });
        }

        let table = InvoluteTable::new(radius, self.involute_step);
        let t_dedendum = table.closest_y(self.spec.dedendum);
        let mut t_addendum = table.closest_y(height);

        let offset = self.spec.circular_pitch / 4.0 + involute(radius, t_dedendum).x;
        let t_clip = table
            .closest_x_down(offset)
            .ok_or(GearsError::LookupExhausted { index, offset })?;

        let clipped = t_addendum > t_clip;
        if clipped {
            observer(&Progress::ClippedTooth {
                index,
                t_addendum,
                t_clip,
            });
            t_addendum = t_clip;
        }

        for slice in 0..slices {
            let t = t_addendum * slice as f64 / (slices - 1) as f64;
            let point = involute(radius, t);
            left.push(place(point.x - offset, point.y));
            right.push(place(offset - point.x, point.y));
        }

        Ok(ToothProfile {
            left,
            right,
            t_addendum,
            t_clip,
            clipped,
            straight: false,
        })
    }
}

#[cfg(test)]
use crate::curve::PitchCurve;
#[cfg(test)]
use crate::discretize::PitchDiscretizer;
#[cfg(test)]
use crate::discretize::Role;
#[cfg(test)]
use crate::geometry::assert_point;
#[cfg(test)]
use crate::options::Options;

#[cfg(test)]
fn ignore(_: &Progress) {}

#[cfg(test)]
fn dot(vector: Point, x: f64, y: f64) -> f64 {
    vector.x * x + vector.y * y
}

#[cfg(test)]
fn minus(left: Point, right: Point) -> Point {
    Point {
        x: left.x - right.x,
        y: left.y - right.y,
    }
}

#[cfg(test)]
fn check_clipping(curve: &PitchCurve, teeth_count: usize, expected_clipped: usize) {
    let options = Options {
        teeth_count,
        ..Options::default()
    };
    let discretization = PitchDiscretizer::new(curve, &options)
        .discretize(&mut ignore)
        .unwrap();
    let builder = ToothProfileBuilder::new(&discretization.spec, options.involute_step);

    let mut reported = 0;
    let mut clipped = 0;
    for (index, anchor) in discretization.anchors.iter().enumerate() {
        if anchor.role != Role::Crest {
            continue;
        }
        let profile = builder
            .build(index, anchor, &mut |progress| {
                if let Progress::ClippedTooth { .. } = progress {
                    reported += 1;
                }
            })
            .unwrap();

        assert!(profile.left.len() == options.tooth_slices);
        assert!(profile.right.len() == options.tooth_slices);
        assert!(profile.t_addendum <= profile.t_clip);
        if profile.clipped {
            clipped += 1;
            assert!(profile.t_addendum == profile.t_clip);
        }

        let size = anchor.tangent_dx.hypot(anchor.tangent_dy);
        let tangent_x = anchor.tangent_dx / size;
        let tangent_y = anchor.tangent_dy / size;
        for (left, right) in profile.left.iter().zip(profile.right.iter()) {
            let across = minus(*left, *right);
            assert!(dot(across, tangent_x, tangent_y) >= -1e-12);
            assert_float_absolute_eq!(dot(across, tangent_y, -tangent_x), 0.0, 1e-12);
            let height = dot(minus(*left, anchor.point()), tangent_y, -tangent_x);
            assert!(height >= -1e-12);
            let tip = discretization.spec.dedendum + discretization.spec.addendum;
            assert!(height <= tip + 0.01);
        }
    }

    assert!(clipped == expected_clipped);
    assert!(reported == expected_clipped);
}

#[cfg(test)]
#[test]
fn test_involute() {
    assert_point(involute(2.0, 0.0), 0.0, 0.0);
    let point = involute(1.0, PI / 2.0);
    assert_point(point, 1.0, PI / 2.0 - 1.0);

    let table = InvoluteTable::new(1.0, 0.01);
    assert!(table.closest_y(0.0) == 0.0);
    assert!(table.closest_x_down(-1.0).is_none());
    assert!(table.closest_x_down(0.0) == Some(0.0));
    let t = table.closest_x_down(0.1).unwrap();
    assert!(involute(1.0, t).x <= 0.1);
    assert!(involute(1.0, t + 0.01).x > 0.1);
}

#[cfg(test)]
#[test]
fn test_clipped_circle() {
    check_clipping(&PitchCurve::circle(1.0, 0.0).unwrap(), 20, 10);
}

#[cfg(test)]
#[test]
fn test_unclipped_ellipse() {
    check_clipping(&PitchCurve::ellipse(1.0, 0.15, 2, 0.0).unwrap(), 40, 0);
}

#[cfg(test)]
#[test]
fn test_upright_tooth() {
    let spec = GearSpec::new(0.1, 10, 3, 0.0);
    let anchor = AnchorPoint {
        x: 1.0,
        y: 0.0,
        r: 1.0,
        t: 0.0,
        curvature: 1.0,
        tangent_dx: 0.0,
        tangent_dy: 2.0,
        role: Role::Crest,
    };
    let profile = ToothProfileBuilder::new(&spec, 0.01)
        .build(0, &anchor, &mut ignore)
        .unwrap();
    let table = InvoluteTable::new(1.0, 0.01);
    let offset =
        spec.circular_pitch / 4.0 + involute(1.0, table.closest_y(spec.dedendum)).x;

    assert!(!profile.clipped);
    assert_point(profile.left[0], 1.0, offset);
    assert_point(profile.right[0], 1.0, -offset);
    assert!(profile.left[2].x > 1.0 + spec.dedendum);
    assert!(profile.left[2].y < offset);
    assert!(profile.right[2].y > -offset);
    assert_float_absolute_eq!(profile.left[2].y, -profile.right[2].y, 1e-12);
}

#[cfg(test)]
#[test]
fn test_degenerate_anchors() {
    let spec = GearSpec::new(0.1, 10, 3, 0.0);
    let anchor = AnchorPoint {
        x: 1.0,
        y: 0.0,
        r: 1.0,
        t: 0.0,
        curvature: 1.0,
        tangent_dx: 0.0,
        tangent_dy: 1.0,
        role: Role::Crest,
    };
    let builder = ToothProfileBuilder::new(&spec, 0.01);

    let flat = AnchorPoint {
        tangent_dy: 0.0,
        ..anchor
    };
    assert!(matches!(
        builder.build(3, &flat, &mut ignore),
        Err(GearsError::DegenerateTangent { index: 3 })
    ));

    let cusp = AnchorPoint {
        curvature: f64::NAN,
        ..anchor
    };
    assert!(matches!(
        builder.build(4, &cusp, &mut ignore),
        Err(GearsError::UnboundedCurvature { index: 4 })
    ));

    let narrow = GearSpec {
        circular_pitch: -1.0,
        dedendum: 0.0,
        ..spec
    };
    assert!(matches!(
        ToothProfileBuilder::new(&narrow, 0.01).build(5, &anchor, &mut ignore),
        Err(GearsError::LookupExhausted { index: 5, .. })
    ));
}

#[cfg(test)]
#[test]
fn test_straight_tooth() {
    let spec = GearSpec::new(0.1, 10, 5, 0.0);
    let anchor = AnchorPoint {
        x: 1.0,
        y: 0.0,
        r: 1.0,
        t: 0.0,
        curvature: f64::INFINITY,
        tangent_dx: 0.0,
        tangent_dy: 1.0,
        role: Role::Crest,
    };
    let builder = ToothProfileBuilder::new(&spec, 0.01);
    let height = spec.dedendum + spec.addendum;
    let offset = spec.circular_pitch / 4.0;

    for flat in &[
        anchor,
        AnchorPoint {
            curvature: 1e7,
            ..anchor
        },
    ] {
        let profile = builder.build(0, flat, &mut ignore).unwrap();
        assert!(profile.straight);
        assert!(!profile.clipped);
        for (slice, (left, right)) in profile.left.iter().zip(profile.right.iter()).enumerate() {
            let x = 1.0 + height * slice as f64 / 4.0;
            assert_point(*left, x, offset);
            assert_point(*right, x, -offset);
        }
    }

    let curved = builder.build(0, &AnchorPoint { curvature: 2.0, ..anchor }, &mut ignore);
    assert!(!curved.unwrap().straight);
}
