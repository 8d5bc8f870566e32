//! Assembling tooth profiles into the closed outline of a gear.

use crate::discretize::AnchorSequence;
use crate::discretize::GearSpec;
use crate::discretize::Role;
use crate::error::Result;
use crate::geometry::arc_to;
use crate::geometry::distance;
use crate::geometry::polar_point;
use crate::geometry::wrap_angle;
use crate::geometry::Point;
use crate::geometry::Polyline;
use crate::options::Options;
use crate::options::Progress;
use crate::tooth::ToothProfile;
use crate::tooth::ToothProfileBuilder;
use log::debug;
use std::f64::consts::PI;

/// A line segment between two points.
pub type Segment = (Point, Point);

/// The outline of a gear as a set of line segments forming closed loops.
#[derive(Clone, Debug, PartialEq)]
pub struct GearOutline {
    segments: Vec<Segment>,
    depth: f64,
}

impl GearOutline {
    /// Wrap some segments.
    pub fn new(segments: Vec<Segment>, depth: f64) -> Self {
        GearOutline { segments, depth }
    }

    /// The segments of the outline.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// The extrusion depth.
    pub fn depth(&self) -> f64 {
        self.depth
    }

    /// The same outline moved by some offset.
    pub fn translated(&self, offset: Point) -> Self {
        let shift = |point: Point| Point {
            x: point.x + offset.x,
            y: point.y + offset.y,
        };
        GearOutline {
            segments: self
                .segments
                .iter()
                .map(|(from, to)| (shift(*from), shift(*to)))
                .collect(),
            depth: self.depth,
        }
    }

    /// The same outline rotated counter-clockwise around the gear axis.
    pub fn rotated(&self, angle: f64) -> Self {
        let (sine, cosine) = angle.sin_cos();
        let turn = |point: Point| Point {
            x: point.x * cosine - point.y * sine,
            y: point.x * sine + point.y * cosine,
        };
        GearOutline {
            segments: self
                .segments
                .iter()
                .map(|(from, to)| (turn(*from), turn(*to)))
                .collect(),
            depth: self.depth,
        }
    }

    /// Each segment as a two-point polyline.
    pub fn polylines(&self) -> Vec<Polyline> {
        self.segments
            .iter()
            .map(|(from, to)| vec![*from, *to])
            .collect()
    }
}

/// Connects the teeth of a gear with root arcs and adds the bore.
#[derive(Debug)]
pub struct SegmentAssembler<'a> {
    spec: &'a GearSpec,
    options: &'a Options,
}

impl<'a> SegmentAssembler<'a> {
    /// Prepare to assemble the outline of a gear.
    pub fn new(spec: &'a GearSpec, options: &'a Options) -> Self {
        SegmentAssembler { spec, options }
    }

    /// Build the teeth on the crest anchors and connect them into an outline.
    pub fn assemble(
        &self,
        anchors: &AnchorSequence,
        observer: &mut dyn FnMut(&Progress),
    ) -> Result<GearOutline> {
        let builder = ToothProfileBuilder::new(self.spec, self.options.involute_step);
        let mut angles = Vec::with_capacity(anchors.len());
        let mut profiles = Vec::with_capacity(anchors.len());
        for (index, anchor) in anchors.iter().enumerate() {
            if anchor.role == Role::Crest {
                profiles.push(builder.build(index, anchor, observer)?);
                angles.push(anchor.t);
            }
        }

        let mut segments = Vec::new();
        self.connect_teeth(&profiles, &mut segments);
        if self.spec.inner_radius > 0.0 {
            self.bore(&angles, &mut segments);
        }

        debug!(
            "assembled {} teeth into {} segments",
            profiles.len(),
            segments.len()
        );
        Ok(GearOutline::new(segments, self.options.depth))
    }

    fn connect_teeth(&self, profiles: &[ToothProfile], segments: &mut Vec<Segment>) {
        for (index, profile) in profiles.iter().enumerate() {
            push_chain(segments, &profile.left);
            push_chain(segments, &profile.right);
            if let (Some(left_tip), Some(right_tip)) = (profile.left.last(), profile.right.last())
            {
                push_segment(segments, *left_tip, *right_tip);
            }

            let previous = &profiles[(index + profiles.len() - 1) % profiles.len()];
            if let (Some(from), Some(to)) = (previous.left.first(), profile.right.first()) {
                let mut sweep = wrap_angle(to.y.atan2(to.x) - from.y.atan2(from.x));
                if sweep > PI && profiles.len() > 1 {
                    sweep -= 2.0 * PI;
                }
                let arc = self.arc_around_axis(*from, *to, sweep);
                push_chain(segments, &arc);
            }
        }
    }

    fn bore(&self, angles: &[f64], segments: &mut Vec<Segment>) {
        let radius = self.spec.inner_radius;
        for (index, angle) in angles.iter().enumerate() {
            let next_angle = angles[(index + 1) % angles.len()];
            let mut sweep = wrap_angle(next_angle - angle);
            if sweep == 0.0 {
                sweep = 2.0 * PI;
            }
            let arc = self.arc_around_axis(
                polar_point(radius, *angle),
                polar_point(radius, next_angle),
                sweep,
            );
            push_chain(segments, &arc);
        }
    }

    /// An arc around the gear axis, sweeping some angle (counter-clockwise when positive).
    fn arc_around_axis(&self, from: Point, to: Point, sweep: f64) -> Polyline {
        let center = Point { x: 0.0, y: 0.0 };
        let from_radius = from.x.hypot(from.y);
        let to_radius = to.x.hypot(to.y);
        let from_angle = from.y.atan2(from.x);
        let pieces_count = (sweep.abs() / (PI / 2.0)).ceil().max(1.0) as usize;

        let mut polyline = Polyline::new();
        let mut piece_from = from;
        for piece_index in 1..=pieces_count {
            let piece_to = if piece_index == pieces_count {
                to
            } else {
                let fraction = piece_index as f64 / pieces_count as f64;
                polar_point(
                    from_radius + (to_radius - from_radius) * fraction,
                    from_angle + sweep * fraction,
                )
            };
            arc_to(
                &mut polyline,
                center,
                piece_from,
                piece_to,
                self.options.tolerance,
            );
            piece_from = piece_to;
        }
        polyline.push(to);
        polyline
    }
}

fn push_segment(segments: &mut Vec<Segment>, from: Point, to: Point) {
    if distance(from, to) > 0.0 {
        segments.push((from, to));
    }
}

fn push_chain(segments: &mut Vec<Segment>, points: &[Point]) {
    for pair in points.windows(2) {
        push_segment(segments, pair[0], pair[1]);
    }
}

#[cfg(test)]
use crate::curve::PitchCurve;
#[cfg(test)]
use crate::discretize::PitchDiscretizer;
#[cfg(test)]
use crate::geometry::assert_point;
#[cfg(test)]
use ordered_float::OrderedFloat;
#[cfg(test)]
use std::collections::HashMap;

#[cfg(test)]
fn ignore(_: &Progress) {}

#[cfg(test)]
fn degrees(outline: &GearOutline) -> HashMap<(OrderedFloat<f64>, OrderedFloat<f64>), usize> {
    let mut degrees = HashMap::new();
    for (from, to) in outline.segments() {
        assert!(distance(*from, *to) > 0.0);
        for point in &[from, to] {
            *degrees
                .entry((OrderedFloat(point.x), OrderedFloat(point.y)))
                .or_insert(0) += 1;
        }
    }
    degrees
}

#[cfg(test)]
fn assemble(curve: &PitchCurve, teeth_count: usize) -> (GearOutline, GearSpec) {
    let options = Options {
        teeth_count,
        ..Options::default()
    };
    let discretization = PitchDiscretizer::new(curve, &options)
        .discretize(&mut ignore)
        .unwrap();
    let outline = SegmentAssembler::new(&discretization.spec, &options)
        .assemble(&discretization.anchors, &mut ignore)
        .unwrap();
    (outline, discretization.spec)
}

#[cfg(test)]
#[test]
fn test_closed_outline() {
    let curve = PitchCurve::ellipse(1.0, 0.15, 2, 0.25).unwrap();
    let (outline, spec) = assemble(&curve, 30);
    assert!(outline.depth() == Options::default().depth);

    let degrees = degrees(&outline);
    assert!(degrees.values().all(|degree| *degree == 2));

    let on_bore = degrees
        .keys()
        .filter(|(x, y)| (x.0.hypot(y.0) - spec.inner_radius).abs() < 1e-9)
        .count();
    assert!(on_bore >= 30);

    let outer = outline
        .segments()
        .iter()
        .map(|(from, _)| from.x.hypot(from.y))
        .fold(0.0, f64::max);
    assert!(outer < 1.0 / 0.85 + spec.addendum);
}

#[cfg(test)]
#[test]
fn test_no_bore() {
    let curve = PitchCurve::circle(1.0, 0.0).unwrap();
    let (outline, spec) = assemble(&curve, 20);
    assert!(spec.teeth_count == 10);
    let degrees = degrees(&outline);
    assert!(degrees.values().all(|degree| *degree == 2));
    assert!(degrees
        .keys()
        .all(|(x, y)| x.0.hypot(y.0) > 1.0 - spec.dedendum - 1e-6));
}

#[cfg(test)]
#[test]
fn test_translated() {
    let outline = GearOutline::new(
        vec![(Point { x: 0.0, y: 0.0 }, Point { x: 1.0, y: 0.0 })],
        0.5,
    );
    let moved = outline.translated(Point { x: 2.0, y: -1.0 });
    assert!(moved.depth() == 0.5);
    assert!(moved.segments()[0].0 == Point { x: 2.0, y: -1.0 });
    assert!(moved.segments()[0].1 == Point { x: 3.0, y: -1.0 });
    assert!(moved.polylines() == vec![vec![moved.segments()[0].0, moved.segments()[0].1]]);

    let turned = moved.rotated(PI / 2.0);
    assert!(turned.depth() == 0.5);
    assert_point(turned.segments()[0].0, 1.0, 2.0);
    assert_point(turned.segments()[0].1, 1.0, 3.0);
}
