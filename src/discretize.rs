//! Placing tooth and gap anchors along a pitch curve.
//!
//! The pitch is refined until walking the root curve (the pitch curve pulled in by the dedendum)
//! in steps of half a pitch lands on exactly the requested number of anchors, and the arc left
//! over at the end of the turn is itself half a pitch.

use crate::curve::PitchCurve;
use crate::error::GearsError;
use crate::error::Result;
use crate::geometry::distance;
use crate::geometry::polar_point;
use crate::geometry::Point;
use crate::options::Options;
use crate::options::Progress;
use std::f64::consts::PI;
use std::slice::Iter;

/// Whether an anchor carries a tooth or sits in the gap between two teeth.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// The middle of a tooth.
    Crest,

    /// The middle of a gap between teeth.
    Gap,
}

/// A sampled point of a pitch curve, where a tooth (or a gap) is anchored.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnchorPoint {
    /// Cartesian X coordinate.
    pub x: f64,

    /// Cartesian Y coordinate.
    pub y: f64,

    /// The distance from the gear axis.
    pub r: f64,

    /// The angle around the gear axis.
    pub t: f64,

    /// The local radius of curvature.
    pub curvature: f64,

    /// X component of the tangent direction (not normalized).
    pub tangent_dx: f64,

    /// Y component of the tangent direction (not normalized).
    pub tangent_dy: f64,

    /// Whether this is a tooth or a gap.
    pub role: Role,
}

impl AnchorPoint {
    /// The anchor position.
    pub fn point(&self) -> Point {
        Point {
            x: self.x,
            y: self.y,
        }
    }
}

/// A circularly indexed sequence of anchors around a gear.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnchorSequence {
    anchors: Vec<AnchorPoint>,
}

impl AnchorSequence {
    /// Wrap a vector of anchors.
    pub fn new(anchors: Vec<AnchorPoint>) -> Self {
        AnchorSequence { anchors }
    }

    /// The number of anchors.
    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    /// Whether there are no anchors at all.
    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    /// The anchor at some index, wrapping around the end of the sequence (none if empty).
    pub fn at(&self, index: usize) -> Option<&AnchorPoint> {
        if self.anchors.is_empty() {
            None
        } else {
            Some(&self.anchors[index % self.anchors.len()])
        }
    }

    /// Iterate on all the anchors.
    pub fn iter(&self) -> Iter<'_, AnchorPoint> {
        self.anchors.iter()
    }

    /// The anchors of some role, in order.
    pub fn with_role(&self, role: Role) -> Vec<AnchorPoint> {
        self.anchors
            .iter()
            .filter(|anchor| anchor.role == role)
            .copied()
            .collect()
    }

    /// Access the anchors as a slice.
    pub fn as_slice(&self) -> &[AnchorPoint] {
        &self.anchors
    }
}

/// Sizing constants of one gear, derived from its circular pitch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GearSpec {
    /// The number of teeth the gear carries.
    pub teeth_count: usize,

    /// The number of points along each side of a tooth.
    pub tooth_slices: usize,

    /// The tooth depth below the pitch curve.
    pub dedendum: f64,

    /// The tooth height above the pitch curve.
    pub addendum: f64,

    /// The arc length between two teeth.
    pub circular_pitch: f64,

    /// The bore radius.
    pub inner_radius: f64,
}

impl GearSpec {
    /// The dedendum of the module matching a half pitch.
    pub fn dedendum_of(half_pitch: f64) -> f64 {
        1.25 * Self::module_of(half_pitch)
    }

    /// The module matching a half pitch.
    pub fn module_of(half_pitch: f64) -> f64 {
        half_pitch * 2.0 / PI
    }

    /// The sizing of a gear with some half pitch.
    pub fn new(half_pitch: f64, teeth_count: usize, tooth_slices: usize, inner_radius: f64) -> Self {
        let module = Self::module_of(half_pitch);
        GearSpec {
            teeth_count,
            tooth_slices,
            dedendum: 1.25 * module,
            addendum: module,
            circular_pitch: half_pitch * 2.0,
            inner_radius,
        }
    }

    /// Half the circular pitch.
    pub fn half_pitch(&self) -> f64 {
        self.circular_pitch / 2.0
    }
}

/// The result of discretizing a pitch curve.
#[derive(Clone, Debug)]
pub struct Discretization {
    /// The anchors, starting with a crest at angle zero.
    pub anchors: AnchorSequence,

    /// The sizing of the gear.
    pub spec: GearSpec,

    /// The number of refinements it took.
    pub refinements: usize,
}

/// The outcome of one walk around the curve.
struct Walk {
    steps: usize,
    residual: f64,
    anchors: Vec<AnchorPoint>,
}

/// Walks a pitch curve placing alternating crest and gap anchors.
#[derive(Debug)]
pub struct PitchDiscretizer<'a> {
    curve: &'a PitchCurve,
    options: &'a Options,
}

impl<'a> PitchDiscretizer<'a> {
    /// Prepare to discretize a curve.
    pub fn new(curve: &'a PitchCurve, options: &'a Options) -> Self {
        PitchDiscretizer { curve, options }
    }

    /// The number of anchors to place: one per tooth and one per gap, or just one per tooth for
    /// circles.
    pub fn target_count(&self) -> usize {
        if self.curve.is_circular() {
            self.options.teeth_count
        } else {
            2 * self.options.teeth_count
        }
    }

    /// Refine the half pitch and then place the anchors.
    pub fn discretize(&self, observer: &mut dyn FnMut(&Progress)) -> Result<Discretization> {
        let (half_pitch, refinements) = self.refine(observer)?;
        let dedendum = GearSpec::dedendum_of(half_pitch);
        let walk = self.walk(half_pitch, dedendum, true)?;
        debug_assert!(walk.steps == self.target_count());

        let crests = walk
            .anchors
            .iter()
            .filter(|anchor| anchor.role == Role::Crest)
            .count();
        let spec = GearSpec::new(
            half_pitch,
            crests,
            self.options.tooth_slices,
            self.curve.inner_radius(0.0),
        );

        observer(&Progress::Refined {
            iterations: refinements,
            circular_pitch: spec.circular_pitch,
            dedendum: spec.dedendum,
            addendum: spec.addendum,
        });

        Ok(Discretization {
            anchors: AnchorSequence::new(walk.anchors),
            spec,
            refinements,
        })
    }

    /// Find the half pitch, returning it and the number of refinements it took.
    pub fn refine(&self, observer: &mut dyn FnMut(&Progress)) -> Result<(f64, usize)> {
        if self.curve.is_circular() && self.options.teeth_count % 2 != 0 {
            return Err(GearsError::invalid(
                "teeth count",
                format!(
                    "{} is odd; circle anchors alternate between teeth and gaps",
                    self.options.teeth_count
                ),
            ));
        }

        let target = self.target_count();
        let band = self.options.tolerance * 5.0;
        let mut half_pitch = self.curve.perimeter() / (2.0 * self.options.teeth_count as f64);
        let mut residual = 0.0;

        for iteration in 1..=self.options.max_refinements {
            let walk = self.walk(half_pitch, GearSpec::dedendum_of(half_pitch), false)?;
            residual = walk.residual;
            observer(&Progress::Refinement {
                iteration,
                steps: walk.steps,
                residual,
                half_pitch,
            });

            if walk.steps == target && (walk.residual - half_pitch).abs() < band {
                return Ok((half_pitch, iteration));
            }

            half_pitch =
                (half_pitch * walk.steps as f64 + walk.residual) / (target as f64 + 1.0);
        }

        Err(GearsError::RefinementNonConvergent {
            iterations: self.options.max_refinements,
            half_pitch,
            residual,
        })
    }

    fn root_point(&self, t: f64, dedendum: f64) -> Result<Point> {
        let radius = self.curve.outer_radius(t) - dedendum;
        if radius > 0.0 {
            Ok(polar_point(radius, t))
        } else {
            Err(GearsError::invalid(
                "teeth count",
                format!("dedendum {} reaches the gear axis at angle {}", dedendum, t),
            ))
        }
    }

    fn anchor(&self, t: f64, dedendum: f64, role: Role) -> AnchorPoint {
        let r = self.curve.outer_radius(t) - dedendum;
        let point = polar_point(r, t);
        AnchorPoint {
            x: point.x,
            y: point.y,
            r,
            t,
            curvature: self.curve.radius_of_curvature(t),
            tangent_dx: self.curve.dx(t),
            tangent_dy: self.curve.dy(t),
            role,
        }
    }

    /// Walk once around the root curve, placing an anchor whenever the accumulated distance
    /// reaches the half pitch.
    fn walk(&self, half_pitch: f64, dedendum: f64, record: bool) -> Result<Walk> {
        let target = self.target_count();
        let tolerance = self.options.tolerance;
        let samples_count = (2.0 * PI / tolerance).ceil() as usize;

        let mut anchors = Vec::new();
        if record {
            anchors.reserve(target);
            anchors.push(self.anchor(0.0, dedendum, Role::Crest));
        }

        let mut last_point = self.root_point(0.0, dedendum)?;
        let mut steps = 1;
        let mut accumulated = 0.0;

        for sample_index in 1..=samples_count {
            let t = sample_index as f64 * tolerance;
            let point = self.root_point(t, dedendum)?;
            accumulated += distance(last_point, point);
            last_point = point;

            if accumulated >= half_pitch && steps < target {
                if record {
                    let role = if steps % 2 == 0 { Role::Crest } else { Role::Gap };
                    anchors.push(self.anchor(t, dedendum, role));
                }
                steps += 1;
                accumulated = 0.0;
            }
        }

        Ok(Walk {
            steps,
            residual: accumulated,
            anchors,
        })
    }
}

#[cfg(test)]
fn ignore(_: &Progress) {}

#[cfg(test)]
fn arc_between(
    curve: &PitchCurve,
    dedendum: f64,
    tolerance: f64,
    from_t: f64,
    to_t: f64,
) -> f64 {
    let from_index = (from_t / tolerance).round() as usize;
    let to_index = (to_t / tolerance).round() as usize;
    (from_index..to_index)
        .map(|index| {
            let from = polar_point(
                curve.outer_radius(index as f64 * tolerance) - dedendum,
                index as f64 * tolerance,
            );
            let to = polar_point(
                curve.outer_radius((index + 1) as f64 * tolerance) - dedendum,
                (index + 1) as f64 * tolerance,
            );
            distance(from, to)
        })
        .sum()
}

#[cfg(test)]
#[test]
fn test_circle_anchors() {
    let curve = PitchCurve::circle(1.0, 0.125).unwrap();
    let options = Options {
        teeth_count: 20,
        depth: 0.2,
        tolerance: 0.001,
        ..Options::default()
    };
    let discretization = PitchDiscretizer::new(&curve, &options)
        .discretize(&mut ignore)
        .unwrap();

    let anchors = &discretization.anchors;
    let spec = discretization.spec;
    assert!(anchors.len() == 20);
    assert!(spec.teeth_count == 10);
    assert_float_absolute_eq!(spec.addendum * 1.25, spec.dedendum, 1e-12);
    assert_float_absolute_eq!(spec.circular_pitch / PI, spec.addendum, 1e-12);
    for (index, anchor) in anchors.iter().enumerate() {
        assert_float_absolute_eq!(anchor.r, 1.0 - spec.dedendum, options.tolerance);
        assert_float_absolute_eq!(anchor.curvature, 1.0, 1e-9);
        let role = if index % 2 == 0 { Role::Crest } else { Role::Gap };
        assert!(anchor.role == role);
    }
    assert!(anchors.at(20) == anchors.at(0));
    assert!(anchors.at(0).map(|anchor| anchor.t) == Some(0.0));
    assert!(AnchorSequence::default().at(0).is_none());
}

#[cfg(test)]
#[test]
fn test_ellipse_anchors() {
    let curve = PitchCurve::ellipse(1.0, 0.15, 2, 0.0625).unwrap();
    let options = Options {
        teeth_count: 30,
        ..Options::default()
    };
    let discretizer = PitchDiscretizer::new(&curve, &options);
    let mut refinements = 0;
    let discretization = discretizer
        .discretize(&mut |progress| {
            if let Progress::Refinement { .. } = progress {
                refinements += 1;
            }
        })
        .unwrap();

    assert!(discretization.refinements < 50);
    assert!(discretization.refinements == refinements);
    assert!(discretization.anchors.len() == 60);
    assert!(discretization.spec.teeth_count == 30);
    assert!(discretization.anchors.with_role(Role::Gap).len() == 30);

    let spec = discretization.spec;
    let anchors = discretization.anchors.as_slice();
    let band = options.tolerance * 5.0;
    for pair in anchors.windows(2) {
        let arc = arc_between(&curve, spec.dedendum, options.tolerance, pair[0].t, pair[1].t);
        assert_float_absolute_eq!(arc, spec.half_pitch(), band);
    }
    let closing = arc_between(
        &curve,
        spec.dedendum,
        options.tolerance,
        anchors[59].t,
        (2.0 * PI / options.tolerance).ceil() * options.tolerance,
    );
    assert_float_absolute_eq!(closing, spec.half_pitch(), band);
}

#[cfg(test)]
#[test]
fn test_deterministic() {
    let curve = PitchCurve::superellipse(1.0, 0.8, 2.5, 0.1).unwrap();
    let options = Options {
        teeth_count: 24,
        ..Options::default()
    };
    let discretizer = PitchDiscretizer::new(&curve, &options);
    let first = discretizer.discretize(&mut ignore).unwrap();
    let second = discretizer.discretize(&mut ignore).unwrap();
    assert!(first.anchors == second.anchors);
    assert!(first.spec == second.spec);
    assert!(first.anchors.len() == 48);
}

#[cfg(test)]
#[test]
fn test_refinement_cap() {
    // A single refinement is never enough from the perimeter seed; the loop must stop anyway.
    let curve = PitchCurve::ellipse(1.0, 0.15, 2, 0.0625).unwrap();
    let options = Options {
        teeth_count: 30,
        max_refinements: 1,
        ..Options::default()
    };
    assert!(matches!(
        PitchDiscretizer::new(&curve, &options).discretize(&mut ignore),
        Err(GearsError::RefinementNonConvergent { iterations: 1, .. })
    ));
}

#[cfg(test)]
#[test]
fn test_too_many_teeth_for_curve() {
    let curve = PitchCurve::circle(1.0, 0.0).unwrap();
    let options = Options {
        teeth_count: 2,
        ..Options::default()
    };
    assert!(matches!(
        PitchDiscretizer::new(&curve, &options).discretize(&mut ignore),
        Err(GearsError::InvalidParameter { .. })
    ));
}

#[cfg(test)]
#[test]
fn test_odd_circle_teeth() {
    let curve = PitchCurve::circle(1.0, 0.0).unwrap();
    let options = Options {
        teeth_count: 21,
        ..Options::default()
    };
    assert!(matches!(
        PitchDiscretizer::new(&curve, &options).discretize(&mut ignore),
        Err(GearsError::InvalidParameter {
            name: "teeth count",
            ..
        })
    ));

    let ellipse = PitchCurve::ellipse(1.0, 0.15, 2, 0.0625).unwrap();
    let discretization = PitchDiscretizer::new(&ellipse, &options)
        .discretize(&mut ignore)
        .unwrap();
    assert!(discretization.anchors.len() == 42);
}
