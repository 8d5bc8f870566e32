//! Deriving the pitch anchors of a gear that meshes with a given gear.
//!
//! Each tooth of the conjugate gear sits in a gap of the reference gear. The two anchors of a
//! meshing pair are on the line between the gear axes, so their radii sum to the center distance
//! (less twice the dedendum, as the reference anchors are on its root curve). The angle the
//! conjugate gear turns between two teeth follows from the law of cosines on the chord between
//! the two matching gaps.

use crate::discretize::AnchorPoint;
use crate::discretize::AnchorSequence;
use crate::discretize::Role;
use crate::error::ConjugateFailure;
use crate::error::GearsError;
use crate::error::Result;
use crate::geometry::distance;
use crate::geometry::polar_point;
use crate::geometry::wrap_angle;
use crate::options::Options;
use crate::options::Progress;
use std::f64::consts::PI;

/// A point given by its polar coordinates around a gear axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PolarPoint {
    /// The distance from the axis.
    pub r: f64,

    /// The angle around the axis, in `[0, 2π)`.
    pub t: f64,
}

/// The solved conjugate gear.
#[derive(Clone, Debug)]
pub struct Conjugate {
    /// The conjugate anchors; all of them are crests.
    pub anchors: AnchorSequence,

    /// The accepted distance between the gear axes.
    pub center_distance: f64,

    /// The number of center distances tried.
    pub iterations: usize,
}

enum Sweep {
    Infeasible,
    Swept { points: Vec<PolarPoint>, swept: f64 },
}

/// Searches for the center distance at which the conjugate anchors close into a loop.
#[derive(Debug)]
pub struct ConjugateSolver<'a> {
    gaps: Vec<AnchorPoint>,
    dedendum: f64,
    options: &'a Options,
}

impl<'a> ConjugateSolver<'a> {
    /// Prepare to mesh with the gaps of a reference gear.
    pub fn new(anchors: &AnchorSequence, dedendum: f64, options: &'a Options) -> Result<Self> {
        let gaps = anchors.with_role(Role::Gap);
        if gaps.is_empty() {
            return Err(GearsError::invalid(
                "teeth count",
                "the reference gear has no gaps",
            ));
        }
        Ok(ConjugateSolver {
            gaps,
            dedendum,
            options,
        })
    }

    /// The number of conjugate anchors: one per gap for each turn of the reference gear.
    pub fn target_count(&self) -> usize {
        self.gaps.len() * self.options.period_factor
    }

    /// Search for the closing center distance, starting from a guess.
    pub fn solve(
        &self,
        mut center_distance: f64,
        observer: &mut dyn FnMut(&Progress),
    ) -> Result<Conjugate> {
        let target = self.target_count();
        let tolerance = self.options.tolerance;

        for iteration in 1..=self.options.max_center_iterations {
            let (mut points, swept) = match self.sweep(center_distance)? {
                Sweep::Infeasible => {
                    center_distance += tolerance;
                    continue;
                }
                Sweep::Swept { points, swept } => (points, swept),
            };

            let steps = points.len() - 1;
            if steps < target {
                center_distance += tolerance;
                continue;
            }
            if steps > target {
                center_distance -= tolerance;
                continue;
            }

            let first = points[0];
            let last = points[steps];
            let gap = distance(polar_point(first.r, first.t), polar_point(last.r, last.t));
            observer(&Progress::CenterDistance {
                iteration,
                center_distance,
                gap,
            });

            if gap >= tolerance * 10.0 {
                if swept >= 2.0 * PI {
                    center_distance += tolerance;
                } else {
                    center_distance -= tolerance;
                }
                continue;
            }

            observer(&Progress::Closed {
                iterations: iteration,
                center_distance,
            });
            points.pop();
            return Ok(Conjugate {
                anchors: self.anchors(&points),
                center_distance,
                iterations: iteration,
            });
        }

        Err(GearsError::ConjugateNonConvergent {
            center_distance,
            cause: ConjugateFailure::IterationCap {
                iterations: self.options.max_center_iterations,
            },
        })
    }

    /// Walk the conjugate curve at a fixed center distance until it turns once.
    fn sweep(&self, center_distance: f64) -> Result<Sweep> {
        let limit = 2 * self.target_count() + 1;
        let first = &self.gaps[0];
        let radius = center_distance - (first.r + 2.0 * self.dedendum);
        if radius < 0.0 {
            return Ok(Sweep::Infeasible);
        }

        let mut points = vec![PolarPoint {
            r: radius,
            t: wrap_angle(PI - first.t),
        }];
        let mut swept = 0.0;

        while points.len() <= limit {
            let step = points.len();
            let anchor = &self.gaps[step % self.gaps.len()];
            if center_distance - (anchor.r + 2.0 * self.dedendum) < 0.0 {
                return Ok(Sweep::Infeasible);
            }

            let (point, delta) = conjugate_step(
                &self.gaps[(step - 1) % self.gaps.len()],
                anchor,
                points[step - 1],
                center_distance,
                self.dedendum,
                step,
            )?;
            points.push(point);
            swept += delta;
            if swept >= 2.0 * PI - delta / 2.0 {
                break;
            }
        }

        Ok(Sweep::Swept { points, swept })
    }

    fn anchors(&self, points: &[PolarPoint]) -> AnchorSequence {
        let count = points.len();
        let cartesian: Vec<_> = points
            .iter()
            .map(|point| polar_point(point.r, point.t))
            .collect();

        let anchors = points
            .iter()
            .enumerate()
            .map(|(index, point)| {
                let before = cartesian[(index + count - 1) % count];
                let after = cartesian[(index + 1) % count];
                AnchorPoint {
                    x: cartesian[index].x,
                    y: cartesian[index].y,
                    r: point.r,
                    t: point.t,
                    curvature: self.gaps[index % self.gaps.len()].curvature,
                    tangent_dx: (after.x - before.x) / 2.0,
                    tangent_dy: (after.y - before.y) / 2.0,
                    role: Role::Crest,
                }
            })
            .collect();

        AnchorSequence::new(anchors)
    }
}

fn conjugate_step(
    previous_anchor: &AnchorPoint,
    anchor: &AnchorPoint,
    previous: PolarPoint,
    center_distance: f64,
    dedendum: f64,
    step: usize,
) -> Result<(PolarPoint, f64)> {
    let radius = center_distance - (anchor.r + 2.0 * dedendum);
    let denominator = -2.0 * radius * previous.r;
    if denominator == 0.0 {
        return Err(GearsError::ConjugateNonConvergent {
            center_distance,
            cause: ConjugateFailure::ZeroRadius { step },
        });
    }

    let mut delta_t = anchor.t - previous_anchor.t;
    if delta_t < 0.0 {
        delta_t += 2.0 * PI;
    }

    let numerator = anchor.r * anchor.r + previous_anchor.r * previous_anchor.r
        - 2.0 * anchor.r * previous_anchor.r * delta_t.cos()
        - radius * radius
        - previous.r * previous.r;
    let delta = (numerator / denominator).max(-1.0).min(1.0).acos();

    Ok((
        PolarPoint {
            r: radius,
            t: wrap_angle(previous.t + delta),
        },
        delta,
    ))
}

/// Trace the curve meshing with a sequence of anchors at a fixed center distance.
///
/// Returns `steps + 1` points, the first facing the first anchor across the center line. Tracing
/// the anchors of a closed conjugate at its center distance gives back the gaps it meshes with.
pub fn trace_conjugate(
    anchors: &[AnchorPoint],
    center_distance: f64,
    dedendum: f64,
    steps: usize,
) -> Result<Vec<PolarPoint>> {
    if anchors.is_empty() {
        return Err(GearsError::invalid("anchors", "empty sequence"));
    }

    let mut points = Vec::with_capacity(steps + 1);
    points.push(PolarPoint {
        r: center_distance - (anchors[0].r + 2.0 * dedendum),
        t: wrap_angle(PI - anchors[0].t),
    });

    for step in 1..=steps {
        let (point, _) = conjugate_step(
            &anchors[(step - 1) % anchors.len()],
            &anchors[step % anchors.len()],
            points[step - 1],
            center_distance,
            dedendum,
            step,
        )?;
        points.push(point);
    }

    Ok(points)
}

#[cfg(test)]
use crate::curve::PitchCurve;
#[cfg(test)]
use crate::discretize::Discretization;
#[cfg(test)]
use crate::discretize::PitchDiscretizer;

#[cfg(test)]
fn ignore(_: &Progress) {}

#[cfg(test)]
fn angle_difference(left: f64, right: f64) -> f64 {
    let difference = wrap_angle(left - right);
    difference.min(2.0 * PI - difference)
}

#[cfg(test)]
fn elliptical(options: &Options) -> Discretization {
    let curve = PitchCurve::ellipse(1.0, 0.15, 2, 0.0625).unwrap();
    PitchDiscretizer::new(&curve, options)
        .discretize(&mut ignore)
        .unwrap()
}

#[cfg(test)]
#[test]
fn test_closes_from_below() {
    let options = Options {
        teeth_count: 20,
        period_factor: 2,
        ..Options::default()
    };
    let reference = elliptical(&options);
    let solver =
        ConjugateSolver::new(&reference.anchors, reference.spec.dedendum, &options).unwrap();
    assert!(solver.target_count() == 40);

    let mut closed = 0;
    let conjugate = solver
        .solve(1.0, &mut |progress| {
            if let Progress::Closed { .. } = progress {
                closed += 1;
            }
        })
        .unwrap();
    assert!(closed == 1);
    assert!(conjugate.anchors.len() == 40);
    assert!(conjugate.iterations < options.max_center_iterations);
    assert_float_absolute_eq!(conjugate.center_distance, 2.866, 0.01);
    assert!(conjugate
        .anchors
        .iter()
        .all(|anchor| anchor.role == Role::Crest && anchor.r > 0.0));

    let gaps = reference.anchors.with_role(Role::Gap);
    let sweep = trace_conjugate(
        &gaps,
        conjugate.center_distance,
        reference.spec.dedendum,
        40,
    )
    .unwrap();
    let first = polar_point(sweep[0].r, sweep[0].t);
    let last = polar_point(sweep[40].r, sweep[40].t);
    assert!(distance(first, last) < options.tolerance * 10.0);
}

#[cfg(test)]
#[test]
fn test_rederives_reference() {
    let options = Options {
        teeth_count: 20,
        period_factor: 2,
        ..Options::default()
    };
    let reference = elliptical(&options);
    let solver =
        ConjugateSolver::new(&reference.anchors, reference.spec.dedendum, &options).unwrap();
    let conjugate = solver.solve(3.0, &mut ignore).unwrap();
    assert_float_absolute_eq!(conjugate.center_distance, 2.868, 0.01);

    let gaps = reference.anchors.with_role(Role::Gap);
    let traced = trace_conjugate(
        conjugate.anchors.as_slice(),
        conjugate.center_distance,
        reference.spec.dedendum,
        conjugate.anchors.len() - 1,
    )
    .unwrap();
    for (index, point) in traced.iter().enumerate() {
        let gap = &gaps[index % gaps.len()];
        assert_float_absolute_eq!(point.r, gap.r, options.tolerance * 10.0);
        assert!(angle_difference(point.t, gap.t) < options.tolerance * 10.0);
    }

    for anchor in conjugate.anchors.iter() {
        assert!(anchor.tangent_dx.hypot(anchor.tangent_dy) > 0.0);
    }
}

#[cfg(test)]
#[test]
fn test_iteration_cap() {
    let options = Options {
        teeth_count: 20,
        period_factor: 2,
        max_center_iterations: 5,
        ..Options::default()
    };
    let reference = elliptical(&options);
    let solver =
        ConjugateSolver::new(&reference.anchors, reference.spec.dedendum, &options).unwrap();
    assert!(matches!(
        solver.solve(1.0, &mut ignore),
        Err(GearsError::ConjugateNonConvergent {
            cause: ConjugateFailure::IterationCap { iterations: 5 },
            ..
        })
    ));
}

#[cfg(test)]
#[test]
fn test_zero_radius() {
    let anchors: Vec<_> = (0..4)
        .map(|index| {
            let t = index as f64 * PI / 2.0;
            let point = polar_point(1.0, t);
            AnchorPoint {
                x: point.x,
                y: point.y,
                r: 1.0,
                t,
                curvature: 1.0,
                tangent_dx: -t.sin(),
                tangent_dy: t.cos(),
                role: Role::Gap,
            }
        })
        .collect();
    let options = Options::default();
    let solver = ConjugateSolver::new(&AnchorSequence::new(anchors), 0.25, &options).unwrap();
    assert!(matches!(
        solver.solve(1.5, &mut ignore),
        Err(GearsError::ConjugateNonConvergent {
            cause: ConjugateFailure::ZeroRadius { step: 1 },
            ..
        })
    ));
}

#[cfg(test)]
#[test]
fn test_no_gaps() {
    let anchors = AnchorSequence::new(vec![]);
    let options = Options::default();
    assert!(matches!(
        ConjugateSolver::new(&anchors, 0.25, &options),
        Err(GearsError::InvalidParameter { .. })
    ));
}
