// Copyright (C) 2021 Oren Ben-Kiki
//
// This program is free software: you can redistribute it and/or modify it under the terms of the
// GNU Affero General Public License as published by the Free Software Foundation, either version 3
// of the License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without
// even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU
// Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License along with this program.
// If not, see <https://www.gnu.org/licenses/>.

//! Generate conjugate pairs of (possibly non-circular) gears.
//!
//! A gear starts as a closed analytic pitch curve. Anchors are placed along it so that the teeth
//! and the gaps between them are evenly spaced, and a mating curve is derived so the two gears
//! roll against each other without slipping. Each tooth is an involute of the local circle of
//! curvature, and the teeth are joined into a closed outline of line segments.
//!
//! Curves that roll against a copy of themselves (such as an ellipse turning around a focus) can
//! instead be paired with a second gear of the same shape, whose teeth sit where the first one has
//! gaps.

#[cfg(test)]
#[macro_use]
extern crate assert_float_eq;

pub mod conjugate;
pub mod curve;
pub mod discretize;
pub mod error;
pub mod geometry;
pub mod options;
pub mod outline;
pub mod output;
pub mod program;
pub mod tooth;

use crate::conjugate::ConjugateSolver;
use crate::curve::PitchCurve;
use crate::discretize::AnchorPoint;
use crate::discretize::AnchorSequence;
use crate::discretize::GearSpec;
use crate::discretize::PitchDiscretizer;
use crate::discretize::Role;
use crate::error::GearsError;
use crate::error::Result;
use crate::geometry::Point;
use crate::options::log_progress;
use crate::options::ConjugateParams;
use crate::options::Options;
use crate::options::Progress;
use crate::outline::GearOutline;
use crate::outline::SegmentAssembler;
use log::info;
use ordered_float::OrderedFloat;
use std::f64::consts::PI;

/// A single gear.
#[derive(Clone, Debug)]
pub struct Gear {
    /// The outline of the gear, around its axis at the origin.
    pub outline: GearOutline,

    /// The tooth and gap anchors along the pitch curve.
    pub anchors: AnchorSequence,

    /// The sizing of the teeth.
    pub spec: GearSpec,

    /// The number of half pitch refinements it took.
    pub refinements: usize,
}

/// A reference gear together with the gear that meshes with it.
#[derive(Clone, Debug)]
pub struct GearPair {
    /// The outline of the reference gear, around its axis at the origin.
    pub gear: GearOutline,

    /// The outline of the conjugate gear, around its axis at `(center_distance, 0)`.
    pub conjugate: GearOutline,

    /// The distance between the two gear axes.
    pub center_distance: f64,

    /// The anchors of the reference gear.
    pub anchors: AnchorSequence,

    /// The anchors of the conjugate gear (around its own axis).
    pub conjugate_anchors: AnchorSequence,

    /// The sizing of the reference gear teeth.
    pub spec: GearSpec,

    /// The sizing of the conjugate gear teeth.
    pub conjugate_spec: GearSpec,

    /// The number of half pitch refinements it took.
    pub refinements: usize,

    /// The number of center distances tried.
    pub center_iterations: usize,
}

/// A gear together with a gear of the same shape, whose teeth are shifted by half a pitch.
#[derive(Clone, Debug)]
pub struct OffsetPair {
    /// The outline of the first gear, around its axis at the origin.
    pub gear: GearOutline,

    /// The outline of the mate, around its axis at `(center_distance, 0)`.
    pub mate: GearOutline,

    /// The distance between the two gear axes.
    pub center_distance: f64,

    /// The angle the mate is turned by (before moving it to its axis).
    pub rotation: f64,

    /// The anchors of the first gear.
    pub anchors: AnchorSequence,

    /// The anchors of the mate (around its own axis, before turning it).
    pub mate_anchors: AnchorSequence,

    /// The sizing of the first gear teeth.
    pub spec: GearSpec,

    /// The sizing of the mate teeth.
    pub mate_spec: GearSpec,

    /// The number of half pitch refinements it took.
    pub refinements: usize,
}

/// Compute a single gear, logging the progress.
pub fn compute_gear(curve: &PitchCurve, options: &Options) -> Result<Gear> {
    compute_gear_with(curve, options, &mut log_progress)
}

/// Compute a single gear, reporting the progress to an observer.
pub fn compute_gear_with(
    curve: &PitchCurve,
    options: &Options,
    observer: &mut dyn FnMut(&Progress),
) -> Result<Gear> {
    options.validate()?;
    let discretization = PitchDiscretizer::new(curve, options).discretize(observer)?;
    let outline = SegmentAssembler::new(&discretization.spec, options)
        .assemble(&discretization.anchors, observer)?;
    info!(
        "gear: {} teeth, circular pitch: {}, segments: {}",
        discretization.spec.teeth_count,
        discretization.spec.circular_pitch,
        outline.segments().len()
    );
    Ok(Gear {
        outline,
        anchors: discretization.anchors,
        spec: discretization.spec,
        refinements: discretization.refinements,
    })
}

/// Compute a gear and its conjugate, logging the progress.
pub fn compute_gear_pair(
    curve: &PitchCurve,
    params: &ConjugateParams,
    options: &Options,
) -> Result<GearPair> {
    compute_gear_pair_with(curve, params, options, &mut log_progress)
}

/// Compute a gear and its conjugate, reporting the progress to an observer.
pub fn compute_gear_pair_with(
    curve: &PitchCurve,
    params: &ConjugateParams,
    options: &Options,
    observer: &mut dyn FnMut(&Progress),
) -> Result<GearPair> {
    params.validate()?;
    let gear = compute_gear_with(curve, options, observer)?;

    let conjugate = ConjugateSolver::new(&gear.anchors, gear.spec.dedendum, options)?
        .solve(params.center_distance, observer)?;
    let smallest_radius = conjugate
        .anchors
        .iter()
        .map(|anchor| anchor.r)
        .fold(f64::INFINITY, f64::min);
    if params.inner_radius >= smallest_radius {
        return Err(GearsError::invalid(
            "conjugate inner radius",
            format!(
                "{} is not inside the conjugate root curve (minimal radius: {})",
                params.inner_radius, smallest_radius
            ),
        ));
    }

    let conjugate_spec = GearSpec::new(
        gear.spec.half_pitch(),
        conjugate.anchors.len(),
        options.tooth_slices,
        params.inner_radius,
    );
    let conjugate_outline = SegmentAssembler::new(&conjugate_spec, options)
        .assemble(&conjugate.anchors, observer)?
        .translated(Point {
            x: conjugate.center_distance,
            y: 0.0,
        });
    info!(
        "conjugate: {} teeth, center distance: {}, iterations: {}",
        conjugate_spec.teeth_count, conjugate.center_distance, conjugate.iterations
    );

    Ok(GearPair {
        gear: gear.outline,
        conjugate: conjugate_outline,
        center_distance: conjugate.center_distance,
        anchors: gear.anchors,
        conjugate_anchors: conjugate.anchors,
        spec: gear.spec,
        conjugate_spec,
        refinements: gear.refinements,
        center_iterations: conjugate.iterations,
    })
}

/// Compute a gear and a mate of the same shape, logging the progress.
pub fn compute_offset_pair(curve: &PitchCurve, options: &Options) -> Result<OffsetPair> {
    compute_offset_pair_with(curve, options, &mut log_progress)
}

/// Compute a gear and a mate of the same shape, reporting the progress to an observer.
///
/// The first gear faces the mate with its anchor at angle zero. The mate is the same curve turned
/// so that the anchor whose radius differs the most from that one faces back, and its teeth are
/// placed on the anchors of the other role, so a tooth always meets a gap. The two only roll
/// without slipping when the facing radii of the curve always sum to the same distance, as they
/// do for an ellipse turning around a focus.
pub fn compute_offset_pair_with(
    curve: &PitchCurve,
    options: &Options,
    observer: &mut dyn FnMut(&Progress),
) -> Result<OffsetPair> {
    let gear = compute_gear_with(curve, options, observer)?;

    let first = *gear
        .anchors
        .at(0)
        .ok_or_else(|| GearsError::invalid("teeth count", "no anchors were placed"))?;
    let facing = gear
        .anchors
        .iter()
        .max_by_key(|anchor| OrderedFloat((anchor.r - first.r).abs()))
        .ok_or_else(|| GearsError::invalid("teeth count", "no anchors were placed"))?;

    let mate_role = match facing.role {
        Role::Crest => Role::Gap,
        Role::Gap => Role::Crest,
    };
    let mate_anchors = AnchorSequence::new(
        gear.anchors
            .iter()
            .map(|anchor| AnchorPoint {
                role: if anchor.role == mate_role {
                    Role::Crest
                } else {
                    Role::Gap
                },
                ..*anchor
            })
            .collect(),
    );
    let mate_spec = GearSpec::new(
        gear.spec.half_pitch(),
        gear.anchors.with_role(mate_role).len(),
        options.tooth_slices,
        gear.spec.inner_radius,
    );

    let center_distance = curve.outer_radius(first.t) + curve.outer_radius(facing.t);
    let rotation = PI - facing.t;
    let mate = SegmentAssembler::new(&mate_spec, options)
        .assemble(&mate_anchors, observer)?
        .rotated(rotation)
        .translated(Point {
            x: center_distance,
            y: 0.0,
        });
    info!(
        "mate: {} teeth, center distance: {}, rotation: {}",
        mate_spec.teeth_count, center_distance, rotation
    );

    Ok(OffsetPair {
        gear: gear.outline,
        mate,
        center_distance,
        rotation,
        anchors: gear.anchors,
        mate_anchors,
        spec: gear.spec,
        mate_spec,
        refinements: gear.refinements,
    })
}

#[cfg(test)]
#[test]
fn test_single_gear() {
    let curve = PitchCurve::ellipse(1.0, 0.15, 2, 0.0625).unwrap();
    let options = Options {
        teeth_count: 30,
        ..Options::default()
    };
    let gear = compute_gear(&curve, &options).unwrap();
    assert!(gear.anchors.len() == 60);
    assert!(gear.spec.teeth_count == 30);
    assert!(!gear.outline.segments().is_empty());
}

#[cfg(test)]
#[test]
fn test_gear_pair() {
    let curve = PitchCurve::ellipse(1.0, 0.15, 2, 0.0625).unwrap();
    let options = Options {
        teeth_count: 20,
        period_factor: 2,
        ..Options::default()
    };
    let params = ConjugateParams {
        center_distance: 3.0,
        inner_radius: 0.125,
    };

    let mut events = Vec::new();
    let pair = compute_gear_pair_with(&curve, &params, &options, &mut |progress| {
        events.push(*progress)
    })
    .unwrap();

    assert!(pair.conjugate_anchors.len() == 40);
    assert!(pair.conjugate_spec.teeth_count == 40);
    assert!(pair.conjugate_spec.circular_pitch == pair.spec.circular_pitch);
    assert!(pair.conjugate_spec.inner_radius == 0.125);
    assert_float_absolute_eq!(pair.center_distance, 2.868, 0.01);
    assert!(pair
        .conjugate_anchors
        .iter()
        .all(|anchor| anchor.role == Role::Crest));

    let refined = events
        .iter()
        .filter(|event| matches!(event, Progress::Refined { .. }))
        .count();
    assert!(refined == 1);
    assert!(matches!(
        events.last(),
        Some(Progress::Closed { .. }) | Some(Progress::ClippedTooth { .. })
    ));

    let minimal_x = pair
        .conjugate
        .segments()
        .iter()
        .map(|(from, _)| from.x)
        .fold(f64::INFINITY, f64::min);
    assert!(minimal_x > 0.0);
}

#[cfg(test)]
#[test]
fn test_invalid_pair() {
    let curve = PitchCurve::circle(1.0, 0.0).unwrap();
    let params = ConjugateParams {
        center_distance: -1.0,
        inner_radius: 0.0,
    };
    assert!(matches!(
        compute_gear_pair(&curve, &params, &Options::default()),
        Err(GearsError::InvalidParameter { .. })
    ));
    assert!(matches!(
        compute_gear(
            &curve,
            &Options {
                tolerance: -1.0,
                ..Options::default()
            }
        ),
        Err(GearsError::InvalidParameter { .. })
    ));
}

#[cfg(test)]
#[test]
fn test_superellipse_pair() {
    let options = Options {
        teeth_count: 24,
        ..Options::default()
    };
    for exponent in &[2.5, 3.0, 4.0] {
        let curve = PitchCurve::superellipse(1.0, 0.8, *exponent, 0.0625).unwrap();
        let gear = compute_gear(&curve, &options).unwrap();
        assert!(gear.spec.teeth_count == 24);
        assert!(!gear.outline.segments().is_empty());
    }

    let curve = PitchCurve::superellipse(1.0, 0.8, 2.5, 0.0625).unwrap();
    let params = ConjugateParams {
        center_distance: 1.5,
        inner_radius: 0.0625,
    };
    let pair = compute_gear_pair(&curve, &params, &options).unwrap();
    assert!(pair.conjugate_anchors.len() == 24);
    assert_float_absolute_eq!(pair.center_distance, 1.862, 0.01);
    assert!(!pair.conjugate.segments().is_empty());
}

#[cfg(test)]
#[test]
fn test_conjugate_bore_too_large() {
    let curve = PitchCurve::ellipse(1.0, 0.15, 2, 0.0625).unwrap();
    let options = Options {
        teeth_count: 20,
        period_factor: 2,
        ..Options::default()
    };
    let params = ConjugateParams {
        center_distance: 3.0,
        inner_radius: 5.0,
    };
    assert!(matches!(
        compute_gear_pair(&curve, &params, &options),
        Err(GearsError::InvalidParameter {
            name: "conjugate inner radius",
            ..
        })
    ));
}

#[cfg(test)]
#[test]
fn test_offset_pair() {
    let curve = PitchCurve::ellipse(1.0, 0.2, 1, 0.0625).unwrap();
    let options = Options {
        teeth_count: 20,
        ..Options::default()
    };
    let pair = compute_offset_pair(&curve, &options).unwrap();

    assert_float_absolute_eq!(pair.center_distance, 2.0, 1e-3);
    assert!(pair.rotation.abs() < 0.05);
    assert!(pair.mate_spec.teeth_count == 20);
    assert!(pair.mate_spec.circular_pitch == pair.spec.circular_pitch);

    let mate_teeth: Vec<f64> = pair
        .mate_anchors
        .with_role(Role::Crest)
        .iter()
        .map(|anchor| anchor.t)
        .collect();
    let gaps: Vec<f64> = pair
        .anchors
        .with_role(Role::Gap)
        .iter()
        .map(|anchor| anchor.t)
        .collect();
    assert!(mate_teeth == gaps);

    let minimal_x = pair
        .mate
        .segments()
        .iter()
        .map(|(from, _)| from.x)
        .fold(f64::INFINITY, f64::min);
    assert!(minimal_x > 0.5);
}

#[cfg(test)]
#[test]
fn test_offset_pair_odd_teeth() {
    let curve = PitchCurve::ellipse(1.0, 0.2, 1, 0.0625).unwrap();
    let options = Options {
        teeth_count: 21,
        ..Options::default()
    };
    let pair = compute_offset_pair(&curve, &options).unwrap();

    // With an odd number of teeth the gear already meshes with an unshifted copy of itself.
    assert!(pair.mate_spec.teeth_count == 21);
    assert!(pair.mate_anchors == pair.anchors);
    assert_float_absolute_eq!(pair.center_distance, 2.0, 1e-3);
}
