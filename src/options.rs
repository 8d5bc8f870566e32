//! Options controlling the computation, and the progress it reports.

use crate::error::GearsError;
use crate::error::Result;
use log::debug;

/// Options for computing a gear (pair).
#[derive(Clone, Debug, PartialEq)]
pub struct Options {
    /// The number of teeth on the pitch curve.
    pub teeth_count: usize,

    /// The number of points along each side of a tooth.
    pub tooth_slices: usize,

    /// The extrusion depth (only carried through to the output).
    pub depth: f64,

    /// Both the angular sampling step of the pitch walk and the base of all convergence bands.
    pub tolerance: f64,

    /// How many times the reference gear turns for one turn of the conjugate gear.
    pub period_factor: usize,

    /// The maximal number of half pitch refinements.
    pub max_refinements: usize,

    /// The maximal number of center distances to try.
    pub max_center_iterations: usize,

    /// The parameter step of the tabulated involute.
    pub involute_step: f64,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            teeth_count: 20,
            tooth_slices: 10,
            depth: 0.2,
            tolerance: 0.001,
            period_factor: 1,
            max_refinements: 100,
            max_center_iterations: 200_000,
            involute_step: 0.01,
        }
    }
}

impl Options {
    /// Ensure the options are valid.
    pub fn validate(&self) -> Result<()> {
        if self.teeth_count == 0 {
            return Err(GearsError::invalid("teeth count", "zero"));
        }

        if self.tooth_slices < 2 {
            return Err(GearsError::invalid(
                "tooth slices",
                format!("{} is less than 2", self.tooth_slices),
            ));
        }

        if !self.depth.is_finite() || self.depth < 0.0 {
            return Err(GearsError::invalid(
                "depth",
                format!("{} is negative", self.depth),
            ));
        }

        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(GearsError::invalid(
                "tolerance",
                format!("{} is not positive", self.tolerance),
            ));
        }

        if self.period_factor == 0 {
            return Err(GearsError::invalid("period factor", "zero"));
        }

        if self.max_refinements == 0 {
            return Err(GearsError::invalid("maximal refinements", "zero"));
        }

        if self.max_center_iterations == 0 {
            return Err(GearsError::invalid("maximal center iterations", "zero"));
        }

        if !self.involute_step.is_finite() || self.involute_step <= 0.0 {
            return Err(GearsError::invalid(
                "involute step",
                format!("{} is not positive", self.involute_step),
            ));
        }

        Ok(())
    }
}

/// The shape parameters of the conjugate gear.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConjugateParams {
    /// The initial guess of the distance between the two gear axes.
    pub center_distance: f64,

    /// The bore radius of the conjugate gear.
    pub inner_radius: f64,
}

impl ConjugateParams {
    /// Ensure the parameters are valid.
    pub fn validate(&self) -> Result<()> {
        if !self.center_distance.is_finite() || self.center_distance <= 0.0 {
            return Err(GearsError::invalid(
                "center distance",
                format!("{} is not positive", self.center_distance),
            ));
        }

        if !self.inner_radius.is_finite() || self.inner_radius < 0.0 {
            return Err(GearsError::invalid(
                "conjugate inner radius",
                format!("{} is negative", self.inner_radius),
            ));
        }

        Ok(())
    }
}

/// A step of the computation, reported to an observer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Progress {
    /// One walk of the half pitch refinement.
    Refinement {
        /// The refinement number (starting at 1).
        iteration: usize,
        /// The number of anchors the walk placed.
        steps: usize,
        /// The arc left over at the end of the walk.
        residual: f64,
        /// The half pitch used by the walk.
        half_pitch: f64,
    },

    /// The half pitch refinement converged.
    Refined {
        /// The number of refinements it took.
        iterations: usize,
        /// The final circular pitch.
        circular_pitch: f64,
        /// The final dedendum.
        dedendum: f64,
        /// The final addendum.
        addendum: f64,
    },

    /// One sweep of the center distance search that placed the right number of anchors.
    CenterDistance {
        /// The search iteration (starting at 1).
        iteration: usize,
        /// The center distance used by the sweep.
        center_distance: f64,
        /// The distance between the first and last conjugate points.
        gap: f64,
    },

    /// The conjugate curve closed.
    Closed {
        /// The number of center distances tried.
        iterations: usize,
        /// The accepted center distance.
        center_distance: f64,
    },

    /// A tooth tip was clipped so its two flanks do not cross.
    ClippedTooth {
        /// The index of the anchor.
        index: usize,
        /// The involute parameter at the addendum.
        t_addendum: f64,
        /// The involute parameter it was clipped to.
        t_clip: f64,
    },
}

/// Report progress to the log; this is the observer used when none is given.
pub fn log_progress(progress: &Progress) {
    match progress {
        Progress::Refinement {
            iteration,
            steps,
            residual,
            half_pitch,
        } => debug!(
            "refinement {}, half-teeth = {}, extra = {}, c pitch = {}",
            iteration,
            steps,
            residual,
            half_pitch * 2.0
        ),
        Progress::Refined {
            iterations,
            circular_pitch,
            dedendum,
            addendum,
        } => debug!(
            "refined in {} iterations, circular pitch = {}, dedendum = {}, addendum = {}",
            iterations, circular_pitch, dedendum, addendum
        ),
        Progress::CenterDistance {
            iteration,
            center_distance,
            gap,
        } => debug!(
            "center distance {} at iteration {} leaves gap {}",
            center_distance, iteration, gap
        ),
        Progress::Closed {
            iterations,
            center_distance,
        } => debug!(
            "conjugate closed at center distance {} after {} iterations",
            center_distance, iterations
        ),
        Progress::ClippedTooth {
            index,
            t_addendum,
            t_clip,
        } => debug!("clipping tooth {}: {} {}", index, t_addendum, t_clip),
    }
}

#[cfg(test)]
#[test]
fn test_validate() {
    assert!(Options::default().validate().is_ok());

    let invalid = vec![
        Options {
            teeth_count: 0,
            ..Options::default()
        },
        Options {
            tooth_slices: 1,
            ..Options::default()
        },
        Options {
            depth: -1.0,
            ..Options::default()
        },
        Options {
            tolerance: 0.0,
            ..Options::default()
        },
        Options {
            period_factor: 0,
            ..Options::default()
        },
        Options {
            max_refinements: 0,
            ..Options::default()
        },
        Options {
            involute_step: f64::NAN,
            ..Options::default()
        },
    ];
    for options in invalid {
        assert!(matches!(
            options.validate(),
            Err(GearsError::InvalidParameter { .. })
        ));
    }

    let params = ConjugateParams {
        center_distance: 3.0,
        inner_radius: 0.0625,
    };
    assert!(params.validate().is_ok());
    assert!(ConjugateParams {
        center_distance: 0.0,
        ..params
    }
    .validate()
    .is_err());
}
