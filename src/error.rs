//! Errors reported while computing gears.

/// Why the center distance search gave up.
#[derive(Clone, Copy, Debug, PartialEq, thiserror::Error)]
pub enum ConjugateFailure {
    /// The search did not close the conjugate curve within its iteration budget.
    #[error("no closing center distance after {iterations} iterations")]
    IterationCap {
        /// The number of center distances tried.
        iterations: usize,
    },

    /// The law of cosines step divided by a zero radius product.
    #[error("zero conjugate radius at step {step}")]
    ZeroRadius {
        /// The step of the conjugate walk.
        step: usize,
    },
}

/// Everything that can go wrong while computing a gear or a gear pair.
///
/// None of these is retried internally; the caller decides whether to adjust the parameters and
/// try again.
#[derive(Debug, thiserror::Error)]
pub enum GearsError {
    /// A shape, count or option is out of range. Detected before any iteration.
    #[error("invalid {name}: {reason}")]
    InvalidParameter {
        /// The offending parameter.
        name: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// The half pitch refinement exceeded its iteration budget.
    #[error(
        "pitch refinement did not converge after {iterations} iterations \
         (half pitch: {half_pitch}, residual: {residual})"
    )]
    RefinementNonConvergent {
        /// The number of refinements performed.
        iterations: usize,
        /// The last half pitch tried.
        half_pitch: f64,
        /// The arc left over by the last walk.
        residual: f64,
    },

    /// No center distance closes the conjugate curve; usually an infeasible configuration.
    #[error("conjugate curve did not close at center distance {center_distance}: {cause}")]
    ConjugateNonConvergent {
        /// The last center distance tried.
        center_distance: f64,
        /// Why the search stopped.
        cause: ConjugateFailure,
    },

    /// The tangent at an anchor is zero so the tooth has no orientation.
    #[error("zero tangent at anchor {index}")]
    DegenerateTangent {
        /// The index of the anchor.
        index: usize,
    },

    /// The radius of curvature at an anchor is zero or undefined.
    #[error("unbounded curvature at anchor {index}")]
    UnboundedCurvature {
        /// The index of the anchor.
        index: usize,
    },

    /// No tabulated involute point lies within the half tooth width.
    #[error("no involute point within half tooth width {offset} at anchor {index}")]
    LookupExhausted {
        /// The index of the anchor.
        index: usize,
        /// The half tooth width searched for.
        offset: f64,
    },

    /// Writing an output failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Writing a DXF drawing failed.
    #[error(transparent)]
    Dxf(#[from] dxf::DxfError),
}

impl GearsError {
    /// Shorthand for an [`GearsError::InvalidParameter`].
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        GearsError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// Results of gear computations.
pub type Result<T> = std::result::Result<T, GearsError>;
