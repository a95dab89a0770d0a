//! Error types for the skater physics kernel.

use thiserror::Error;

use crate::track::TrackId;

/// Result alias used throughout the crate.
pub type Result<T, E = SimError> = std::result::Result<T, E>;

/// Errors that can occur while building tracks or stepping the simulation.
///
/// Stale track references are not errors: operations on a track that has
/// left the collection are no-ops and report that through their return value.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    /// A track was created with too few control points.
    #[error("insufficient control points: need at least {required}, got {actual}")]
    InsufficientPoints {
        /// Minimum required points.
        required: usize,
        /// Actual number of points provided.
        actual: usize,
    },

    /// A control point index does not exist on the track.
    #[error("control point {index} out of range for track with {len} points")]
    ControlPointOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of control points on the track.
        len: usize,
    },

    /// A quantity evaluated to NaN or infinity during a step.
    #[error("non-finite {quantity} during step")]
    NonFinite {
        /// Name of the offending quantity.
        quantity: &'static str,
    },

    /// Another drag gesture already owns the track.
    #[error("track {0:?} is already claimed by another drag")]
    TrackClaimed(TrackId),
}

impl SimError {
    /// Create a non-finite quantity error.
    #[must_use]
    pub fn non_finite(quantity: &'static str) -> Self {
        Self::NonFinite { quantity }
    }

    /// Returns an error if `value` is NaN or infinite.
    pub fn check_finite(quantity: &'static str, value: f64) -> Result<f64, Self> {
        if value.is_finite() {
            Ok(value)
        } else {
            Err(Self::non_finite(quantity))
        }
    }
}
