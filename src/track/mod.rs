//! Editable spline tracks and the collection that owns them.
//!
//! A [`Track`] answers geometric queries along its parameter `u ∈ [0, 1]`;
//! the [`TrackCollection`] hands out stable ids, finds snap partners and
//! joins tracks.

mod collection;
mod control_point;
mod drag;
mod geometry;
mod spline;

pub use crate::sim::TrackId;
pub use collection::{JoinOutcome, TrackCollection};
pub use control_point::{ControlPoint, SnapTarget, TrackEnd};
pub use drag::TrackDrag;
pub use geometry::{ClosestPoint, Track, CLOSEST_REFINE_ITERATIONS, CLOSEST_SAMPLES_PER_SEGMENT};
pub use spline::CubicSpline;
