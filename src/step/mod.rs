//! Per-frame advancement of a [`SkaterState`].
//!
//! [`step_model`] dispatches one sub-step on the skater's [`Phase`];
//! [`advance_frame`] wraps it in the adaptive subdivision loop that keeps total
//! energy fixed across a whole frame.

mod diagnostics;
mod driver;
mod free_fall;
mod landing;
mod on_track;

pub use diagnostics::{Diagnostic, StepLog};
pub use driver::{advance_frame, FrameOutcome};
pub use free_fall::continue_free_fall;

use tracing::warn;

use crate::error::Result;
use crate::sim::{PhysicsParams, SkaterState};
use crate::track::TrackCollection;

/// Which sub-step a state is dispatched to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Phase {
    Dragging,
    Grounded,
    FreeFall,
    OnTrack,
}

impl Phase {
    pub fn of(state: &SkaterState) -> Self {
        if state.dragging {
            Phase::Dragging
        } else if state.is_on_track() {
            Phase::OnTrack
        } else if state.position.y <= 0.0 {
            Phase::Grounded
        } else {
            Phase::FreeFall
        }
    }
}

/// Read-only world the stepper runs against.
#[derive(Debug, Copy, Clone)]
pub struct StepContext<'a> {
    pub tracks: &'a TrackCollection,
    pub params: &'a PhysicsParams,
}

impl<'a> StepContext<'a> {
    pub fn new(tracks: &'a TrackCollection, params: &'a PhysicsParams) -> Self {
        Self { tracks, params }
    }
}

/// Advances `state` by one sub-step of `dt` seconds.
///
/// Numeric faults are returned as errors so the caller can keep the prior
/// state; everything else, including non-convergence, is recorded in `log`.
pub fn step_model(
    dt: f64,
    state: &SkaterState,
    ctx: &StepContext<'_>,
    log: &mut StepLog,
) -> Result<SkaterState> {
    match Phase::of(state) {
        Phase::Dragging | Phase::Grounded => Ok(*state),
        Phase::FreeFall => free_fall::step_free_fall(dt, state, ctx, log),
        Phase::OnTrack => {
            let Some(contact) = state.contact else {
                return Ok(*state);
            };
            match ctx.tracks.get(contact.track) {
                Some(track) => on_track::step_on_track(dt, state, contact, track, ctx.params, log),
                None => {
                    warn!(track = contact.track.0, "skater rode a removed track, detaching");
                    log.push(Diagnostic::StaleTrack(contact.track));
                    Ok(state.detached())
                }
            }
        }
    }
}
