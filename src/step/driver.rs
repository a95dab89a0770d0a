use tracing::warn;

use crate::error::Result;
use crate::sim::physics::{ENERGY_TOLERANCE, MAX_SUBDIVISIONS};
use crate::sim::{sanitize_dt, SkaterState};

use super::{step_model, Diagnostic, StepContext, StepLog};

/// Result of one frame of [`advance_frame`].
#[derive(Debug, Clone, PartialEq)]
pub struct FrameOutcome {
    pub state: SkaterState,
    pub log: StepLog,
    /// Sub-steps used by the committed attempt.
    pub subdivisions: usize,
}

/// Advances `state` by one host frame of `dt` seconds.
///
/// `dt` outside `(0, 1]` is replaced by the nominal frame interval. The frame
/// is split into 1, 2, 4, ... equal sub-steps until total energy drifts by
/// less than [`ENERGY_TOLERANCE`] or [`MAX_SUBDIVISIONS`] is reached; the
/// last attempt is committed either way. A numeric fault keeps `state`.
pub fn advance_frame(dt: f64, state: &SkaterState, ctx: &StepContext<'_>) -> FrameOutcome {
    let dt = sanitize_dt(dt) * ctx.params.speed.scale();
    subdivide(dt, state, |sub_dt, current, log| {
        step_model(sub_dt, current, ctx, log)
    })
}

/// Runs `step` over ever finer subdivisions of `dt` until energy settles.
fn subdivide(
    dt: f64,
    state: &SkaterState,
    mut step: impl FnMut(f64, &SkaterState, &mut StepLog) -> Result<SkaterState>,
) -> FrameOutcome {
    let initial_energy = state.total_energy();
    let mut subdivisions = 1;

    loop {
        let mut log = StepLog::new();
        let sub_dt = dt / subdivisions as f64;
        let attempt = (0..subdivisions)
            .try_fold(*state, |current, _| step(sub_dt, &current, &mut log));

        let next = match attempt {
            Ok(next) => next,
            Err(err) => {
                warn!(%err, subdivisions, "step rejected, keeping prior state");
                log.push(Diagnostic::StepRejected(err));
                return FrameOutcome {
                    state: *state,
                    log,
                    subdivisions,
                };
            }
        };

        let drift = (next.total_energy() - initial_energy).abs();
        if drift < ENERGY_TOLERANCE || subdivisions >= MAX_SUBDIVISIONS {
            if drift >= ENERGY_TOLERANCE {
                warn!(subdivisions, drift, "energy drift above tolerance");
                log.push(Diagnostic::SubdivisionLimit {
                    subdivisions,
                    drift,
                });
            }
            return FrameOutcome {
                state: next,
                log,
                subdivisions,
            };
        }
        subdivisions *= 2;
    }
}
