use crate::error::{Result, SimError};
use crate::sim::{SkaterState, StateUpdate, Vec2};

use super::{landing, StepContext, StepLog};

pub(super) fn step_free_fall(
    dt: f64,
    state: &SkaterState,
    ctx: &StepContext<'_>,
    log: &mut StepLog,
) -> Result<SkaterState> {
    let initial_energy = state.total_energy();
    let acceleration = Vec2::new(0.0, state.gravity);
    let proposed_velocity = state.velocity + acceleration * dt;
    let mut proposed_position = state.position + proposed_velocity * dt;
    if !proposed_velocity.is_finite() || !proposed_position.is_finite() {
        return Err(SimError::non_finite("free-fall motion"));
    }

    if proposed_position.y < 0.0 {
        proposed_position.y = 0.0;
        return Ok(continue_free_fall(
            state,
            initial_energy,
            proposed_position,
            proposed_velocity,
        ));
    }
    if proposed_position == state.position {
        return Ok(*state);
    }
    if ctx.tracks.has_physical_tracks() {
        return landing::interact_with_tracks(
            state,
            initial_energy,
            proposed_position,
            proposed_velocity,
            ctx,
            log,
        );
    }
    Ok(continue_free_fall(
        state,
        initial_energy,
        proposed_position,
        proposed_velocity,
    ))
}

/// Finishes a flight sub-step that touched no track.
///
/// Height is solved from the energy equation so that the total matches
/// `initial_energy` exactly. A solved height at or below ground stops the
/// skater there and turns all of its energy into heat.
pub fn continue_free_fall(
    state: &SkaterState,
    initial_energy: f64,
    proposed_position: Vec2,
    proposed_velocity: Vec2,
) -> SkaterState {
    let weight = -state.mass * state.gravity;
    if weight == 0.0 {
        return state.update(
            StateUpdate::new()
                .position(proposed_position)
                .velocity(proposed_velocity),
        );
    }

    let kinetic = 0.5 * state.mass * proposed_velocity.magnitude_squared();
    let y = (initial_energy - kinetic - state.thermal_energy) / weight;
    if y <= 0.0 {
        ground_stop(state, initial_energy, proposed_position.x)
    } else {
        state.update(
            StateUpdate::new()
                .position(Vec2::new(proposed_position.x, y))
                .velocity(proposed_velocity),
        )
    }
}

/// Full inelastic stop on the ground line at `x`.
pub(super) fn ground_stop(state: &SkaterState, initial_energy: f64, x: f64) -> SkaterState {
    state.update(
        StateUpdate::new()
            .position(Vec2::new(x, 0.0))
            .velocity(Vec2::ZERO)
            .thermal_energy(initial_energy)
            .detach()
            .up(true),
    )
}
