use tracing::{debug, warn};

use crate::error::{Result, SimError};
use crate::sim::physics::ATTACH_DOT_THRESHOLD;
use crate::sim::{bisect_energy, SkaterState, StateUpdate, TrackContact, TrackId, Vec2};
use crate::track::Track;

use super::free_fall::continue_free_fall;
use super::{Diagnostic, StepContext, StepLog};

/// Axes whose share of the track derivative is below this ratio are left out
/// of the parametric velocity estimate.
pub const AXIS_ESTIMATE_RATIO: f64 = 0.1;
/// Doublings allowed when the estimate carries too little energy.
pub const MAX_BRACKET_EXPANSIONS: usize = 64;

/// Decides whether a flight sub-step crossed the nearest physical track, and
/// if so whether the skater bounces off it or lands on it.
pub(super) fn interact_with_tracks(
    state: &SkaterState,
    initial_energy: f64,
    proposed_position: Vec2,
    proposed_velocity: Vec2,
    ctx: &StepContext<'_>,
    log: &mut StepLog,
) -> Result<SkaterState> {
    let fall = || continue_free_fall(state, initial_energy, proposed_position, proposed_velocity);

    let Some((id, closest)) = ctx.tracks.closest_physical_track(state.position) else {
        return Ok(fall());
    };
    let Some(track) = ctx.tracks.get(id) else {
        return Ok(fall());
    };
    let u = closest.u;
    if !track.is_parameter_in_bounds(u) {
        return Ok(fall());
    }

    let segment = track.sampled_tangent(u);
    let normal = segment.perpendicular();
    let before = normal.dot(state.position - closest.point) > 0.0;
    let after = normal.dot(proposed_position - closest.point) > 0.0;
    if before == after {
        return Ok(fall());
    }

    let dot = proposed_velocity.normalize().dot(segment).abs();
    if dot < ATTACH_DOT_THRESHOLD {
        if let Some(bounced) = bounce(state, proposed_velocity, normal) {
            log.bounces += 1;
            return Ok(bounced);
        }
    }
    attach(state, initial_energy, proposed_velocity, id, track, u, before, log)
}

/// Reflects the proposed velocity about the track normal, keeping the
/// skater where it was. Speed is restored to the pre-step value since the
/// position, and so the potential energy, did not change.
///
/// A skater with no speed of its own has nothing to bounce with and returns
/// `None`.
fn bounce(state: &SkaterState, proposed_velocity: Vec2, normal: Vec2) -> Option<SkaterState> {
    let speed = state.speed();
    let direction = proposed_velocity.reflect(normal).normalize();
    if speed == 0.0 || direction == Vec2::ZERO {
        return None;
    }
    Some(state.with_velocity(direction * speed))
}

#[allow(clippy::too_many_arguments)]
fn attach(
    state: &SkaterState,
    initial_energy: f64,
    proposed_velocity: Vec2,
    id: TrackId,
    track: &Track,
    u: f64,
    up: bool,
    log: &mut StepLog,
) -> Result<SkaterState> {
    let derivative = track.derivative(u);
    let estimate = estimate_parametric_velocity(proposed_velocity, derivative)?;

    let (mass, gravity) = (state.mass, state.gravity);
    let energy = |u_d: f64| track.energy(u, u_d, mass, gravity);
    let target = initial_energy - state.thermal_energy;

    let direction = if estimate != 0.0 {
        estimate.signum()
    } else if proposed_velocity.dot(derivative) < 0.0 {
        -1.0
    } else {
        1.0
    };
    let upper = bracket_upper_bound(estimate, direction / derivative.magnitude(), target, energy);

    let u_d = {
        let result = bisect_energy(0.0, upper, target, energy);
        if !result.converged {
            warn!(
                track = id.0,
                iterations = result.iterations,
                residual = result.residual,
                "landing bisection did not converge"
            );
            log.push(Diagnostic::LandingNotConverged {
                iterations: result.iterations,
                residual: result.residual,
            });
        }
        result.value
    };
    SimError::check_finite("landing parametric velocity", u_d)?;

    let shortfall = (target - energy(u_d)).max(0.0);
    debug!(track = id.0, u, u_d, shortfall, "skater landed");

    Ok(state.update(
        StateUpdate::new()
            .contact(TrackContact::new(id, u, u_d))
            .position(track.point(u))
            .velocity(derivative * u_d)
            .thermal_energy(state.thermal_energy + shortfall)
            .up(up),
    ))
}

/// Grows `estimate` until its energy reaches `target`, so that the landing
/// bisection brackets the answer. `seed` is used when the estimate is zero.
fn bracket_upper_bound(estimate: f64, seed: f64, target: f64, energy: impl Fn(f64) -> f64) -> f64 {
    let mut upper = estimate;
    for _ in 0..MAX_BRACKET_EXPANSIONS {
        if energy(upper) >= target {
            break;
        }
        upper = if upper == 0.0 { seed } else { upper * 2.0 };
    }
    upper
}

/// Average of `velocity / derivative` over the well-conditioned axes.
fn estimate_parametric_velocity(velocity: Vec2, derivative: Vec2) -> Result<f64> {
    let scale = derivative.magnitude();
    if !scale.is_finite() {
        return Err(SimError::non_finite("track derivative"));
    }
    let threshold = scale * AXIS_ESTIMATE_RATIO;
    let estimates: Vec<f64> = [(velocity.x, derivative.x), (velocity.y, derivative.y)]
        .into_iter()
        .filter(|(_, d)| d.abs() > threshold && *d != 0.0)
        .map(|(v, d)| v / d)
        .collect();
    if estimates.is_empty() {
        return Err(SimError::non_finite("landing parametric velocity"));
    }
    Ok(estimates.iter().sum::<f64>() / estimates.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::physics::ENERGY_TOLERANCE;
    use crate::sim::PhysicsParams;
    use crate::track::TrackCollection;
    use approx::assert_relative_eq;

    const TOLERANCE: f64 = 1e-9;

    fn flat_world(y: f64) -> (TrackCollection, TrackId) {
        let mut tracks = TrackCollection::new();
        let id = tracks.add(
            Track::new(&[Vec2::new(-5.0, y), Vec2::new(0.0, y), Vec2::new(5.0, y)], true).unwrap(),
        );
        (tracks, id)
    }

    /// Runs a crossing sub-step from `position` with a proposed velocity at
    /// `cos` to the flat track at y = 1.
    fn crossing(cos: f64) -> (SkaterState, Vec2, SkaterState, StepLog, TrackId) {
        let (tracks, id) = flat_world(1.0);
        let params = PhysicsParams::default();
        let ctx = StepContext::new(&tracks, &params);
        let mut log = StepLog::new();

        let speed = 6.0;
        let sin = (1.0 - cos * cos).sqrt();
        let velocity = Vec2::new(cos * speed, -sin * speed);
        let state = SkaterState::DEFAULT
            .with_position(Vec2::new(0.0, 1.001))
            .with_velocity(velocity);
        let proposed_velocity = velocity;
        let proposed_position = state.position + proposed_velocity * 0.01;

        let next = interact_with_tracks(
            &state,
            state.total_energy(),
            proposed_position,
            proposed_velocity,
            &ctx,
            &mut log,
        )
        .unwrap();
        (state, proposed_velocity, next, log, id)
    }

    #[test]
    fn steep_crossing_bounces() {
        let (state, proposed, next, log, _) = crossing(0.3);
        assert!(!next.is_on_track());
        assert_eq!(log.bounces, 1);
        assert_eq!(next.position, state.position);
        // mirrored about the track normal (0, 1)
        let expected = Vec2::new(proposed.x, -proposed.y).normalize() * state.speed();
        assert_relative_eq!(next.velocity.x, expected.x, epsilon = 1e-6);
        assert_relative_eq!(next.velocity.y, expected.y, epsilon = 1e-6);
        assert_relative_eq!(next.total_energy(), state.total_energy(), epsilon = 1e-6);
    }

    #[test]
    fn shallow_crossing_attaches_with_matched_energy() {
        let (state, _, next, log, id) = crossing(0.6);
        let contact = next.contact.unwrap();
        assert_eq!(contact.track, id);
        assert_eq!(log.bounces, 0);
        assert!(!log.has_non_convergence());

        let (tracks, _) = flat_world(1.0);
        let track = tracks.get(id).unwrap();
        let energy = track.energy(contact.u, contact.u_d, state.mass, state.gravity);
        assert!((energy - state.total_energy()).abs() < ENERGY_TOLERANCE);
        assert_relative_eq!(next.thermal_energy, 0.0, epsilon = ENERGY_TOLERANCE);
        assert_relative_eq!(next.position.y, 1.0, epsilon = TOLERANCE);
        assert!(next.up);
    }

    #[test]
    fn attach_velocity_follows_track() {
        let (_, _, next, _, _) = crossing(0.8);
        let contact = next.contact.unwrap();
        assert!(contact.u_d > 0.0);
        assert_relative_eq!(next.velocity.y, 0.0, epsilon = TOLERANCE);
        assert_relative_eq!(next.velocity.x, contact.u_d * 10.0, epsilon = 1e-9);
    }

    #[test]
    fn no_crossing_continues_flight() {
        let (tracks, _) = flat_world(1.0);
        let params = PhysicsParams::default();
        let ctx = StepContext::new(&tracks, &params);
        let mut log = StepLog::new();
        let state = SkaterState::DEFAULT
            .with_position(Vec2::new(0.0, 3.0))
            .with_velocity(Vec2::new(1.0, -1.0));
        let next = interact_with_tracks(
            &state,
            state.total_energy(),
            Vec2::new(0.01, 2.99),
            Vec2::new(1.0, -1.0),
            &ctx,
            &mut log,
        )
        .unwrap();
        assert!(!next.is_on_track());
        assert!(log.is_empty());
    }

    #[test]
    fn motionless_crossing_lands_with_matched_energy() {
        let (tracks, id) = flat_world(1.0);
        let params = PhysicsParams::default();
        let ctx = StepContext::new(&tracks, &params);
        let mut log = StepLog::new();
        let state = SkaterState::DEFAULT.with_position(Vec2::new(0.0, 1.0001));
        let next = interact_with_tracks(
            &state,
            state.total_energy(),
            Vec2::new(0.0, 0.9999),
            Vec2::new(0.0, -0.1),
            &ctx,
            &mut log,
        )
        .unwrap();

        let contact = next.contact.unwrap();
        assert_eq!(contact.track, id);
        assert_eq!(log.bounces, 0);
        let track = tracks.get(id).unwrap();
        let energy = track.energy(contact.u, contact.u_d, state.mass, state.gravity);
        assert!((energy + next.thermal_energy - state.total_energy()).abs() < ENERGY_TOLERANCE);
    }

    #[test]
    fn landing_above_reachable_energy_is_reported() {
        // A track point above the skater's total energy cannot be matched.
        let (tracks, id) = flat_world(1.0);
        let track = tracks.get(id).unwrap();
        let state = SkaterState::DEFAULT
            .with_position(Vec2::new(0.0, 0.5))
            .with_velocity(Vec2::new(1.0, 0.0));
        let mut log = StepLog::new();
        let next = attach(
            &state,
            state.total_energy(),
            Vec2::new(1.0, 0.0),
            id,
            track,
            0.5,
            true,
            &mut log,
        )
        .unwrap();
        assert!(next.is_on_track());
        assert!(log.has_non_convergence());
        assert_relative_eq!(next.thermal_energy, 0.0, epsilon = TOLERANCE);
    }

    #[test]
    fn bracket_expands_until_target() {
        let upper = bracket_upper_bound(0.5, 1.0, 16.0, |v| v * v);
        assert!(upper * upper >= 16.0);
        let seeded = bracket_upper_bound(0.0, -1.0, 4.0, |v| v * v);
        assert!(seeded <= -2.0);
    }

    #[test]
    fn estimate_skips_ill_conditioned_axis() {
        let estimate =
            estimate_parametric_velocity(Vec2::new(3.0, -4.0), Vec2::new(10.0, 0.5)).unwrap();
        assert_relative_eq!(estimate, 0.3, epsilon = TOLERANCE);
    }
}
