use tracing::{debug, warn};

use crate::error::{Result, SimError};
use crate::sim::physics::ENERGY_TOLERANCE;
use crate::sim::{
    bisect_energy, Curvature, Forces, PhysicsParams, SkaterState, StateUpdate, TrackContact, Vec2,
};
use crate::track::Track;

use super::free_fall::ground_stop;
use super::{Diagnostic, StepLog};

pub(super) fn step_on_track(
    dt: f64,
    state: &SkaterState,
    contact: TrackContact,
    track: &Track,
    params: &PhysicsParams,
    log: &mut StepLog,
) -> Result<SkaterState> {
    let curvature = track.curvature(contact.u);
    let forces = Forces::compute(
        state.mass,
        state.gravity,
        state.velocity,
        curvature,
        params.friction,
    );
    if !forces.friction.is_finite() {
        return Err(SimError::non_finite("friction force"));
    }

    if leaves_track(state, track, contact.u, curvature, &forces) && !params.stick_to_track {
        debug!(track = contact.track.0, u = contact.u, "skater left the track");
        return Ok(state.detached());
    }
    integrate(dt, state, contact, track, &forces, params, log)
}

/// Whether the track can no longer supply the centripetal force needed to
/// keep the skater on the side it rides.
pub fn leaves_track(
    state: &SkaterState,
    track: &Track,
    u: f64,
    curvature: Curvature,
    forces: &Forces,
) -> bool {
    let side = track.unit_normal(u) * if state.up { 1.0 } else { -1.0 };
    let outside = side.dot(curvature.direction) < 0.0;
    let centripetal = state.mass * state.velocity.magnitude_squared() / curvature.radius.abs();
    let radial = forces.net().dot(curvature.direction);
    (radial < centripetal && outside) || (radial > centripetal && !outside)
}

/// One Euler sub-step along the track, settled so that total energy equals
/// its pre-step value.
fn integrate(
    dt: f64,
    state: &SkaterState,
    contact: TrackContact,
    track: &Track,
    forces: &Forces,
    params: &PhysicsParams,
    log: &mut StepLog,
) -> Result<SkaterState> {
    let (mass, gravity) = (state.mass, state.gravity);
    let potential = |p: Vec2| -mass * gravity * p.y;
    let initial_energy = state.total_energy();

    let u0 = contact.u;
    let p0 = state.position;
    let d0 = track.derivative(u0);
    let scale = d0.magnitude();
    if !scale.is_finite() || scale == 0.0 {
        return Err(SimError::non_finite("track derivative"));
    }
    let tangent = d0 / scale;

    let speed0 = contact.u_d * scale;
    let acceleration = tangent.dot(forces.net()) / mass;
    let speed1 = speed0 + acceleration * dt;
    let distance = speed0 * dt + 0.5 * acceleration * dt * dt;
    let u1 = u0 + track.fractional_distance(u0, distance);
    let p1 = track.point(u1);
    let chord_velocity = (p1 - p0) / dt;

    let mut thermal = state.thermal_energy;
    if params.friction > 0.0 {
        let heat = forces.friction.magnitude() * p1.distance(p0);
        let expected = thermal + heat;
        let total = 0.5 * mass * chord_velocity.magnitude_squared() + potential(p1) + expected;
        thermal = if total < initial_energy {
            expected + (initial_energy - total)
        } else {
            expected - (total - initial_energy).min(heat)
        };
        let correction = thermal - expected;
        if correction.abs() > ENERGY_TOLERANCE {
            debug!(correction, "thermal energy corrected after friction");
            log.push(Diagnostic::ThermalCorrection { amount: correction });
        }
    }

    let available = initial_energy - thermal;
    let kinetic = available - potential(p1);
    let (u_final, position, velocity) = if kinetic >= 0.0 {
        let chord = chord_velocity.normalize();
        let direction = if chord == Vec2::ZERO {
            track.unit_tangent(u1) * speed1.signum()
        } else {
            chord
        };
        (u1, p1, direction * (2.0 * kinetic / mass).sqrt())
    } else {
        // Past the turning point: pull back to where potential energy uses
        // up everything that is available.
        let result = bisect_energy(0.0, u1 - u0, available, |s| {
            potential(track.point(u0 + s))
        });
        if !result.converged {
            warn!(
                track = contact.track.0,
                iterations = result.iterations,
                residual = result.residual,
                "turning point bisection did not converge"
            );
            log.push(Diagnostic::TurningPointNotConverged {
                iterations: result.iterations,
                residual: result.residual,
            });
        }
        let u = u0 + result.lower;
        let p = track.point(u);
        let kinetic = (available - potential(p)).max(0.0);
        let heading = if acceleration != 0.0 { acceleration } else { speed1 };
        let direction = track.unit_tangent(u) * heading.signum();
        (u, p, direction * (2.0 * kinetic / mass).sqrt())
    };

    if !velocity.is_finite() || !position.is_finite() {
        return Err(SimError::non_finite("on-track motion"));
    }

    if !track.is_parameter_in_bounds(u_final) {
        debug!(track = contact.track.0, u = u_final, "skater ran off the track end");
        if position.y <= 0.0 {
            return Ok(ground_stop(state, initial_energy, position.x));
        }
        return Ok(state.update(
            StateUpdate::new()
                .detach()
                .position(position)
                .velocity(velocity)
                .thermal_energy(thermal),
        ));
    }

    let d1 = track.derivative(u_final);
    let u_d = velocity.dot(d1) / d1.magnitude_squared();
    SimError::check_finite("parametric velocity", u_d)?;

    Ok(state.update(
        StateUpdate::new()
            .contact(TrackContact::new(contact.track, u_final, u_d))
            .position(position)
            .velocity(velocity)
            .thermal_energy(thermal),
    ))
}
