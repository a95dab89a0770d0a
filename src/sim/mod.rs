//! Pure physics/math primitives for the skater simulation.
//!
//! Nothing in here knows about tracks beyond the [`TrackId`] handle.

mod curvature;
mod forces;
mod math;
mod physics_params;
mod state;

pub mod physics;

pub use curvature::{Circle, Curvature, STRAIGHT_RADIUS};
pub use forces::{friction_force, gravity_force, normal_force, Forces};
pub use math::Vec2;
pub use physics::{
    bisect_energy, sanitize_dt, Bisection, ENERGY_TOLERANCE, FRAME_DT, GRAVITY,
    MAX_BISECTION_ITERATIONS, MAX_SUBDIVISIONS, PARAMETER_EPSILON,
};
pub use physics_params::{PhysicsParams, SimSpeed};
pub use state::{SkaterState, StateUpdate, TrackContact, TrackId};
