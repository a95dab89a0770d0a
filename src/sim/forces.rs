use super::curvature::Curvature;
use super::math::Vec2;
use super::physics;

/// Forces acting on the skater while riding a track.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Forces {
    pub gravity: Vec2,
    pub normal: Vec2,
    pub friction: Vec2,
}

impl Forces {
    pub fn compute(
        mass: f64,
        gravity: f64,
        velocity: Vec2,
        curvature: Curvature,
        friction_coefficient: f64,
    ) -> Self {
        let gravity_force = gravity_force(mass, gravity);
        let normal = normal_force(mass, gravity, velocity, curvature);
        let friction = friction_force(friction_coefficient, normal, velocity);
        Self {
            gravity: gravity_force,
            normal,
            friction,
        }
    }

    /// Gravity plus friction; the normal force only bends the path.
    pub fn net(&self) -> Vec2 {
        self.gravity + self.friction
    }
}

pub fn gravity_force(mass: f64, gravity: f64) -> Vec2 {
    Vec2::new(0.0, mass * gravity)
}

/// Force the track exerts to keep the skater on a curve of the given shape.
pub fn normal_force(mass: f64, gravity: f64, velocity: Vec2, curvature: Curvature) -> Vec2 {
    let radial_gravity = gravity_force(mass, gravity).dot(curvature.direction);
    let magnitude =
        mass * velocity.magnitude_squared() / curvature.radius.abs() - radial_gravity;
    curvature.direction * magnitude
}

/// Kinetic friction opposing the velocity.
pub fn friction_force(coefficient: f64, normal: Vec2, velocity: Vec2) -> Vec2 {
    if coefficient == 0.0 || velocity.magnitude() < physics::MIN_FRICTION_SPEED {
        return Vec2::ZERO;
    }
    let magnitude = coefficient * normal.magnitude() * physics::FRICTION_SCALE;
    -velocity.normalize() * magnitude
}
