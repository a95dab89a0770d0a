use super::physics;

/// Playback speed of the simulation clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimSpeed {
    #[default]
    Normal,
    Slow,
}

impl SimSpeed {
    pub fn scale(self) -> f64 {
        match self {
            SimSpeed::Normal => 1.0,
            SimSpeed::Slow => physics::SLOW_MOTION_FACTOR,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsParams {
    /// Kinetic friction coefficient; zero disables friction.
    pub friction: f64,
    /// When set, the skater never flies off a track mid-span.
    pub stick_to_track: bool,
    pub speed: SimSpeed,
    pub mass: f64,
    pub gravity: f64,
}

impl PhysicsParams {
    pub fn new(friction: f64, stick_to_track: bool, speed: SimSpeed) -> Self {
        Self {
            friction,
            stick_to_track,
            speed,
            ..Self::default()
        }
    }

    pub fn with_friction(self, friction: f64) -> Self {
        Self { friction, ..self }
    }

    pub fn with_mass(self, mass: f64) -> Self {
        Self {
            mass: mass.clamp(physics::MIN_MASS, physics::MAX_MASS),
            ..self
        }
    }
}

impl Default for PhysicsParams {
    fn default() -> Self {
        Self {
            friction: 0.0,
            stick_to_track: true,
            speed: SimSpeed::Normal,
            mass: physics::DEFAULT_MASS,
            gravity: physics::GRAVITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let params = PhysicsParams::new(0.2, false, SimSpeed::Slow);
        assert_eq!(params.friction, 0.2);
        assert!(!params.stick_to_track);
        assert_eq!(params.speed, SimSpeed::Slow);
        assert_eq!(params.mass, physics::DEFAULT_MASS);
    }

    #[test]
    fn test_default_values() {
        let params = PhysicsParams::default();
        assert_eq!(params.friction, 0.0);
        assert!(params.stick_to_track);
        assert_eq!(params.speed, SimSpeed::Normal);
        assert_eq!(params.gravity, physics::GRAVITY);
    }

    #[test]
    fn test_mass_is_clamped() {
        assert_eq!(PhysicsParams::default().with_mass(500.0).mass, physics::MAX_MASS);
        assert_eq!(PhysicsParams::default().with_mass(1.0).mass, physics::MIN_MASS);
    }

    #[test]
    fn test_speed_scale() {
        assert_eq!(SimSpeed::Normal.scale(), 1.0);
        assert_eq!(SimSpeed::Slow.scale(), physics::SLOW_MOTION_FACTOR);
    }
}
