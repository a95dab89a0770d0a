use super::math::Vec2;
use super::physics;

/// Stable handle for a track inside a [`TrackCollection`](crate::track::TrackCollection).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackId(pub u32);

/// Where the skater sits on a track: parameter `u` and its rate `u_d`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TrackContact {
    pub track: TrackId,
    pub u: f64,
    pub u_d: f64,
}

impl TrackContact {
    pub const fn new(track: TrackId, u: f64, u_d: f64) -> Self {
        Self { track, u, u_d }
    }
}

/// Snapshot of every physical quantity of the skater at one instant.
///
/// Values are replaced, never edited: each step builds a new state through
/// [`SkaterState::update`] or one of the `with_*` constructors.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SkaterState {
    pub position: Vec2,
    pub velocity: Vec2,
    pub mass: f64,
    pub gravity: f64,
    pub thermal_energy: f64,
    pub contact: Option<TrackContact>,
    /// Skater stands on the side the track normal points to.
    pub up: bool,
    pub dragging: bool,
}

impl SkaterState {
    /// Skater at rest at `position`, off any track.
    pub const fn at_rest(position: Vec2, mass: f64, gravity: f64) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            mass,
            gravity,
            thermal_energy: 0.0,
            contact: None,
            up: true,
            dragging: false,
        }
    }

    pub const DEFAULT: Self = Self::at_rest(
        Vec2::new(3.5, 0.0),
        physics::DEFAULT_MASS,
        physics::GRAVITY,
    );

    pub fn kinetic_energy(&self) -> f64 {
        0.5 * self.mass * self.velocity.magnitude_squared()
    }

    pub fn potential_energy(&self) -> f64 {
        -self.mass * self.gravity * self.position.y
    }

    pub fn mechanical_energy(&self) -> f64 {
        self.kinetic_energy() + self.potential_energy()
    }

    /// Kinetic plus potential plus thermal energy.
    pub fn total_energy(&self) -> f64 {
        self.mechanical_energy() + self.thermal_energy
    }

    pub fn speed(&self) -> f64 {
        self.velocity.magnitude()
    }

    pub fn track(&self) -> Option<TrackId> {
        self.contact.map(|c| c.track)
    }

    pub fn is_on_track(&self) -> bool {
        self.contact.is_some()
    }

    /// Copy of this state with the given fields replaced.
    pub fn update(&self, changes: StateUpdate) -> Self {
        Self {
            position: changes.position.unwrap_or(self.position),
            velocity: changes.velocity.unwrap_or(self.velocity),
            mass: changes.mass.unwrap_or(self.mass),
            gravity: self.gravity,
            thermal_energy: changes.thermal_energy.unwrap_or(self.thermal_energy),
            contact: changes.contact.unwrap_or(self.contact),
            up: changes.up.unwrap_or(self.up),
            dragging: changes.dragging.unwrap_or(self.dragging),
        }
    }

    pub fn with_position(&self, position: Vec2) -> Self {
        self.update(StateUpdate::new().position(position))
    }

    pub fn with_velocity(&self, velocity: Vec2) -> Self {
        self.update(StateUpdate::new().velocity(velocity))
    }

    pub fn with_thermal_energy(&self, thermal_energy: f64) -> Self {
        self.update(StateUpdate::new().thermal_energy(thermal_energy))
    }

    pub fn detached(&self) -> Self {
        self.update(StateUpdate::new().detach())
    }
}

impl Default for SkaterState {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Partial set of field replacements for [`SkaterState::update`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StateUpdate {
    position: Option<Vec2>,
    velocity: Option<Vec2>,
    mass: Option<f64>,
    thermal_energy: Option<f64>,
    contact: Option<Option<TrackContact>>,
    up: Option<bool>,
    dragging: Option<bool>,
}

impl StateUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(mut self, position: Vec2) -> Self {
        self.position = Some(position);
        self
    }

    pub fn velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = Some(velocity);
        self
    }

    pub fn mass(mut self, mass: f64) -> Self {
        self.mass = Some(mass);
        self
    }

    pub fn thermal_energy(mut self, thermal_energy: f64) -> Self {
        self.thermal_energy = Some(thermal_energy);
        self
    }

    pub fn contact(mut self, contact: TrackContact) -> Self {
        self.contact = Some(Some(contact));
        self
    }

    pub fn detach(mut self) -> Self {
        self.contact = Some(None);
        self
    }

    pub fn up(mut self, up: bool) -> Self {
        self.up = Some(up);
        self
    }

    pub fn dragging(mut self, dragging: bool) -> Self {
        self.dragging = Some(dragging);
        self
    }
}
