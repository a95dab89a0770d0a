use crate::sim::{SkaterState, StateUpdate, TrackContact, TrackId, Vec2};
use crate::track::TrackCollection;

/// A dragged skater closer than this to a physical track sits on it.
pub const SKATER_SNAP_DISTANCE: f64 = 0.5;

/// The live skater: its current state plus where it was last released.
#[derive(Debug, Clone, PartialEq)]
pub struct Skater {
    pub state: SkaterState,
    starting: SkaterState,
    /// Track and parameter the skater will sit on when released.
    drag_target: Option<(TrackId, f64)>,
}

impl Skater {
    pub fn new(state: SkaterState) -> Self {
        Self {
            state,
            starting: state,
            drag_target: None,
        }
    }

    /// State restored by [`Skater::return_to_start`].
    pub fn starting_state(&self) -> &SkaterState {
        &self.starting
    }

    pub fn is_dragging(&self) -> bool {
        self.state.dragging
    }

    /// Takes the skater out of the physics. Grabbing clears thermal energy.
    pub fn grab(&mut self) {
        self.drag_target = None;
        self.state = self.state.update(
            StateUpdate::new()
                .dragging(true)
                .thermal_energy(0.0)
                .velocity(Vec2::ZERO)
                .detach(),
        );
    }

    /// Moves a grabbed skater, snapping it onto a nearby physical track.
    pub fn drag_to(&mut self, position: Vec2, tracks: &TrackCollection) {
        if !self.state.dragging {
            return;
        }
        let snapped = tracks
            .closest_physical_track(position)
            .and_then(|(id, closest)| {
                let track = tracks.get(id)?;
                (closest.distance < SKATER_SNAP_DISTANCE && track.is_parameter_in_bounds(closest.u))
                    .then_some((id, closest, track))
            });

        let update = match snapped {
            Some((id, closest, track)) => {
                self.drag_target = Some((id, closest.u));
                StateUpdate::new()
                    .position(closest.point)
                    .up(track.unit_normal(closest.u).y > 0.0)
            }
            None => {
                self.drag_target = None;
                StateUpdate::new().position(position).up(true)
            }
        };
        self.state = self.state.update(update.velocity(Vec2::ZERO));
    }

    /// Hands the skater back to the physics at rest, on the track it was
    /// dropped onto if that track still exists, and remembers this as the
    /// return point.
    pub fn release(&mut self, tracks: &TrackCollection) {
        let mut update = StateUpdate::new().dragging(false).velocity(Vec2::ZERO);
        if let Some((id, u)) = self.drag_target.take() {
            if let Some(track) = tracks.get(id) {
                update = update
                    .contact(TrackContact::new(id, u, 0.0))
                    .position(track.point(u));
            }
        }
        self.state = self.state.update(update);
        self.starting = self.state;
    }

    /// Puts the skater back where it was last released, at rest and without
    /// thermal energy. A return track that no longer exists is dropped.
    pub fn return_to_start(&mut self, tracks: &TrackCollection) {
        let mut start = self.starting.update(
            StateUpdate::new()
                .velocity(Vec2::ZERO)
                .thermal_energy(0.0)
                .dragging(false),
        );
        if let Some(contact) = start.contact {
            match tracks.get(contact.track) {
                Some(track) => {
                    start = start.update(
                        StateUpdate::new()
                            .contact(TrackContact::new(contact.track, contact.u, 0.0))
                            .position(track.point(contact.u)),
                    );
                }
                None => start = start.detached(),
            }
        }
        self.drag_target = None;
        self.state = start;
    }

    /// Changes the mass of the live skater and of its return state.
    pub fn set_mass(&mut self, mass: f64) {
        self.state = self.state.update(StateUpdate::new().mass(mass));
        self.starting = self.starting.update(StateUpdate::new().mass(mass));
    }

    pub fn clear_thermal(&mut self) {
        self.state = self.state.with_thermal_energy(0.0);
    }

    /// Track the skater returns to, if any.
    pub fn starting_track(&self) -> Option<TrackId> {
        self.starting.track()
    }

    /// Direction the skater's head points: the track side it rides, or
    /// straight up off-track.
    pub fn up_vector(&self, tracks: &TrackCollection) -> Vec2 {
        let Some(contact) = self.state.contact else {
            return Vec2::UP;
        };
        match tracks.get(contact.track) {
            Some(track) => {
                let normal = track.unit_normal(contact.u);
                if self.state.up {
                    normal
                } else {
                    -normal
                }
            }
            None => Vec2::UP,
        }
    }
}

impl Default for Skater {
    fn default() -> Self {
        Self::new(SkaterState::DEFAULT)
    }
}
