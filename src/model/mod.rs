//! The live simulation: skater, tracks and physics settings, advanced once
//! per host frame.

mod scene;
mod skater;

pub use scene::{
    preset_tracks, scene_count, toolbox_tracks, Layout, DOUBLE_WELL, PARABOLA, SLOPE,
    TOOLBOX_OFFSET, TOOLBOX_TRACKS,
};
pub use skater::{Skater, SKATER_SNAP_DISTANCE};

use tracing::debug;

use crate::error::Result;
use crate::sim::{PhysicsParams, SkaterState, StateUpdate, TrackContact, TrackId, Vec2, FRAME_DT};
use crate::step::{advance_frame, StepContext, StepLog};
use crate::track::{JoinOutcome, Track, TrackCollection, TrackDrag};

/// What one committed frame produced.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    pub state: SkaterState,
    pub log: StepLog,
    pub subdivisions: usize,
}

#[derive(Debug, Clone)]
pub struct Simulation {
    pub skater: Skater,
    pub tracks: TrackCollection,
    pub params: PhysicsParams,
    pub paused: bool,
    layout: Layout,
    scene: usize,
    initial_params: PhysicsParams,
    bounces: u64,
}

impl Simulation {
    pub fn new(layout: Layout, params: PhysicsParams) -> Result<Self> {
        let mut sim = Self {
            skater: Skater::new(SkaterState::at_rest(
                SkaterState::DEFAULT.position,
                params.mass,
                params.gravity,
            )),
            tracks: TrackCollection::new(),
            params,
            paused: false,
            layout,
            scene: 0,
            initial_params: params,
            bounces: 0,
        };
        sim.populate_tracks()?;
        Ok(sim)
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn scene(&self) -> usize {
        self.scene
    }

    /// Bounces off tracks since the last reset.
    pub fn bounces(&self) -> u64 {
        self.bounces
    }

    pub fn physical_tracks(&self) -> impl Iterator<Item = (TrackId, &Track)> {
        self.tracks.physical_tracks()
    }

    /// Advances one host frame. Nothing happens while paused or while the
    /// skater is held.
    pub fn step(&mut self, dt: f64) -> Option<FrameReport> {
        if self.paused || self.skater.is_dragging() {
            return None;
        }
        Some(self.advance(dt))
    }

    /// Advances exactly one nominal frame, even while paused.
    pub fn manual_step(&mut self) -> FrameReport {
        self.advance(FRAME_DT)
    }

    fn advance(&mut self, dt: f64) -> FrameReport {
        let ctx = StepContext::new(&self.tracks, &self.params);
        let outcome = advance_frame(dt, &self.skater.state, &ctx);
        self.skater.state = outcome.state;
        self.bounces += u64::from(outcome.log.bounces);
        FrameReport {
            state: outcome.state,
            log: outcome.log,
            subdivisions: outcome.subdivisions,
        }
    }

    pub fn grab_skater(&mut self) {
        self.skater.grab();
    }

    pub fn drag_skater(&mut self, position: Vec2) {
        self.skater.drag_to(position, &self.tracks);
    }

    pub fn release_skater(&mut self) {
        self.skater.release(&self.tracks);
    }

    /// Puts the skater back at its last release point, switching back to the
    /// scene of the track it was released on.
    pub fn return_skater(&mut self) {
        let scene = self
            .skater
            .starting_track()
            .and_then(|id| self.tracks.get(id))
            .and_then(|track| track.scene);
        if let Some(scene) = scene {
            self.activate_scene(scene);
        }
        self.skater.return_to_start(&self.tracks);
    }

    pub fn clear_thermal(&mut self) {
        self.skater.clear_thermal();
    }

    /// Sets the skater's mass, clamped to the allowed range, and returns the
    /// mass applied. Total energy changes with it.
    pub fn set_mass(&mut self, mass: f64) -> f64 {
        self.params = self.params.with_mass(mass);
        self.skater.set_mass(self.params.mass);
        self.params.mass
    }

    /// Makes the preset track of `scene` the only physical one and takes the
    /// skater off any track. Returns `false` for an unknown scene.
    pub fn set_scene(&mut self, scene: usize) -> bool {
        if scene >= scene_count() || self.layout != Layout::Scenes {
            return false;
        }
        self.activate_scene(scene);
        self.skater.state = self.skater.state.detached();
        true
    }

    fn activate_scene(&mut self, scene: usize) {
        self.scene = scene;
        let ids: Vec<TrackId> = self.tracks.iter().map(|(id, _)| id).collect();
        for id in ids {
            if let Some(track) = self.tracks.get_mut(id) {
                if let Some(index) = track.scene {
                    track.physical = index == scene;
                }
            }
        }
    }

    /// Back to the initial layout, settings and skater.
    pub fn reset(&mut self) -> Result<()> {
        self.params = self.initial_params;
        self.paused = false;
        self.bounces = 0;
        self.scene = 0;
        self.skater = Skater::new(SkaterState::at_rest(
            SkaterState::DEFAULT.position,
            self.params.mass,
            self.params.gravity,
        ));
        self.tracks.clear();
        self.populate_tracks()
    }

    fn populate_tracks(&mut self) -> Result<()> {
        let tracks = match self.layout {
            Layout::Scenes => preset_tracks(self.scene)?,
            Layout::Playground => toolbox_tracks()?,
        };
        for track in tracks {
            self.tracks.add(track);
        }
        Ok(())
    }

    /// Recomputes a track's splines after its control points were edited,
    /// re-seating a skater that rides it. Returns `false` for a stale id.
    pub fn control_points_changed(&mut self, id: TrackId) -> bool {
        if !self.tracks.control_points_changed(id) {
            return false;
        }
        self.reseat_skater(id);
        true
    }

    /// Moves one control point of track `id` and refreshes everything that
    /// depends on it. Returns `Ok(false)` for a stale id.
    pub fn move_control_point(&mut self, id: TrackId, index: usize, position: Vec2) -> Result<bool> {
        if !self.tracks.move_control_point(id, index, position)? {
            return Ok(false);
        }
        self.tracks.update_snap_targets(id);
        self.reseat_skater(id);
        Ok(true)
    }

    fn reseat_skater(&mut self, id: TrackId) {
        let state = &self.skater.state;
        let Some(contact) = state.contact.filter(|c| c.track == id) else {
            return;
        };
        let Some(track) = self.tracks.get(id) else {
            return;
        };
        self.skater.state = state.update(
            StateUpdate::new()
                .position(track.point(contact.u))
                .velocity(track.derivative(contact.u) * contact.u_d),
        );
    }

    /// Claims a track for a whole-track drag gesture.
    pub fn begin_track_drag(&mut self, id: TrackId) -> Result<Option<TrackDrag>> {
        self.tracks.begin_drag(id)
    }

    pub fn drag_track(&mut self, drag: &TrackDrag, delta: Vec2) -> bool {
        if !drag.translate(&mut self.tracks, delta) {
            return false;
        }
        self.reseat_skater(drag.track());
        true
    }

    /// Ends a track drag, joining the track to its snap partner if it has
    /// one. Returns the id of the track that now holds the dragged geometry.
    pub fn end_track_drag(&mut self, drag: TrackDrag) -> Option<TrackId> {
        let id = drag.track();
        let snapped = drag.release(&mut self.tracks).is_some();
        if !self.tracks.contains(id) {
            return None;
        }
        let id = if snapped {
            self.join_tracks(id).map_or(id, |outcome| outcome.merged)
        } else {
            id
        };
        if let Some(track) = self.tracks.get_mut(id) {
            track.bump_above_ground();
        }
        self.reseat_skater(id);
        Some(id)
    }

    /// Joins track `id` with the track its snapped endpoint points at.
    ///
    /// A skater riding either source moves to the nearest point of the merged
    /// track, keeping the part of its velocity along the new tangent. Its
    /// upright flag flips if the merged track runs the other way. Energy is
    /// not preserved.
    pub fn join_tracks(&mut self, id: TrackId) -> Option<JoinOutcome> {
        let up_before = self.skater.up_vector(&self.tracks);
        let outcome = self.tracks.join(id)?;

        let state = self.skater.state;
        let rides_source = state
            .track()
            .is_some_and(|t| outcome.sources.contains(&t));
        if !rides_source {
            return Some(outcome);
        }
        let Some(merged) = self.tracks.get(outcome.merged) else {
            return Some(outcome);
        };

        let closest = merged.closest_position_and_parameter(state.position);
        let derivative = merged.derivative(closest.u);
        let u_d = state.velocity.dot(derivative) / derivative.magnitude_squared();
        let u_d = if u_d.is_finite() { u_d } else { 0.0 };
        self.skater.state = state.update(
            StateUpdate::new()
                .contact(TrackContact::new(outcome.merged, closest.u, u_d))
                .position(closest.point)
                .velocity(derivative * u_d),
        );
        if up_before.dot(self.skater.up_vector(&self.tracks)) < 0.0 {
            self.skater.state = self
                .skater
                .state
                .update(StateUpdate::new().up(!state.up));
        }
        debug!(merged = outcome.merged.0, u = closest.u, "skater moved to joined track");
        Some(outcome)
    }

    /// Removes a track; a skater riding it is left in flight.
    pub fn remove_track(&mut self, id: TrackId) -> Option<Track> {
        let removed = self.tracks.remove(id)?;
        if self.skater.state.track() == Some(id) {
            self.skater.state = self.skater.state.detached();
        }
        Some(removed)
    }
}
