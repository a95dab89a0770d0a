use tracing::trace;

use crate::error::{Result, SimError};
use crate::sim::{TrackId, Vec2};

use super::collection::TrackCollection;
use super::control_point::SnapTarget;

/// An in-progress drag of a whole track.
///
/// Holding a `TrackDrag` is the claim: a track can have at most one, and the
/// claim ends when the gesture is [released](TrackDrag::release) or the track
/// leaves the collection.
#[derive(Debug, PartialEq, Eq)]
pub struct TrackDrag {
    track: TrackId,
}

impl TrackCollection {
    /// Claims track `id` for a drag gesture.
    ///
    /// Returns `Ok(None)` if the track is gone and
    /// [`SimError::TrackClaimed`] if another gesture holds it.
    pub fn begin_drag(&mut self, id: TrackId) -> Result<Option<TrackDrag>> {
        if self.is_claimed(id) {
            return Err(SimError::TrackClaimed(id));
        }
        let Some(track) = self.get_mut(id) else {
            return Ok(None);
        };
        track.dragging = true;
        self.claimed.insert(id);
        Ok(Some(TrackDrag { track: id }))
    }
}

impl TrackDrag {
    pub fn track(&self) -> TrackId {
        self.track
    }

    /// Moves the dragged track by `delta`.
    ///
    /// A track pulled fully above ground becomes physical; a physical track
    /// is kept above ground and its snap target is refreshed. Returns `false`
    /// if the track has been removed meanwhile.
    pub fn translate(&self, tracks: &mut TrackCollection, delta: Vec2) -> bool {
        if !tracks.is_claimed(self.track) {
            return false;
        }
        let Some(track) = tracks.get_mut(self.track) else {
            return false;
        };
        track.translate(delta);
        track.update_splines();
        if track.bottom_control_point_y() > 0.0 {
            track.physical = true;
        }
        if track.physical {
            track.bump_above_ground();
        }
        trace!(track = self.track.0, dx = delta.x, dy = delta.y, "dragged track");
        tracks.update_snap_targets(self.track);
        true
    }

    /// Ends the gesture and returns the snap target left on the track, if
    /// any, so the caller can join.
    pub fn release(self, tracks: &mut TrackCollection) -> Option<SnapTarget> {
        if !tracks.claimed.remove(&self.track) {
            return None;
        }
        let track = tracks.get_mut(self.track)?;
        track.dragging = false;
        track.snap_target()
    }
}
