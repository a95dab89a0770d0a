use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::error::Result;
use crate::sim::physics::SNAP_DISTANCE;
use crate::sim::{TrackId, Vec2};

use super::control_point::{SnapTarget, TrackEnd};
use super::geometry::{ClosestPoint, Track};

/// Tracks that took part in a join.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    pub merged: TrackId,
    /// The track that carried the snap target, then the track it pointed at.
    pub sources: [TrackId; 2],
}

/// The active tracks of a simulation, addressed by stable [`TrackId`]s.
///
/// Ids are never reused, so a handle to a removed track stays stale forever
/// and every lookup through it quietly yields nothing.
#[derive(Debug, Clone, Default)]
pub struct TrackCollection {
    tracks: BTreeMap<TrackId, Track>,
    next_id: u32,
    pub(super) claimed: BTreeSet<TrackId>,
}

impl TrackCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, track: Track) -> TrackId {
        let id = TrackId(self.next_id);
        self.next_id += 1;
        self.tracks.insert(id, track);
        id
    }

    /// Removes a track and drops any drag claim on it.
    pub fn remove(&mut self, id: TrackId) -> Option<Track> {
        self.claimed.remove(&id);
        self.tracks.remove(&id)
    }

    pub fn get(&self, id: TrackId) -> Option<&Track> {
        self.tracks.get(&id)
    }

    pub fn get_mut(&mut self, id: TrackId) -> Option<&mut Track> {
        self.tracks.get_mut(&id)
    }

    pub fn contains(&self, id: TrackId) -> bool {
        self.tracks.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TrackId, &Track)> {
        self.tracks.iter().map(|(&id, track)| (id, track))
    }

    pub fn physical_tracks(&self) -> impl Iterator<Item = (TrackId, &Track)> {
        self.iter().filter(|(_, track)| track.physical)
    }

    pub fn physical_ids(&self) -> Vec<TrackId> {
        self.physical_tracks().map(|(id, _)| id).collect()
    }

    pub fn has_physical_tracks(&self) -> bool {
        self.physical_tracks().next().is_some()
    }

    pub fn is_claimed(&self, id: TrackId) -> bool {
        self.claimed.contains(&id)
    }

    /// Nearest physical track to `point`; ties go to the lowest id.
    pub fn closest_physical_track(&self, point: Vec2) -> Option<(TrackId, ClosestPoint)> {
        let mut best: Option<(TrackId, ClosestPoint)> = None;
        for (id, track) in self.physical_tracks() {
            let closest = track.closest_position_and_parameter(point);
            match best {
                Some((_, current)) if current.distance <= closest.distance => {}
                _ => best = Some((id, closest)),
            }
        }
        best
    }

    /// Recomputes the splines of a track whose control points were edited.
    /// Returns `false` if the track is no longer in the collection.
    pub fn control_points_changed(&mut self, id: TrackId) -> bool {
        match self.tracks.get_mut(&id) {
            Some(track) => {
                track.update_splines();
                true
            }
            None => false,
        }
    }

    /// Moves one control point and refreshes the track's splines.
    /// Returns `Ok(false)` for a stale track id.
    pub fn move_control_point(&mut self, id: TrackId, index: usize, position: Vec2) -> Result<bool> {
        let Some(track) = self.tracks.get_mut(&id) else {
            return Ok(false);
        };
        track.set_control_point(index, position)?;
        track.update_splines();
        Ok(true)
    }

    /// Recomputes which endpoint, if any, of track `id` snaps to another
    /// physical track. At most one end is snapped, the one with the closer
    /// candidate.
    pub fn update_snap_targets(&mut self, id: TrackId) -> Option<SnapTarget> {
        let track = self.tracks.get(&id)?;
        let candidate = if track.physical {
            [TrackEnd::Start, TrackEnd::End]
                .into_iter()
                .filter_map(|end| {
                    let position = track.endpoint(end).position;
                    self.nearest_endpoint(id, position).map(|(target, d)| (end, target, d))
                })
                .fold(None, |best: Option<(TrackEnd, SnapTarget, f64)>, c| match best {
                    Some(b) if b.2 <= c.2 => Some(b),
                    _ => Some(c),
                })
        } else {
            None
        };

        let track = self.tracks.get_mut(&id)?;
        track.clear_snap_targets();
        let (end, target, _) = candidate?;
        track.endpoint_mut(end).snap_target = Some(target);
        Some(target)
    }

    /// Closest endpoint of any other physical track within [`SNAP_DISTANCE`].
    fn nearest_endpoint(&self, exclude: TrackId, position: Vec2) -> Option<(SnapTarget, f64)> {
        let mut best: Option<(SnapTarget, f64)> = None;
        for (id, track) in self.physical_tracks() {
            if id == exclude {
                continue;
            }
            for end in [TrackEnd::Start, TrackEnd::End] {
                let d = track.endpoint(end).position.distance(position);
                if d >= SNAP_DISTANCE {
                    continue;
                }
                match best {
                    Some((_, current)) if current <= d => {}
                    _ => best = Some((SnapTarget::new(id, end), d)),
                }
            }
        }
        best
    }

    /// Replaces track `id` and its snap partner with their merged track.
    ///
    /// Returns `None`, changing nothing, if `id` is stale, has no snap target,
    /// or its partner is gone or not physical.
    pub fn join(&mut self, id: TrackId) -> Option<JoinOutcome> {
        let track = self.tracks.get(&id)?;
        let target = track.snap_target()?;
        let other = self.tracks.get(&target.track).filter(|t| t.physical)?;
        let merged = track.join(id, other, target.track)?;

        self.remove(id);
        self.remove(target.track);
        let merged_id = self.add(merged);
        debug!(
            first = id.0,
            second = target.track.0,
            merged = merged_id.0,
            "joined tracks"
        );
        Some(JoinOutcome {
            merged: merged_id,
            sources: [id, target.track],
        })
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
        self.claimed.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn line(points: &[(f64, f64)], physical: bool) -> Track {
        let points: Vec<Vec2> = points.iter().map(|&(x, y)| Vec2::new(x, y)).collect();
        Track::new(&points, physical).unwrap()
    }

    #[test]
    fn ids_are_never_reused() {
        let mut tracks = TrackCollection::new();
        let a = tracks.add(line(&[(0.0, 1.0), (1.0, 1.0)], true));
        tracks.remove(a);
        let b = tracks.add(line(&[(0.0, 1.0), (1.0, 1.0)], true));
        assert_ne!(a, b);
        assert!(tracks.get(a).is_none());
        assert!(!tracks.control_points_changed(a));
    }

    #[test]
    fn physical_filter() {
        let mut tracks = TrackCollection::new();
        let a = tracks.add(line(&[(0.0, 1.0), (1.0, 1.0)], true));
        tracks.add(line(&[(0.0, 1.0), (1.0, 1.0)], false));
        assert_eq!(tracks.physical_ids(), vec![a]);
        assert!(tracks.has_physical_tracks());
    }

    #[test]
    fn closest_physical_track_ignores_toolbox_tracks() {
        let mut tracks = TrackCollection::new();
        tracks.add(line(&[(-1.0, 3.0), (1.0, 3.0)], false));
        let far = tracks.add(line(&[(-1.0, 0.5), (1.0, 0.5)], true));
        let (id, closest) = tracks.closest_physical_track(Vec2::new(0.0, 2.9)).unwrap();
        assert_eq!(id, far);
        assert_relative_eq!(closest.distance, 2.4, epsilon = 1e-9);
    }

    #[test]
    fn move_control_point_refreshes_splines() {
        let mut tracks = TrackCollection::new();
        let id = tracks.add(line(&[(0.0, 1.0), (1.0, 1.0), (2.0, 1.0)], true));
        assert_eq!(tracks.move_control_point(id, 1, Vec2::new(1.0, 3.0)), Ok(true));
        let track = tracks.get(id).unwrap();
        assert!(!track.splines_stale());
        assert_relative_eq!(track.point(0.5).y, 3.0, epsilon = 1e-9);
        assert_eq!(tracks.move_control_point(TrackId(99), 0, Vec2::ZERO), Ok(false));
    }

    #[test]
    fn snaps_only_the_closer_end() {
        let mut tracks = TrackCollection::new();
        let left = tracks.add(line(&[(-4.0, 1.0), (-2.0, 1.0)], true));
        let right = tracks.add(line(&[(2.0, 1.0), (4.0, 1.0)], true));
        // 0.5 from left's end, 0.8 from right's start
        let middle = tracks.add(line(&[(-1.5, 1.0), (1.2, 1.0)], true));

        let target = tracks.update_snap_targets(middle).unwrap();
        assert_eq!(target, SnapTarget::new(left, TrackEnd::End));
        let track = tracks.get(middle).unwrap();
        assert!(track.endpoint(TrackEnd::End).snap_target.is_none());
        assert_ne!(target.track, right);
    }

    #[test]
    fn snap_requires_distance_below_one() {
        let mut tracks = TrackCollection::new();
        tracks.add(line(&[(-4.0, 1.0), (-2.0, 1.0)], true));
        let b = tracks.add(line(&[(-1.0, 1.0), (1.0, 1.0)], true));
        assert_eq!(tracks.update_snap_targets(b), None);
        assert!(tracks.get(b).unwrap().snap_target().is_none());
    }

    #[test]
    fn non_physical_tracks_do_not_snap() {
        let mut tracks = TrackCollection::new();
        tracks.add(line(&[(-4.0, 1.0), (-2.0, 1.0)], true));
        let b = tracks.add(line(&[(-1.9, 1.0), (1.0, 1.0)], false));
        assert_eq!(tracks.update_snap_targets(b), None);
    }

    #[test]
    fn join_replaces_sources() {
        let mut tracks = TrackCollection::new();
        let a = tracks.add(line(&[(-4.0, 1.0), (-2.0, 1.0)], true));
        let b = tracks.add(line(&[(-1.5, 1.0), (1.0, 1.0), (3.0, 2.0)], true));
        assert!(tracks.update_snap_targets(b).is_some());

        let outcome = tracks.join(b).unwrap();
        assert_eq!(outcome.sources, [b, a]);
        assert_eq!(tracks.len(), 1);
        assert!(!tracks.contains(a));
        assert!(!tracks.contains(b));

        let merged = tracks.get(outcome.merged).unwrap();
        assert_eq!(merged.control_points().len(), 4);
        assert_eq!(merged.parents(), &[b, a]);
    }

    #[test]
    fn join_without_snap_is_noop() {
        let mut tracks = TrackCollection::new();
        let a = tracks.add(line(&[(-4.0, 1.0), (-2.0, 1.0)], true));
        assert!(tracks.join(a).is_none());
        assert!(tracks.join(TrackId(42)).is_none());
        assert_eq!(tracks.len(), 1);
    }

    #[test]
    fn join_with_removed_partner_is_noop() {
        let mut tracks = TrackCollection::new();
        let a = tracks.add(line(&[(-4.0, 1.0), (-2.0, 1.0)], true));
        let b = tracks.add(line(&[(-1.5, 1.0), (1.0, 1.0)], true));
        tracks.update_snap_targets(b);
        tracks.remove(a);
        assert!(tracks.join(b).is_none());
        assert!(tracks.contains(b));
    }
}
