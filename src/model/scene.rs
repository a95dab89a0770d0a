//! Preset track layouts.

use crate::error::Result;
use crate::sim::Vec2;
use crate::track::Track;

pub const PARABOLA: [Vec2; 3] = [Vec2::new(-4.0, 6.0), Vec2::new(0.0, 0.0), Vec2::new(4.0, 6.0)];

pub const SLOPE: [Vec2; 3] = [Vec2::new(-4.0, 4.0), Vec2::new(-2.0, 2.0), Vec2::new(2.0, 1.0)];

/// The left well sits slightly raised so the interpolated curve stays above ground.
pub const DOUBLE_WELL: [Vec2; 5] = [
    Vec2::new(-4.0, 5.0),
    Vec2::new(-2.0, 0.0166015),
    Vec2::new(0.0, 2.0),
    Vec2::new(2.0, 1.0),
    Vec2::new(4.0, 5.0),
];

/// Where unused playground tracks wait, below the ground line.
pub const TOOLBOX_OFFSET: Vec2 = Vec2::new(-5.5, -0.8);
pub const TOOLBOX_TRACKS: usize = 4;

/// How a simulation lays out its tracks.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Layout {
    /// Fixed preset tracks, one physical at a time.
    #[default]
    Scenes,
    /// Short straight tracks the user drags out and joins.
    Playground,
}

/// The three preset tracks, tagged with their scene index. Only the track of
/// `active` starts physical.
pub fn preset_tracks(active: usize) -> Result<Vec<Track>> {
    [&PARABOLA[..], &SLOPE[..], &DOUBLE_WELL[..]]
        .iter()
        .enumerate()
        .map(|(scene, points)| {
            let mut track = Track::new(points, scene == active)?;
            track.scene = Some(scene);
            Ok(track)
        })
        .collect()
}

pub fn scene_count() -> usize {
    3
}

/// Non-physical three-point tracks stacked in the toolbox.
pub fn toolbox_tracks() -> Result<Vec<Track>> {
    (0..TOOLBOX_TRACKS)
        .map(|_| {
            let points = [
                Vec2::new(-1.0, 0.0) + TOOLBOX_OFFSET,
                TOOLBOX_OFFSET,
                Vec2::new(1.0, 0.0) + TOOLBOX_OFFSET,
            ];
            Track::new(&points, false)
        })
        .collect()
}
