use crate::sim::{TrackId, Vec2};

/// Which end of a track a control point sits on.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TrackEnd {
    Start,
    End,
}

impl TrackEnd {
    /// Index of this end in a track of `len` control points.
    pub fn index(self, len: usize) -> usize {
        match self {
            TrackEnd::Start => 0,
            TrackEnd::End => len.saturating_sub(1),
        }
    }
}

/// Non-owning reference to another track's endpoint.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SnapTarget {
    pub track: TrackId,
    pub end: TrackEnd,
}

impl SnapTarget {
    pub const fn new(track: TrackId, end: TrackEnd) -> Self {
        Self { track, end }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ControlPoint {
    pub position: Vec2,
    /// Position last requested by an editing gesture, before constraints.
    pub source_position: Vec2,
    pub snap_target: Option<SnapTarget>,
}

impl ControlPoint {
    pub const fn new(position: Vec2) -> Self {
        Self {
            position,
            source_position: position,
            snap_target: None,
        }
    }

    /// Fresh point at the same position, without any snap target.
    pub fn copy(&self) -> Self {
        Self::new(self.position)
    }
}

impl From<Vec2> for ControlPoint {
    fn from(position: Vec2) -> Self {
        Self::new(position)
    }
}
