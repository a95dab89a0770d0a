use crate::error::{Result, SimError};
use crate::sim::{Circle, Curvature, TrackId, Vec2, PARAMETER_EPSILON};

use super::control_point::{ControlPoint, SnapTarget, TrackEnd};
use super::spline::CubicSpline;

/// Coarse samples per spline segment for closest-point searches.
pub const CLOSEST_SAMPLES_PER_SEGMENT: usize = 40;
/// Halving steps when refining a closest-point match.
pub const CLOSEST_REFINE_ITERATIONS: usize = 40;

/// Result of [`Track::closest_position_and_parameter`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ClosestPoint {
    pub u: f64,
    pub point: Vec2,
    pub distance: f64,
}

/// A skateable curve through an ordered list of control points.
///
/// `x(u)` and `y(u)` are natural cubic splines over `u ∈ [0, 1]`. Editing a
/// control point leaves the splines stale until [`Track::update_splines`]
/// runs; geometric queries must not be made in between.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    control_points: Vec<ControlPoint>,
    x_spline: CubicSpline,
    y_spline: CubicSpline,
    splines_stale: bool,
    pub physical: bool,
    pub dragging: bool,
    /// Preset scene this track belongs to, if any.
    pub scene: Option<usize>,
    parents: Vec<TrackId>,
}

impl Track {
    pub fn new(points: &[Vec2], physical: bool) -> Result<Self> {
        Self::from_control_points(points.iter().copied().map(ControlPoint::new).collect(), physical)
    }

    pub fn from_control_points(control_points: Vec<ControlPoint>, physical: bool) -> Result<Self> {
        if control_points.len() < 2 {
            return Err(SimError::InsufficientPoints {
                required: 2,
                actual: control_points.len(),
            });
        }
        let (x_spline, y_spline) = build_splines(&control_points);
        Ok(Self {
            control_points,
            x_spline,
            y_spline,
            splines_stale: false,
            physical,
            dragging: false,
            scene: None,
            parents: Vec::new(),
        })
    }

    pub fn control_points(&self) -> &[ControlPoint] {
        &self.control_points
    }

    pub fn control_point(&self, index: usize) -> Option<&ControlPoint> {
        self.control_points.get(index)
    }

    pub fn endpoint(&self, end: TrackEnd) -> &ControlPoint {
        &self.control_points[end.index(self.control_points.len())]
    }

    pub(crate) fn endpoint_mut(&mut self, end: TrackEnd) -> &mut ControlPoint {
        let index = end.index(self.control_points.len());
        &mut self.control_points[index]
    }

    /// Tracks this one was joined from, oldest first.
    pub fn parents(&self) -> &[TrackId] {
        &self.parents
    }

    pub fn splines_stale(&self) -> bool {
        self.splines_stale
    }

    /// Moves one control point. Splines stay stale until [`Track::update_splines`].
    pub fn set_control_point(&mut self, index: usize, position: Vec2) -> Result<()> {
        let len = self.control_points.len();
        let point = self
            .control_points
            .get_mut(index)
            .ok_or(SimError::ControlPointOutOfRange { index, len })?;
        point.source_position = position;
        point.position = position;
        self.splines_stale = true;
        Ok(())
    }

    /// Moves every control point by `delta`.
    pub fn translate(&mut self, delta: Vec2) {
        for point in &mut self.control_points {
            point.position += delta;
            point.source_position += delta;
        }
        self.splines_stale = true;
    }

    /// Recomputes the position and derivative splines from the control points.
    pub fn update_splines(&mut self) {
        let (x_spline, y_spline) = build_splines(&self.control_points);
        self.x_spline = x_spline;
        self.y_spline = y_spline;
        self.splines_stale = false;
    }

    pub fn x(&self, u: f64) -> f64 {
        self.debug_check_fresh();
        self.x_spline.at(u)
    }

    pub fn y(&self, u: f64) -> f64 {
        self.debug_check_fresh();
        self.y_spline.at(u)
    }

    pub fn point(&self, u: f64) -> Vec2 {
        Vec2::new(self.x(u), self.y(u))
    }

    pub fn x_derivative(&self, u: f64) -> f64 {
        self.debug_check_fresh();
        self.x_spline.derivative(u)
    }

    pub fn y_derivative(&self, u: f64) -> f64 {
        self.debug_check_fresh();
        self.y_spline.derivative(u)
    }

    /// `(dx/du, dy/du)`.
    pub fn derivative(&self, u: f64) -> Vec2 {
        Vec2::new(self.x_derivative(u), self.y_derivative(u))
    }

    pub fn second_derivative(&self, u: f64) -> Vec2 {
        self.debug_check_fresh();
        Vec2::new(
            self.x_spline.second_derivative(u),
            self.y_spline.second_derivative(u),
        )
    }

    pub fn unit_tangent(&self, u: f64) -> Vec2 {
        self.derivative(u).normalize()
    }

    /// Tangent turned a quarter counter-clockwise.
    pub fn unit_normal(&self, u: f64) -> Vec2 {
        self.unit_tangent(u).perpendicular()
    }

    /// Tangent from the chord between `u - ε` and `u + ε`.
    pub fn sampled_tangent(&self, u: f64) -> Vec2 {
        (self.point(u + PARAMETER_EPSILON) - self.point(u - PARAMETER_EPSILON)).normalize()
    }

    /// Circle through the samples at `u - ε`, `u` and `u + ε`.
    ///
    /// Straight stretches report [`STRAIGHT_RADIUS`](crate::sim::STRAIGHT_RADIUS)
    /// with the unit normal as direction.
    pub fn curvature(&self, u: f64) -> Curvature {
        let position = self.point(u);
        let samples = [
            position,
            self.point(u - PARAMETER_EPSILON),
            self.point(u + PARAMETER_EPSILON),
        ];
        Curvature::from_circle(Circle::fit(&samples), position, self.unit_normal(u))
    }

    pub fn is_parameter_in_bounds(&self, u: f64) -> bool {
        (0.0..=1.0).contains(&u)
    }

    /// Kinetic energy from the parametric velocity plus potential energy at `u`.
    pub fn energy(&self, u: f64, u_d: f64, mass: f64, gravity: f64) -> f64 {
        let speed_squared = self.derivative(u).magnitude_squared() * u_d * u_d;
        0.5 * mass * speed_squared - mass * gravity * self.y(u)
    }

    /// Parametric step that covers `distance` of arc length starting at `u`.
    pub fn fractional_distance(&self, u: f64, distance: f64) -> f64 {
        let scale = self.derivative(u).magnitude();
        if scale < f64::EPSILON {
            return 0.0;
        }
        distance / scale
    }

    /// Nearest point of the track's `[0, 1]` span to `point`.
    pub fn closest_position_and_parameter(&self, point: Vec2) -> ClosestPoint {
        let samples = CLOSEST_SAMPLES_PER_SEGMENT * (self.control_points.len() - 1);
        let distance_at = |u: f64| self.point(u).distance(point);

        let mut best_u = 0.0;
        let mut best_distance = distance_at(0.0);
        for i in 1..=samples {
            let u = i as f64 / samples as f64;
            let d = distance_at(u);
            if d < best_distance {
                best_distance = d;
                best_u = u;
            }
        }

        let mut step = 1.0 / samples as f64;
        for _ in 0..CLOSEST_REFINE_ITERATIONS {
            let below = (best_u - step).max(0.0);
            let above = (best_u + step).min(1.0);
            let d_below = distance_at(below);
            let d_above = distance_at(above);
            if d_below < best_distance {
                best_distance = d_below;
                best_u = below;
            }
            if d_above < best_distance {
                best_distance = d_above;
                best_u = above;
            }
            step /= 2.0;
        }

        ClosestPoint {
            u: best_u,
            point: self.point(best_u),
            distance: best_distance,
        }
    }

    /// First endpoint snap target, checking the start before the end.
    pub fn snap_target(&self) -> Option<SnapTarget> {
        self.endpoint(TrackEnd::Start)
            .snap_target
            .or(self.endpoint(TrackEnd::End).snap_target)
    }

    pub fn clear_snap_targets(&mut self) {
        for point in &mut self.control_points {
            point.snap_target = None;
        }
    }

    pub fn bottom_control_point_y(&self) -> f64 {
        self.fold_points(f64::INFINITY, |acc, p| acc.min(p.y))
    }

    pub fn top_control_point_y(&self) -> f64 {
        self.fold_points(f64::NEG_INFINITY, |acc, p| acc.max(p.y))
    }

    pub fn left_control_point_x(&self) -> f64 {
        self.fold_points(f64::INFINITY, |acc, p| acc.min(p.x))
    }

    pub fn right_control_point_x(&self) -> f64 {
        self.fold_points(f64::NEG_INFINITY, |acc, p| acc.max(p.x))
    }

    /// Lifts the whole track so that no control point is below ground.
    /// Returns whether anything moved.
    pub fn bump_above_ground(&mut self) -> bool {
        let bottom = self.bottom_control_point_y();
        if bottom >= 0.0 {
            return false;
        }
        self.translate(Vec2::new(0.0, -bottom));
        self.update_splines();
        true
    }

    /// Merges `other` onto this track through the snapped endpoint pair.
    ///
    /// The shared point is kept once, taken from this track. Returns `None`
    /// when neither end of this track is snapped to an end of `other`.
    pub fn join(&self, self_id: TrackId, other: &Track, other_id: TrackId) -> Option<Track> {
        let snapped_to = |mine: TrackEnd, theirs: TrackEnd| {
            self.endpoint(mine).snap_target == Some(SnapTarget::new(other_id, theirs))
        };

        let (first_forward, second_forward) = if snapped_to(TrackEnd::End, TrackEnd::Start) {
            (true, true)
        } else if snapped_to(TrackEnd::End, TrackEnd::End) {
            (true, false)
        } else if snapped_to(TrackEnd::Start, TrackEnd::Start) {
            (false, true)
        } else if snapped_to(TrackEnd::Start, TrackEnd::End) {
            (false, false)
        } else {
            return None;
        };

        let a = &self.control_points;
        let b = &other.control_points;
        let mut points: Vec<ControlPoint> = Vec::with_capacity(a.len() + b.len() - 1);

        if first_forward {
            points.extend(a.iter().map(ControlPoint::copy));
        } else {
            points.extend(a.iter().rev().map(ControlPoint::copy));
        }
        if second_forward {
            points.extend(b.iter().skip(1).map(ControlPoint::copy));
        } else {
            points.extend(b.iter().rev().skip(1).map(ControlPoint::copy));
        }

        let mut joined = Track::from_control_points(points, true).ok()?;
        joined.parents = self.parents_or_self(self_id);
        joined.parents.extend(other.parents_or_self(other_id));
        Some(joined)
    }

    /// Source tracks this one descends from, or just `id` if it was never joined.
    pub fn parents_or_self(&self, id: TrackId) -> Vec<TrackId> {
        if self.parents.is_empty() {
            vec![id]
        } else {
            self.parents.clone()
        }
    }

    fn fold_points(&self, init: f64, f: impl Fn(f64, Vec2) -> f64) -> f64 {
        self.control_points
            .iter()
            .fold(init, |acc, p| f(acc, p.position))
    }

    fn debug_check_fresh(&self) {
        debug_assert!(
            !self.splines_stale,
            "track queried after a control point edit without update_splines()"
        );
    }
}

fn build_splines(control_points: &[ControlPoint]) -> (CubicSpline, CubicSpline) {
    let xs = control_points.iter().map(|p| p.position.x).collect();
    let ys = control_points.iter().map(|p| p.position.y).collect();
    (CubicSpline::uniform(xs), CubicSpline::uniform(ys))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const TOLERANCE: f64 = 1e-9;

    fn parabola() -> Track {
        Track::new(
            &[Vec2::new(-4.0, 6.0), Vec2::new(0.0, 0.0), Vec2::new(4.0, 6.0)],
            true,
        )
        .unwrap()
    }

    fn flat(y: f64) -> Track {
        Track::new(
            &[Vec2::new(-5.0, y), Vec2::new(0.0, y), Vec2::new(5.0, y)],
            true,
        )
        .unwrap()
    }

    #[test]
    fn rejects_single_point() {
        let err = Track::new(&[Vec2::ZERO], true).unwrap_err();
        assert_eq!(
            err,
            SimError::InsufficientPoints {
                required: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn endpoints_match_control_points() {
        let track = parabola();
        assert_relative_eq!(track.point(0.0).x, -4.0, epsilon = TOLERANCE);
        assert_relative_eq!(track.point(0.0).y, 6.0, epsilon = TOLERANCE);
        assert_relative_eq!(track.point(1.0).x, 4.0, epsilon = TOLERANCE);
        assert_relative_eq!(track.point(0.5).y, 0.0, epsilon = TOLERANCE);
    }

    #[test]
    fn normal_points_up_at_valley_bottom() {
        let track = parabola();
        let tangent = track.unit_tangent(0.5);
        let normal = track.unit_normal(0.5);
        assert_relative_eq!(tangent.x, 1.0, epsilon = TOLERANCE);
        assert_relative_eq!(normal.y, 1.0, epsilon = TOLERANCE);
        let sampled = track.sampled_tangent(0.5);
        assert_relative_eq!(sampled.dot(tangent), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn curvature_of_valley_points_up() {
        let track = parabola();
        let curvature = track.curvature(0.5);
        assert!(curvature.radius < 10.0);
        assert_relative_eq!(curvature.direction.y, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn straight_track_curvature_uses_normal() {
        let track = flat(1.0);
        let curvature = track.curvature(0.3);
        assert_relative_eq!(curvature.radius, crate::sim::STRAIGHT_RADIUS, epsilon = TOLERANCE);
        assert_relative_eq!(curvature.direction.y, 1.0, epsilon = TOLERANCE);
    }

    #[test]
    fn parameter_bounds() {
        let track = parabola();
        assert!(track.is_parameter_in_bounds(0.0));
        assert!(track.is_parameter_in_bounds(1.0));
        assert!(!track.is_parameter_in_bounds(-1e-9));
        assert!(!track.is_parameter_in_bounds(1.0 + 1e-9));
    }

    #[test]
    fn energy_combines_parametric_speed_and_height() {
        let track = flat(2.0);
        // dx/du = 10 on a straight 10 m track
        let energy = track.energy(0.5, 0.3, 50.0, -9.8);
        assert_relative_eq!(energy, 0.5 * 50.0 * 9.0 + 50.0 * 9.8 * 2.0, epsilon = 1e-6);
    }

    #[test]
    fn fractional_distance_scales_by_derivative() {
        let track = flat(0.0);
        assert_relative_eq!(track.fractional_distance(0.3, 2.0), 0.2, epsilon = TOLERANCE);
    }

    #[test]
    fn closest_point_on_flat_track() {
        let track = flat(1.0);
        let closest = track.closest_position_and_parameter(Vec2::new(2.0, 3.0));
        assert_relative_eq!(closest.u, 0.7, epsilon = 1e-6);
        assert_relative_eq!(closest.point.x, 2.0, epsilon = 1e-6);
        assert_relative_eq!(closest.distance, 2.0, epsilon = 1e-6);
    }

    #[test]
    fn closest_point_clamps_to_ends() {
        let track = flat(1.0);
        let closest = track.closest_position_and_parameter(Vec2::new(-9.0, 1.0));
        assert_relative_eq!(closest.u, 0.0, epsilon = TOLERANCE);
        assert_relative_eq!(closest.distance, 4.0, epsilon = 1e-9);
    }

    #[test]
    fn closest_point_is_idempotent() {
        let track = parabola();
        let query = Vec2::new(1.3, 2.2);
        let first = track.closest_position_and_parameter(query);
        let second = track.closest_position_and_parameter(query);
        assert_eq!(first, second);
    }

    #[test]
    fn edits_require_spline_update() {
        let mut track = flat(1.0);
        track.set_control_point(1, Vec2::new(0.0, 0.0)).unwrap();
        assert!(track.splines_stale());
        track.update_splines();
        assert!(!track.splines_stale());
        assert_relative_eq!(track.point(0.5).y, 0.0, epsilon = TOLERANCE);
    }

    #[test]
    fn set_control_point_out_of_range() {
        let mut track = flat(1.0);
        assert_eq!(
            track.set_control_point(7, Vec2::ZERO),
            Err(SimError::ControlPointOutOfRange { index: 7, len: 3 })
        );
    }

    #[test]
    fn bump_above_ground_lifts_track() {
        let mut track = flat(-0.8);
        assert!(track.bump_above_ground());
        assert_relative_eq!(track.bottom_control_point_y(), 0.0, epsilon = TOLERANCE);
        assert!(!track.bump_above_ground());
    }

    #[test]
    fn bounds_helpers() {
        let track = parabola();
        assert_relative_eq!(track.bottom_control_point_y(), 0.0, epsilon = TOLERANCE);
        assert_relative_eq!(track.top_control_point_y(), 6.0, epsilon = TOLERANCE);
        assert_relative_eq!(track.left_control_point_x(), -4.0, epsilon = TOLERANCE);
        assert_relative_eq!(track.right_control_point_x(), 4.0, epsilon = TOLERANCE);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn closest_point_is_deterministic(x in -8.0f64..8.0, y in -2.0f64..10.0) {
                let track = parabola();
                let query = Vec2::new(x, y);
                let first = track.closest_position_and_parameter(query);
                let second = track.closest_position_and_parameter(query);
                prop_assert_eq!(first, second);
                prop_assert!(track.is_parameter_in_bounds(first.u));
            }

            #[test]
            fn closest_point_beats_every_control_point(x in -8.0f64..8.0, y in -2.0f64..10.0) {
                let track = parabola();
                let query = Vec2::new(x, y);
                let closest = track.closest_position_and_parameter(query);
                for point in track.control_points() {
                    prop_assert!(closest.distance <= point.position.distance(query) + 1e-9);
                }
            }
        }
    }

    mod join {
        use super::*;

        const A: TrackId = TrackId(1);
        const B: TrackId = TrackId(2);

        fn pts(track: &Track) -> Vec<(f64, f64)> {
            track
                .control_points()
                .iter()
                .map(|p| (p.position.x, p.position.y))
                .collect()
        }

        fn line(points: &[(f64, f64)]) -> Track {
            let points: Vec<Vec2> = points.iter().map(|&(x, y)| Vec2::new(x, y)).collect();
            Track::new(&points, true).unwrap()
        }

        #[test]
        fn forward_forward() {
            let mut a = line(&[(0.0, 1.0), (1.0, 1.0), (2.0, 1.0)]);
            let b = line(&[(2.2, 1.0), (3.0, 1.0), (4.0, 1.0)]);
            a.endpoint_mut(TrackEnd::End).snap_target = Some(SnapTarget::new(B, TrackEnd::Start));

            let joined = a.join(A, &b, B).unwrap();
            assert_eq!(
                pts(&joined),
                vec![(0.0, 1.0), (1.0, 1.0), (2.0, 1.0), (3.0, 1.0), (4.0, 1.0)]
            );
        }

        #[test]
        fn forward_backward() {
            let mut a = line(&[(0.0, 1.0), (1.0, 1.0), (2.0, 1.0)]);
            let b = line(&[(4.0, 1.0), (3.0, 1.0), (2.2, 1.0)]);
            a.endpoint_mut(TrackEnd::End).snap_target = Some(SnapTarget::new(B, TrackEnd::End));

            let joined = a.join(A, &b, B).unwrap();
            assert_eq!(
                pts(&joined),
                vec![(0.0, 1.0), (1.0, 1.0), (2.0, 1.0), (3.0, 1.0), (4.0, 1.0)]
            );
        }

        #[test]
        fn backward_forward() {
            let mut a = line(&[(2.0, 1.0), (1.0, 1.0), (0.0, 1.0)]);
            let b = line(&[(2.2, 1.0), (3.0, 1.0), (4.0, 1.0)]);
            a.endpoint_mut(TrackEnd::Start).snap_target =
                Some(SnapTarget::new(B, TrackEnd::Start));

            let joined = a.join(A, &b, B).unwrap();
            assert_eq!(
                pts(&joined),
                vec![(0.0, 1.0), (1.0, 1.0), (2.0, 1.0), (3.0, 1.0), (4.0, 1.0)]
            );
        }

        #[test]
        fn backward_backward() {
            let mut a = line(&[(2.0, 1.0), (1.0, 1.0), (0.0, 1.0)]);
            let b = line(&[(4.0, 1.0), (3.0, 1.0), (2.2, 1.0)]);
            a.endpoint_mut(TrackEnd::Start).snap_target = Some(SnapTarget::new(B, TrackEnd::End));

            let joined = a.join(A, &b, B).unwrap();
            assert_eq!(
                pts(&joined),
                vec![(0.0, 1.0), (1.0, 1.0), (2.0, 1.0), (3.0, 1.0), (4.0, 1.0)]
            );
        }

        #[test]
        fn unsnapped_tracks_do_not_join() {
            let a = line(&[(0.0, 1.0), (2.0, 1.0)]);
            let b = line(&[(2.2, 1.0), (4.0, 1.0)]);
            assert!(a.join(A, &b, B).is_none());
        }

        #[test]
        fn snapped_to_a_different_track_does_not_join() {
            let mut a = line(&[(0.0, 1.0), (2.0, 1.0)]);
            let b = line(&[(2.2, 1.0), (4.0, 1.0)]);
            a.endpoint_mut(TrackEnd::End).snap_target =
                Some(SnapTarget::new(TrackId(9), TrackEnd::Start));
            assert!(a.join(A, &b, B).is_none());
        }

        #[test]
        fn joined_points_carry_no_snap_targets() {
            let mut a = line(&[(0.0, 1.0), (2.0, 1.0)]);
            let b = line(&[(2.2, 1.0), (4.0, 1.0)]);
            a.endpoint_mut(TrackEnd::End).snap_target = Some(SnapTarget::new(B, TrackEnd::Start));
            let joined = a.join(A, &b, B).unwrap();
            assert!(joined.snap_target().is_none());
            assert!(joined.physical);
            assert_eq!(joined.parents(), &[A, B]);
        }
    }
}
