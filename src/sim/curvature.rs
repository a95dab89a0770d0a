use super::math::Vec2;

/// Radius reported for straight or numerically flat sections.
pub const STRAIGHT_RADIUS: f64 = 100_000.0;

/// Circle fitted through a handful of samples.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Circle {
    pub center: Vec2,
    pub radius: f64,
}

impl Circle {
    /// Closed-form least-squares circle through `points`.
    ///
    /// With exactly three points this is the circumscribed circle.
    /// Returns `None` for fewer than three points or collinear samples.
    pub fn fit(points: &[Vec2]) -> Option<Self> {
        if points.len() < 3 {
            return None;
        }
        let n = points.len() as f64;
        let mean = points.iter().fold(Vec2::ZERO, |acc, &p| acc + p) / n;

        let (mut suu, mut suv, mut svv) = (0.0, 0.0, 0.0);
        let (mut suuu, mut svvv, mut suvv, mut svuu) = (0.0, 0.0, 0.0, 0.0);
        for &p in points {
            let u = p.x - mean.x;
            let v = p.y - mean.y;
            suu += u * u;
            suv += u * v;
            svv += v * v;
            suuu += u * u * u;
            svvv += v * v * v;
            suvv += u * v * v;
            svuu += v * u * u;
        }

        // Solve [suu suv; suv svv] [uc vc] = 0.5 [suuu + suvv; svvv + svuu]
        let det = suu * svv - suv * suv;
        if det == 0.0 {
            return None;
        }
        let b1 = 0.5 * (suuu + suvv);
        let b2 = 0.5 * (svvv + svuu);
        let uc = (b1 * svv - b2 * suv) / det;
        let vc = (suu * b2 - suv * b1) / det;

        let radius = (uc * uc + vc * vc + (suu + svv) / n).sqrt();
        let center = Vec2::new(uc + mean.x, vc + mean.y);
        if !center.is_finite() || !radius.is_finite() {
            return None;
        }
        Some(Self { center, radius })
    }
}

/// Local curvature seen from a point on the track.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Curvature {
    pub radius: f64,
    /// Unit vector from the point toward the center of curvature.
    pub direction: Vec2,
}

impl Curvature {
    /// Curvature at `position` from a fitted circle.
    ///
    /// Missing or very large circles are treated as straight, pointing along
    /// `straight_direction`.
    pub fn from_circle(circle: Option<Circle>, position: Vec2, straight_direction: Vec2) -> Self {
        match circle {
            Some(c) if c.radius < STRAIGHT_RADIUS => {
                let direction = (c.center - position).normalize();
                if direction == Vec2::ZERO {
                    Self::straight(straight_direction)
                } else {
                    Self::new(c.radius, direction)
                }
            }
            _ => Self::straight(straight_direction),
        }
    }

    pub const fn new(radius: f64, direction: Vec2) -> Self {
        Self { radius, direction }
    }

    pub fn straight(direction: Vec2) -> Self {
        Self::new(STRAIGHT_RADIUS, direction.normalize())
    }
}
