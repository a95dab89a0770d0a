/// Default vertical gravitational acceleration (m/s², negative is down).
pub const GRAVITY: f64 = -9.8;
pub const FRAME_RATE: f64 = 60.0;
/// Nominal frame interval used when the host reports a stall.
pub const FRAME_DT: f64 = 1.0 / FRAME_RATE;

pub const DEFAULT_MASS: f64 = 62.5;
pub const MIN_MASS: f64 = 25.0;
pub const MAX_MASS: f64 = 100.0;

/// Parametric offset used to sample tangents and curvature around `u`.
pub const PARAMETER_EPSILON: f64 = 1e-6;
/// Allowed energy drift (J) for bisection and the adaptive driver.
pub const ENERGY_TOLERANCE: f64 = 1e-6;
pub const MAX_BISECTION_ITERATIONS: usize = 200;
/// Upper bound on sub-divisions of a single frame.
pub const MAX_SUBDIVISIONS: usize = 64;

/// Minimum |cos| between velocity and track tangent for a landing to attach.
pub const ATTACH_DOT_THRESHOLD: f64 = 0.4;
/// Below this speed no friction force acts.
pub const MIN_FRICTION_SPEED: f64 = 1e-2;
pub const FRICTION_SCALE: f64 = 25.0;
/// Slow motion multiplies every sub-step by this factor.
pub const SLOW_MOTION_FACTOR: f64 = 0.25;

/// Endpoints closer than this may be joined.
pub const SNAP_DISTANCE: f64 = 1.0;

/// Clamp a host frame interval into `(0, 1]`, falling back to [`FRAME_DT`].
pub fn sanitize_dt(dt: f64) -> f64 {
    if dt > 1.0 || dt <= 0.0 || dt.is_nan() {
        FRAME_DT
    } else {
        dt
    }
}

/// Bisect `[lower, upper]` for a value whose `energy` matches `target`.
///
/// `energy` must grow as the candidate moves from `lower` toward `upper`.
/// Returns the final midpoint together with the number of iterations spent;
/// hitting [`MAX_BISECTION_ITERATIONS`] leaves the best midpoint found.
/// [`Bisection::lower`] is the last candidate whose energy did not exceed
/// `target`.
pub fn bisect_energy(
    mut lower: f64,
    mut upper: f64,
    target: f64,
    energy: impl Fn(f64) -> f64,
) -> Bisection {
    let mut mid = (lower + upper) / 2.0;
    let mut residual = energy(mid) - target;
    let mut iterations = 0;

    while residual.abs() > ENERGY_TOLERANCE {
        if iterations >= MAX_BISECTION_ITERATIONS {
            return Bisection {
                value: mid,
                lower,
                iterations,
                residual,
                converged: false,
            };
        }
        if residual > 0.0 {
            upper = mid;
        } else {
            lower = mid;
        }
        mid = (lower + upper) / 2.0;
        residual = energy(mid) - target;
        iterations += 1;
    }

    Bisection {
        value: mid,
        lower: if residual > 0.0 { lower } else { mid },
        iterations,
        residual,
        converged: true,
    }
}

/// Outcome of [`bisect_energy`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bisection {
    pub value: f64,
    pub lower: f64,
    pub iterations: usize,
    pub residual: f64,
    pub converged: bool,
}
