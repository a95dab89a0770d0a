//! Skatepark - energy-conserving skater physics on user-editable spline tracks.
//!
//! # Architecture
//!
//! Layered modules with strict inward-only dependencies:
//!
//! - **sim**: Physics/math primitives (Vec2, SkaterState, Forces, Curvature)
//! - **track**: Spline tracks, the track collection, snapping and joining
//! - **step**: Sub-step physics and the adaptive per-frame driver
//! - **model**: The live simulation: skater, scenes, user gestures
//!
//! # Usage
//!
//! ```ignore
//! use skatepark::{Layout, PhysicsParams, Simulation, Vec2, FRAME_DT};
//!
//! let mut sim = Simulation::new(Layout::Scenes, PhysicsParams::default())?;
//! sim.grab_skater();
//! sim.drag_skater(Vec2::new(-3.0, 3.5));
//! sim.release_skater();
//! let report = sim.step(FRAME_DT);
//! ```

pub mod error;
pub mod model;
pub mod sim;
pub mod step;
pub mod track;

// Re-export commonly used types at crate root
pub use error::{Result, SimError};
pub use model::{FrameReport, Layout, Simulation, Skater};
pub use sim::{PhysicsParams, SimSpeed, SkaterState, TrackContact, TrackId, Vec2, FRAME_DT};
pub use step::{advance_frame, Diagnostic, StepLog};
pub use track::{Track, TrackCollection};
