use crate::error::SimError;
use crate::sim::TrackId;

/// Something worth knowing about a step that still produced a state.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// Landing bisection hit the iteration cap; the best midpoint was used.
    LandingNotConverged { iterations: usize, residual: f64 },
    /// Turning-point bisection on a track hit the iteration cap.
    TurningPointNotConverged { iterations: usize, residual: f64 },
    /// The frame driver ran out of subdivisions before energy settled.
    SubdivisionLimit { subdivisions: usize, drift: f64 },
    /// Thermal energy adjusted to keep the total exact after friction.
    ThermalCorrection { amount: f64 },
    /// A numeric fault rejected the frame; the prior state was kept.
    StepRejected(SimError),
    /// The ridden track had left the collection; the skater was detached.
    StaleTrack(TrackId),
}

impl Diagnostic {
    pub fn is_non_convergence(&self) -> bool {
        matches!(
            self,
            Diagnostic::LandingNotConverged { .. }
                | Diagnostic::TurningPointNotConverged { .. }
                | Diagnostic::SubdivisionLimit { .. }
        )
    }
}

/// Everything recorded while advancing one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepLog {
    pub diagnostics: Vec<Diagnostic>,
    pub bounces: u32,
}

impl StepLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty() && self.bounces == 0
    }

    pub fn has_non_convergence(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_non_convergence)
    }

    pub fn rejected(&self) -> Option<&SimError> {
        self.diagnostics.iter().find_map(|d| match d {
            Diagnostic::StepRejected(err) => Some(err),
            _ => None,
        })
    }
}
