use std::fmt;

pub const BUTTON_WIDTH: f32 = 60.0;
pub const BUTTON_WIDTH_BUSY: f32 = 90.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// No accepted splits yet, the user draws their own.
    #[default]
    Authoring,
    /// Accepted splits exist and are being refined.
    Refining,
    Requesting {
        refining: bool,
    },
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Authoring => write!(f, "Author"),
            Phase::Refining => write!(f, "Refine"),
            Phase::Requesting { .. } => write!(f, "Loading"),
        }
    }
}

/// Single-flight guard around the refinement request of one chart.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubmitGate {
    phase: Phase,
}

impl SubmitGate {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_requesting(&self) -> bool {
        matches!(self.phase, Phase::Requesting { .. })
    }

    pub fn label(&self) -> String {
        self.phase.to_string()
    }

    pub fn button_width(&self) -> f32 {
        if self.is_requesting() {
            BUTTON_WIDTH_BUSY
        } else {
            BUTTON_WIDTH
        }
    }

    /// Tracks whether accepted splits exist. Ignored while a request is out.
    pub fn sync(&mut self, has_accepted: bool) {
        if self.is_requesting() {
            return;
        }
        self.phase = if has_accepted {
            Phase::Refining
        } else {
            Phase::Authoring
        };
    }

    /// Enters `Requesting`. Returns `None` when a request is already in
    /// flight, otherwise whether this one refines accepted splits.
    pub fn try_begin(&mut self) -> Option<bool> {
        let refining = match self.phase {
            Phase::Requesting { .. } => {
                log::warn!("Refinement already in flight, submit ignored");
                return None;
            }
            Phase::Authoring => false,
            Phase::Refining => true,
        };
        self.phase = Phase::Requesting { refining };
        Some(refining)
    }

    /// Leaves `Requesting`. On success the envelope became the accepted
    /// splits, so the chart moves on to refining; on failure it reverts.
    pub fn finish(&mut self, accepted: bool) {
        if let Phase::Requesting { refining } = self.phase {
            self.phase = if accepted || refining {
                Phase::Refining
            } else {
                Phase::Authoring
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_submit_is_rejected_while_in_flight() {
        let mut gate = SubmitGate::default();
        assert_eq!(gate.try_begin(), Some(false));
        assert!(gate.is_requesting());
        assert_eq!(gate.try_begin(), None);
        assert_eq!(gate.label(), "Loading");
        assert_eq!(gate.button_width(), BUTTON_WIDTH_BUSY);
    }

    #[test]
    fn accepted_authoring_moves_to_refining() {
        let mut gate = SubmitGate::default();
        assert_eq!(gate.label(), "Author");
        gate.try_begin();
        gate.finish(true);
        assert_eq!(gate.phase(), Phase::Refining);
        assert_eq!(gate.label(), "Refine");
        assert_eq!(gate.try_begin(), Some(true));
    }

    #[test]
    fn failure_reverts_to_previous_phase() {
        let mut gate = SubmitGate::default();
        gate.try_begin();
        gate.finish(false);
        assert_eq!(gate.phase(), Phase::Authoring);

        gate.sync(true);
        gate.try_begin();
        gate.finish(false);
        assert_eq!(gate.phase(), Phase::Refining);
    }

    #[test]
    fn sync_waits_for_request() {
        let mut gate = SubmitGate::default();
        gate.try_begin();
        gate.sync(true);
        assert!(gate.is_requesting());
        gate.finish(false);
        gate.sync(true);
        assert_eq!(gate.phase(), Phase::Refining);
    }
}
