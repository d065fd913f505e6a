//! Enrollment progress events
//!
//! The enrollment workflow never prints. Callers that want to prompt the
//! user ("remove finger", "place the same finger again") subscribe with an
//! [`EnrollObserver`].

use zfmrust_core::{EnrollState, EnrollStep, Transition};

/// Events emitted while enrolling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollEvent {
    /// A step is about to run
    StepStarted { state: EnrollState, step: EnrollStep },

    /// The enrollment moved to a new state
    StateChanged(Transition),
}

/// Receives enrollment events
pub trait EnrollObserver: Send + Sync {
    fn on_event(&self, event: &EnrollEvent);
}

/// Discards all events
pub struct NullObserver;

impl EnrollObserver for NullObserver {
    fn on_event(&self, _event: &EnrollEvent) {}
}

/// Logs events with tracing
pub struct TracingObserver;

impl EnrollObserver for TracingObserver {
    fn on_event(&self, event: &EnrollEvent) {
        match event {
            EnrollEvent::StepStarted { state, step } => {
                tracing::debug!(state = %state, "Starting step: {}", step);
            }
            EnrollEvent::StateChanged(Transition { from, to: to @ EnrollState::Failed(_) }) => {
                tracing::warn!(from = %from, "Enrollment {}", to);
            }
            EnrollEvent::StateChanged(Transition { from, to }) => {
                tracing::info!(from = %from, to = %to, "Enrollment state changed");
            }
        }
    }
}

impl<F> EnrollObserver for F
where
    F: Fn(&EnrollEvent) + Send + Sync,
{
    fn on_event(&self, event: &EnrollEvent) {
        self(event)
    }
}
