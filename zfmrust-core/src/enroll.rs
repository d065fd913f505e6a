//! Enrollment state machine
//!
//! Enrolling a finger takes two captures of the same finger, merged into one
//! model and stored in the library:
//!
//! ```text
//! AwaitFinger1 ──GenImg ok, Img2Tz(1) ok──▶ Char1Captured ──▶ AwaitRemoval
//!      AwaitRemoval ──GenImg fails──▶ AwaitFinger2
//!      AwaitFinger2 ──GenImg ok, Img2Tz(2) ok──▶ Char2Captured
//!      Char2Captured ──RegModel ok──▶ ModelCreated ──Store ok──▶ Stored
//! ```
//!
//! Any rejected step, exhausted poll or cancellation ends in `Failed`.
//! The machine performs no I/O: a driver asks for the [`Enrollment::next_step`],
//! executes it against a module and reports back through [`Enrollment::advance`].

use std::fmt;

use crate::{
    command::{CharBuffer, TemplateRef},
    status::Status,
};

/// One unit of work the driver performs
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EnrollStep {
    /// Poll `GenImg` until a finger is on the sensor
    WaitForFinger,

    /// `Img2Tz` into the given buffer
    GenerateChar(CharBuffer),

    /// Poll `GenImg` until the finger is lifted
    WaitForRemoval,

    /// `RegModel`
    CreateModel,

    /// `Store`
    Store(TemplateRef),
}

impl fmt::Display for EnrollStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WaitForFinger => write!(f, "wait for finger"),
            Self::GenerateChar(buffer) => write!(f, "generate character file into {}", buffer),
            Self::WaitForRemoval => write!(f, "wait for finger removal"),
            Self::CreateModel => write!(f, "create model"),
            Self::Store(target) => write!(f, "store {} at page {}", target.buffer, target.page),
        }
    }
}

/// Result of executing a step
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Completed,
    Rejected(Status),
    TimedOut,
    Cancelled,
}

/// Why an enrollment ended without storing a model
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EnrollFailure {
    /// The module answered a step with a non-success confirmation code
    Rejected { step: EnrollStep, status: Status },

    /// A presence poll ran out of time or attempts
    TimedOut { step: EnrollStep },

    /// The caller cancelled during a step
    Cancelled { step: EnrollStep },
}

impl EnrollFailure {
    /// Confirmation code that caused the failure, if the module rejected a step
    pub fn status(&self) -> Option<Status> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn step(&self) -> EnrollStep {
        match self {
            Self::Rejected { step, .. } | Self::TimedOut { step } | Self::Cancelled { step } => *step,
        }
    }
}

impl fmt::Display for EnrollFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected { step, status } => write!(f, "{} rejected: {}", step, status),
            Self::TimedOut { step } => write!(f, "{} timed out", step),
            Self::Cancelled { step } => write!(f, "{} cancelled", step),
        }
    }
}

/// Enrollment states
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EnrollState {
    AwaitFinger1,
    Char1Captured,
    AwaitRemoval,
    AwaitFinger2,
    Char2Captured,
    ModelCreated,
    Stored,
    Failed(EnrollFailure),
}

impl EnrollState {
    /// No further steps
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stored | Self::Failed(_))
    }
}

impl fmt::Display for EnrollState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AwaitFinger1 => write!(f, "AwaitFinger1"),
            Self::Char1Captured => write!(f, "Char1Captured"),
            Self::AwaitRemoval => write!(f, "AwaitRemoval"),
            Self::AwaitFinger2 => write!(f, "AwaitFinger2"),
            Self::Char2Captured => write!(f, "Char2Captured"),
            Self::ModelCreated => write!(f, "ModelCreated"),
            Self::Stored => write!(f, "Stored"),
            Self::Failed(failure) => write!(f, "Failed({})", failure),
        }
    }
}

/// A state change
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Transition {
    pub from: EnrollState,
    pub to: EnrollState,
}

/// Enrollment of one finger into one library page
#[derive(Debug, Clone)]
pub struct Enrollment {
    page: u16,
    state: EnrollState,
    finger_placed: bool,
}

impl Enrollment {
    /// Start enrolling into `page`
    pub fn new(page: u16) -> Self {
        Self {
            page,
            state: EnrollState::AwaitFinger1,
            finger_placed: false,
        }
    }

    pub fn page(&self) -> u16 {
        self.page
    }

    pub fn state(&self) -> EnrollState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_terminal()
    }

    /// Step to execute next, `None` once finished
    pub fn next_step(&self) -> Option<EnrollStep> {
        match self.state {
            EnrollState::AwaitFinger1 if self.finger_placed => {
                Some(EnrollStep::GenerateChar(CharBuffer::One))
            }
            EnrollState::AwaitFinger2 if self.finger_placed => {
                Some(EnrollStep::GenerateChar(CharBuffer::Two))
            }
            EnrollState::AwaitFinger1 | EnrollState::AwaitFinger2 => Some(EnrollStep::WaitForFinger),
            EnrollState::Char1Captured | EnrollState::AwaitRemoval => Some(EnrollStep::WaitForRemoval),
            EnrollState::Char2Captured => Some(EnrollStep::CreateModel),
            EnrollState::ModelCreated => Some(EnrollStep::Store(TemplateRef::new(
                CharBuffer::One,
                self.page,
            ))),
            EnrollState::Stored | EnrollState::Failed(_) => None,
        }
    }

    /// Apply the outcome of the current step
    ///
    /// Returns the state changes it caused, in order; empty when the step
    /// only made progress within the current state or the enrollment is
    /// already finished.
    pub fn advance(&mut self, outcome: StepOutcome) -> Vec<Transition> {
        let Some(step) = self.next_step() else {
            return Vec::new();
        };

        let failure = match outcome {
            StepOutcome::Completed => return self.complete(step),
            StepOutcome::Rejected(status) => EnrollFailure::Rejected { step, status },
            StepOutcome::TimedOut => EnrollFailure::TimedOut { step },
            StepOutcome::Cancelled => EnrollFailure::Cancelled { step },
        };

        vec![self.goto(EnrollState::Failed(failure))]
    }

    fn complete(&mut self, step: EnrollStep) -> Vec<Transition> {
        match (self.state, step) {
            (EnrollState::AwaitFinger1 | EnrollState::AwaitFinger2, EnrollStep::WaitForFinger) => {
                self.finger_placed = true;
                Vec::new()
            }
            (EnrollState::AwaitFinger1, EnrollStep::GenerateChar(_)) => {
                self.finger_placed = false;
                vec![
                    self.goto(EnrollState::Char1Captured),
                    self.goto(EnrollState::AwaitRemoval),
                ]
            }
            (EnrollState::Char1Captured | EnrollState::AwaitRemoval, EnrollStep::WaitForRemoval) => {
                vec![self.goto(EnrollState::AwaitFinger2)]
            }
            (EnrollState::AwaitFinger2, EnrollStep::GenerateChar(_)) => {
                self.finger_placed = false;
                vec![self.goto(EnrollState::Char2Captured)]
            }
            (EnrollState::Char2Captured, EnrollStep::CreateModel) => {
                vec![self.goto(EnrollState::ModelCreated)]
            }
            (EnrollState::ModelCreated, EnrollStep::Store(_)) => vec![self.goto(EnrollState::Stored)],
            // next_step() only yields the pairs above
            _ => Vec::new(),
        }
    }

    fn goto(&mut self, to: EnrollState) -> Transition {
        let transition = Transition { from: self.state, to };
        self.state = to;
        transition
    }
}
