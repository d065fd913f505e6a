//! Multi-command workflows: finger search and enrollment

use std::fmt;

use tracing::{debug, info, warn};

use zfmrust_core::{
    CancelToken, CharBuffer, Command, EnrollState, EnrollStep, Enrollment, Outcome, PollOptions,
    PollOutcome, Presence, Status, StepOutcome,
};
use zfmrust_transport::Transport;
use zfmrust_types::SearchMatch;

use crate::{
    Device,
    error::Result,
    observer::{EnrollEvent, EnrollObserver},
};

/// Result of a finger search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    /// The finger matched a library template
    Found(SearchMatch),

    /// A step was rejected; later steps were not run
    Rejected { command: &'static str, status: Status },

    /// No finger was presented before the poll gave up
    NoFinger(PollOutcome),
}

impl SearchOutcome {
    pub fn found(self) -> Option<SearchMatch> {
        match self {
            Self::Found(hit) => Some(hit),
            _ => None,
        }
    }
}

impl fmt::Display for SearchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Found(hit) => write!(f, "found at {}", hit),
            Self::Rejected { command, status } => write!(f, "{} rejected: {}", command, status),
            Self::NoFinger(poll) => write!(f, "no finger after {} attempts", poll.attempts()),
        }
    }
}

impl<T: Transport> Device<T> {
    /// Capture an image and search the library for it
    ///
    /// Runs `GenImg`, `Img2Tz` into buffer 1 and `HighSpeedSearch` over
    /// `page_count` pages from `start_page`, stopping at the first rejection.
    pub async fn search_finger(&mut self, start_page: u16, page_count: u16) -> Result<SearchOutcome> {
        if let Outcome::Failure(status) = self.get_image().await? {
            return Ok(SearchOutcome::Rejected {
                command: Command::GetImage.name(),
                status,
            });
        }

        self.search_captured(start_page, page_count).await
    }

    /// Wait for a finger, then search the library for it
    pub async fn wait_and_search(
        &mut self,
        start_page: u16,
        page_count: u16,
        cancel: &CancelToken,
    ) -> Result<SearchOutcome> {
        let options = self.poll_options();
        let poll = self.poll_finger(Presence::Placed, &options, cancel).await?;

        if !poll.is_satisfied() {
            return Ok(SearchOutcome::NoFinger(poll));
        }

        self.search_captured(start_page, page_count).await
    }

    async fn search_captured(&mut self, start_page: u16, page_count: u16) -> Result<SearchOutcome> {
        let buffer = CharBuffer::One;

        if let Outcome::Failure(status) = self.image_to_char(buffer).await? {
            return Ok(SearchOutcome::Rejected {
                command: Command::ImageToChar { buffer }.name(),
                status,
            });
        }

        let outcome = match self.high_speed_search(buffer, start_page, page_count).await? {
            Outcome::Success(hit) => SearchOutcome::Found(hit),
            Outcome::Failure(status) => SearchOutcome::Rejected {
                command: Command::HighSpeedSearch {
                    buffer,
                    start_page,
                    page_count,
                }
                .name(),
                status,
            },
        };

        debug!("Search {}", outcome);
        Ok(outcome)
    }

    /// Enroll a finger into library `page`
    ///
    /// Captures the finger twice (lifted in between), merges both captures
    /// into a model and stores it. Presence polls use the device's
    /// [`PollOptions`]. Returns the final state: [`EnrollState::Stored`] or
    /// [`EnrollState::Failed`] with the step and status that stopped it.
    pub async fn enroll(
        &mut self,
        page: u16,
        cancel: &CancelToken,
        observer: &dyn EnrollObserver,
    ) -> Result<EnrollState> {
        let options = self.poll_options();
        let mut enrollment = Enrollment::new(page);

        info!(page, "Enrolling finger");

        while let Some(step) = enrollment.next_step() {
            observer.on_event(&EnrollEvent::StepStarted {
                state: enrollment.state(),
                step,
            });

            let outcome = if cancel.is_cancelled() {
                StepOutcome::Cancelled
            } else {
                self.run_step(step, &options, cancel).await?
            };

            for transition in enrollment.advance(outcome) {
                observer.on_event(&EnrollEvent::StateChanged(transition));
            }
        }

        let state = enrollment.state();
        match state {
            EnrollState::Failed(failure) => warn!(page, "Enrollment failed: {}", failure),
            _ => info!(page, "Enrollment complete"),
        }

        Ok(state)
    }

    async fn run_step(
        &mut self,
        step: EnrollStep,
        options: &PollOptions,
        cancel: &CancelToken,
    ) -> Result<StepOutcome> {
        let status = match step {
            EnrollStep::WaitForFinger => {
                let poll = self.poll_finger(Presence::Placed, options, cancel).await?;
                return Ok(poll_step(poll));
            }
            EnrollStep::WaitForRemoval => {
                let poll = self.poll_finger(Presence::Removed, options, cancel).await?;
                return Ok(poll_step(poll));
            }
            EnrollStep::GenerateChar(buffer) => self.image_to_char(buffer).await?.status(),
            EnrollStep::CreateModel => self.create_model().await?.status(),
            EnrollStep::Store(target) => self.store(target.buffer, target.page).await?.status(),
        };

        Ok(if status.is_ok() {
            StepOutcome::Completed
        } else {
            StepOutcome::Rejected(status)
        })
    }
}

fn poll_step(poll: PollOutcome) -> StepOutcome {
    match poll {
        PollOutcome::Satisfied { .. } => StepOutcome::Completed,
        PollOutcome::TimedOut { .. } => StepOutcome::TimedOut,
        PollOutcome::Cancelled { .. } => StepOutcome::Cancelled,
    }
}
