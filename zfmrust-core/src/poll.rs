//! Finger presence polling primitives
//!
//! The module has no "finger placed" interrupt on the serial link; presence
//! is detected by repeating `GenImg` until it succeeds (finger on the sensor)
//! or fails (finger lifted). These types bound that loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::status::Status;

/// Limits for a presence polling loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    /// Give up after this long
    pub timeout: Duration,

    /// Give up after this many `GenImg` attempts (unbounded if `None`)
    pub max_attempts: Option<u32>,

    /// Pause between attempts
    pub interval: Duration,
}

impl PollOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Attempt budget exhausted after `attempts` tries
    pub fn attempts_exhausted(&self, attempts: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max)
    }
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_attempts: None,
            interval: Duration::from_millis(50),
        }
    }
}

/// Cancellation signal shared between a polling loop and its controller
///
/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Condition a presence poll waits for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// `GenImg` succeeds
    Placed,

    /// `GenImg` fails
    Removed,
}

impl Presence {
    /// Whether a `GenImg` confirmation code satisfies this condition
    pub fn is_satisfied_by(self, status: Status) -> bool {
        match self {
            Self::Placed => status.is_ok(),
            Self::Removed => !status.is_ok(),
        }
    }
}

/// How a presence poll ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Condition met after `attempts` tries
    Satisfied { attempts: u32 },

    /// Time or attempt budget exhausted
    TimedOut { attempts: u32 },

    /// Cancel token triggered
    Cancelled { attempts: u32 },
}

impl PollOutcome {
    pub fn is_satisfied(self) -> bool {
        matches!(self, Self::Satisfied { .. })
    }

    pub fn attempts(self) -> u32 {
        match self {
            Self::Satisfied { attempts }
            | Self::TimedOut { attempts }
            | Self::Cancelled { attempts } => attempts,
        }
    }
}
