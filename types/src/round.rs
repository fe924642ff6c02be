//! Round countdown state machine.
//!
//! This module holds the pure transition logic for the shared round clock.
//! It performs no I/O and knows nothing about timers; the server drives it
//! once per tick and persists whatever it returns.
//!
//! ## Phases
//!
//! Every tick observes one of two phases:
//! 1. **Counting** - more than one second remains, the countdown decrements
//! 2. **Expiring** - the window is used up, the round number advances and the
//!    countdown is refilled to the window length `W`
//!
//! A round lasts exactly `W` ticks. The tick that would bring the countdown
//! to zero lands on `{W, round + 1}` instead, so ticking never produces a
//! zero countdown. A zero countdown can still be installed administratively
//! (see [`RoundState::force`]) and expires on the next tick.
//!
//! ## Usage
//!
//! ```rust
//! use colorclock_types::{RoundState, Transition};
//!
//! let window = 35;
//! let mut state = RoundState::initial(window);
//! for _ in 0..34 {
//!     let (next, transition) = state.tick(window);
//!     assert_eq!(transition, Transition::Counted);
//!     state = next;
//! }
//! let (state, transition) = state.tick(window);
//! assert_eq!(transition, Transition::Advanced);
//! assert_eq!(state, RoundState { countdown_seconds_remaining: 35, current_round_number: 2 });
//! ```

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Default countdown window in seconds.
pub const DEFAULT_WINDOW_SECONDS: u32 = 35;

/// First round number handed out by a fresh clock.
pub const FIRST_ROUND: u64 = 1;

/// Largest round number accepted anywhere; round numbers are stored as
/// signed 64-bit integers.
pub const MAX_ROUND: u64 = i64::MAX as u64;

/// Reject round numbers outside `[FIRST_ROUND, MAX_ROUND]`.
pub fn check_round(round: u64) -> Result<()> {
    if round < FIRST_ROUND {
        return Err(Error::invalid("round number must be at least 1"));
    }
    if round > MAX_ROUND {
        return Err(Error::invalid(format!(
            "round number {round} exceeds {MAX_ROUND}"
        )));
    }
    Ok(())
}

/// Snapshot of the shared countdown and round counter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundState {
    #[serde(alias = "timeLeft")]
    pub countdown_seconds_remaining: u32,
    #[serde(alias = "currentBetNumber")]
    pub current_round_number: u64,
}

/// Phase observed on entry to a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Counting,
    Expiring,
}

/// Outcome of a single tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// The countdown decremented within the same round.
    Counted,
    /// The round closed and the next one opened with a full window.
    Advanced,
}

impl RoundState {
    /// State of a clock that has never run.
    pub const fn initial(window: u32) -> Self {
        Self {
            countdown_seconds_remaining: window,
            current_round_number: FIRST_ROUND,
        }
    }

    pub fn phase(&self) -> Phase {
        if self.countdown_seconds_remaining <= 1 {
            Phase::Expiring
        } else {
            Phase::Counting
        }
    }

    /// Apply one tick.
    pub fn tick(&self, window: u32) -> (Self, Transition) {
        match self.phase() {
            Phase::Counting => (
                Self {
                    countdown_seconds_remaining: self.countdown_seconds_remaining - 1,
                    ..*self
                },
                Transition::Counted,
            ),
            Phase::Expiring => (self.next_round(window), Transition::Advanced),
        }
    }

    /// Close the current round immediately, regardless of the countdown.
    ///
    /// The round number stops at [`MAX_ROUND`].
    pub fn next_round(&self, window: u32) -> Self {
        Self {
            countdown_seconds_remaining: window,
            current_round_number: self.current_round_number.saturating_add(1).min(MAX_ROUND),
        }
    }

    /// Validate an administrative override against the window.
    pub fn force(countdown: u32, round: u64, window: u32) -> Result<Self> {
        let state = Self {
            countdown_seconds_remaining: countdown,
            current_round_number: round,
        };
        state.validate(window)?;
        Ok(state)
    }

    pub fn validate(&self, window: u32) -> Result<()> {
        if self.countdown_seconds_remaining > window {
            return Err(Error::invalid(format!(
                "countdown {} exceeds window {window}",
                self.countdown_seconds_remaining
            )));
        }
        check_round(self.current_round_number)
    }

    /// Bring a persisted snapshot back into range.
    ///
    /// Returns the clamped state and whether anything changed.
    pub fn clamp(&self, window: u32) -> (Self, bool) {
        let clamped = Self {
            countdown_seconds_remaining: self.countdown_seconds_remaining.min(window),
            current_round_number: self.current_round_number.clamp(FIRST_ROUND, MAX_ROUND),
        };
        (clamped, clamped != *self)
    }
}
