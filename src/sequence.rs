//! Secret-sequence matcher.
//!
//! Pure state machine tracking progress through the configured unlock code.
//! Each qualifying tracked subject contributes one `submit` call with the
//! symbols observed on it; the matcher only cares whether the expected next
//! symbol is among them.
//!
//! The matcher is deterministic and clock-free. It never renders text and
//! never logs; callers turn `MatchResult` into UI messages.

use anyhow::{anyhow, Result};

use crate::Symbol;

/// Outcome of one `submit` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MatchResult {
    /// Expected symbol absent while no progress had been made. Nothing
    /// changed; background noise stays silent.
    NoOp,
    /// Expected symbol present; progressed to `step` of `of`.
    Advanced { step: usize, of: usize },
    /// Expected symbol absent after partial progress; position is back at 0.
    Reset,
    /// The final symbol landed. Position is already back at 0.
    Completed,
}

/// Progress through a fixed secret sequence of symbols.
///
/// Position `len` is never a resting state: the transition that would reach
/// it reports `Completed` and resets to 0 in the same step, so observers can
/// never see "full position, not yet unlocked".
#[derive(Clone, Debug)]
pub struct SequenceMatcher {
    sequence: Vec<Symbol>,
    position: usize,
}

impl SequenceMatcher {
    /// Build a matcher over the secret sequence.
    ///
    /// An empty sequence can never be satisfied and is rejected outright.
    pub fn new(sequence: Vec<Symbol>) -> Result<Self> {
        if sequence.is_empty() {
            return Err(anyhow!("secret sequence must not be empty"));
        }
        Ok(Self {
            sequence,
            position: 0,
        })
    }

    /// Feed the symbols observed on one qualifying tracked subject.
    ///
    /// Only membership of the expected next symbol matters; order and
    /// duplicates within `observed` are irrelevant.
    pub fn submit(&mut self, observed: &[Symbol]) -> MatchResult {
        let expected = &self.sequence[self.position];
        if observed.contains(expected) {
            self.position += 1;
            if self.position == self.sequence.len() {
                self.position = 0;
                return MatchResult::Completed;
            }
            return MatchResult::Advanced {
                step: self.position,
                of: self.sequence.len(),
            };
        }
        if self.position > 0 {
            self.position = 0;
            return MatchResult::Reset;
        }
        MatchResult::NoOp
    }

    /// Current progress, in `[0, len)`.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Drop any partial progress. Called at session boundaries.
    pub fn reset(&mut self) {
        self.position = 0;
    }
}
