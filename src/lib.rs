//! deskwatch - intrusion-alert kernel for a camera-secured desk
//!
//! This crate implements the alerting core that sits between an external
//! detection pipeline and a notification endpoint.
//!
//! # Architecture
//!
//! A session runs from "first person observed" to "alarm resolved":
//!
//! 1. **Presence arms the countdown**: a detection carrying the presence
//!    symbol starts a fresh session and arms the alarm timer.
//! 2. **Unlock by secret sequence**: each newly tracked subject may advance
//!    the secret symbol sequence exactly once; completing it disarms the
//!    timer before it fires.
//! 3. **Fire exactly once**: an expired countdown notifies the alert
//!    endpoint once, best-effort, and never after a successful disarm.
//!
//! # Module Structure
//!
//! - `sequence`: secret-sequence matcher (pure state machine)
//! - `track`: once-per-session admission of tracked subjects
//! - `alarm`: cancellable countdown with a supervised worker thread
//! - `coordinator`: session boundaries and glue between the above
//! - `notify`: alert delivery (ntfy-style HTTP POST)
//! - `detect`: collaborator-facing detection types and sources
//! - `config`: TOML configuration with env overrides

use serde::{Deserialize, Serialize};

pub mod alarm;
pub mod config;
pub mod coordinator;
pub mod detect;
pub mod notify;
pub mod sequence;
pub mod track;

pub use alarm::{AlarmState, AlarmTimer};
pub use config::DeskwatchConfig;
pub use coordinator::{Coordinator, UiState};
pub use detect::{filter_confident, DetectionSource, FrameDetections, SyntheticSource};
pub use notify::{AlertNotifier, AlertPayload, NtfyNotifier};
pub use sequence::{MatchResult, SequenceMatcher};
pub use track::SeenSet;

// -------------------- Symbols --------------------

/// Identifier for a detected object class, used as one digit of the unlock
/// code or as the presence marker.
///
/// Symbols are opaque and equality-comparable only. Detection models expose
/// both numeric class ids and class-name strings, and configs mix the two
/// (`code = [2, 0, 5]` next to `presence = "person"`), so both spellings
/// deserialize transparently.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum Symbol {
    Id(u32),
    Name(String),
}

impl From<u32> for Symbol {
    fn from(id: u32) -> Self {
        Symbol::Id(id)
    }
}

impl From<&str> for Symbol {
    fn from(name: &str) -> Self {
        Symbol::Name(name.to_string())
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Symbol::Id(id) => write!(f, "{}", id),
            Symbol::Name(name) => write!(f, "{}", name),
        }
    }
}

// -------------------- Tracking --------------------

/// Handle assigned by the external tracker to one continuously observed
/// subject. Unique for the process lifetime; the kernel only ever compares
/// it for equality.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct TrackedId(pub u64);

impl std::fmt::Display for TrackedId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "track:{}", self.0)
    }
}

/// One tracked subject's observation for a single frame.
///
/// `symbols` is membership-only: the order the detector emitted them in
/// carries no meaning. `confidence` is the upstream model score; the
/// alerting core never reads it (filtering happens in `detect`).
#[derive(Clone, Debug)]
pub struct TrackedDetection {
    pub id: TrackedId,
    pub confidence: f32,
    pub symbols: Vec<Symbol>,
}

impl TrackedDetection {
    pub fn new(id: TrackedId, confidence: f32, symbols: Vec<Symbol>) -> Self {
        Self {
            id,
            confidence,
            symbols,
        }
    }

    /// Membership test used by the matcher and the presence check.
    pub fn has_symbol(&self, symbol: &Symbol) -> bool {
        self.symbols.contains(symbol)
    }
}
