//! Collaborator-facing detection interface.
//!
//! Model inference, tracking, and video decode live outside this crate; the
//! kernel only consumes their output. This module provides:
//! - the per-frame detection types handed to the coordinator
//! - the upstream confidence filter applied before tracking
//! - `DetectionSource` implementations (`stub://` synthetic scenes for
//!   camera-less runs)

mod result;
mod source;

pub use result::{filter_confident, FrameDetections};
pub use source::{DetectionSource, SourceStats, SyntheticSource};

use anyhow::{bail, Result};

use crate::Symbol;

/// Pick a detection source for a stream URL.
///
/// `stub://` URLs get a synthetic scripted scene. Anything else requires a
/// real detection pipeline wired in by the embedding application.
pub fn source_for_url(
    url: &str,
    code: Vec<Symbol>,
    presence: Symbol,
) -> Result<Box<dyn DetectionSource>> {
    if url.starts_with("stub://") {
        return Ok(Box::new(SyntheticSource::new(
            url.to_string(),
            code,
            presence,
        )));
    }
    bail!(
        "no detection pipeline available for '{}'; attach one via DetectionSource or use a stub:// URL",
        url
    )
}
