//! Detection sources.
//!
//! A `DetectionSource` stands in for the external inference pipeline: per
//! frame it yields the tracked detections the coordinator consumes. The
//! synthetic source scripts a repeating desk scene so the daemon runs
//! end-to-end with no camera, no model, and no tracker attached.

use anyhow::Result;
use rand::Rng;

use crate::detect::FrameDetections;
use crate::{Symbol, TrackedDetection, TrackedId};

/// Frames in one scripted approach (empty desk, person enters, resolution).
const CYCLE_FRAMES: u64 = 120;
/// Frame within the cycle where the person enters.
const PERSON_APPEARS: u64 = 20;
/// Frames between consecutive code cards being held up.
const CARD_INTERVAL: u64 = 10;

/// Stream of per-frame tracked detections.
pub trait DetectionSource: Send {
    /// Source identifier for logs.
    fn name(&self) -> &'static str;

    /// Produce the next frame's detections. An empty vec is a valid frame.
    fn next_frame(&mut self) -> Result<FrameDetections>;

    /// Whether the source is still delivering.
    fn is_healthy(&self) -> bool;

    /// Frame statistics for health logging.
    fn stats(&self) -> SourceStats;
}

/// Statistics for a detection source.
#[derive(Clone, Debug)]
pub struct SourceStats {
    pub frames_emitted: u64,
    pub url: String,
}

/// Scripted detection source for `stub://` URLs.
///
/// Alternates between two approaches: an authorized one where a person
/// enters and holds up the code symbols in order (each card gets a fresh
/// tracker id), and an intruder one where a person enters and never shows a
/// card. Confidence scores carry a little jitter so the upstream filter has
/// something to chew on.
pub struct SyntheticSource {
    url: String,
    code: Vec<Symbol>,
    presence: Symbol,
    frame_count: u64,
    next_track: u64,
    person_track: TrackedId,
}

impl SyntheticSource {
    pub fn new(url: String, code: Vec<Symbol>, presence: Symbol) -> Self {
        Self {
            url,
            code,
            presence,
            frame_count: 0,
            next_track: 0,
            person_track: TrackedId(0),
        }
    }

    fn alloc_track(&mut self) -> TrackedId {
        self.next_track += 1;
        TrackedId(self.next_track)
    }

    fn confidence() -> f32 {
        rand::thread_rng().gen_range(0.80..0.99)
    }
}

impl DetectionSource for SyntheticSource {
    fn name(&self) -> &'static str {
        "synthetic"
    }

    fn next_frame(&mut self) -> Result<FrameDetections> {
        let cycle = self.frame_count / CYCLE_FRAMES;
        let pos = self.frame_count % CYCLE_FRAMES;
        self.frame_count += 1;

        let mut frame = FrameDetections::new();
        if pos == PERSON_APPEARS {
            // A new approach: the tracker hands out a fresh id.
            self.person_track = self.alloc_track();
        }
        if pos >= PERSON_APPEARS {
            frame.push(TrackedDetection::new(
                self.person_track,
                Self::confidence(),
                vec![self.presence.clone()],
            ));
        }

        let authorized_run = cycle % 2 == 0;
        if authorized_run && pos >= PERSON_APPEARS && (pos - PERSON_APPEARS) % CARD_INTERVAL == 0 {
            let card = ((pos - PERSON_APPEARS) / CARD_INTERVAL) as usize;
            if let Some(symbol) = self.code.get(card).cloned() {
                let track = self.alloc_track();
                frame.push(TrackedDetection::new(
                    track,
                    Self::confidence(),
                    vec![symbol],
                ));
            }
        }

        Ok(frame)
    }

    fn is_healthy(&self) -> bool {
        true
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_emitted: self.frame_count,
            url: self.url.clone(),
        }
    }
}
