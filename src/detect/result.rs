//! Per-frame detection output.

use crate::TrackedDetection;

/// Everything the tracker reported for one frame.
pub type FrameDetections = Vec<TrackedDetection>;

/// Drop detections below the configured model score.
///
/// Runs upstream of the tracker and the coordinator; the alerting core never
/// sees a low-confidence detection and never reads scores itself.
pub fn filter_confident(frame: FrameDetections, min_confidence: f32) -> FrameDetections {
    frame
        .into_iter()
        .filter(|d| d.confidence > min_confidence)
        .collect()
}
