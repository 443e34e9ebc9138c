//! Once-per-session admission of tracked subjects.
//!
//! The tracker hands the same `TrackedId` back on every frame a subject stays
//! in view, so a person holding up one code symbol for a second would
//! otherwise be scored thirty times. `SeenSet` consumes each id exactly once
//! per session.

use std::collections::HashSet;

use crate::TrackedId;

/// Records which tracked ids have already been fed to the sequence matcher
/// in the current session.
#[derive(Debug, Default)]
pub struct SeenSet {
    seen: HashSet<TrackedId>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true (and records the id) the first time an id is presented
    /// in the current session, false on every repeat until `clear`.
    pub fn admit(&mut self, id: TrackedId) -> bool {
        self.seen.insert(id)
    }

    /// Number of distinct ids consumed this session.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Forget everything. Called at the session boundary so a stale id set
    /// cannot leak into a later, unrelated approach.
    pub fn clear(&mut self) {
        self.seen.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_each_id_once() {
        let mut seen = SeenSet::new();
        assert!(seen.admit(TrackedId(7)));
        assert!(!seen.admit(TrackedId(7)));
        assert!(seen.admit(TrackedId(8)));
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn repeat_admits_stay_false_until_clear() {
        let mut seen = SeenSet::new();
        assert!(seen.admit(TrackedId(7)));
        for _ in 0..30 {
            assert!(!seen.admit(TrackedId(7)));
        }
        seen.clear();
        assert!(seen.is_empty());
        assert!(seen.admit(TrackedId(7)));
    }
}
