//! Session coordinator.
//!
//! Owns the sequence matcher, the seen-set, and the alarm timer, and is the
//! only writer of session boundaries. The detection collaborator calls
//! `on_detections` once per frame from a single producer context; the only
//! other thread in play is the alarm countdown worker, which shares state
//! with this module exclusively through `AlarmTimer`'s lock.
//!
//! A session runs from the first presence detection to the timer resolving
//! (fired or disarmed). Starting a session clears the seen-set and the
//! matcher, so progress and consumed tracker ids can never leak from an
//! earlier approach into a later one.

use std::sync::Arc;

use anyhow::Result;

use crate::alarm::{AlarmState, AlarmTimer};
use crate::config::DeskwatchConfig;
use crate::notify::AlertNotifier;
use crate::sequence::{MatchResult, SequenceMatcher};
use crate::track::SeenSet;
use crate::{Symbol, TrackedDetection};

/// Snapshot handed to the rendering collaborator after each frame.
///
/// Plain strings for the on-screen overlay; no rendering decisions are made
/// here.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UiState {
    pub alarm_message: String,
    pub sequence_message: String,
}

/// Glue between the detection stream and the alerting core.
pub struct Coordinator {
    presence: Symbol,
    matcher: SequenceMatcher,
    seen: SeenSet,
    alarm: AlarmTimer,
    sequence_message: String,
}

impl Coordinator {
    pub fn new(code: Vec<Symbol>, presence: Symbol, alarm: AlarmTimer) -> Result<Self> {
        Ok(Self {
            presence,
            matcher: SequenceMatcher::new(code)?,
            seen: SeenSet::new(),
            alarm,
            sequence_message: String::new(),
        })
    }

    /// Build the coordinator and its alarm timer from loaded configuration.
    pub fn from_config(cfg: &DeskwatchConfig, notifier: Arc<dyn AlertNotifier>) -> Result<Self> {
        let alarm = AlarmTimer::new(cfg.app.window_ticks, cfg.app.tick, notifier)?;
        Self::new(cfg.app.code.clone(), cfg.app.presence.clone(), alarm)
    }

    /// Process one frame's worth of tracked detections.
    ///
    /// Empty input is a valid frame with zero detections. Runs in
    /// O(detections) and never waits on the countdown worker.
    pub fn on_detections(&mut self, detections: &[TrackedDetection]) -> Result<UiState> {
        let presence_seen = detections.iter().any(|d| d.has_symbol(&self.presence));
        if presence_seen && self.alarm.state()? != AlarmState::Armed {
            self.begin_session()?;
        }

        for detection in detections {
            if !self.seen.admit(detection.id) {
                continue;
            }
            let result = self.matcher.submit(&detection.symbols);
            self.render_sequence_message(&result);
            if result == MatchResult::Completed {
                self.alarm.disarm()?;
            }
        }

        Ok(UiState {
            alarm_message: self.alarm.message()?,
            sequence_message: self.sequence_message.clone(),
        })
    }

    /// Current alarm lifecycle state, for health logging and tests.
    pub fn alarm_state(&self) -> Result<AlarmState> {
        self.alarm.state()
    }

    /// Presence observed with no session active: resolve the previous
    /// session's leftovers and arm a fresh countdown.
    fn begin_session(&mut self) -> Result<()> {
        self.seen.clear();
        self.matcher.reset();
        self.sequence_message.clear();
        self.alarm.reset()?;
        self.alarm.arm()?;
        log::info!("presence detected, new session armed");
        Ok(())
    }

    fn render_sequence_message(&mut self, result: &MatchResult) {
        let msg = match result {
            // Background noise stays silent.
            MatchResult::NoOp => return,
            MatchResult::Advanced { step, of } => {
                format!("Correct code entered. Step {} of {} completed.", step, of)
            }
            MatchResult::Reset => "Incorrect code entered. Resetting sequence.".to_string(),
            MatchResult::Completed => "Correct sequence entered! Desk is unlocked!".to_string(),
        };
        log::info!("{}", msg);
        self.sequence_message = msg;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::AlertPayload;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingNotifier {
        sent: AtomicUsize,
    }

    impl CountingNotifier {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                sent: AtomicUsize::new(0),
            })
        }
    }

    impl AlertNotifier for CountingNotifier {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn send(&self, _alert: &AlertPayload) -> Result<()> {
            self.sent.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn coordinator(code: &[u32], window: u32) -> (Coordinator, Arc<CountingNotifier>) {
        let notifier = CountingNotifier::new();
        let alarm = AlarmTimer::new(window, Duration::from_millis(5), notifier.clone())
            .expect("alarm timer");
        let coordinator = Coordinator::new(
            code.iter().map(|&id| Symbol::Id(id)).collect(),
            Symbol::from("person"),
            alarm,
        )
        .expect("coordinator");
        (coordinator, notifier)
    }

    fn person(id: u64) -> TrackedDetection {
        TrackedDetection::new(crate::TrackedId(id), 0.95, vec![Symbol::from("person")])
    }

    fn card(id: u64, symbol: u32) -> TrackedDetection {
        TrackedDetection::new(crate::TrackedId(id), 0.90, vec![Symbol::Id(symbol)])
    }

    #[test]
    fn empty_frame_is_a_no_op() {
        let (mut c, _notifier) = coordinator(&[2, 0, 5], 1000);
        let ui = c.on_detections(&[]).expect("frame");
        assert_eq!(ui, UiState::default());
        assert_eq!(c.alarm_state().expect("state"), AlarmState::Idle);
    }

    #[test]
    fn presence_arms_and_full_sequence_disarms() {
        let (mut c, _notifier) = coordinator(&[2, 0, 5], 1000);

        c.on_detections(&[person(1)]).expect("frame");
        assert_eq!(c.alarm_state().expect("state"), AlarmState::Armed);

        let ui = c.on_detections(&[card(7, 2)]).expect("frame");
        assert_eq!(
            ui.sequence_message,
            "Correct code entered. Step 1 of 3 completed."
        );
        let ui = c.on_detections(&[card(8, 0)]).expect("frame");
        assert_eq!(
            ui.sequence_message,
            "Correct code entered. Step 2 of 3 completed."
        );
        let ui = c.on_detections(&[card(9, 5)]).expect("frame");
        assert_eq!(ui.sequence_message, "Correct sequence entered! Desk is unlocked!");
        assert_eq!(ui.alarm_message, "Desk Unlocked!");
        assert_eq!(c.alarm_state().expect("state"), AlarmState::Disarmed);
    }

    #[test]
    fn lingering_tracked_id_is_scored_once() {
        let (mut c, _notifier) = coordinator(&[2, 0, 5], 1000);
        c.on_detections(&[person(1)]).expect("frame");

        for _ in 0..30 {
            c.on_detections(&[card(7, 2)]).expect("frame");
        }
        // 29 repeats of track 7 neither advance nor reset.
        let ui = c.on_detections(&[card(8, 0)]).expect("frame");
        assert_eq!(
            ui.sequence_message,
            "Correct code entered. Step 2 of 3 completed."
        );
    }

    #[test]
    fn wrong_entry_resets_only_after_progress() {
        let (mut c, _notifier) = coordinator(&[2, 0], 1000);
        c.on_detections(&[person(1)]).expect("frame");

        let ui = c.on_detections(&[card(7, 9)]).expect("frame");
        assert_eq!(ui.sequence_message, "");

        c.on_detections(&[card(8, 2)]).expect("frame");
        let ui = c.on_detections(&[card(9, 9)]).expect("frame");
        assert_eq!(ui.sequence_message, "Incorrect code entered. Resetting sequence.");
    }

    #[test]
    fn new_session_clears_previous_state() {
        let (mut c, notifier) = coordinator(&[2, 0], 1000);
        c.on_detections(&[person(1)]).expect("frame");
        c.on_detections(&[card(7, 2)]).expect("frame");
        c.on_detections(&[card(8, 0)]).expect("frame");
        assert_eq!(c.alarm_state().expect("state"), AlarmState::Disarmed);

        // Next approach: the same tracker ids are admissible again and the
        // matcher starts from scratch.
        c.on_detections(&[person(1)]).expect("frame");
        assert_eq!(c.alarm_state().expect("state"), AlarmState::Armed);
        let ui = c.on_detections(&[card(7, 2)]).expect("frame");
        assert_eq!(
            ui.sequence_message,
            "Correct code entered. Step 1 of 2 completed."
        );
        let ui = c.on_detections(&[card(8, 0)]).expect("frame");
        assert_eq!(ui.sequence_message, "Correct sequence entered! Desk is unlocked!");
        assert_eq!(notifier.sent.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn presence_while_armed_does_not_restart() {
        let (mut c, _notifier) = coordinator(&[2, 0], 1000);
        c.on_detections(&[person(1)]).expect("frame");
        c.on_detections(&[card(7, 2)]).expect("frame");
        // The person is still in frame; progress must survive.
        let ui = c.on_detections(&[person(1), card(8, 0)]).expect("frame");
        assert_eq!(ui.sequence_message, "Correct sequence entered! Desk is unlocked!");
    }

    #[test]
    fn unattended_presence_fires_once() {
        let (mut c, notifier) = coordinator(&[2, 0, 5], 3);
        c.on_detections(&[person(1)]).expect("frame");
        for _ in 0..200 {
            if c.alarm_state().expect("state") == AlarmState::Fired {
                break;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        assert_eq!(c.alarm_state().expect("state"), AlarmState::Fired);
        // Delivery completes just after the Fired transition is published.
        for _ in 0..100 {
            if notifier.sent.load(Ordering::SeqCst) == 1 {
                break;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        assert_eq!(notifier.sent.load(Ordering::SeqCst), 1);
        let ui = c.on_detections(&[]).expect("frame");
        assert_eq!(ui.alarm_message, "Alert Sent!");
    }
}
