//! Cancellable alarm countdown.
//!
//! `AlarmTimer` owns the countdown for one desk. Arming spawns a supervised
//! worker thread that decrements once per tick and publishes the remaining
//! count for the overlay; disarming before expiry cancels the alert.
//!
//! The worker and the frame-callback context share one mutex-guarded state
//! block. The disarm check and the `Armed -> Fired` transition happen under
//! that lock, so a disarm racing the final expiry check is linearized: the
//! notifier is never invoked after a successful disarm and never skipped
//! after a genuine timeout.

use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::{anyhow, Result};

use crate::notify::{AlertNotifier, AlertPayload};

/// Alarm lifecycle for one session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlarmState {
    /// No session in progress; `arm` starts one.
    Idle,
    /// Countdown running.
    Armed,
    /// Cancelled before expiry. Terminal until `reset`.
    Disarmed,
    /// Countdown elapsed and the notify decision was taken. Terminal until
    /// `reset`.
    Fired,
}

#[derive(Debug)]
struct AlarmShared {
    state: AlarmState,
    /// Invalidates workers from earlier sessions: a worker only acts while
    /// the epoch it was spawned under is still current.
    epoch: u64,
    remaining: u32,
    message: String,
}

/// Countdown timer that fires an alert unless disarmed in time.
///
/// One instance per desk. All transitions go through the shared lock; the
/// worker is owned (joined when finished, abandoned to exit on its own when
/// a session resets mid-tick).
pub struct AlarmTimer {
    window: u32,
    tick: Duration,
    notifier: Arc<dyn AlertNotifier>,
    shared: Arc<Mutex<AlarmShared>>,
    worker: Option<JoinHandle<()>>,
}

impl AlarmTimer {
    pub fn new(window: u32, tick: Duration, notifier: Arc<dyn AlertNotifier>) -> Result<Self> {
        if window == 0 {
            return Err(anyhow!("countdown window must be at least one tick"));
        }
        Ok(Self {
            window,
            tick,
            notifier,
            shared: Arc::new(Mutex::new(AlarmShared {
                state: AlarmState::Idle,
                epoch: 0,
                remaining: 0,
                message: String::new(),
            })),
            worker: None,
        })
    }

    /// Start the countdown. No-op unless `Idle`: re-arming while armed or
    /// resolved never restarts the countdown or double-fires.
    ///
    /// Returns true when a new countdown actually started.
    pub fn arm(&mut self) -> Result<bool> {
        let epoch = {
            let mut shared = self
                .shared
                .lock()
                .map_err(|_| anyhow!("alarm state lock poisoned"))?;
            if shared.state != AlarmState::Idle {
                return Ok(false);
            }
            shared.state = AlarmState::Armed;
            shared.epoch += 1;
            shared.remaining = self.window;
            shared.message = format!("{} seconds left.", self.window);
            shared.epoch
        };

        let shared = Arc::clone(&self.shared);
        let notifier = Arc::clone(&self.notifier);
        let window = self.window;
        let tick = self.tick;
        self.worker = Some(std::thread::spawn(move || {
            run_countdown(shared, notifier, window, tick, epoch);
        }));
        log::info!("alarm armed: {} ticks", self.window);
        Ok(true)
    }

    /// Cancel a running countdown. Idempotent; has no effect once the timer
    /// has fired or the session is already resolved.
    ///
    /// Returns true when this call performed the cancellation.
    pub fn disarm(&mut self) -> Result<bool> {
        let mut shared = self
            .shared
            .lock()
            .map_err(|_| anyhow!("alarm state lock poisoned"))?;
        if shared.state != AlarmState::Armed {
            return Ok(false);
        }
        shared.state = AlarmState::Disarmed;
        shared.message = "Desk Unlocked!".to_string();
        log::info!("alarm disarmed with {} ticks left", shared.remaining);
        Ok(true)
    }

    /// Return a resolved timer (`Disarmed` or `Fired`) to `Idle` for the
    /// next session. Refuses while a countdown is still armed.
    pub fn reset(&mut self) -> Result<bool> {
        {
            let mut shared = self
                .shared
                .lock()
                .map_err(|_| anyhow!("alarm state lock poisoned"))?;
            match shared.state {
                AlarmState::Disarmed | AlarmState::Fired => {
                    shared.state = AlarmState::Idle;
                    shared.remaining = 0;
                    shared.message.clear();
                }
                AlarmState::Idle | AlarmState::Armed => return Ok(false),
            }
        }
        // Join the worker if it already wound down; otherwise abandon it.
        // A stale worker exits on its next epoch check without touching the
        // new session's state.
        if let Some(handle) = self.worker.take() {
            if handle.is_finished() {
                handle
                    .join()
                    .map_err(|_| anyhow!("alarm worker thread panicked"))?;
            }
        }
        Ok(true)
    }

    pub fn state(&self) -> Result<AlarmState> {
        let shared = self
            .shared
            .lock()
            .map_err(|_| anyhow!("alarm state lock poisoned"))?;
        Ok(shared.state)
    }

    /// Ticks left on the running countdown, 0 when not armed.
    pub fn remaining(&self) -> Result<u32> {
        let shared = self
            .shared
            .lock()
            .map_err(|_| anyhow!("alarm state lock poisoned"))?;
        Ok(shared.remaining)
    }

    /// Latest overlay message published by the countdown.
    pub fn message(&self) -> Result<String> {
        let shared = self
            .shared
            .lock()
            .map_err(|_| anyhow!("alarm state lock poisoned"))?;
        Ok(shared.message.clone())
    }
}

fn run_countdown(
    shared: Arc<Mutex<AlarmShared>>,
    notifier: Arc<dyn AlertNotifier>,
    window: u32,
    tick: Duration,
    epoch: u64,
) {
    for remaining in (1..=window).rev() {
        {
            let Ok(mut guard) = shared.lock() else {
                log::error!("alarm state lock poisoned; countdown abandoned");
                return;
            };
            if guard.state != AlarmState::Armed || guard.epoch != epoch {
                return;
            }
            guard.remaining = remaining;
            guard.message = format!("{} seconds left.", remaining);
        }
        std::thread::sleep(tick);
    }

    // Expiry decision. Reading the state under the same lock disarm() writes
    // through makes disarm-vs-fire a single linearization point.
    let fire = {
        let Ok(mut guard) = shared.lock() else {
            log::error!("alarm state lock poisoned; countdown abandoned");
            return;
        };
        if guard.state == AlarmState::Armed && guard.epoch == epoch {
            guard.state = AlarmState::Fired;
            guard.remaining = 0;
            guard.message = "Alert Sent!".to_string();
            true
        } else {
            false
        }
    };

    if fire {
        match notifier.send(&AlertPayload::intrusion()) {
            Ok(()) => log::info!("intrusion alert delivered via {}", notifier.name()),
            // Best effort: the alarm stays Fired whether or not the POST
            // landed.
            Err(err) => log::error!("intrusion alert delivery failed: {:#}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingNotifier {
        sent: AtomicUsize,
    }

    impl CountingNotifier {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                sent: AtomicUsize::new(0),
            })
        }

        fn count(&self) -> usize {
            self.sent.load(Ordering::SeqCst)
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

    struct FailingNotifier;

    impl AlertNotifier for FailingNotifier {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn send(&self, _alert: &AlertPayload) -> Result<()> {
            Err(anyhow!("endpoint unreachable"))
        }
    }

    const FAST_TICK: Duration = Duration::from_millis(5);

    fn wait_for_resolution(timer: &AlarmTimer) -> AlarmState {
        for _ in 0..400 {
            let state = timer.state().expect("state");
            if state != AlarmState::Armed {
                return state;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        panic!("alarm never resolved");
    }

    // The Fired transition is published before the notifier call returns,
    // so give the worker a moment to finish delivery.
    fn wait_for_count(notifier: &CountingNotifier, expected: usize) {
        for _ in 0..200 {
            if notifier.count() == expected {
                return;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        assert_eq!(notifier.count(), expected);
    }

    #[test]
    fn zero_window_rejected() {
        assert!(AlarmTimer::new(0, FAST_TICK, CountingNotifier::new()).is_err());
    }

    #[test]
    fn expiry_fires_exactly_once() {
        let notifier = CountingNotifier::new();
        let mut timer = AlarmTimer::new(3, FAST_TICK, notifier.clone()).expect("timer");
        assert!(timer.arm().expect("arm"));
        assert_eq!(wait_for_resolution(&timer), AlarmState::Fired);
        wait_for_count(&notifier, 1);
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(notifier.count(), 1);
        assert_eq!(timer.message().expect("message"), "Alert Sent!");
    }

    #[test]
    fn disarm_before_expiry_suppresses_alert() {
        let notifier = CountingNotifier::new();
        let mut timer =
            AlarmTimer::new(200, Duration::from_millis(10), notifier.clone()).expect("timer");
        assert!(timer.arm().expect("arm"));
        assert!(timer.disarm().expect("disarm"));
        // Second disarm is a no-op.
        assert!(!timer.disarm().expect("disarm"));
        assert_eq!(wait_for_resolution(&timer), AlarmState::Disarmed);
        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(notifier.count(), 0);
        assert_eq!(timer.message().expect("message"), "Desk Unlocked!");
    }

    #[test]
    fn arm_is_idempotent_while_armed() {
        let notifier = CountingNotifier::new();
        let mut timer = AlarmTimer::new(3, FAST_TICK, notifier.clone()).expect("timer");
        assert!(timer.arm().expect("arm"));
        assert!(!timer.arm().expect("second arm"));
        assert_eq!(wait_for_resolution(&timer), AlarmState::Fired);
        // Re-arm after firing is still a no-op until reset.
        assert!(!timer.arm().expect("post-fire arm"));
        wait_for_count(&notifier, 1);
    }

    #[test]
    fn reset_allows_a_fresh_session() {
        let notifier = CountingNotifier::new();
        let mut timer = AlarmTimer::new(2, FAST_TICK, notifier.clone()).expect("timer");
        assert!(timer.arm().expect("arm"));
        assert_eq!(wait_for_resolution(&timer), AlarmState::Fired);
        assert!(timer.reset().expect("reset"));
        assert_eq!(timer.state().expect("state"), AlarmState::Idle);
        assert!(timer.arm().expect("re-arm"));
        assert_eq!(wait_for_resolution(&timer), AlarmState::Fired);
        wait_for_count(&notifier, 2);
    }

    #[test]
    fn reset_refuses_while_armed() {
        let notifier = CountingNotifier::new();
        let mut timer = AlarmTimer::new(500, Duration::from_millis(10), notifier).expect("timer");
        assert!(timer.arm().expect("arm"));
        assert!(!timer.reset().expect("reset while armed"));
        assert!(timer.disarm().expect("disarm"));
        assert!(timer.reset().expect("reset after disarm"));
    }

    #[test]
    fn stale_worker_cannot_touch_next_session() {
        let notifier = CountingNotifier::new();
        // Long tick: the first worker is still sleeping when the session
        // resets and re-arms.
        let mut timer =
            AlarmTimer::new(2, Duration::from_millis(80), notifier.clone()).expect("timer");
        assert!(timer.arm().expect("arm"));
        assert!(timer.disarm().expect("disarm"));
        assert!(timer.reset().expect("reset"));
        assert!(timer.arm().expect("re-arm"));
        // The new countdown runs its full window even though the stale
        // worker wakes mid-way through it.
        assert_eq!(wait_for_resolution(&timer), AlarmState::Fired);
        wait_for_count(&notifier, 1);
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(notifier.count(), 1);
    }

    #[test]
    fn delivery_failure_still_marks_fired() {
        let mut timer = AlarmTimer::new(2, FAST_TICK, Arc::new(FailingNotifier)).expect("timer");
        assert!(timer.arm().expect("arm"));
        assert_eq!(wait_for_resolution(&timer), AlarmState::Fired);
        assert_eq!(timer.message().expect("message"), "Alert Sent!");
    }
}
