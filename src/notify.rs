//! Alert delivery.
//!
//! The countdown worker fires alerts through the `AlertNotifier` trait so the
//! timer logic never knows about HTTP. The stock implementation posts to an
//! ntfy topic (<https://docs.ntfy.sh/publish/>).
//!
//! Delivery is fire-and-forget: a failed POST is reported to the caller for
//! logging and never retried. Timeouts are bounded so a hung endpoint cannot
//! wedge the countdown worker.

use std::time::Duration;

use anyhow::{Context, Result};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Fixed payload for an intrusion alert.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AlertPayload {
    pub body: String,
    pub title: String,
    pub priority: String,
    pub tags: String,
}

impl AlertPayload {
    /// The one payload this kernel ever sends.
    pub fn intrusion() -> Self {
        Self {
            body: "Someone is at your desk".to_string(),
            title: "Unauthorized access detected".to_string(),
            priority: "urgent".to_string(),
            tags: "warning,skull".to_string(),
        }
    }
}

/// Alert sink invoked by the countdown worker on expiry.
///
/// Implementations must be callable from the worker thread and must return
/// promptly; a bounded internal timeout is part of the contract.
pub trait AlertNotifier: Send + Sync {
    /// Notifier identifier for logs.
    fn name(&self) -> &'static str;

    /// Deliver one alert. `Err` means delivery failed; the caller logs it
    /// and moves on.
    fn send(&self, alert: &AlertPayload) -> Result<()>;
}

/// ntfy.sh-style HTTP notifier: plain-text body plus `Title`/`Priority`/
/// `Tags` headers, POSTed to the configured topic endpoint.
pub struct NtfyNotifier {
    endpoint: String,
    agent: ureq::Agent,
}

impl NtfyNotifier {
    pub fn new(endpoint: String) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build();
        Self { endpoint, agent }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl AlertNotifier for NtfyNotifier {
    fn name(&self) -> &'static str {
        "ntfy"
    }

    fn send(&self, alert: &AlertPayload) -> Result<()> {
        // ureq maps non-2xx statuses to Err, which is exactly the
        // success/failure signal the timer wants.
        self.agent
            .post(&self.endpoint)
            .set("Title", &alert.title)
            .set("Priority", &alert.priority)
            .set("Tags", &alert.tags)
            .send_string(&alert.body)
            .with_context(|| format!("post alert to {}", self.endpoint))?;
        Ok(())
    }
}
