use std::time::Duration;

use super::config::ReconnectPolicy;

/// Geometric reconnect delay: starts at the policy's initial delay, grows by
/// its multiplier per failed attempt and never exceeds its ceiling.
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: ReconnectPolicy,
    current_ms: f64,
}

impl Backoff {
    pub fn new(policy: ReconnectPolicy) -> Self {
        let current_ms = policy.initial_delay_ms;
        Self { policy, current_ms }
    }

    /// Returns the delay to wait now and advances to the next one.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current_ms.clamp(0.0, self.policy.max_delay_ms);
        self.current_ms = (self.current_ms * self.policy.multiplier).min(self.policy.max_delay_ms);
        Duration::from_secs_f64(delay / 1000.0)
    }

    pub fn peek(&self) -> Duration {
        Duration::from_secs_f64(self.current_ms.clamp(0.0, self.policy.max_delay_ms) / 1000.0)
    }

    pub fn reset(&mut self) {
        self.current_ms = self.policy.initial_delay_ms;
    }
}
