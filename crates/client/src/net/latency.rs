use skirmish::{ClientMessage, Ping, Pong};

pub const DEFAULT_PROBE_INTERVAL_MS: f64 = 1000.0;
pub const DEFAULT_MAX_RTT_MS: f64 = 999.0;

/// Round-trip estimate from periodic ping probes. Each echo overwrites the
/// estimate; there is no averaging.
#[derive(Debug, Clone)]
pub struct LatencyTracker {
    probe_interval_ms: f64,
    max_rtt_ms: f64,
    next_probe_at_ms: f64,
    rtt_ms: Option<f64>,
}

impl Default for LatencyTracker {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_INTERVAL_MS, DEFAULT_MAX_RTT_MS)
    }
}

impl LatencyTracker {
    pub fn new(probe_interval_ms: f64, max_rtt_ms: f64) -> Self {
        Self {
            probe_interval_ms,
            max_rtt_ms,
            next_probe_at_ms: f64::NEG_INFINITY,
            rtt_ms: None,
        }
    }

    /// Returns a probe when one is due. The next probe is scheduled one
    /// interval after the tick that fired this one.
    pub fn tick(&mut self, now_ms: f64) -> Option<ClientMessage> {
        if now_ms < self.next_probe_at_ms {
            return None;
        }
        self.next_probe_at_ms = now_ms + self.probe_interval_ms;
        Some(ClientMessage::Ping(Ping { t: now_ms }))
    }

    pub fn on_pong(&mut self, pong: &Pong, now_ms: f64) {
        let Some(sent_at) = pong.t.filter(|t| t.is_finite()) else {
            log::trace!("Ignoring pong without a usable timestamp");
            return;
        };

        let rtt = (now_ms - sent_at).clamp(0.0, self.max_rtt_ms);
        log::debug!("RTT: {:.0} ms", rtt);
        self.rtt_ms = Some(rtt);
    }

    pub fn rtt_ms(&self) -> Option<f64> {
        self.rtt_ms
    }

    pub fn reset(&mut self) {
        self.next_probe_at_ms = f64::NEG_INFINITY;
        self.rtt_ms = None;
    }
}
