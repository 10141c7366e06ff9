pub const DEFAULT_MAX_FRAME_DELTA: f32 = 0.25;

/// Fixed-rate accumulator: converts irregular frame deltas into a whole
/// number of fixed steps so step count tracks elapsed real time.
#[derive(Debug, Clone)]
pub struct FixedTimestep {
    dt: f32,
    accumulator: f32,
    max_frame_delta: f32,
}

impl FixedTimestep {
    pub fn new(tick_rate: u32) -> Self {
        Self::with_max_frame_delta(tick_rate, DEFAULT_MAX_FRAME_DELTA)
    }

    pub fn with_max_frame_delta(tick_rate: u32, max_frame_delta: f32) -> Self {
        Self {
            dt: 1.0 / tick_rate.max(1) as f32,
            accumulator: 0.0,
            max_frame_delta,
        }
    }

    pub fn dt(&self) -> f32 {
        self.dt
    }

    pub fn accumulate(&mut self, delta: f32) {
        if delta.is_finite() && delta > 0.0 {
            self.accumulator += delta.min(self.max_frame_delta);
        }
    }

    pub fn consume_tick(&mut self) -> bool {
        if self.accumulator >= self.dt {
            self.accumulator -= self.dt;
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}
