use glam::Vec3;

pub const DEFAULT_SMOOTHING_RATE: f32 = 18.0;

/// Exponential position filter for a locally controlled camera.
///
/// The first observation is taken as-is; after that the filtered position
/// approaches the raw one with a half-life that does not depend on frame rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraSmoother {
    rate: f32,
    filtered: Option<Vec3>,
}

impl Default for CameraSmoother {
    fn default() -> Self {
        Self::new(DEFAULT_SMOOTHING_RATE)
    }
}

impl CameraSmoother {
    pub fn new(rate: f32) -> Self {
        Self {
            rate,
            filtered: None,
        }
    }

    pub fn update(&mut self, raw: Vec3, dt: f32) -> Vec3 {
        let filtered = match self.filtered {
            None => raw,
            Some(filtered) => {
                let alpha = 1.0 - (-self.rate * dt.max(0.0)).exp();
                filtered + (raw - filtered) * alpha
            }
        };
        self.filtered = Some(filtered);
        filtered
    }

    pub fn position(&self) -> Option<Vec3> {
        self.filtered
    }

    pub fn reset(&mut self) {
        self.filtered = None;
    }
}
