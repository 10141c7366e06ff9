use glam::Vec3;

/// Dead reckoning for the locally driven player: authoritative position and
/// velocity are taken verbatim from each snapshot and advanced with explicit
/// Euler steps until the next one arrives.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LocalKinematics {
    position: Vec3,
    velocity: Vec3,
    has_state: bool,
}

impl LocalKinematics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply_snapshot(&mut self, position: Vec3, velocity: Vec3) {
        self.position = position;
        self.velocity = velocity;
        self.has_state = true;
    }

    pub fn integrate(&mut self, dt: f32) {
        if self.has_state {
            self.position += self.velocity * dt;
        }
    }

    pub fn position(&self) -> Option<Vec3> {
        self.has_state.then_some(self.position)
    }

    pub fn velocity(&self) -> Option<Vec3> {
        self.has_state.then_some(self.velocity)
    }

    pub fn has_state(&self) -> bool {
        self.has_state
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
