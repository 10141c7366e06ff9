use std::collections::HashSet;
use std::f32::consts::{PI, TAU};

use glam::Vec3;

use skirmish::{EntityHistory, EntitySampleStore, Sample};

pub const DEFAULT_INTERPOLATION_DELAY_MS: f64 = 120.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub yaw: f32,
}

impl From<&Sample> for Pose {
    fn from(sample: &Sample) -> Self {
        Self {
            position: sample.position,
            yaw: sample.yaw,
        }
    }
}

/// Resolves a render pose per player from its sample history.
///
/// Remote players are played back `delay_ms` in the past, between the two
/// samples bracketing that moment. Locally controlled players use their newest
/// sample as-is.
#[derive(Debug, Clone)]
pub struct Interpolator {
    delay_ms: f64,
    local: HashSet<String>,
}

impl Default for Interpolator {
    fn default() -> Self {
        Self::new(DEFAULT_INTERPOLATION_DELAY_MS)
    }
}

impl Interpolator {
    pub fn new(delay_ms: f64) -> Self {
        Self {
            delay_ms,
            local: HashSet::new(),
        }
    }

    pub fn set_local_players<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.local = ids.into_iter().map(Into::into).collect();
    }

    pub fn is_local(&self, player_id: &str) -> bool {
        self.local.contains(player_id)
    }

    pub fn delay_ms(&self) -> f64 {
        self.delay_ms
    }

    pub fn resolve(&self, store: &EntitySampleStore, player_id: &str, now_ms: f64) -> Option<Pose> {
        let history = store.history(player_id)?;
        if self.is_local(player_id) {
            return history.latest().map(Pose::from);
        }
        sample_at(history, now_ms - self.delay_ms)
    }

    pub fn resolve_all<'a>(
        &'a self,
        store: &'a EntitySampleStore,
        now_ms: f64,
    ) -> impl Iterator<Item = (&'a str, Pose)> + 'a {
        store
            .players()
            .filter_map(move |(id, _)| self.resolve(store, id, now_ms).map(|pose| (id, pose)))
    }
}

/// Pose at `target_ms`, clamped to the recorded range (never extrapolated).
pub fn sample_at(history: &EntityHistory, target_ms: f64) -> Option<Pose> {
    let samples = history.samples();
    match samples.len() {
        0 => None,
        1 => samples.front().map(Pose::from),
        len => {
            let (a, b) = samples
                .iter()
                .zip(samples.iter().skip(1))
                .find(|(a, b)| a.timestamp_ms <= target_ms && target_ms <= b.timestamp_ms)
                .unwrap_or_else(|| {
                    if target_ms < samples[0].timestamp_ms {
                        (&samples[0], &samples[1])
                    } else {
                        (&samples[len - 2], &samples[len - 1])
                    }
                });

            let span = (b.timestamp_ms - a.timestamp_ms).max(1.0);
            let t = ((target_ms - a.timestamp_ms) / span).clamp(0.0, 1.0) as f32;
            Some(interpolate(a, b, t))
        }
    }
}

pub fn interpolate(a: &Sample, b: &Sample, t: f32) -> Pose {
    if t <= 0.0 {
        return Pose::from(a);
    }
    if t >= 1.0 {
        return Pose::from(b);
    }

    Pose {
        position: a.position.lerp(b.position, t),
        yaw: lerp_angle(a.yaw, b.yaw, t),
    }
}

/// Shortest-arc angle interpolation.
pub fn lerp_angle(from: f32, to: f32, t: f32) -> f32 {
    wrap_angle(from + wrap_angle(to - from) * t)
}

/// Wraps into `(-PI, PI]`.
pub fn wrap_angle(angle: f32) -> f32 {
    let mut wrapped = angle % TAU;
    if wrapped > PI {
        wrapped -= TAU;
    } else if wrapped <= -PI {
        wrapped += TAU;
    }
    wrapped
}
