use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    pub initial_delay_ms: f64,
    pub multiplier: f64,
    pub max_delay_ms: f64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay_ms: 250.0,
            multiplier: 1.6,
            max_delay_ms: 3000.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub connect_timeout_ms: u64,
    pub reconnect: ReconnectPolicy,
    pub ping_interval_ms: f64,
    pub max_rtt_ms: f64,
    pub input_send_rate: u32,
    pub max_frame_delta: f32,
    pub interpolation_delay_ms: f64,
    pub stale_entity_ms: f64,
    pub history_capacity: usize,
    pub camera_smoothing_rate: f32,
    pub eye_height: f32,
    pub join_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 2500,
            reconnect: ReconnectPolicy::default(),
            ping_interval_ms: 1000.0,
            max_rtt_ms: 999.0,
            input_send_rate: 60,
            max_frame_delta: 0.05,
            interpolation_delay_ms: 120.0,
            stale_entity_ms: 5000.0,
            history_capacity: 32,
            camera_smoothing_rate: 18.0,
            eye_height: 1.55,
            join_timeout_ms: 3000,
        }
    }
}

impl ClientConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }
}

/// Connection parameters supplied by whoever drives the client.
#[derive(Debug, Clone)]
pub struct JoinRequest {
    pub url: String,
    pub player_name: String,
    pub room_id: Option<String>,
    pub matchmake: bool,
    pub split: bool,
}

impl JoinRequest {
    pub const MAX_NAME_LEN: usize = 20;

    pub fn display_name(&self) -> String {
        let name = self.player_name.trim();
        let name = if name.is_empty() { "Player" } else { name };
        name.chars().take(Self::MAX_NAME_LEN).collect()
    }

    pub fn room(&self) -> Option<String> {
        self.room_id
            .as_deref()
            .map(str::trim)
            .filter(|room| !room.is_empty())
            .map(str::to_string)
    }
}
