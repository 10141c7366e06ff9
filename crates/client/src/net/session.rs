use std::fmt;
use std::sync::Arc;

use glam::Vec3;

use skirmish::{
    ClientMessage, EntitySampleStore, Hello, Join, LocalPlayerState, Reported, ServerMessage,
    Snapshot, StoreChanges, Welcome,
};

use super::channel::{Channel, ChannelEvent, Connector, ConnectionState};
use super::config::ClientConfig;
use super::error::ChannelError;
use super::input::{InputSender, InputState};
use super::kinematics::LocalKinematics;
use super::latency::LatencyTracker;
use super::stats::NetworkStats;
use crate::camera::CameraSmoother;

/// Human-readable session status for the HUD.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    Connecting,
    Connected,
    Disconnected,
    Joined(String),
    Rejected(String),
    ConnectFailed(String),
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Idle => write!(f, "idle"),
            SessionStatus::Connecting => write!(f, "connecting..."),
            SessionStatus::Connected => write!(f, "connected"),
            SessionStatus::Disconnected => write!(f, "disconnected"),
            SessionStatus::Joined(room) => write!(f, "joined {}", room),
            SessionStatus::Rejected(message) => write!(f, "error: {}", message),
            SessionStatus::ConnectFailed(reason) => write!(f, "connect failed: {}", reason),
        }
    }
}

/// One locally controlled player: its own channel to the server plus the
/// latency, input and camera state that belong to that slot.
pub struct Session {
    slot: usize,
    player_name: String,
    channel: Channel,
    latency: LatencyTracker,
    kinematics: LocalKinematics,
    camera: CameraSmoother,
    input: InputSender,
    eye_height: f32,
    player_id: Option<String>,
    room_id: Option<String>,
    you: Option<LocalPlayerState>,
    last_seq_ack: Option<i64>,
    status: SessionStatus,
}

impl Session {
    pub fn new(
        slot: usize,
        player_name: impl Into<String>,
        url: &str,
        connector: Arc<dyn Connector>,
        config: &ClientConfig,
    ) -> Self {
        let channel = Channel::new(
            url,
            connector,
            config.reconnect.clone(),
            config.connect_timeout(),
        )
        .with_greeting(&ClientMessage::Hello(Hello::default()));

        Self {
            slot,
            player_name: player_name.into(),
            channel,
            latency: LatencyTracker::new(config.ping_interval_ms, config.max_rtt_ms),
            kinematics: LocalKinematics::new(),
            camera: CameraSmoother::new(config.camera_smoothing_rate),
            input: InputSender::new(config.input_send_rate, config.max_frame_delta),
            eye_height: config.eye_height,
            player_id: None,
            room_id: None,
            you: None,
            last_seq_ack: None,
            status: SessionStatus::Idle,
        }
    }

    pub async fn connect(&mut self) -> Result<(), ChannelError> {
        self.set_status(SessionStatus::Connecting);
        match self.channel.connect().await {
            Ok(()) => {
                self.set_status(SessionStatus::Connected);
                Ok(())
            }
            Err(e) => {
                self.set_status(SessionStatus::ConnectFailed(e.to_string()));
                Err(e)
            }
        }
    }

    /// Requests placement either through matchmaking or into `room_id`.
    pub fn join(&mut self, matchmake: bool, room_id: Option<String>) -> bool {
        let join = Join::new(self.player_name.clone(), matchmake, room_id);
        self.channel.send(&ClientMessage::Join(join))
    }

    /// Drains channel events and inbound messages received since the last call.
    pub fn pump(&mut self, store: &mut EntitySampleStore, now_ms: f64) -> StoreChanges {
        while let Some(event) = self.channel.poll_event() {
            self.handle_event(event);
        }

        let mut changes = StoreChanges::default();
        while let Some(message) = self.channel.poll_message() {
            match message {
                ServerMessage::Welcome(welcome) => self.on_welcome(welcome),
                ServerMessage::Error(error) => {
                    log::warn!("P{}: server error: {}", self.slot + 1, error.message());
                    self.set_status(SessionStatus::Rejected(error.message().to_string()));
                }
                ServerMessage::Pong(pong) => self.latency.on_pong(&pong, now_ms),
                ServerMessage::Snapshot(snapshot) => {
                    if let Some(ingested) = self.on_snapshot(&snapshot, store, now_ms) {
                        changes.extend(ingested);
                    }
                }
            }
        }
        changes
    }

    fn handle_event(&mut self, event: ChannelEvent) {
        match event {
            ChannelEvent::Opened { reconnect } => {
                self.set_status(SessionStatus::Connected);
                if reconnect {
                    self.rejoin();
                }
            }
            ChannelEvent::Closed => self.set_status(SessionStatus::Disconnected),
            ChannelEvent::ConnectFailed(e) => {
                self.set_status(SessionStatus::ConnectFailed(e.to_string()))
            }
            ChannelEvent::ReconnectScheduled(_) => self.set_status(SessionStatus::Connecting),
        }
    }

    // A dropped connection comes back unjoined; go back to the same room.
    fn rejoin(&mut self) {
        let Some(room_id) = self.room_id.clone() else {
            return;
        };
        log::info!("P{}: rejoining room {}", self.slot + 1, room_id);
        self.join(false, Some(room_id));
    }

    fn on_welcome(&mut self, welcome: Welcome) {
        log::info!(
            "P{}: joined room {} as {}",
            self.slot + 1,
            welcome.room_id,
            welcome.player_id
        );
        self.set_status(SessionStatus::Joined(welcome.room_id.clone()));
        self.player_id = Some(welcome.player_id);
        self.room_id = Some(welcome.room_id);
    }

    fn on_snapshot(
        &mut self,
        snapshot: &Snapshot,
        store: &mut EntitySampleStore,
        now_ms: f64,
    ) -> Option<StoreChanges> {
        match &snapshot.you {
            Reported::Absent => {
                log::trace!("P{}: snapshot without local player, ignoring", self.slot + 1);
                return None;
            }
            // Only the local prediction is skipped; the rest of the frame is good.
            Reported::Malformed => {
                log::trace!("P{}: malformed local player record", self.slot + 1);
            }
            Reported::Valid(you) => {
                self.kinematics.apply_snapshot(you.pos, you.vel);
                if you.last_seq.is_some() {
                    self.last_seq_ack = you.last_seq;
                }
                self.you = Some(you.clone());
            }
        }

        Some(store.ingest(snapshot, now_ms))
    }

    /// Per render tick work for a joined session: latency probes, fixed-rate
    /// inputs and dead reckoning.
    pub fn update(&mut self, now_ms: f64, dt: f32, input: &InputState) {
        if !self.is_joined() {
            return;
        }

        if let Some(probe) = self.latency.tick(now_ms) {
            self.channel.send(&probe);
        }
        for command in self.input.update(dt, input) {
            self.channel.send(&command);
        }
        self.kinematics.integrate(dt);
    }

    /// Smoothed eye position: the dead-reckoned position raised to eye level,
    /// or the origin while no authoritative state has arrived.
    pub fn camera_position(&mut self, dt: f32) -> Vec3 {
        let raw = self.kinematics.position().unwrap_or(Vec3::ZERO) + Vec3::Y * self.eye_height;
        self.camera.update(raw, dt)
    }

    pub fn close(&mut self) {
        self.channel.close();
        self.set_status(SessionStatus::Disconnected);
    }

    fn set_status(&mut self, status: SessionStatus) {
        if self.status != status {
            log::debug!("P{}: {}", self.slot + 1, status);
            self.status = status;
        }
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn player_name(&self) -> &str {
        &self.player_name
    }

    pub fn player_id(&self) -> Option<&str> {
        self.player_id.as_deref()
    }

    pub fn room_id(&self) -> Option<&str> {
        self.room_id.as_deref()
    }

    pub fn is_joined(&self) -> bool {
        self.room_id.is_some()
    }

    /// Latest authoritative record for this slot's player (HUD vitals and score).
    pub fn you(&self) -> Option<&LocalPlayerState> {
        self.you.as_ref()
    }

    pub fn last_seq_ack(&self) -> Option<i64> {
        self.last_seq_ack
    }

    pub fn status(&self) -> &SessionStatus {
        &self.status
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.channel.state()
    }

    pub fn rtt_ms(&self) -> Option<f64> {
        self.latency.rtt_ms()
    }

    pub fn kinematics(&self) -> &LocalKinematics {
        &self.kinematics
    }

    pub fn next_input_seq(&self) -> u32 {
        self.input.next_seq()
    }

    pub fn stats(&self) -> NetworkStats {
        self.channel.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_text() {
        assert_eq!(SessionStatus::Connecting.to_string(), "connecting...");
        assert_eq!(SessionStatus::Joined("r1".into()).to_string(), "joined r1");
        assert_eq!(
            SessionStatus::Rejected("room full".into()).to_string(),
            "error: room full"
        );
    }
}
