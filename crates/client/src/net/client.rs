use std::sync::Arc;
use std::time::Duration;

use glam::Vec3;
use tokio::time::{self, Instant};

use skirmish::{
    EntityKey, EntityKind, EntitySampleStore, PickupRecord, ProjectileRecord, StoreChanges,
};

use super::channel::Connector;
use super::config::{ClientConfig, JoinRequest};
use super::error::ClientError;
use super::input::InputState;
use super::interpolation::{Interpolator, Pose};
use super::session::Session;
use super::websocket::WebSocketConnector;

const WELCOME_POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Debug, Clone, PartialEq)]
pub struct EntityPose {
    pub id: String,
    pub pose: Pose,
    pub local: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CameraView {
    pub slot: usize,
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
}

/// Everything the renderer and HUD need for one displayed frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    pub entities: Vec<EntityPose>,
    pub projectiles: Vec<(String, ProjectileRecord)>,
    pub pickups: Vec<(String, PickupRecord)>,
    pub cameras: Vec<CameraView>,
    pub spawned: Vec<EntityKey>,
    pub released: Vec<EntityKey>,
    pub rtt_ms: Option<f64>,
}

/// Client-side netcode for one or two local players sharing a world view.
pub struct NetworkClient {
    config: ClientConfig,
    connector: Arc<dyn Connector>,
    sessions: Vec<Session>,
    store: EntitySampleStore,
    interpolator: Interpolator,
    pending: StoreChanges,
    epoch: Instant,
}

impl NetworkClient {
    pub fn new(config: ClientConfig) -> Self {
        Self::with_connector(config, Arc::new(WebSocketConnector))
    }

    pub fn with_connector(config: ClientConfig, connector: Arc<dyn Connector>) -> Self {
        Self {
            store: EntitySampleStore::new(config.history_capacity, config.stale_entity_ms),
            interpolator: Interpolator::new(config.interpolation_delay_ms),
            connector,
            sessions: Vec::new(),
            pending: StoreChanges::default(),
            epoch: Instant::now(),
            config,
        }
    }

    /// Closes any previous sessions, whose entities the next [`Frame`]
    /// reports as released, then connects and joins one session
    /// (or two for split screen) and waits for the server to welcome each.
    ///
    /// On failure the sessions are kept, so their channels go on reconnecting
    /// until [`NetworkClient::close`].
    pub async fn connect(&mut self, request: &JoinRequest) -> Result<(), ClientError> {
        // Entities of the previous sessions are reported released on the next tick.
        let released = self.close();
        self.pending.removed.extend(released);

        let name = request.display_name();
        if request.split {
            self.connect_split(request, &name).await?;
        } else {
            self.connect_solo(request, &name).await?;
        }

        self.refresh_local_players();
        Ok(())
    }

    async fn connect_solo(&mut self, request: &JoinRequest, name: &str) -> Result<(), ClientError> {
        let slot = self.open_session(&request.url, name).await?;
        self.sessions[slot].join(request.matchmake, request.room());
        self.wait_for_welcome(slot).await
    }

    async fn connect_split(&mut self, request: &JoinRequest, name: &str) -> Result<(), ClientError> {
        let first = self.open_session(&request.url, &format!("{}1", name)).await?;
        self.sessions[first].join(request.matchmake, request.room());
        self.wait_for_welcome(first).await?;

        let room = self.sessions[first].room_id().map(str::to_string);
        let second = self.open_session(&request.url, &format!("{}2", name)).await?;
        self.sessions[second].join(false, room);
        self.wait_for_welcome(second).await
    }

    async fn open_session(&mut self, url: &str, name: &str) -> Result<usize, ClientError> {
        let slot = self.sessions.len();
        self.sessions.push(Session::new(
            slot,
            name,
            url,
            Arc::clone(&self.connector),
            &self.config,
        ));
        self.sessions[slot].connect().await?;
        Ok(slot)
    }

    async fn wait_for_welcome(&mut self, slot: usize) -> Result<(), ClientError> {
        let timeout = self.config.join_timeout();
        let started = Instant::now();

        while started.elapsed() < timeout {
            let now_ms = self.now_ms();
            self.pump(now_ms);
            if self.sessions[slot].is_joined() {
                return Ok(());
            }
            time::sleep(WELCOME_POLL_INTERVAL).await;
        }

        log::warn!("P{}: no welcome within {:?}", slot + 1, timeout);
        Err(ClientError::JoinTimeout(timeout))
    }

    fn pump(&mut self, now_ms: f64) {
        for session in &mut self.sessions {
            let changes = session.pump(&mut self.store, now_ms);
            self.pending.extend(changes);
        }
    }

    fn refresh_local_players(&mut self) {
        self.interpolator
            .set_local_players(self.sessions.iter().filter_map(Session::player_id));
    }

    /// Milliseconds since this client was created.
    pub fn now_ms(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64() * 1000.0
    }

    pub fn tick(&mut self, dt: f32, inputs: &[InputState]) -> Frame {
        let now_ms = self.now_ms();
        self.tick_at(now_ms, dt, inputs)
    }

    /// Advances every session by one render frame of `dt` seconds. Slots
    /// without an entry in `inputs` send neutral input.
    pub fn tick_at(&mut self, now_ms: f64, dt: f32, inputs: &[InputState]) -> Frame {
        self.pump(now_ms);
        self.refresh_local_players();

        let neutral = InputState::default();
        for session in &mut self.sessions {
            let input = inputs.get(session.slot()).unwrap_or(&neutral);
            session.update(now_ms, dt, input);
        }

        let mut changes = std::mem::take(&mut self.pending);
        changes.removed.extend(
            self.store
                .sweep(now_ms)
                .into_iter()
                .map(|id| EntityKey::new(EntityKind::Player, id)),
        );

        let entities = self
            .interpolator
            .resolve_all(&self.store, now_ms)
            .map(|(id, pose)| EntityPose {
                id: id.to_string(),
                pose,
                local: self.interpolator.is_local(id),
            })
            .collect();

        let cameras = self
            .sessions
            .iter_mut()
            .filter(|session| session.is_joined())
            .map(|session| {
                let input = inputs.get(session.slot()).unwrap_or(&neutral);
                CameraView {
                    slot: session.slot(),
                    position: session.camera_position(dt),
                    yaw: input.yaw,
                    pitch: input.pitch,
                }
            })
            .collect();

        Frame {
            entities,
            projectiles: self
                .store
                .projectiles()
                .map(|(id, record)| (id.to_string(), record.clone()))
                .collect(),
            pickups: self
                .store
                .pickups()
                .map(|(id, record)| (id.to_string(), *record))
                .collect(),
            cameras,
            spawned: changes.spawned,
            released: changes.removed,
            rtt_ms: self.rtt_ms(),
        }
    }

    /// Closes every session and forgets all tracked entities, returning the
    /// ones the renderer should release.
    pub fn close(&mut self) -> Vec<EntityKey> {
        for session in &mut self.sessions {
            session.close();
        }
        self.sessions.clear();
        self.pending = StoreChanges::default();
        self.interpolator.set_local_players(Vec::<String>::new());
        self.store.clear()
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn session(&self, slot: usize) -> Option<&Session> {
        self.sessions.get(slot)
    }

    pub fn store(&self) -> &EntitySampleStore {
        &self.store
    }

    pub fn interpolator(&self) -> &Interpolator {
        &self.interpolator
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn is_split(&self) -> bool {
        self.sessions.len() > 1
    }

    pub fn rtt_ms(&self) -> Option<f64> {
        self.sessions.first().and_then(Session::rtt_ms)
    }
}
