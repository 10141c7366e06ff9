use std::collections::{HashMap, HashSet};

use glam::Vec3;

use super::history::{EntityHistory, Sample, DEFAULT_HISTORY_CAPACITY};
use crate::net::{PickupKind, PickupState, ProjectileState, Snapshot};

pub const DEFAULT_STALE_AFTER_MS: f64 = 5000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Player,
    Projectile,
    Pickup,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityKey {
    pub kind: EntityKind,
    pub id: String,
}

impl EntityKey {
    pub fn new(kind: EntityKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectileRecord {
    pub position: Vec3,
    pub velocity: Vec3,
    pub owner_id: Option<String>,
    pub weapon_id: Option<String>,
    pub radius: Option<f32>,
}

impl From<&ProjectileState> for ProjectileRecord {
    fn from(state: &ProjectileState) -> Self {
        Self {
            position: state.pos,
            velocity: state.vel,
            owner_id: state.owner_id.clone(),
            weapon_id: state.weapon_id.clone(),
            radius: state.radius,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickupRecord {
    pub kind: PickupKind,
    pub position: Vec3,
    pub available: bool,
}

impl From<&PickupState> for PickupRecord {
    fn from(state: &PickupState) -> Self {
        Self {
            kind: state.kind,
            position: state.pos,
            available: state.available,
        }
    }
}

/// Entities that appeared or disappeared during one ingest or sweep, so the
/// owner of their visual representation can allocate or release it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreChanges {
    pub spawned: Vec<EntityKey>,
    pub removed: Vec<EntityKey>,
}

impl StoreChanges {
    pub fn is_empty(&self) -> bool {
        self.spawned.is_empty() && self.removed.is_empty()
    }

    pub fn extend(&mut self, other: StoreChanges) {
        self.spawned.extend(other.spawned);
        self.removed.extend(other.removed);
    }
}

/// Registry of per-entity sample histories.
///
/// Players are persistent: a player missing from a snapshot keeps its history
/// until it has been silent for longer than the staleness threshold.
/// Projectiles and pickups mirror the latest snapshot exactly.
#[derive(Debug)]
pub struct EntitySampleStore {
    players: HashMap<String, EntityHistory>,
    projectiles: HashMap<String, ProjectileRecord>,
    pickups: HashMap<String, PickupRecord>,
    history_capacity: usize,
    stale_after_ms: f64,
}

impl Default for EntitySampleStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY, DEFAULT_STALE_AFTER_MS)
    }
}

impl EntitySampleStore {
    pub fn new(history_capacity: usize, stale_after_ms: f64) -> Self {
        Self {
            players: HashMap::new(),
            projectiles: HashMap::new(),
            pickups: HashMap::new(),
            history_capacity,
            stale_after_ms,
        }
    }

    pub fn ingest(&mut self, snapshot: &Snapshot, now_ms: f64) -> StoreChanges {
        let mut changes = StoreChanges::default();

        let you = snapshot
            .you
            .valid()
            .map(|you| (you.player_id.as_str(), you.pos, you.yaw));
        let others = snapshot
            .others
            .iter()
            .map(|other| (other.player_id.as_str(), other.pos, other.yaw));

        for (player_id, position, yaw) in you.into_iter().chain(others) {
            if player_id.is_empty() {
                continue;
            }
            if self.record(player_id, Sample::new(now_ms, position, yaw)) {
                changes
                    .spawned
                    .push(EntityKey::new(EntityKind::Player, player_id));
            }
        }

        let seen: HashSet<&str> = snapshot
            .projectiles
            .iter()
            .filter(|p| !p.projectile_id.is_empty())
            .map(|p| p.projectile_id.as_str())
            .collect();
        for projectile in &snapshot.projectiles {
            if projectile.projectile_id.is_empty() {
                continue;
            }
            let record = ProjectileRecord::from(projectile);
            if self
                .projectiles
                .insert(projectile.projectile_id.clone(), record)
                .is_none()
            {
                changes.spawned.push(EntityKey::new(
                    EntityKind::Projectile,
                    projectile.projectile_id.as_str(),
                ));
            }
        }
        self.projectiles.retain(|id, _| {
            let keep = seen.contains(id.as_str());
            if !keep {
                changes
                    .removed
                    .push(EntityKey::new(EntityKind::Projectile, id.as_str()));
            }
            keep
        });

        let seen: HashSet<&str> = snapshot
            .pickups
            .iter()
            .filter(|p| !p.pickup_id.is_empty())
            .map(|p| p.pickup_id.as_str())
            .collect();
        for pickup in &snapshot.pickups {
            if pickup.pickup_id.is_empty() {
                continue;
            }
            if self
                .pickups
                .insert(pickup.pickup_id.clone(), PickupRecord::from(pickup))
                .is_none()
            {
                changes
                    .spawned
                    .push(EntityKey::new(EntityKind::Pickup, pickup.pickup_id.as_str()));
            }
        }
        self.pickups.retain(|id, _| {
            let keep = seen.contains(id.as_str());
            if !keep {
                changes
                    .removed
                    .push(EntityKey::new(EntityKind::Pickup, id.as_str()));
            }
            keep
        });

        changes
    }

    /// Appends a player sample and marks the player as seen. Returns true when
    /// this is the first sample for `player_id`.
    pub fn record(&mut self, player_id: &str, sample: Sample) -> bool {
        let capacity = self.history_capacity;
        let created = !self.players.contains_key(player_id);
        let history = self
            .players
            .entry(player_id.to_string())
            .or_insert_with(|| EntityHistory::new(capacity));

        if !history.push(sample) {
            log::trace!(
                "Discarding out-of-order sample for {} at {:.1} ms",
                player_id,
                sample.timestamp_ms
            );
        }
        history.touch(sample.timestamp_ms);

        if created {
            log::debug!("Tracking player {}", player_id);
        }
        created
    }

    /// Evicts every player silent for longer than the staleness threshold.
    pub fn sweep(&mut self, now_ms: f64) -> Vec<String> {
        let stale_after_ms = self.stale_after_ms;
        let mut evicted = Vec::new();

        self.players.retain(|id, history| {
            let stale = history.is_stale(now_ms, stale_after_ms);
            if stale {
                evicted.push(id.clone());
            }
            !stale
        });

        for id in &evicted {
            log::debug!("Evicted stale player {}", id);
        }
        evicted
    }

    pub fn history(&self, player_id: &str) -> Option<&EntityHistory> {
        self.players.get(player_id)
    }

    pub fn players(&self) -> impl Iterator<Item = (&str, &EntityHistory)> {
        self.players.iter().map(|(id, h)| (id.as_str(), h))
    }

    pub fn projectiles(&self) -> impl Iterator<Item = (&str, &ProjectileRecord)> {
        self.projectiles.iter().map(|(id, p)| (id.as_str(), p))
    }

    pub fn pickups(&self) -> impl Iterator<Item = (&str, &PickupRecord)> {
        self.pickups.iter().map(|(id, p)| (id.as_str(), p))
    }

    pub fn projectile(&self, id: &str) -> Option<&ProjectileRecord> {
        self.projectiles.get(id)
    }

    pub fn pickup(&self, id: &str) -> Option<&PickupRecord> {
        self.pickups.get(id)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn stale_after_ms(&self) -> f64 {
        self.stale_after_ms
    }

    /// Drops everything, returning the keys of all released entities.
    pub fn clear(&mut self) -> Vec<EntityKey> {
        let mut released: Vec<EntityKey> = self
            .players
            .drain()
            .map(|(id, _)| EntityKey::new(EntityKind::Player, id))
            .collect();
        released.extend(
            self.projectiles
                .drain()
                .map(|(id, _)| EntityKey::new(EntityKind::Projectile, id)),
        );
        released.extend(
            self.pickups
                .drain()
                .map(|(id, _)| EntityKey::new(EntityKind::Pickup, id)),
        );
        released
    }
}
