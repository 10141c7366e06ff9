use glam::Vec3;
use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};

pub const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const DEFAULT_SERVER_URL: &str = "ws://127.0.0.1:8765/ws";
pub const DEFAULT_WEAPON: &str = "pistol";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum ClientMessage {
    Hello(Hello),
    Join(Join),
    Ping(Ping),
    Input(InputCommand),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum ServerMessage {
    Welcome(Welcome),
    Error(ServerError),
    Pong(Pong),
    Snapshot(Box<Snapshot>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Hello {
    pub client_version: String,
}

impl Default for Hello {
    fn default() -> Self {
        Self {
            client_version: CLIENT_VERSION.to_string(),
        }
    }
}

/// Session placement request. `want_deltas` is always false: this client only
/// consumes full snapshots.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Join {
    pub matchmake: bool,
    pub room_id: Option<String>,
    pub player_name: String,
    pub want_deltas: bool,
}

impl Join {
    pub fn new(player_name: impl Into<String>, matchmake: bool, room_id: Option<String>) -> Self {
        Self {
            matchmake,
            room_id: if matchmake { None } else { room_id },
            player_name: player_name.into(),
            want_deltas: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Ping {
    pub t: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputCommand {
    pub seq: u32,
    pub dt: f32,
    pub move_x: f32,
    pub move_y: f32,
    pub yaw: f32,
    pub pitch: f32,
    pub fire: bool,
    pub jump: bool,
    pub sprint: bool,
    pub reload: bool,
    pub weapon_id: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Welcome {
    pub player_id: String,
    pub room_id: String,
    #[serde(default)]
    pub tickrate: Option<u32>,
    #[serde(default)]
    pub map_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServerError {
    #[serde(default)]
    pub message: Option<String>,
}

impl ServerError {
    pub fn message(&self) -> &str {
        self.message.as_deref().unwrap_or("unknown")
    }
}

/// Echo of a [`Ping`]. A missing timestamp decodes as `None` and is ignored
/// by the latency estimator.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Pong {
    #[serde(default)]
    pub t: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub server_tick: Option<u64>,
    #[serde(default, deserialize_with = "lenient_report")]
    pub you: Reported<LocalPlayerState>,
    #[serde(default, deserialize_with = "lenient_seq")]
    pub others: Vec<RemotePlayerState>,
    #[serde(default, deserialize_with = "lenient_seq")]
    pub projectiles: Vec<ProjectileState>,
    #[serde(default, deserialize_with = "lenient_seq")]
    pub pickups: Vec<PickupState>,
}

/// Decoding outcome of an optional snapshot record. `null` counts as absent.
#[derive(Debug, Clone, PartialEq)]
pub enum Reported<T> {
    Absent,
    Malformed,
    Valid(T),
}

impl<T> Default for Reported<T> {
    fn default() -> Self {
        Reported::Absent
    }
}

impl<T> Reported<T> {
    pub fn valid(&self) -> Option<&T> {
        match self {
            Reported::Valid(value) => Some(value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalPlayerState {
    pub player_id: String,
    pub pos: Vec3,
    pub vel: Vec3,
    #[serde(default)]
    pub yaw: f32,
    #[serde(default)]
    pub pitch: f32,
    #[serde(default)]
    pub hp: i32,
    #[serde(default)]
    pub armor: i32,
    #[serde(default)]
    pub ammo: i32,
    #[serde(default)]
    pub weapon_id: Option<String>,
    #[serde(default)]
    pub alive: Option<bool>,
    #[serde(default)]
    pub kills: u32,
    #[serde(default)]
    pub deaths: u32,
    #[serde(default)]
    pub score: i32,
    #[serde(default)]
    pub last_seq: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemotePlayerState {
    pub player_id: String,
    pub pos: Vec3,
    #[serde(default)]
    pub yaw: f32,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub alive: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectileState {
    pub projectile_id: String,
    pub pos: Vec3,
    #[serde(default)]
    pub vel: Vec3,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub weapon_id: Option<String>,
    #[serde(default)]
    pub radius: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PickupKind {
    #[default]
    Health,
    Armor,
    Ammo,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickupState {
    pub pickup_id: String,
    pub pos: Vec3,
    #[serde(default)]
    pub kind: PickupKind,
    #[serde(default)]
    pub available: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("encoding failed: {0}")]
    Encode(serde_json::Error),
    #[error("decoding failed: {0}")]
    Decode(serde_json::Error),
}

pub fn encode(message: &ClientMessage) -> Result<String, EnvelopeError> {
    serde_json::to_string(message).map_err(EnvelopeError::Encode)
}

pub fn decode(text: &str) -> Result<ServerMessage, EnvelopeError> {
    serde_json::from_str(text).map_err(EnvelopeError::Decode)
}

// Entries that fail to decode are skipped one by one so a single bad record
// never costs the whole snapshot.
fn lenient_seq<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    let serde_json::Value::Array(items) = raw else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}

fn lenient_report<'de, D, T>(deserializer: D) -> Result<Reported<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    if raw.is_null() {
        return Ok(Reported::Absent);
    }
    Ok(serde_json::from_value(raw).map_or(Reported::Malformed, Reported::Valid))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_envelope_shape() {
        let join = ClientMessage::Join(Join::new("Player1", false, Some("r1".into())));
        let value: serde_json::Value = serde_json::from_str(&encode(&join).unwrap()).unwrap();

        assert_eq!(value["type"], "join");
        assert_eq!(value["data"]["roomId"], "r1");
        assert_eq!(value["data"]["playerName"], "Player1");
        assert_eq!(value["data"]["wantDeltas"], false);
    }

    #[test]
    fn test_matchmake_drops_room() {
        let join = Join::new("p", true, Some("r1".into()));
        assert!(join.room_id.is_none());
    }

    #[test]
    fn test_input_field_names() {
        let input = ClientMessage::Input(InputCommand {
            seq: 7,
            dt: 1.0 / 60.0,
            move_x: 1.0,
            move_y: 0.0,
            yaw: 0.5,
            pitch: 0.0,
            fire: true,
            jump: false,
            sprint: false,
            reload: false,
            weapon_id: DEFAULT_WEAPON.into(),
        });
        let value: serde_json::Value = serde_json::from_str(&encode(&input).unwrap()).unwrap();

        assert_eq!(value["type"], "input");
        assert_eq!(value["data"]["seq"], 7);
        assert_eq!(value["data"]["moveX"], 1.0);
        assert_eq!(value["data"]["weaponId"], "pistol");
    }

    #[test]
    fn test_decode_welcome_and_pong() {
        let welcome = decode(r#"{"type":"welcome","data":{"playerId":"p1","roomId":"r9","tickrate":30}}"#)
            .unwrap();
        match welcome {
            ServerMessage::Welcome(w) => {
                assert_eq!(w.player_id, "p1");
                assert_eq!(w.room_id, "r9");
                assert_eq!(w.tickrate, Some(30));
            }
            other => panic!("unexpected {:?}", other),
        }

        let pong = decode(r#"{"type":"pong","data":{"t":1000.5,"serverTime":17.0}}"#).unwrap();
        assert_eq!(pong, ServerMessage::Pong(Pong { t: Some(1000.5) }));

        let empty = decode(r#"{"type":"pong","data":{}}"#).unwrap();
        assert_eq!(empty, ServerMessage::Pong(Pong { t: None }));
    }

    #[test]
    fn test_unknown_and_malformed_envelopes_fail() {
        assert!(decode(r#"{"type":"version","data":{"ok":true}}"#).is_err());
        assert!(decode("not json").is_err());
        assert!(decode(r#"{"data":{}}"#).is_err());
        assert!(decode(r#"{"type":"pong","data":{"t":"soon"}}"#).is_err());
    }

    #[test]
    fn test_snapshot_skips_bad_entries() {
        let text = r#"{"type":"snapshot","data":{
            "mode":"full","serverTick":12,
            "you":{"playerId":"me","pos":[1,2,3],"vel":[0,0,1],"yaw":0.5,"hp":100,"lastSeq":4},
            "others":[{"playerId":"a","pos":[0,0,0]},{"playerId":"b"},null,{"playerId":"c","pos":[1,1,1],"yaw":3.0}],
            "projectiles":[{"projectileId":"x","pos":[5,5,5],"vel":[1,0,0]}],
            "pickups":[{"pickupId":"k","kind":"armor","pos":[0,0,0],"available":true},{"pickupId":"q","kind":"quad","pos":[0,0,0]}],
            "events":[{"type":"explosion"}]
        }}"#;

        let ServerMessage::Snapshot(snapshot) = decode(text).unwrap() else {
            panic!("expected snapshot");
        };

        let you = snapshot.you.valid().unwrap();
        assert_eq!(you.pos, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(you.last_seq, Some(4));
        assert_eq!(snapshot.server_tick, Some(12));

        let ids: Vec<&str> = snapshot.others.iter().map(|o| o.player_id.as_str()).collect();
        assert_eq!(ids, ["a", "c"]);
        assert_eq!(snapshot.projectiles.len(), 1);
        assert_eq!(snapshot.pickups[0].kind, PickupKind::Armor);
        assert_eq!(snapshot.pickups[1].kind, PickupKind::Other);
        assert!(!snapshot.pickups[1].available);
    }

    #[test]
    fn test_snapshot_with_malformed_you() {
        let text = r#"{"type":"snapshot","data":{"you":{"playerId":"me"},"others":"nope"}}"#;
        let ServerMessage::Snapshot(snapshot) = decode(text).unwrap() else {
            panic!("expected snapshot");
        };
        assert_eq!(snapshot.you, Reported::Malformed);
        assert!(snapshot.you.valid().is_none());
        assert!(snapshot.others.is_empty());
    }

    #[test]
    fn test_snapshot_you_absent_or_null() {
        for text in [
            r#"{"type":"snapshot","data":{"others":[]}}"#,
            r#"{"type":"snapshot","data":{"you":null,"others":[]}}"#,
        ] {
            let ServerMessage::Snapshot(snapshot) = decode(text).unwrap() else {
                panic!("expected snapshot");
            };
            assert_eq!(snapshot.you, Reported::Absent, "{}", text);
        }
    }

    #[test]
    fn test_snapshot_you_without_velocity_keeps_others() {
        let text = r#"{"type":"snapshot","data":{
            "you":{"playerId":"me","pos":[1,0,0]},
            "others":[{"playerId":"a","pos":[0,0,0]}],
            "projectiles":[{"projectileId":"x","pos":[5,5,5],"vel":[1,0,0]}]
        }}"#;
        let ServerMessage::Snapshot(snapshot) = decode(text).unwrap() else {
            panic!("expected snapshot");
        };
        assert_eq!(snapshot.you, Reported::Malformed);
        assert_eq!(snapshot.others.len(), 1);
        assert_eq!(snapshot.projectiles.len(), 1);
    }
}
