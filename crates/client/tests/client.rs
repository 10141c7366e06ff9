use std::time::Duration;

use glam::Vec3;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::time;

use skirmish::{EntityKey, EntityKind};
use skirmish_client::net::{
    ClientConfig, ClientError, InputState, JoinRequest, MemoryConnector, MemoryOutcome,
    MemoryPeer, NetworkClient, SessionStatus,
};

fn request(split: bool, room: Option<&str>) -> JoinRequest {
    JoinRequest {
        url: "memory://arena".into(),
        player_name: " Ada ".into(),
        room_id: room.map(str::to_string),
        matchmake: room.is_none(),
        split,
    }
}

fn envelope(kind: &str, data: Value) -> String {
    json!({ "type": kind, "data": data }).to_string()
}

async fn expect(peer: &mut MemoryPeer, kind: &str) -> Value {
    loop {
        let text = peer.recv().await.expect("link closed");
        let value: Value = serde_json::from_str(&text).unwrap();
        if value["type"] == kind {
            return value["data"].clone();
        }
    }
}

async fn accept_join(
    peers: &mut mpsc::UnboundedReceiver<MemoryPeer>,
    player_id: &str,
    room_id: &str,
) -> (MemoryPeer, Value) {
    let mut peer = peers.recv().await.unwrap();
    let hello = expect(&mut peer, "hello").await;
    assert!(hello["clientVersion"].is_string());

    let join = expect(&mut peer, "join").await;
    peer.send(envelope(
        "welcome",
        json!({ "playerId": player_id, "roomId": room_id }),
    ));
    (peer, join)
}

fn snapshot(you: &str, x: f32, others: &[(&str, f32)]) -> String {
    let others: Vec<Value> = others
        .iter()
        .map(|(id, x)| json!({ "playerId": id, "pos": [x, 0.0, 0.0], "yaw": 0.0 }))
        .collect();
    envelope(
        "snapshot",
        json!({
            "you": {
                "playerId": you, "pos": [x, 0.0, 0.0], "vel": [2.0, 0.0, 0.0],
                "yaw": 0.0, "hp": 87, "armor": 10, "ammo": 12, "weaponId": "rocket",
                "kills": 3, "deaths": 1, "lastSeq": 41
            },
            "others": others,
            "projectiles": [{ "projectileId": "rk1", "pos": [1.0, 1.0, 1.0], "vel": [0.0, 0.0, 9.0] }],
            "pickups": [{ "pickupId": "hp1", "kind": "health", "pos": [4.0, 0.0, 4.0], "available": true }]
        }),
    )
}

#[tokio::test(start_paused = true)]
async fn test_solo_join_and_frame() {
    let (connector, mut peers) = MemoryConnector::new(MemoryOutcome::Accept);
    let mut client = NetworkClient::with_connector(ClientConfig::default(), connector);

    let server = tokio::spawn(async move {
        let (peer, join) = accept_join(&mut peers, "p1", "r1").await;
        peer.send(snapshot("p1", 10.0, &[("p9", -5.0)]));
        (peer, join)
    });

    client.connect(&request(false, None)).await.unwrap();
    let (mut peer, join) = server.await.unwrap();

    assert_eq!(join["playerName"], "Ada");
    assert_eq!(join["matchmake"], true);
    assert_eq!(join["roomId"], Value::Null);
    assert_eq!(join["wantDeltas"], false);

    let session = client.session(0).unwrap();
    assert_eq!(session.player_id(), Some("p1"));
    assert_eq!(session.room_id(), Some("r1"));
    assert_eq!(session.status(), &SessionStatus::Joined("r1".into()));

    let now = client.now_ms() + 50.0;
    let frame = client.tick_at(now, 0.1, &[]);

    let session = client.session(0).unwrap();
    let you = session.you().unwrap();
    assert_eq!(you.hp, 87);
    assert_eq!(you.weapon_id.as_deref(), Some("rocket"));
    assert_eq!(session.last_seq_ack(), Some(41));

    let local = frame.entities.iter().find(|e| e.id == "p1").unwrap();
    assert!(local.local);
    assert_eq!(local.pose.position, Vec3::new(10.0, 0.0, 0.0));
    let remote = frame.entities.iter().find(|e| e.id == "p9").unwrap();
    assert!(!remote.local);
    assert_eq!(remote.pose.position, Vec3::new(-5.0, 0.0, 0.0));

    assert_eq!(frame.projectiles.len(), 1);
    assert_eq!(frame.pickups.len(), 1);
    assert!(
        frame
            .spawned
            .contains(&EntityKey::new(EntityKind::Projectile, "rk1"))
    );

    // Dead reckoning: 10 + 2 * 0.1, raised to eye level.
    let camera = &frame.cameras[0];
    assert!((camera.position.x - 10.2).abs() < 1e-4);
    assert!((camera.position.y - 1.55).abs() < 1e-4);

    let first = expect(&mut peer, "ping").await;
    assert!(first["t"].is_number());
    let input = expect(&mut peer, "input").await;
    assert_eq!(input["seq"], 0);
    assert_eq!(input["weaponId"], "pistol");

    client.close();
    assert!(client.sessions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_join_times_out_without_welcome() {
    let (connector, mut peers) = MemoryConnector::new(MemoryOutcome::Accept);
    let mut client = NetworkClient::with_connector(ClientConfig::default(), connector);
    let req = request(false, Some("r1"));

    let (result, _peer) = tokio::join!(client.connect(&req), peers.recv());

    assert!(matches!(result, Err(ClientError::JoinTimeout(d)) if d == Duration::from_millis(3000)));
    client.close();
}

#[tokio::test(start_paused = true)]
async fn test_connect_failure_is_reported() {
    let (connector, _peers) = MemoryConnector::new(MemoryOutcome::Refuse);
    let mut client = NetworkClient::with_connector(ClientConfig::default(), connector);

    let result = client.connect(&request(false, None)).await;

    assert!(matches!(result, Err(ClientError::Channel(_))));
    let status = client.session(0).unwrap().status().to_string();
    assert!(status.starts_with("connect failed"), "{}", status);
    client.close();
}

#[tokio::test(start_paused = true)]
async fn test_split_sessions_share_room() {
    let (connector, mut peers) = MemoryConnector::new(MemoryOutcome::Accept);
    let mut client = NetworkClient::with_connector(ClientConfig::default(), connector);

    let server = tokio::spawn(async move {
        let (first, first_join) = accept_join(&mut peers, "p1", "r7").await;
        let (second, second_join) = accept_join(&mut peers, "p2", "r7").await;
        (first, second, first_join, second_join)
    });

    client.connect(&request(true, None)).await.unwrap();
    let (_first, _second, first_join, second_join) = server.await.unwrap();

    assert_eq!(first_join["playerName"], "Ada1");
    assert_eq!(first_join["matchmake"], true);
    assert_eq!(second_join["playerName"], "Ada2");
    assert_eq!(second_join["matchmake"], false);
    assert_eq!(second_join["roomId"], "r7");

    assert!(client.is_split());
    assert!(client.interpolator().is_local("p1"));
    assert!(client.interpolator().is_local("p2"));
}

#[tokio::test(start_paused = true)]
async fn test_rejoins_room_after_reconnect() {
    let (connector, mut peers) = MemoryConnector::new(MemoryOutcome::Accept);
    let mut client = NetworkClient::with_connector(ClientConfig::default(), connector);

    let server = tokio::spawn(async move {
        let (peer, _) = accept_join(&mut peers, "p1", "r3").await;
        (peer, peers)
    });
    client.connect(&request(false, None)).await.unwrap();
    let (peer, mut peers) = server.await.unwrap();

    drop(peer);
    for _ in 0..40 {
        time::sleep(Duration::from_millis(25)).await;
        client.tick(0.025, &[InputState::default()]);
    }

    let mut peer = peers.try_recv().unwrap();
    let join = expect(&mut peer, "join").await;
    assert_eq!(join["roomId"], "r3");
    assert_eq!(join["matchmake"], false);
    assert_eq!(join["playerName"], "Ada");
    client.close();
}

#[tokio::test(start_paused = true)]
async fn test_silent_players_are_released() {
    let (connector, mut peers) = MemoryConnector::new(MemoryOutcome::Accept);
    let mut client = NetworkClient::with_connector(ClientConfig::default(), connector);

    let server = tokio::spawn(async move {
        let (peer, _) = accept_join(&mut peers, "p1", "r1").await;
        peer.send(snapshot("p1", 0.0, &[("ghost", 3.0)]));
        peer
    });
    client.connect(&request(false, None)).await.unwrap();
    let _peer = server.await.unwrap();

    let start = client.now_ms();
    let frame = client.tick_at(start, 0.016, &[]);
    assert!(frame.entities.iter().any(|e| e.id == "ghost"));

    let frame = client.tick_at(start + 5001.0, 0.016, &[]);
    assert!(
        frame
            .released
            .contains(&EntityKey::new(EntityKind::Player, "ghost"))
    );
    assert!(client.store().history("ghost").is_none());
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_releases_previous_entities() {
    let (connector, mut peers) = MemoryConnector::new(MemoryOutcome::Accept);
    let mut client = NetworkClient::with_connector(ClientConfig::default(), connector);

    let server = tokio::spawn(async move {
        let (peer, _) = accept_join(&mut peers, "p1", "r1").await;
        peer.send(snapshot("p1", 0.0, &[("ghost", 3.0)]));
        (peer, peers)
    });
    client.connect(&request(false, None)).await.unwrap();
    let (_first, mut peers) = server.await.unwrap();

    let frame = client.tick_at(client.now_ms(), 0.016, &[]);
    let ghost = EntityKey::new(EntityKind::Player, "ghost");
    assert!(frame.spawned.contains(&ghost));

    let server = tokio::spawn(async move { accept_join(&mut peers, "p1", "r2").await });
    client.connect(&request(false, None)).await.unwrap();
    let _second = server.await.unwrap();

    let frame = client.tick_at(client.now_ms(), 0.016, &[]);
    assert!(frame.released.contains(&ghost));
    assert!(
        frame
            .released
            .contains(&EntityKey::new(EntityKind::Projectile, "rk1"))
    );
    assert!(client.store().history("ghost").is_none());
    client.close();
}

#[tokio::test(start_paused = true)]
async fn test_malformed_local_record_keeps_rest_of_snapshot() {
    let (connector, mut peers) = MemoryConnector::new(MemoryOutcome::Accept);
    let mut client = NetworkClient::with_connector(ClientConfig::default(), connector);

    let server = tokio::spawn(async move {
        let (peer, _) = accept_join(&mut peers, "p1", "r1").await;
        peer.send(envelope(
            "snapshot",
            json!({
                "you": { "playerId": "p1", "pos": [1.0, 0.0, 0.0] },
                "others": [{ "playerId": "p9", "pos": [-5.0, 0.0, 0.0], "yaw": 0.0 }],
                "projectiles": [{ "projectileId": "rk1", "pos": [1.0, 1.0, 1.0], "vel": [0.0, 0.0, 9.0] }]
            }),
        ));
        peer
    });
    client.connect(&request(false, None)).await.unwrap();
    let _peer = server.await.unwrap();

    let frame = client.tick_at(client.now_ms(), 0.016, &[]);

    assert!(frame.entities.iter().any(|e| e.id == "p9"));
    assert_eq!(frame.projectiles.len(), 1);
    let session = client.session(0).unwrap();
    assert!(session.you().is_none());
    assert_eq!(session.last_seq_ack(), None);
    client.close();
}
