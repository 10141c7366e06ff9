mod protocol;

pub use protocol::{
    decode, encode, ClientMessage, EnvelopeError, Hello, InputCommand, Join, LocalPlayerState,
    PickupKind, PickupState, Ping, Pong, ProjectileState, RemotePlayerState, Reported,
    ServerError, ServerMessage, Snapshot, Welcome, CLIENT_VERSION, DEFAULT_SERVER_URL, DEFAULT_WEAPON,
};
