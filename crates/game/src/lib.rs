pub mod net;
pub mod simulation;
pub mod snapshot;

pub use net::{
    decode, encode, ClientMessage, EnvelopeError, Hello, InputCommand, Join, LocalPlayerState,
    PickupKind, PickupState, Ping, Pong, ProjectileState, RemotePlayerState, Reported,
    ServerError, ServerMessage, Snapshot, Welcome, CLIENT_VERSION, DEFAULT_SERVER_URL, DEFAULT_WEAPON,
};
pub use simulation::FixedTimestep;
pub use snapshot::{
    EntityHistory, EntityKey, EntityKind, EntitySampleStore, PickupRecord, ProjectileRecord,
    Sample, StoreChanges, DEFAULT_HISTORY_CAPACITY, DEFAULT_STALE_AFTER_MS,
};
