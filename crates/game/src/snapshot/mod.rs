mod history;
mod store;

pub use history::{EntityHistory, Sample, DEFAULT_HISTORY_CAPACITY};
pub use store::{
    EntityKey, EntityKind, EntitySampleStore, PickupRecord, ProjectileRecord, StoreChanges,
    DEFAULT_STALE_AFTER_MS,
};
