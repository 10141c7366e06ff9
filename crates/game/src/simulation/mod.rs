mod timestep;

pub use timestep::{FixedTimestep, DEFAULT_MAX_FRAME_DELTA};
