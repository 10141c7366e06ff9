mod backoff;
mod channel;
mod client;
mod config;
mod error;
mod input;
mod interpolation;
mod kinematics;
mod latency;
mod memory;
mod session;
mod stats;
mod websocket;

pub use backoff::Backoff;
pub use channel::{
    Channel, ChannelEvent, ConnectionState, Connector, Link, LinkSink, LinkStream,
};
pub use client::{CameraView, EntityPose, Frame, NetworkClient};
pub use config::{ClientConfig, JoinRequest, ReconnectPolicy};
pub use error::{ChannelError, ClientError};
pub use input::{InputSender, InputState};
pub use interpolation::{
    interpolate, lerp_angle, sample_at, wrap_angle, Interpolator, Pose,
    DEFAULT_INTERPOLATION_DELAY_MS,
};
pub use kinematics::LocalKinematics;
pub use latency::{LatencyTracker, DEFAULT_MAX_RTT_MS, DEFAULT_PROBE_INTERVAL_MS};
pub use memory::{MemoryConnector, MemoryOutcome, MemoryPeer};
pub use session::{Session, SessionStatus};
pub use stats::NetworkStats;
pub use websocket::WebSocketConnector;
