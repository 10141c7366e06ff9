use std::time::Duration;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ChannelError {
    #[error("connection did not open within {0:?}")]
    ConnectTimeout(Duration),
    #[error("transport failed before opening: {0}")]
    Connect(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("channel closed")]
    Closed,
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Channel(#[from] ChannelError),
    #[error("no welcome from server within {0:?}")]
    JoinTimeout(Duration),
}
