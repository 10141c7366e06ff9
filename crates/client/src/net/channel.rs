use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::stream::BoxStream;
use futures_util::{Sink, SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time;

use skirmish::net::{self, ClientMessage, ServerMessage};

use super::backoff::Backoff;
use super::config::ReconnectPolicy;
use super::error::ChannelError;
use super::stats::{NetworkStats, StatsCounters};

const EVENT_QUEUE_CAPACITY: usize = 32;

pub type LinkSink = Pin<Box<dyn Sink<String, Error = ChannelError> + Send>>;
pub type LinkStream = BoxStream<'static, String>;

/// One open, message-oriented duplex connection carrying text frames. The
/// stream ending means the connection closed.
pub struct Link {
    pub sink: LinkSink,
    pub stream: LinkStream,
}

pub trait Connector: Send + Sync + 'static {
    fn connect(&self, url: &str) -> BoxFuture<'static, Result<Link, ChannelError>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Open,
    Reconnecting,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    Opened { reconnect: bool },
    Closed,
    ConnectFailed(ChannelError),
    ReconnectScheduled(Duration),
}

impl ChannelEvent {
    /// Failure notices that a later event supersedes.
    fn is_transient(&self) -> bool {
        matches!(
            self,
            ChannelEvent::ConnectFailed(_) | ChannelEvent::ReconnectScheduled(_)
        )
    }
}

/// Bounded lifecycle queue. When full, the oldest transient event makes room,
/// so `Opened` and `Closed` survive an owner that stops draining during a
/// long outage. The newest event is always kept.
#[derive(Default)]
struct EventQueue {
    events: Mutex<VecDeque<ChannelEvent>>,
}

impl EventQueue {
    fn push(&self, event: ChannelEvent) {
        let Ok(mut events) = self.events.lock() else {
            return;
        };
        if events.len() >= EVENT_QUEUE_CAPACITY {
            let oldest = events
                .iter()
                .position(ChannelEvent::is_transient)
                .unwrap_or(0);
            if let Some(dropped) = events.remove(oldest) {
                log::trace!("Channel event queue full, dropping {:?}", dropped);
            }
        }
        events.push_back(event);
    }

    fn pop(&self) -> Option<ChannelEvent> {
        self.events.lock().ok()?.pop_front()
    }
}

struct Generation {
    outbound: mpsc::UnboundedSender<String>,
    closed: Arc<AtomicBool>,
    stop: oneshot::Sender<()>,
}

/// Self-healing duplex message channel.
///
/// A background supervisor task owns the transport. Inbound envelopes and
/// lifecycle events are queued for the owner to drain once per tick; the
/// connection state is published through a watch channel.
pub struct Channel {
    url: String,
    connector: Arc<dyn Connector>,
    policy: ReconnectPolicy,
    connect_timeout: Duration,
    greeting: Option<String>,
    state: Arc<watch::Sender<ConnectionState>>,
    stats: Arc<StatsCounters>,
    generation: Option<Generation>,
    inbound: mpsc::UnboundedReceiver<ServerMessage>,
    events: Arc<EventQueue>,
}

impl Channel {
    pub fn new(
        url: impl Into<String>,
        connector: Arc<dyn Connector>,
        policy: ReconnectPolicy,
        connect_timeout: Duration,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        let (_, inbound) = mpsc::unbounded_channel();
        Self {
            url: url.into(),
            connector,
            policy,
            connect_timeout,
            greeting: None,
            state: Arc::new(state),
            stats: Arc::new(StatsCounters::default()),
            generation: None,
            inbound,
            events: Arc::default(),
        }
    }

    /// Message written first on every successful open.
    pub fn with_greeting(mut self, greeting: &ClientMessage) -> Self {
        match net::encode(greeting) {
            Ok(text) => self.greeting = Some(text),
            Err(e) => log::warn!("Greeting not encodable, ignoring it: {}", e),
        }
        self
    }

    /// Starts a new connection, superseding any previous one, and waits for
    /// the first attempt to open, fail or time out. A failed first attempt
    /// still leaves automatic reconnection running until [`Channel::close`].
    pub async fn connect(&mut self) -> Result<(), ChannelError> {
        self.shutdown();

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let events = Arc::new(EventQueue::default());
        let (stop_tx, stop_rx) = oneshot::channel();
        let (first_tx, first_rx) = oneshot::channel();
        let closed = Arc::new(AtomicBool::new(false));

        self.inbound = inbound_rx;
        self.events = Arc::clone(&events);
        self.generation = Some(Generation {
            outbound: outbound_tx,
            closed: Arc::clone(&closed),
            stop: stop_tx,
        });

        let supervisor = Supervisor {
            url: self.url.clone(),
            connector: Arc::clone(&self.connector),
            policy: self.policy.clone(),
            connect_timeout: self.connect_timeout,
            greeting: self.greeting.clone(),
            state: Arc::clone(&self.state),
            closed,
            stats: Arc::clone(&self.stats),
            outbound: outbound_rx,
            inbound: inbound_tx,
            events,
        };

        log::info!("Connecting to {}", self.url);
        self.state.send_replace(ConnectionState::Connecting);

        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = stop_rx => {}
                _ = supervisor.run(first_tx) => {}
            }
        });

        first_rx.await.unwrap_or(Err(ChannelError::Closed))
    }

    /// Best-effort send; dropped unless the connection is open right now.
    pub fn send(&self, message: &ClientMessage) -> bool {
        if self.state() != ConnectionState::Open {
            return false;
        }
        let Some(generation) = &self.generation else {
            return false;
        };

        match net::encode(message) {
            Ok(text) => generation.outbound.send(text).is_ok(),
            Err(e) => {
                log::warn!("Dropping unencodable message: {}", e);
                false
            }
        }
    }

    /// Terminal: stops the connection and every pending reconnect attempt.
    pub fn close(&mut self) {
        if self.generation.is_some() {
            log::info!("Closing channel to {}", self.url);
        }
        self.shutdown();
        self.state.send_replace(ConnectionState::Disconnected);
    }

    fn shutdown(&mut self) {
        if let Some(generation) = self.generation.take() {
            generation.closed.store(true, Ordering::SeqCst);
            let _ = generation.stop.send(());
        }
    }

    pub fn poll_message(&mut self) -> Option<ServerMessage> {
        self.inbound.try_recv().ok()
    }

    pub fn poll_event(&mut self) -> Option<ChannelEvent> {
        self.events.pop()
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub fn stats(&self) -> NetworkStats {
        self.stats.snapshot()
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct Supervisor {
    url: String,
    connector: Arc<dyn Connector>,
    policy: ReconnectPolicy,
    connect_timeout: Duration,
    greeting: Option<String>,
    state: Arc<watch::Sender<ConnectionState>>,
    closed: Arc<AtomicBool>,
    stats: Arc<StatsCounters>,
    outbound: mpsc::UnboundedReceiver<String>,
    inbound: mpsc::UnboundedSender<ServerMessage>,
    events: Arc<EventQueue>,
}

impl Supervisor {
    async fn run(mut self, first: oneshot::Sender<Result<(), ChannelError>>) {
        let mut first = Some(first);
        let mut backoff = Backoff::new(self.policy.clone());
        let mut reconnect = false;

        loop {
            self.stats.attempted();
            match self.open().await {
                Ok(link) => {
                    // Nothing queued for a previous connection is replayed.
                    while self.outbound.try_recv().is_ok() {}

                    backoff.reset();
                    self.stats.opened();
                    self.set_state(ConnectionState::Open);
                    log::info!("Connected to {}", self.url);
                    self.emit(ChannelEvent::Opened { reconnect });
                    if let Some(first) = first.take() {
                        let _ = first.send(Ok(()));
                    }

                    let reason = self.pump(link).await;
                    if self.is_closed() {
                        return;
                    }
                    log::info!("Connection to {} lost: {}", self.url, reason);
                    self.set_state(ConnectionState::Disconnected);
                    self.emit(ChannelEvent::Closed);
                }
                Err(error) => {
                    log::warn!("Connecting to {} failed: {}", self.url, error);
                    self.emit(ChannelEvent::ConnectFailed(error.clone()));
                    if let Some(first) = first.take() {
                        let _ = first.send(Err(error));
                    }
                }
            }

            if self.is_closed() {
                return;
            }

            let delay = backoff.next_delay();
            reconnect = true;
            self.set_state(ConnectionState::Reconnecting);
            log::info!("Reconnecting to {} in {:?}", self.url, delay);
            self.emit(ChannelEvent::ReconnectScheduled(delay));
            time::sleep(delay).await;
        }
    }

    async fn open(&self) -> Result<Link, ChannelError> {
        match time::timeout(self.connect_timeout, self.connector.connect(&self.url)).await {
            Ok(result) => result,
            Err(_) => Err(ChannelError::ConnectTimeout(self.connect_timeout)),
        }
    }

    async fn pump(&mut self, link: Link) -> &'static str {
        let Link {
            mut sink,
            mut stream,
        } = link;

        if let Some(greeting) = self.greeting.clone() {
            if sink.send(greeting).await.is_err() {
                return "greeting rejected";
            }
            self.stats.sent();
        }

        let outbound = &mut self.outbound;
        let inbound = &self.inbound;
        let stats = &self.stats;

        loop {
            tokio::select! {
                frame = stream.next() => match frame {
                    Some(text) => {
                        if !deliver(&text, inbound, stats) {
                            return "receiver dropped";
                        }
                    }
                    None => return "closed by peer",
                },
                outgoing = outbound.recv() => match outgoing {
                    Some(text) => {
                        if let Err(e) = sink.send(text).await {
                            log::debug!("Send failed: {}", e);
                            return "send failed";
                        }
                        stats.sent();
                    }
                    None => {
                        let _ = sink.close().await;
                        return "closed locally";
                    }
                },
            }
        }
    }

    // The closed check runs under the watch lock, so a transition racing
    // `Channel::close` can never land after its `Disconnected`.
    fn set_state(&self, state: ConnectionState) {
        let closed = &self.closed;
        self.state.send_if_modified(|current| {
            if closed.load(Ordering::SeqCst) || *current == state {
                return false;
            }
            *current = state;
            true
        });
    }

    fn emit(&self, event: ChannelEvent) {
        self.events.push(event);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

// Undecodable frames are noise: counted and dropped, never fatal.
fn deliver(
    text: &str,
    inbound: &mpsc::UnboundedSender<ServerMessage>,
    stats: &StatsCounters,
) -> bool {
    match net::decode(text) {
        Ok(message) => {
            stats.received();
            inbound.send(message).is_ok()
        }
        Err(e) => {
            stats.dropped();
            log::trace!("Dropping inbound frame: {}", e);
            true
        }
    }
}
