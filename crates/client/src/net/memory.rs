use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use futures_util::future::{self, BoxFuture};
use futures_util::{sink, stream, FutureExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::Instant;

use super::channel::{Connector, Link};
use super::error::ChannelError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryOutcome {
    Accept,
    Refuse,
    /// Never opens; only the connect timeout ends the attempt.
    Stall,
}

/// Server side of an accepted in-memory link. Dropping it closes the link.
#[derive(Debug)]
pub struct MemoryPeer {
    to_client: mpsc::UnboundedSender<String>,
    from_client: mpsc::UnboundedReceiver<String>,
}

impl MemoryPeer {
    pub fn send(&self, text: impl Into<String>) -> bool {
        self.to_client.send(text.into()).is_ok()
    }

    pub async fn recv(&mut self) -> Option<String> {
        self.from_client.recv().await
    }

    pub fn try_recv(&mut self) -> Option<String> {
        self.from_client.try_recv().ok()
    }
}

/// In-process [`Connector`] with scripted connection outcomes, for tests and
/// offline runs.
#[derive(Debug)]
pub struct MemoryConnector {
    script: Mutex<VecDeque<MemoryOutcome>>,
    fallback: MemoryOutcome,
    attempts: Mutex<Vec<Instant>>,
    peers: mpsc::UnboundedSender<MemoryPeer>,
}

impl MemoryConnector {
    pub fn new(fallback: MemoryOutcome) -> (Arc<Self>, mpsc::UnboundedReceiver<MemoryPeer>) {
        let (peers, accepted) = mpsc::unbounded_channel();
        let connector = Self {
            script: Mutex::new(VecDeque::new()),
            fallback,
            attempts: Mutex::new(Vec::new()),
            peers,
        };
        (Arc::new(connector), accepted)
    }

    pub fn push_outcome(&self, outcome: MemoryOutcome) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(outcome);
        }
    }

    pub fn attempts(&self) -> Vec<Instant> {
        self.attempts
            .lock()
            .map(|attempts| attempts.clone())
            .unwrap_or_default()
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.lock().map(|a| a.len()).unwrap_or_default()
    }

    fn next_outcome(&self) -> MemoryOutcome {
        self.script
            .lock()
            .ok()
            .and_then(|mut script| script.pop_front())
            .unwrap_or(self.fallback)
    }

    fn accept(&self) -> Link {
        let (to_client, client_rx) = mpsc::unbounded_channel::<String>();
        let (client_tx, from_client) = mpsc::unbounded_channel::<String>();

        let _ = self.peers.send(MemoryPeer {
            to_client,
            from_client,
        });

        let sink = sink::unfold(
            client_tx,
            |tx: mpsc::UnboundedSender<String>, text: String| async move {
                tx.send(text).map_err(|_| ChannelError::Closed)?;
                Ok::<_, ChannelError>(tx)
            },
        );
        let stream = stream::unfold(client_rx, |mut rx| async move {
            rx.recv().await.map(|text| (text, rx))
        });

        Link {
            sink: Box::pin(sink),
            stream: stream.boxed(),
        }
    }
}

impl Connector for MemoryConnector {
    fn connect(&self, _url: &str) -> BoxFuture<'static, Result<Link, ChannelError>> {
        if let Ok(mut attempts) = self.attempts.lock() {
            attempts.push(Instant::now());
        }

        match self.next_outcome() {
            MemoryOutcome::Accept => future::ready(Ok(self.accept())).boxed(),
            MemoryOutcome::Refuse => {
                future::ready(Err(ChannelError::Connect("connection refused".into()))).boxed()
            }
            MemoryOutcome::Stall => future::pending().boxed(),
        }
    }
}
