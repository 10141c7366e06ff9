use futures_util::future::{self, BoxFuture};
use futures_util::{FutureExt, SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

use super::channel::{Connector, Link};
use super::error::ChannelError;

/// Production transport: one WebSocket per link, text frames only.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

impl Connector for WebSocketConnector {
    fn connect(&self, url: &str) -> BoxFuture<'static, Result<Link, ChannelError>> {
        let url = url.to_string();

        async move {
            let (socket, _response) = tokio_tungstenite::connect_async(url.as_str())
                .await
                .map_err(|e| ChannelError::Connect(e.to_string()))?;
            let (sink, stream) = socket.split();

            let sink = sink
                .with(|text: String| future::ready(Ok::<_, WsError>(Message::Text(text))))
                .sink_map_err(|e| ChannelError::Transport(e.to_string()));

            let stream = stream
                .take_while(|frame| {
                    future::ready(matches!(frame, Ok(message) if !message.is_close()))
                })
                .filter_map(|frame| {
                    future::ready(match frame {
                        Ok(message) if message.is_text() => message.into_text().ok(),
                        _ => None,
                    })
                });

            Ok(Link {
                sink: Box::pin(sink),
                stream: stream.boxed(),
            })
        }
        .boxed()
    }
}
