//! tokio-tungstenite backed channel.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::{RealtimeChannel, RealtimeConnector};
use crate::errors::AppError;

/// Connects with `tokio_tungstenite::connect_async` (TLS for `wss://`).
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteConnector;

impl RealtimeConnector for TungsteniteConnector {
    type Channel = TungsteniteChannel;

    async fn connect(&self, url: &str) -> Result<Self::Channel, AppError> {
        let (stream, response) = connect_async(url).await?;
        tracing::debug!("WebSocket handshake completed ({})", response.status());
        Ok(TungsteniteChannel { stream })
    }
}

pub struct TungsteniteChannel {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl RealtimeChannel for TungsteniteChannel {
    async fn send_text(&mut self, text: String) -> Result<(), AppError> {
        self.stream.send(Message::Text(text.into())).await?;
        Ok(())
    }

    async fn next_text(&mut self) -> Option<Result<String, AppError>> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Some(Ok(text.as_str().to_owned())),
                Some(Ok(Message::Close(frame))) => {
                    tracing::debug!("Server closed the connection: {:?}", frame);
                    return None;
                }
                None => return None,
                Some(Err(e)) => return Some(Err(e.into())),
                // Binary frames are not part of the protocol; ping/pong is answered by tungstenite.
                Some(Ok(_)) => continue,
            }
        }
    }
}
