//! WebSocket transport over tokio-tungstenite.
//!
//! The bearer token rides in the `?token=` query parameter of the connect
//! URL, because browser-parity WebSocket clients cannot set request headers.
//! A refused upgrade (401) surfaces as `HandshakeRefused`.

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::{Transport, TransportError};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket transport.
///
/// Send and receive halves are guarded separately so a blocked `recv` never
/// delays a `send`.
#[derive(Default)]
pub struct WsTransport {
    write: Mutex<Option<SplitSink<WsStream, Message>>>,
    read: Mutex<Option<SplitStream<WsStream>>>,
    connected: AtomicBool,
}

impl WsTransport {
    /// Create a disconnected transport.
    pub fn new() -> Self {
        Self::default()
    }

    fn url_with_token(address: &str, token: &str) -> String {
        let separator = if address.contains('?') { '&' } else { '?' };
        format!("{address}{separator}token={token}")
    }
}

impl std::fmt::Debug for WsTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsTransport")
            .field("connected", &self.is_connected())
            .finish()
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn connect(&self, address: &str, token: &str) -> Result<(), TransportError> {
        let url = Self::url_with_token(address, token);

        let (stream, _response) = connect_async(url.as_str()).await.map_err(|e| match e {
            tungstenite::Error::Http(ref response)
                if response.status() == tungstenite::http::StatusCode::UNAUTHORIZED =>
            {
                TransportError::HandshakeRefused
            }
            other => TransportError::ConnectionFailed(other.to_string()),
        })?;

        let (write, read) = stream.split();
        *self.write.lock().await = Some(write);
        *self.read.lock().await = Some(read);
        self.connected.store(true, Ordering::Release);

        tracing::debug!("websocket connected to {address}");
        Ok(())
    }

    async fn send(&self, frame: &str) -> Result<(), TransportError> {
        let mut guard = self.write.lock().await;
        let sink = guard.as_mut().ok_or(TransportError::NotConnected)?;

        sink.send(Message::Text(frame.to_string()))
            .await
            .map_err(|e| {
                self.connected.store(false, Ordering::Release);
                TransportError::SendFailed(e.to_string())
            })
    }

    async fn recv(&self) -> Result<String, TransportError> {
        let mut guard = self.read.lock().await;
        let stream = guard.as_mut().ok_or(TransportError::NotConnected)?;

        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(text),
                Some(Ok(Message::Close(_))) | None => {
                    self.connected.store(false, Ordering::Release);
                    return Err(TransportError::ConnectionClosed);
                }
                Some(Ok(_)) => continue, // ping/pong/binary
                Some(Err(e)) => {
                    self.connected.store(false, Ordering::Release);
                    return Err(TransportError::ReceiveFailed(e.to_string()));
                }
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    async fn close(&self) -> Result<(), TransportError> {
        if let Some(mut sink) = self.write.lock().await.take() {
            let _ = sink.send(Message::Close(None)).await;
        }
        *self.read.lock().await = None;
        self.connected.store(false, Ordering::Release);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_appended_as_query() {
        assert_eq!(
            WsTransport::url_with_token("ws://relay/ws", "abc.def"),
            "ws://relay/ws?token=abc.def"
        );
        assert_eq!(
            WsTransport::url_with_token("ws://relay/ws?v=1", "abc"),
            "ws://relay/ws?v=1&token=abc"
        );
    }

    #[tokio::test]
    async fn send_before_connect_fails() {
        let transport = WsTransport::new();
        assert!(!transport.is_connected());
        assert!(matches!(
            transport.send("{}").await,
            Err(TransportError::NotConnected)
        ));
        assert!(matches!(
            transport.recv().await,
            Err(TransportError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn close_is_idempotent_when_disconnected() {
        let transport = WsTransport::new();
        transport.close().await.unwrap();
        transport.close().await.unwrap();
        assert!(!transport.is_connected());
    }
}
