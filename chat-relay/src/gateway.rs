//! The session gateway: authenticated WebSocket sessions.
//!
//! Per-connection state machine:
//!
//! ```text
//! Connecting → Authenticating → Authenticated → Closed
//!                    └──────────── Closed  (any verification failure)
//! ```
//!
//! The bearer token must accompany the HANDSHAKE (Authorization header or
//! `?token=` query); a missing or invalid token refuses the upgrade itself
//! with 401 - no WebSocket is established and the registry is never touched.
//! There is no retry at this layer: the client reconnects with a fresh
//! credential.
//!
//! One tokio task owns each authenticated session and is the only place its
//! socket and registry entry are torn down, so cleanup runs exactly once;
//! the registry's handle-id compare additionally makes a late teardown from
//! a superseded connection a no-op.

use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Extension, Query};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use chat_types::{ClientFrame, ErrorFrame, Identity, SendOutcome, ServerFrame};

use crate::error::AuthError;
use crate::registry::ConnectionHandle;
use crate::server::ChatRelay;

/// Session state machine states.
#[derive(Debug, Clone)]
pub enum SessionState {
    /// Connection arrived, credential not yet examined.
    Connecting,
    /// Credential handed to the token verifier.
    Authenticating,
    /// Verified and bound to an identity; the only state that may relay.
    Authenticated(Identity),
    /// Torn down. Terminal.
    Closed,
}

/// A per-connection session.
pub struct Session {
    relay: Arc<ChatRelay>,
    state: SessionState,
}

impl Session {
    /// Create a session for an incoming connection.
    pub fn new(relay: Arc<ChatRelay>) -> Self {
        Self {
            relay,
            state: SessionState::Connecting,
        }
    }

    /// Current state (for tests and logs).
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Drive `Connecting → Authenticating → Authenticated | Closed`.
    ///
    /// The verifier may block briefly on an external service; nothing here
    /// holds any registry state while it does. On failure the session is
    /// `Closed` with no registry mutation.
    pub async fn authenticate(&mut self, token: Option<&str>) -> Result<Identity, AuthError> {
        self.state = SessionState::Authenticating;

        let token = match token {
            Some(token) => token,
            None => {
                self.refuse();
                return Err(AuthError::MissingCredential);
            }
        };

        match self.relay.verifier().verify(token).await {
            Ok(identity) => {
                self.state = SessionState::Authenticated(identity.clone());
                Ok(identity)
            }
            Err(e) => {
                self.refuse();
                Err(e)
            }
        }
    }

    fn refuse(&mut self) {
        self.state = SessionState::Closed;
        self.relay.metrics().auth_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Run an authenticated session to completion.
    pub async fn run(mut self, socket: WebSocket) {
        let identity = match &self.state {
            SessionState::Authenticated(identity) => identity.clone(),
            _ => {
                tracing::debug!("refusing to run unauthenticated session");
                return;
            }
        };

        let queue_depth = self.relay.config().limits.outbound_queue_depth;
        let (outbound_tx, mut outbound_rx) = mpsc::channel(queue_depth);
        let handle = ConnectionHandle::new(identity.clone(), outbound_tx);
        let handle_id = handle.handle_id();

        // A new connection for the same identity supersedes the old one.
        // Nudge the orphaned session to shut down; if it is already gone the
        // send just fails.
        if let Some(old) = self.relay.registry().register(handle) {
            let _ = old.try_deliver(ServerFrame::Evicted);
            tracing::info!(user = %identity.id, "superseded previous connection");
        }

        self.relay
            .metrics()
            .connections_total
            .fetch_add(1, Ordering::Relaxed);
        tracing::info!(user = %identity.id, name = %identity.display_name, "session established");

        let (mut ws_tx, mut ws_rx) = socket.split();

        loop {
            tokio::select! {
                outbound = outbound_rx.recv() => match outbound {
                    Some(frame) => {
                        let evicting = matches!(frame, ServerFrame::Evicted);
                        match frame.to_json() {
                            Ok(text) => {
                                if ws_tx.send(Message::Text(text)).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => tracing::error!("failed to encode outbound frame: {e}"),
                        }
                        if evicting {
                            break;
                        }
                    }
                    None => break,
                },
                inbound = ws_rx.next() => match inbound {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(reply) = self.handle_text(&identity, &text) {
                            match reply.to_json() {
                                Ok(reply_text) => {
                                    if ws_tx.send(Message::Text(reply_text)).await.is_err() {
                                        break;
                                    }
                                }
                                Err(e) => tracing::error!("failed to encode reply frame: {e}"),
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {} // ping/pong handled by axum; binary ignored
                    Some(Err(e)) => {
                        tracing::debug!(user = %identity.id, "websocket error: {e}");
                        break;
                    }
                }
            }
        }

        // Idempotent teardown: the handle-id compare means a teardown racing
        // a supersede can never evict the newer connection.
        self.state = SessionState::Closed;
        self.relay.registry().remove(&identity.id, handle_id);
        tracing::info!(user = %identity.id, "session closed");
    }

    /// Handle one inbound text frame. Returns the reply frame, if any.
    ///
    /// Only `Authenticated` sessions ever reach this point; the relay call
    /// itself is synchronous (fire-and-forget handoff), so inbound frames
    /// from one sender are processed strictly in arrival order.
    fn handle_text(&self, identity: &Identity, text: &str) -> Option<ServerFrame> {
        let frame = match ClientFrame::from_json(text) {
            Ok(frame) => frame,
            Err(e) => {
                self.relay
                    .metrics()
                    .validation_failures
                    .fetch_add(1, Ordering::Relaxed);
                tracing::debug!(user = %identity.id, "unparseable frame: {e}");
                return Some(ServerFrame::Error(ErrorFrame {
                    kind: "validation".to_string(),
                    reason: e.to_string(),
                }));
            }
        };

        match frame {
            ClientFrame::Send(request) => {
                let limits = self.relay.rate_limits();
                if let Err(e) = limits.check_global().and_then(|()| limits.check_message(&identity.id)) {
                    self.relay
                        .metrics()
                        .rate_limit_hits
                        .fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(user = %identity.id, "send rate limited: {e}");
                    return Some(ServerFrame::Error(ErrorFrame {
                        kind: "rateLimited".to_string(),
                        reason: e.to_string(),
                    }));
                }

                match self.relay.router().relay(identity, request) {
                    Ok(status) => Some(ServerFrame::SendResult(SendOutcome { status })),
                    Err(e) => Some(ServerFrame::Error(ErrorFrame {
                        kind: "validation".to_string(),
                        reason: e.to_string(),
                    })),
                }
            }
        }
    }
}

/// Extract the bearer token from the upgrade request.
///
/// `Authorization: Bearer` wins; browser clients that cannot set headers on
/// a WebSocket use `?token=`.
fn token_from_request(headers: &HeaderMap, query: &HashMap<String, String>) -> Option<String> {
    if let Some(value) = headers.get(axum::http::header::AUTHORIZATION) {
        if let Ok(value) = value.to_str() {
            if let Some(token) = value.strip_prefix("Bearer ") {
                return Some(token.to_string());
            }
        }
    }
    query.get("token").cloned()
}

/// `GET /ws` - the real-time channel handshake.
///
/// The handshake itself is rejected on a missing/invalid token; rate-limited
/// identities are refused with 429 before any registry mutation.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Extension(relay): Extension<Arc<ChatRelay>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let mut session = Session::new(relay.clone());
    let token = token_from_request(&headers, &query);

    let identity = match session.authenticate(token.as_deref()).await {
        Ok(identity) => identity,
        Err(e) => {
            tracing::warn!("refused handshake: {e}");
            return (StatusCode::UNAUTHORIZED, "authentication error").into_response();
        }
    };

    if relay.rate_limits().check_connection(&identity.id).is_err() {
        relay.metrics().rate_limit_hits.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(user = %identity.id, "connection rate limited");
        return (StatusCode::TOO_MANY_REQUESTS, "rate limited").into_response();
    }

    ws.on_upgrade(move |socket| session.run(socket))
}
