//! The client session.
//!
//! [`ChatClient`] ties the pieces together: seal locally against the
//! recipient's directory key, send over the authenticated channel, surface
//! the relay's outcome, and let the application decide what to do about an
//! offline recipient.

use std::collections::VecDeque;
use std::sync::Mutex;

use chat_crypto::{seal, vault, KeyPair, PublicKey, VaultParams};
use chat_types::{
    ClientFrame, DeliverEvent, DeliveryStatus, HistoryAppendRequest, PublishKeysRequest,
    SendRequest, ServerFrame, StoredMessage, UserId,
};

use crate::api::DirectoryApi;
use crate::transport::Transport;
use crate::unlock::PendingUnlock;
use crate::ClientError;

/// A sealchat client session.
///
/// Generic over its two seams so the whole send/receive path runs against
/// mocks in tests.
pub struct ChatClient<T: Transport, A: DirectoryApi> {
    transport: T,
    api: A,
    relay_address: String,
    token: String,
    /// Deliver events that arrived while we were waiting for a send outcome.
    pending: Mutex<VecDeque<DeliverEvent>>,
}

impl<T: Transport, A: DirectoryApi> ChatClient<T, A> {
    /// Create a client for a relay address and bearer token.
    pub fn new(
        transport: T,
        api: A,
        relay_address: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            api,
            relay_address: relay_address.into(),
            token: token.into(),
            pending: Mutex::new(VecDeque::new()),
        }
    }

    /// Establish the real-time channel. The token authenticates the
    /// handshake itself; a bad token never produces a half-open session.
    pub async fn connect(&self) -> Result<(), ClientError> {
        self.transport
            .connect(&self.relay_address, &self.token)
            .await?;
        Ok(())
    }

    /// Whether the real-time channel is up.
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Lock a key pair under the account password and publish it.
    ///
    /// The server receives the public key in the clear and the private key
    /// only as an opaque blob.
    pub async fn publish_keys(
        &self,
        keys: &KeyPair,
        password: &str,
        username: &str,
        params: &VaultParams,
    ) -> Result<(), ClientError> {
        let blob = vault::lock(&*keys.secret().to_bytes(), password, username, params)?;
        self.api
            .publish_keys(&PublishKeysRequest {
                public_key: keys.public().to_base64(),
                private_key_blob: blob,
            })
            .await?;
        Ok(())
    }

    /// Phase one of the unlock flow: fetch the caller's blob and salt.
    ///
    /// Collecting the password and calling
    /// [`PendingUnlock::complete`] is the application's business.
    pub async fn request_unlock(&self) -> Result<PendingUnlock, ClientError> {
        let response = self.api.fetch_private_key_blob().await?;
        let salt = response.username.clone();
        Ok(PendingUnlock::new(response.blob(), salt))
    }

    /// Seal `plaintext` for `to` and relay it, returning the relay's
    /// outcome.
    ///
    /// [`DeliveryStatus::RecipientOffline`] is a normal result - deciding
    /// whether to fall back to persisted history belongs to the caller (or
    /// use [`ChatClient::send_or_store`]). The sealed plaintext is never
    /// round-tripped through `open` on this side.
    pub async fn send_message(
        &self,
        to: &UserId,
        plaintext: &[u8],
    ) -> Result<DeliveryStatus, ClientError> {
        let request = self.seal_for(to, plaintext).await?;
        self.relay_request(request).await
    }

    /// Like [`ChatClient::send_message`], but on `RecipientOffline` appends
    /// the same envelope to persisted history so the recipient finds it
    /// later.
    pub async fn send_or_store(
        &self,
        to: &UserId,
        plaintext: &[u8],
    ) -> Result<DeliveryStatus, ClientError> {
        let request = self.seal_for(to, plaintext).await?;
        let fallback = HistoryAppendRequest {
            to: request.to,
            ciphertext: request.ciphertext.clone(),
            algorithm: request.algorithm.clone(),
            metadata: request.metadata.clone(),
        };

        let status = self.relay_request(request).await?;
        if status == DeliveryStatus::RecipientOffline {
            tracing::debug!(to = %to, "recipient offline, storing to history");
            self.api.append_history(&fallback).await?;
        }
        Ok(status)
    }

    /// The next envelope addressed to this session.
    ///
    /// Buffered events (received while waiting for a send outcome) drain
    /// first.
    pub async fn next_event(&self) -> Result<DeliverEvent, ClientError> {
        if let Some(event) = self.pending.lock().unwrap().pop_front() {
            return Ok(event);
        }

        loop {
            match self.next_server_frame().await? {
                ServerFrame::Deliver(event) => return Ok(event),
                // A late ack nobody is waiting on
                ServerFrame::SendResult(_) => continue,
                ServerFrame::Error(error) => {
                    return Err(ClientError::Rejected {
                        kind: error.kind,
                        reason: error.reason,
                    })
                }
                ServerFrame::Evicted => return Err(ClientError::Evicted),
            }
        }
    }

    /// Fetch the persisted conversation with one other participant.
    pub async fn history_with(&self, other: &UserId) -> Result<Vec<StoredMessage>, ClientError> {
        Ok(self.api.history_with(other).await?)
    }

    /// Close the real-time channel.
    pub async fn close(&self) -> Result<(), ClientError> {
        self.transport.close().await?;
        Ok(())
    }

    /// Fetch the recipient's directory key and seal locally.
    async fn seal_for(&self, to: &UserId, plaintext: &[u8]) -> Result<SendRequest, ClientError> {
        let key_b64 = self.api.fetch_public_key(to).await?;
        let recipient = PublicKey::from_base64(&key_b64)?;
        let envelope = seal(&recipient, plaintext)?;

        Ok(SendRequest {
            to: *to,
            ciphertext: envelope.ciphertext,
            algorithm: envelope.suite.as_tag().to_string(),
            metadata: chat_types::EnvelopeMetadata {
                iv: envelope.nonce.to_vec(),
                wrapped_key: envelope.wrapped_key,
            },
        })
    }

    /// Send one request and wait for its outcome, buffering any deliver
    /// events that arrive in between.
    async fn relay_request(&self, request: SendRequest) -> Result<DeliveryStatus, ClientError> {
        let frame = ClientFrame::Send(request);
        self.transport.send(&frame.to_json()?).await?;

        loop {
            match self.next_server_frame().await? {
                ServerFrame::SendResult(outcome) => return Ok(outcome.status),
                ServerFrame::Deliver(event) => {
                    self.pending.lock().unwrap().push_back(event);
                }
                ServerFrame::Error(error) => {
                    return Err(ClientError::Rejected {
                        kind: error.kind,
                        reason: error.reason,
                    })
                }
                ServerFrame::Evicted => return Err(ClientError::Evicted),
            }
        }
    }

    async fn next_server_frame(&self) -> Result<ServerFrame, ClientError> {
        let text = self.transport.recv().await?;
        Ok(ServerFrame::from_json(&text)?)
    }
}

impl<T: Transport, A: DirectoryApi> std::fmt::Debug for ChatClient<T, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatClient")
            .field("relay_address", &self.relay_address)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}
