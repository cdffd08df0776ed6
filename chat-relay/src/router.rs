//! The relay router: validate, attribute, forward.
//!
//! The router is the trust boundary for sender attribution: whatever a
//! client might claim, `from` is always the authenticated session identity.
//! It is also a blind forwarder - it checks the SHAPE of an envelope
//! (lengths, algorithm tag, size cap) and never looks inside `ciphertext`
//! or `wrapped_key`.
//!
//! Forwarding is fire-and-forget: `relay` returns as soon as the envelope is
//! on the recipient's outbound queue. It never awaits, so a slow recipient
//! cannot stall a sender, and no registry lock is held during the handoff.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use chrono::Utc;

use chat_types::{
    CipherSuite, DeliverEvent, DeliveryStatus, Identity, SendRequest, ServerFrame, NONCE_LEN,
    WRAPPED_KEY_LEN,
};

use crate::error::ValidationError;
use crate::registry::ConnectionRegistry;
use crate::server::RelayMetrics;

/// Routes validated envelopes to the addressed identity's live connection.
pub struct RelayRouter {
    registry: Arc<ConnectionRegistry>,
    metrics: Arc<RelayMetrics>,
    max_payload_bytes: usize,
}

impl RelayRouter {
    /// Create a router over a registry.
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        metrics: Arc<RelayMetrics>,
        max_payload_bytes: usize,
    ) -> Self {
        Self {
            registry,
            metrics,
            max_payload_bytes,
        }
    }

    /// Relay one envelope on behalf of an authenticated sender.
    ///
    /// `RecipientOffline` is a NORMAL outcome, not an error; whether to fall
    /// back to persisted history is the caller's decision. Validation
    /// failures drop the request with zero side effects.
    pub fn relay(
        &self,
        sender: &Identity,
        request: SendRequest,
    ) -> Result<DeliveryStatus, ValidationError> {
        if let Err(e) = self.validate(&request) {
            self.metrics.validation_failures.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(user = %sender.id, error = %e, "dropped malformed relay request");
            return Err(e);
        }

        let to = request.to;
        let payload_len = request.ciphertext.len() as u64;

        // Sender attribution and timestamp are server-assigned here, at the
        // trust boundary. The request carries no `from` field at all.
        let event = DeliverEvent {
            from: sender.id,
            ciphertext: request.ciphertext,
            algorithm: request.algorithm,
            metadata: request.metadata,
            timestamp: Utc::now(),
        };

        let Some((_, outbound)) = self.registry.lookup_sender(&to) else {
            self.metrics.offline_total.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(to = %to, "recipient offline");
            return Ok(DeliveryStatus::RecipientOffline);
        };

        // A connection that closed between lookup and handoff, or one whose
        // queue is full, degrades to RecipientOffline rather than crashing
        // the in-flight relay.
        match outbound.try_send(ServerFrame::Deliver(event)) {
            Ok(()) => {
                self.metrics.delivered_total.fetch_add(1, Ordering::Relaxed);
                self.metrics
                    .bytes_relayed
                    .fetch_add(payload_len, Ordering::Relaxed);
                tracing::debug!(from = %sender.id, to = %to, bytes = payload_len, "forwarded envelope");
                Ok(DeliveryStatus::Delivered)
            }
            Err(_) => {
                self.metrics.offline_total.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(to = %to, "recipient unreachable at handoff");
                Ok(DeliveryStatus::RecipientOffline)
            }
        }
    }

    /// Shape-only validation. Never inspects ciphertext contents.
    fn validate(&self, request: &SendRequest) -> Result<(), ValidationError> {
        if request.ciphertext.is_empty() {
            return Err(ValidationError::EmptyField("ciphertext"));
        }

        if request.ciphertext.len() > self.max_payload_bytes {
            return Err(ValidationError::PayloadTooLarge {
                size: request.ciphertext.len(),
                limit: self.max_payload_bytes,
            });
        }

        if CipherSuite::parse(&request.algorithm).is_err() {
            return Err(ValidationError::UnsupportedAlgorithm(
                request.algorithm.clone(),
            ));
        }

        if request.metadata.iv.len() != NONCE_LEN {
            return Err(ValidationError::BadLength {
                field: "metadata.iv",
                expected: NONCE_LEN,
                actual: request.metadata.iv.len(),
            });
        }

        if request.metadata.wrapped_key.len() != WRAPPED_KEY_LEN {
            return Err(ValidationError::BadLength {
                field: "metadata.wrappedKey",
                expected: WRAPPED_KEY_LEN,
                actual: request.metadata.wrapped_key.len(),
            });
        }

        Ok(())
    }
}

impl std::fmt::Debug for RelayRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayRouter")
            .field("max_payload_bytes", &self.max_payload_bytes)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ConnectionHandle;
    use chat_types::{EnvelopeMetadata, UserId};
    use tokio::sync::mpsc;

    fn test_router() -> (RelayRouter, Arc<ConnectionRegistry>, Arc<RelayMetrics>) {
        let registry = Arc::new(ConnectionRegistry::new());
        let metrics = Arc::new(RelayMetrics::default());
        let router = RelayRouter::new(registry.clone(), metrics.clone(), 64 * 1024);
        (router, registry, metrics)
    }

    fn identity(name: &str) -> Identity {
        Identity::new(UserId::random(), name)
    }

    fn request_to(to: UserId) -> SendRequest {
        SendRequest {
            to,
            ciphertext: vec![0xAA; 32],
            algorithm: CipherSuite::X25519XChaCha20Poly1305.as_tag().to_string(),
            metadata: EnvelopeMetadata {
                iv: vec![0x01; NONCE_LEN],
                wrapped_key: vec![0x02; WRAPPED_KEY_LEN],
            },
        }
    }

    fn connect(
        registry: &ConnectionRegistry,
        identity: &Identity,
        depth: usize,
    ) -> mpsc::Receiver<ServerFrame> {
        let (tx, rx) = mpsc::channel(depth);
        registry.register(ConnectionHandle::new(identity.clone(), tx));
        rx
    }

    #[tokio::test]
    async fn relays_to_online_recipient_with_server_assigned_from() {
        let (router, registry, _) = test_router();
        let alice = identity("alice");
        let bob = identity("bob");
        let mut bob_rx = connect(&registry, &bob, 8);

        let status = router.relay(&alice, request_to(bob.id)).unwrap();
        assert_eq!(status, DeliveryStatus::Delivered);

        let frame = bob_rx.recv().await.unwrap();
        let ServerFrame::Deliver(event) = frame else {
            panic!("expected deliver frame");
        };
        assert_eq!(event.from, alice.id);
        assert_eq!(event.ciphertext, vec![0xAA; 32]);
    }

    #[test]
    fn offline_recipient_is_a_normal_outcome() {
        let (router, _, metrics) = test_router();
        let alice = identity("alice");

        let status = router.relay(&alice, request_to(UserId::random())).unwrap();
        assert_eq!(status, DeliveryStatus::RecipientOffline);
        assert_eq!(metrics.offline_total.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.delivered_total.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn closed_connection_degrades_to_offline() {
        let (router, registry, _) = test_router();
        let alice = identity("alice");
        let bob = identity("bob");

        // Bob's session task is gone but the registry entry lingers
        let rx = connect(&registry, &bob, 8);
        drop(rx);

        let status = router.relay(&alice, request_to(bob.id)).unwrap();
        assert_eq!(status, DeliveryStatus::RecipientOffline);
    }

    #[tokio::test]
    async fn full_queue_degrades_to_offline() {
        let (router, registry, _) = test_router();
        let alice = identity("alice");
        let bob = identity("bob");
        let _bob_rx = connect(&registry, &bob, 1);

        assert_eq!(
            router.relay(&alice, request_to(bob.id)).unwrap(),
            DeliveryStatus::Delivered
        );
        // Second send has nowhere to go until bob drains the queue
        assert_eq!(
            router.relay(&alice, request_to(bob.id)).unwrap(),
            DeliveryStatus::RecipientOffline
        );
    }

    #[tokio::test]
    async fn per_sender_order_is_preserved() {
        let (router, registry, _) = test_router();
        let alice = identity("alice");
        let bob = identity("bob");
        let mut bob_rx = connect(&registry, &bob, 16);

        for i in 0..5u8 {
            let mut request = request_to(bob.id);
            request.ciphertext = vec![i; 16];
            router.relay(&alice, request).unwrap();
        }

        for i in 0..5u8 {
            let ServerFrame::Deliver(event) = bob_rx.recv().await.unwrap() else {
                panic!("expected deliver frame");
            };
            assert_eq!(event.ciphertext, vec![i; 16]);
        }
    }

    #[test]
    fn empty_ciphertext_is_rejected() {
        let (router, _, metrics) = test_router();
        let mut request = request_to(UserId::random());
        request.ciphertext.clear();

        let err = router.relay(&identity("alice"), request).unwrap_err();
        assert!(matches!(err, ValidationError::EmptyField("ciphertext")));
        assert_eq!(metrics.validation_failures.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn unknown_algorithm_fails_closed() {
        let (router, _, _) = test_router();
        let mut request = request_to(UserId::random());
        request.algorithm = "rsa-oaep".to_string();

        let err = router.relay(&identity("alice"), request).unwrap_err();
        assert!(matches!(err, ValidationError::UnsupportedAlgorithm(_)));
    }

    #[test]
    fn wrong_nonce_length_is_rejected() {
        let (router, _, _) = test_router();
        let mut request = request_to(UserId::random());
        request.metadata.iv = vec![0; 12];

        let err = router.relay(&identity("alice"), request).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::BadLength {
                field: "metadata.iv",
                ..
            }
        ));
    }

    #[test]
    fn wrong_wrapped_key_length_is_rejected() {
        let (router, _, _) = test_router();
        let mut request = request_to(UserId::random());
        request.metadata.wrapped_key = vec![0; 32];

        let err = router.relay(&identity("alice"), request).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::BadLength {
                field: "metadata.wrappedKey",
                ..
            }
        ));
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let registry = Arc::new(ConnectionRegistry::new());
        let metrics = Arc::new(RelayMetrics::default());
        let router = RelayRouter::new(registry, metrics, 16);

        let request = request_to(UserId::random()); // 32-byte ciphertext
        let err = router.relay(&identity("alice"), request).unwrap_err();
        assert!(matches!(err, ValidationError::PayloadTooLarge { .. }));
    }

    #[tokio::test]
    async fn validation_failure_has_no_side_effects() {
        let (router, registry, metrics) = test_router();
        let alice = identity("alice");
        let bob = identity("bob");
        let mut bob_rx = connect(&registry, &bob, 8);

        let mut request = request_to(bob.id);
        request.algorithm = "des".to_string();
        assert!(router.relay(&alice, request).is_err());

        // Nothing was forwarded, nothing counted as delivered
        assert!(bob_rx.try_recv().is_err());
        assert_eq!(metrics.delivered_total.load(Ordering::Relaxed), 0);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn after_supersede_only_new_handle_receives() {
        let (router, registry, _) = test_router();
        let alice = identity("alice");
        let bob = identity("bob");

        let (tx1, mut rx1) = mpsc::channel(8);
        registry.register(ConnectionHandle::new(bob.clone(), tx1));
        let (tx2, mut rx2) = mpsc::channel(8);
        registry.register(ConnectionHandle::new(bob.clone(), tx2));

        router.relay(&alice, request_to(bob.id)).unwrap();

        assert!(rx1.try_recv().is_err());
        assert!(matches!(
            rx2.try_recv().unwrap(),
            ServerFrame::Deliver(_)
        ));
    }
}
