//! End-to-end relay scenarios: two authenticated clients exchanging sealed
//! envelopes through the router, with key custody and decryption happening
//! strictly at the endpoints.

use std::sync::Arc;

use tokio::sync::mpsc;

use chat_crypto::{open, seal, vault, KeyPair, PublicKey, SealedEnvelope, VaultParams};
use chat_types::{
    DeliveryStatus, Identity, LockedKeyBlob, SendRequest, ServerFrame, UserId,
};
use sealchat_relay::auth::TokenKeychain;
use sealchat_relay::config::Config;
use sealchat_relay::gateway::Session;
use sealchat_relay::registry::ConnectionHandle;
use sealchat_relay::server::ChatRelay;

const SECRET: &[u8] = b"relay-flow-test-secret";

fn setup() -> (Arc<ChatRelay>, TokenKeychain) {
    let relay = Arc::new(ChatRelay::new(
        Config::default(),
        Arc::new(TokenKeychain::new(SECRET, 3600)),
    ));
    (relay, TokenKeychain::new(SECRET, 3600))
}

/// Authenticate an identity through the gateway state machine and bind a
/// connection for it, returning the delivery queue a session task would own.
async fn connect(
    relay: &Arc<ChatRelay>,
    keychain: &TokenKeychain,
    identity: &Identity,
) -> mpsc::Receiver<ServerFrame> {
    let token = keychain.issue(identity);
    let mut session = Session::new(relay.clone());
    let verified = session
        .authenticate(Some(&token))
        .await
        .expect("token must verify");
    assert_eq!(verified.id, identity.id);

    let (tx, rx) = mpsc::channel(16);
    relay
        .registry()
        .register(ConnectionHandle::new(verified, tx));
    rx
}

fn send_request(to: UserId, envelope: &SealedEnvelope) -> SendRequest {
    SendRequest {
        to,
        ciphertext: envelope.ciphertext.clone(),
        algorithm: envelope.suite.as_tag().to_string(),
        metadata: envelope.metadata(),
    }
}

#[tokio::test]
async fn alice_sends_bob_reads() {
    let (relay, keychain) = setup();
    let alice = Identity::new(UserId::random(), "alice");
    let bob = Identity::new(UserId::random(), "bob");

    // Bob's key custody: key pair locked under his password, blob published
    // to the blind directory, public key fetchable by anyone authenticated.
    let bob_keys = KeyPair::generate();
    let vault_params = VaultParams::insecure_fast();
    let blob = vault::lock(
        &*bob_keys.secret().to_bytes(),
        "bobs password",
        "bob",
        &vault_params,
    )
    .unwrap();
    relay.directory().publish(
        bob.clone(),
        bob_keys.public().to_base64(),
        LockedKeyBlob {
            ciphertext: blob.ciphertext.clone(),
            iv: blob.iv.clone(),
        },
    );

    let _alice_rx = connect(&relay, &keychain, &alice).await;
    let mut bob_rx = connect(&relay, &keychain, &bob).await;

    // Alice: fetch bob's public key from the directory and seal locally
    let bob_public = PublicKey::from_base64(
        &relay.directory().public_key_of(&bob.id).unwrap(),
    )
    .unwrap();
    let envelope = seal(&bob_public, b"hi").unwrap();

    let status = relay
        .router()
        .relay(&alice, send_request(bob.id, &envelope))
        .unwrap();
    assert_eq!(status, DeliveryStatus::Delivered);

    // Bob receives an envelope attributed to alice by the relay
    let ServerFrame::Deliver(event) = bob_rx.recv().await.unwrap() else {
        panic!("expected deliver frame");
    };
    assert_eq!(event.from, alice.id);

    // Bob's side: fetch his own blob, unlock with his password, open
    let response = relay.directory().blob_of(&bob.id).unwrap();
    let key_bytes =
        vault::unlock(&response.blob(), "bobs password", &response.username, &vault_params)
            .unwrap();
    let unlocked = KeyPair::from_secret_bytes((*key_bytes).as_slice().try_into().unwrap());

    let received =
        SealedEnvelope::from_wire(&event.algorithm, &event.ciphertext, &event.metadata).unwrap();
    let plaintext = open(unlocked.secret(), &received).unwrap();
    assert_eq!(plaintext.as_slice(), b"hi");
}

#[tokio::test]
async fn sending_to_carol_who_never_connected_is_offline() {
    let (relay, keychain) = setup();
    let alice = Identity::new(UserId::random(), "alice");
    let carol = UserId::random();

    let mut alice_rx = connect(&relay, &keychain, &alice).await;

    let carol_keys = KeyPair::generate();
    let envelope = seal(carol_keys.public(), b"anyone home?").unwrap();

    let status = relay
        .router()
        .relay(&alice, send_request(carol, &envelope))
        .unwrap();
    assert_eq!(status, DeliveryStatus::RecipientOffline);

    // Nobody received anything, and the registry was not touched
    assert!(alice_rx.try_recv().is_err());
    assert_eq!(relay.total_connections(), 1);
}

#[tokio::test]
async fn expired_token_never_reaches_the_registry() {
    let (relay, keychain) = setup();
    let mallory = Identity::new(UserId::random(), "mallory");
    let token = keychain.issue_expired(&mallory);

    let mut session = Session::new(relay.clone());
    assert!(session.authenticate(Some(&token)).await.is_err());

    assert!(relay.registry().is_empty());
    assert_eq!(relay.total_connections(), 0);
}

#[tokio::test]
async fn reconnect_supersedes_and_only_new_connection_receives() {
    let (relay, keychain) = setup();
    let alice = Identity::new(UserId::random(), "alice");
    let bob = Identity::new(UserId::random(), "bob");

    let mut bob_first_rx = connect(&relay, &keychain, &bob).await;
    let mut bob_second_rx = connect(&relay, &keychain, &bob).await;

    // Still exactly one live entry for bob
    assert_eq!(relay.total_connections(), 1);

    let bob_keys = KeyPair::generate();
    let envelope = seal(bob_keys.public(), b"which session?").unwrap();
    let status = relay
        .router()
        .relay(&alice, send_request(bob.id, &envelope))
        .unwrap();
    assert_eq!(status, DeliveryStatus::Delivered);

    // Only the newer connection gets the envelope
    assert!(matches!(
        bob_second_rx.try_recv().unwrap(),
        ServerFrame::Deliver(_)
    ));
    assert!(bob_first_rx.try_recv().is_err());
}

#[tokio::test]
async fn wrong_password_cannot_unlock_and_cannot_read() {
    let (relay, _) = setup();
    let bob = Identity::new(UserId::random(), "bob");
    let vault_params = VaultParams::insecure_fast();

    let bob_keys = KeyPair::generate();
    let blob = vault::lock(
        &*bob_keys.secret().to_bytes(),
        "right password",
        "bob",
        &vault_params,
    )
    .unwrap();
    relay
        .directory()
        .publish(bob.clone(), bob_keys.public().to_base64(), blob);

    let response = relay.directory().blob_of(&bob.id).unwrap();
    let result = vault::unlock(
        &response.blob(),
        "wrong password",
        &response.username,
        &vault_params,
    );
    assert!(result.is_err(), "wrong password must never yield key material");
}
