//! # sealchat-client
//!
//! The client side of sealchat. This crate owns everything the relay must
//! never be able to do:
//! - seal plaintext for a recipient before it touches the wire
//! - open received envelopes with a vault-unlocked private key
//! - the two-phase unlock flow ([`PendingUnlock`] → [`PrivateKeyHandle`])
//!
//! # Architecture
//!
//! ```text
//! Application → ChatClient → Transport  → relay (WebSocket)
//!                   │      → DirectoryApi → key directory / history (HTTP)
//!                   ↓
//!             chat-crypto (seal/open, vault)
//! ```
//!
//! Both seams are traits with mock implementations, so the full send/receive
//! path is testable without a network.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod api;
mod client;
mod error;
pub mod transport;
mod unlock;

pub use api::{ApiError, DirectoryApi, HttpDirectoryApi, MockDirectoryApi};
pub use client::ChatClient;
pub use error::ClientError;
pub use transport::{MockTransport, Transport, TransportError, WsTransport};
pub use unlock::{PendingUnlock, PrivateKeyHandle};
