//! # sealchat-relay
//!
//! Blind-forwarding relay server for sealchat.
//!
//! This crate implements a relay server that:
//! - Authenticates every WebSocket handshake with a bearer token
//! - Maps each stable user identity to at most one live connection
//! - Forwards opaque ciphertext envelopes between exactly two parties
//! - Never sees plaintext (the relay is a blind forwarder)
//!
//! ## Architecture
//!
//! ```text
//! Client A ──┐                      ┌── Client B
//!            │   WebSocket + token  │
//!            ├─────────────────────►│
//!            │                      │
//!        ┌───┴──────────────────────┴───┐
//!        │        sealchat-relay        │
//!        │  gateway → router → registry │
//!        │  (identity → live handle)    │
//!        └──────────────────────────────┘
//! ```
//!
//! The gateway owns the per-connection state machine
//! (`Connecting → Authenticating → Authenticated → Closed`); the router
//! validates envelope shape, stamps the authenticated sender and a server
//! timestamp, and hands the envelope to the recipient's outbound queue.
//! Presence is process-local: a restart empties the registry and every
//! client re-authenticates.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod auth;
pub mod config;
pub mod directory;
pub mod error;
pub mod gateway;
pub mod history;
pub mod housekeeping;
pub mod http;
pub mod limits;
pub mod registry;
pub mod router;
pub mod server;
