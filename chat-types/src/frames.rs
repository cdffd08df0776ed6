//! Real-time channel frames.
//!
//! JSON text frames exchanged over the authenticated WebSocket, tagged by a
//! `type` field. Client-originated frames are [`ClientFrame`]; everything the
//! server pushes is a [`ServerFrame`].

use serde::{Deserialize, Serialize};

use crate::{DeliverEvent, SendRequest, WireError};

/// Frames a client may send on the real-time channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientFrame {
    /// Ask the relay to forward an envelope.
    Send(SendRequest),
}

impl ClientFrame {
    /// Serialize to a JSON text frame.
    pub fn to_json(&self) -> Result<String, WireError> {
        serde_json::to_string(self).map_err(WireError::Serialization)
    }

    /// Parse a JSON text frame.
    pub fn from_json(text: &str) -> Result<Self, WireError> {
        serde_json::from_str(text).map_err(WireError::Deserialization)
    }
}

/// Outcome of a relay send, reported back to the caller.
///
/// `RecipientOffline` is a normal outcome, not an error: the caller decides
/// whether to fall back to persisted history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeliveryStatus {
    /// The envelope was handed off to the recipient's live connection.
    Delivered,
    /// No live connection is registered for the recipient.
    RecipientOffline,
}

/// Server response to a [`ClientFrame::Send`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendOutcome {
    /// What happened to the envelope.
    pub status: DeliveryStatus,
}

/// Server-reported error on the real-time channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorFrame {
    /// Error class, e.g. `"validation"` or `"rateLimited"`.
    pub kind: String,
    /// Human-readable reason. Never contains payload bytes.
    pub reason: String,
}

/// Frames the server may push on the real-time channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerFrame {
    /// An envelope addressed to this connection's identity.
    Deliver(DeliverEvent),
    /// Outcome of the caller's most recent send.
    SendResult(SendOutcome),
    /// A request was rejected; the channel stays open.
    Error(ErrorFrame),
    /// This connection was superseded by a newer one for the same identity.
    Evicted,
}

impl ServerFrame {
    /// Serialize to a JSON text frame.
    pub fn to_json(&self) -> Result<String, WireError> {
        serde_json::to_string(self).map_err(WireError::Serialization)
    }

    /// Parse a JSON text frame.
    pub fn from_json(text: &str) -> Result<Self, WireError> {
        serde_json::from_str(text).map_err(WireError::Deserialization)
    }
}
