//! Wire protocol: one JSON object per text frame, keyed by the variant name.
//!
//! Both directions use serde's externally tagged enum representation, e.g.
//! `{"Join": {"room": "abc"}}` or `{"Invoice": {"id": "inv-1"}}`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ClientError, DecodeError};

/// Top-level keys of every inbound variant.
const INBOUND_KEYS: [&str; 4] = ["AssignedUsername", "ServerMessage", "Invoice", "UpdateViewers"];

/// Commands sent from the client to the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutboundCommand {
    /// Subscribe to a room's chat; sent immediately after the transport opens
    Join { room: String },
    /// Ask the server for a payment invoice that boosts `message`
    GetInvoice { amount: u64, message: String },
    /// Plain chat message
    ClientMessage { message: String },
}

/// Events received from the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InboundMessage {
    /// The server picked a username for this connection
    AssignedUsername { username: String },
    /// A chat line, optionally boosted by a donation
    ServerMessage {
        from: String,
        message: String,
        #[serde(default)]
        extra: Option<DonationPayload>,
    },
    /// Response to the outstanding `GetInvoice`
    Invoice { id: String },
    /// Current number of viewers in the room
    UpdateViewers { viewers: u64 },
}

/// Donation attached to a chat line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonationPayload {
    pub amount: u64,
    /// Indicator lifetime in seconds
    pub duration: u64,
}

/// Encoder/decoder for text frames
pub struct MessageCodec;

impl MessageCodec {
    /// Serialize an outbound command into a text frame
    pub fn encode(command: &OutboundCommand) -> Result<String, ClientError> {
        Ok(serde_json::to_string(command)?)
    }

    /// Parse a text frame into exactly one inbound message
    ///
    /// # Returns
    ///
    /// The variant is picked by the first recognized top-level key.
    ///
    /// * `Err(DecodeError::Unrecognized)` - the frame is a JSON object with no known key
    /// * `Err(DecodeError::Malformed)` - anything else that fails to parse
    pub fn decode(frame: &str) -> Result<InboundMessage, DecodeError> {
        let value: Value = serde_json::from_str(frame).map_err(DecodeError::Malformed)?;

        let mut fields = match value {
            Value::Object(fields) => fields,
            other => return serde_json::from_value(other).map_err(DecodeError::Malformed),
        };

        let Some(key) = INBOUND_KEYS
            .iter()
            .copied()
            .find(|key| fields.contains_key(*key))
        else {
            return Err(DecodeError::Unrecognized(fields.keys().cloned().collect()));
        };

        // Other top-level keys travel alongside the variant and are ignored.
        let body = fields.remove(key).unwrap_or_default();
        let variant = Map::from_iter([(key.to_string(), body)]);
        serde_json::from_value(Value::Object(variant)).map_err(DecodeError::Malformed)
    }
}
