use std::fmt;

use bytes::BufMut;
use serde::{Deserialize, Serialize};

use crate::codec;
use crate::domains::protocol_id::ProtocolId;
use crate::error::Result;

/// A routed message exchanged between agents.
///
/// Every field may be empty; empty fields are not written to the wire and
/// read back as empty. `message` is opaque and only interpreted by the
/// handler registered for `protocol_id`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Envelope {
    pub to: String,
    pub sender: String,
    pub protocol_id: String,
    #[serde(with = "base64_bytes")]
    pub message: Vec<u8>,
    pub uri: String,
    /// Raw records of tags this version does not know, in arrival order.
    #[serde(skip)]
    pub unknown_fields: Vec<u8>,
}

impl Envelope {
    pub fn new(
        to: impl Into<String>,
        sender: impl Into<String>,
        protocol_id: impl Into<String>,
        message: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            to: to.into(),
            sender: sender.into(),
            protocol_id: protocol_id.into(),
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn with_to(mut self, to: impl Into<String>) -> Self {
        self.to = to.into();
        self
    }

    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = sender.into();
        self
    }

    pub fn with_protocol_id(mut self, protocol_id: impl Into<String>) -> Self {
        self.protocol_id = protocol_id.into();
        self
    }

    pub fn with_message(mut self, message: impl Into<Vec<u8>>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = uri.into();
        self
    }

    pub fn to(&self) -> &str {
        &self.to
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn protocol_id(&self) -> &str {
        &self.protocol_id
    }

    pub fn message(&self) -> &[u8] {
        &self.message
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn unknown_fields(&self) -> &[u8] {
        &self.unknown_fields
    }

    /// Parses `protocol_id` as `author/name:version`.
    pub fn parsed_protocol_id(&self) -> Result<ProtocolId> {
        self.protocol_id.parse()
    }

    pub fn encoded_len(&self) -> usize {
        codec::encoded_len(self)
    }

    pub fn encode_to(&self, buf: &mut impl BufMut) {
        codec::encode(self, buf);
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        self.encode_to(&mut buf);
        buf
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(codec::decode(bytes)?)
    }
}

impl fmt::Display for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Envelope(to={}, sender={}, protocol_id={}, message={} bytes, uri={})",
            self.to,
            self.sender,
            self.protocol_id,
            self.message.len(),
            self.uri
        )
    }
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        BASE64
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
