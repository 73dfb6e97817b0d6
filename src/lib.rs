pub mod codec;
pub mod config;
pub mod domains;
pub mod error;
pub mod interfaces;
pub mod services;

pub use crate::config::Config;
pub use crate::domains::envelope::Envelope;
pub use crate::domains::protocol_id::ProtocolId;
pub use crate::error::{EnvelopeError, Malformed, Result};
pub use crate::interfaces::transport::{EnvelopeTransport, FramedEnvelopeStream};
pub use crate::services::framing::EnvelopeFramer;
