use thiserror::Error;

/// Why a byte sequence could not be read as an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Malformed {
    #[error("truncated varint")]
    TruncatedVarint,
    #[error("varint exceeds 10 bytes")]
    VarintOverflow,
    #[error("invalid field number {0}")]
    InvalidFieldNumber(u64),
    #[error("invalid wire type {0}")]
    InvalidWireType(u8),
    #[error("field {field} has wire type {wire_type}, expected length-delimited")]
    WireTypeMismatch { field: u32, wire_type: u8 },
    #[error("length {need} exceeds remaining {have} bytes")]
    TruncatedValue { need: u64, have: usize },
    #[error("end group for field {0} without matching start")]
    UnexpectedEndGroup(u32),
    #[error("unknown field {field} could not be skipped: {reason}")]
    UnreadableField { field: u32, reason: String },
    #[error("field {0} is not valid utf-8")]
    InvalidUtf8(u32),
}

#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(#[from] Malformed),
    #[error("invalid protocol id: {0}")]
    InvalidProtocolId(String),
    #[error("frame of {size} bytes exceeds limit of {max}")]
    FrameTooLarge { size: usize, max: usize },
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("io error: {0}")]
    Io(String),
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<std::io::Error> for EnvelopeError {
    fn from(err: std::io::Error) -> Self {
        EnvelopeError::Io(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EnvelopeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_reason() {
        let err = EnvelopeError::from(Malformed::TruncatedValue { need: 9, have: 2 });
        assert_eq!(
            format!("{err}"),
            "malformed envelope: length 9 exceeds remaining 2 bytes"
        );
        let err = EnvelopeError::FrameTooLarge { size: 10, max: 4 };
        assert!(format!("{err}").contains("exceeds limit of 4"));
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "early eof");
        let err: EnvelopeError = io.into();
        assert!(matches!(err, EnvelopeError::Io(msg) if msg.contains("early eof")));
    }
}
