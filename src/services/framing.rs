use std::io::ErrorKind;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use crate::domains::envelope::Envelope;
use crate::error::{EnvelopeError, Result};

pub const DEFAULT_MAX_FRAME_SIZE: usize = 3 * 1024 * 1024;
const LENGTH_PREFIX: usize = 4;

/// Reads and writes envelopes as `u32` big-endian length-prefixed frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvelopeFramer {
    max_frame_size: usize,
}

impl Default for EnvelopeFramer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_SIZE)
    }
}

impl EnvelopeFramer {
    pub fn new(max_frame_size: usize) -> Self {
        Self {
            max_frame_size: max_frame_size.min(u32::MAX as usize),
        }
    }

    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    fn check_size(&self, size: usize) -> Result<()> {
        if size > self.max_frame_size {
            warn!(size, max = self.max_frame_size, "rejecting oversized envelope frame");
            return Err(EnvelopeError::FrameTooLarge {
                size,
                max: self.max_frame_size,
            });
        }
        Ok(())
    }

    pub async fn write_envelope<W>(&self, writer: &mut W, envelope: &Envelope) -> Result<()>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let size = envelope.encoded_len();
        self.check_size(size)?;

        let mut frame = Vec::with_capacity(LENGTH_PREFIX + size);
        frame.extend_from_slice(&(size as u32).to_be_bytes());
        envelope.encode_to(&mut frame);
        writer.write_all(&frame).await?;
        writer.flush().await?;
        debug!(size, to = %envelope.to, "wrote envelope frame");
        Ok(())
    }

    /// Returns `None` when the stream ends cleanly between frames.
    pub async fn read_envelope<R>(&self, reader: &mut R) -> Result<Option<Envelope>>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let mut prefix = [0u8; LENGTH_PREFIX];
        let first = reader.read(&mut prefix).await?;
        if first == 0 {
            return Ok(None);
        }
        if first < LENGTH_PREFIX {
            reader
                .read_exact(&mut prefix[first..])
                .await
                .map_err(|e| truncated("length prefix", e))?;
        }

        let size = u32::from_be_bytes(prefix) as usize;
        self.check_size(size)?;

        let mut body = vec![0u8; size];
        reader
            .read_exact(&mut body)
            .await
            .map_err(|e| truncated("envelope body", e))?;
        let envelope = Envelope::decode(&body)?;
        debug!(size, sender = %envelope.sender, "read envelope frame");
        Ok(Some(envelope))
    }
}

fn truncated(part: &str, err: std::io::Error) -> EnvelopeError {
    if err.kind() == ErrorKind::UnexpectedEof {
        EnvelopeError::Io(format!("stream ended inside {part}"))
    } else {
        err.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cap_is_limited_to_prefix_range() {
        let framer = EnvelopeFramer::new(usize::MAX);
        assert_eq!(framer.max_frame_size(), u32::MAX as usize);
        assert_eq!(
            EnvelopeFramer::default().max_frame_size(),
            DEFAULT_MAX_FRAME_SIZE
        );
    }

    #[tokio::test]
    async fn frame_layout_is_prefix_then_body() {
        let envelope = Envelope::new("b", "a", "p", vec![9]);
        let mut out = Vec::new();
        EnvelopeFramer::default()
            .write_envelope(&mut out, &envelope)
            .await
            .unwrap();
        let body = envelope.encode();
        assert_eq!(&out[..4], &(body.len() as u32).to_be_bytes());
        assert_eq!(&out[4..], body.as_slice());
    }
}
