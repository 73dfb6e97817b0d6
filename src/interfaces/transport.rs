use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::domains::envelope::Envelope;
use crate::error::Result;
use crate::services::framing::EnvelopeFramer;

pub trait AsyncReadWrite: AsyncRead + AsyncWrite {}

impl<T> AsyncReadWrite for T where T: AsyncRead + AsyncWrite {}

pub type BoxedStream = Box<dyn AsyncReadWrite + Unpin + Send>;

/// A connection that carries whole envelopes.
#[async_trait]
pub trait EnvelopeTransport: Send {
    async fn send(&mut self, envelope: &Envelope) -> Result<()>;

    /// `None` once the peer has closed the stream.
    async fn recv(&mut self) -> Result<Option<Envelope>>;
}

pub struct FramedEnvelopeStream<S> {
    stream: S,
    framer: EnvelopeFramer,
}

impl<S> FramedEnvelopeStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S, framer: EnvelopeFramer) -> Self {
        Self { stream, framer }
    }

    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl FramedEnvelopeStream<BoxedStream> {
    pub fn boxed<S>(stream: S, framer: EnvelopeFramer) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        Self::new(Box::new(stream), framer)
    }
}

#[async_trait]
impl<S> EnvelopeTransport for FramedEnvelopeStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn send(&mut self, envelope: &Envelope) -> Result<()> {
        self.framer.write_envelope(&mut self.stream, envelope).await
    }

    async fn recv(&mut self) -> Result<Option<Envelope>> {
        self.framer.read_envelope(&mut self.stream).await
    }
}
