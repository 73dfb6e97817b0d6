//! Tag-length-value encoding of [`Envelope`] values on top of `prost::encoding`.
//!
//! Known fields are all length-delimited and written in ascending tag order,
//! skipping empty values. Records carrying any other tag are kept on decode
//! and appended after the known fields on encode.

use bytes::{Buf, BufMut};
use prost::encoding::{self, DecodeContext, WireType};
use prost::{DecodeError, Message};
use tracing::trace;

use crate::domains::envelope::Envelope;
use crate::error::Malformed;

pub const TAG_TO: u32 = 1;
pub const TAG_SENDER: u32 = 2;
pub const TAG_PROTOCOL_ID: u32 = 3;
pub const TAG_MESSAGE: u32 = 4;
pub const TAG_URI: u32 = 5;

const MAX_VARINT_LEN: usize = 10;

pub fn encoded_len(envelope: &Envelope) -> usize {
    let mut len = envelope.unknown_fields.len();
    for (tag, text) in [
        (TAG_TO, &envelope.to),
        (TAG_SENDER, &envelope.sender),
        (TAG_PROTOCOL_ID, &envelope.protocol_id),
    ] {
        if !text.is_empty() {
            len += encoding::string::encoded_len(tag, text);
        }
    }
    if !envelope.message.is_empty() {
        len += encoding::bytes::encoded_len(TAG_MESSAGE, &envelope.message);
    }
    if !envelope.uri.is_empty() {
        len += encoding::string::encoded_len(TAG_URI, &envelope.uri);
    }
    len
}

pub fn encode(envelope: &Envelope, buf: &mut impl BufMut) {
    for (tag, text) in [
        (TAG_TO, &envelope.to),
        (TAG_SENDER, &envelope.sender),
        (TAG_PROTOCOL_ID, &envelope.protocol_id),
    ] {
        if !text.is_empty() {
            encoding::string::encode(tag, text, buf);
        }
    }
    if !envelope.message.is_empty() {
        encoding::bytes::encode(TAG_MESSAGE, &envelope.message, buf);
    }
    if !envelope.uri.is_empty() {
        encoding::string::encode(TAG_URI, &envelope.uri, buf);
    }
    buf.put_slice(&envelope.unknown_fields);
}

pub fn decode(mut buf: &[u8]) -> Result<Envelope, Malformed> {
    let mut envelope = Envelope::default();
    while buf.has_remaining() {
        let (field, wire_type) = read_key(&mut buf)?;
        merge_field(&mut envelope, field, wire_type, &mut buf, DecodeContext::default())?;
    }
    Ok(envelope)
}

/// Reads a varint, telling a short input apart from an overlong encoding.
fn read_varint(buf: &mut impl Buf) -> Result<u64, Malformed> {
    let available = buf.remaining();
    encoding::decode_varint(buf).map_err(|_| {
        if available < MAX_VARINT_LEN {
            Malformed::TruncatedVarint
        } else {
            Malformed::VarintOverflow
        }
    })
}

fn read_key(buf: &mut impl Buf) -> Result<(u32, WireType), Malformed> {
    let key = read_varint(buf)?;
    let field = key >> 3;
    if field < u64::from(encoding::MIN_TAG) || field > u64::from(encoding::MAX_TAG) {
        return Err(Malformed::InvalidFieldNumber(field));
    }
    let wire_type = WireType::try_from(key & 0x07)
        .map_err(|_| Malformed::InvalidWireType((key & 0x07) as u8))?;
    Ok((field as u32, wire_type))
}

pub(crate) fn merge_field(
    envelope: &mut Envelope,
    field: u32,
    wire_type: WireType,
    buf: &mut impl Buf,
    ctx: DecodeContext,
) -> Result<(), Malformed> {
    if !(TAG_TO..=TAG_URI).contains(&field) {
        return keep_unknown(envelope, field, wire_type, buf, ctx);
    }
    if wire_type != WireType::LengthDelimited {
        return Err(Malformed::WireTypeMismatch {
            field,
            wire_type: wire_type as u8,
        });
    }

    let len = read_varint(buf)?;
    if len > buf.remaining() as u64 {
        return Err(Malformed::TruncatedValue {
            need: len,
            have: buf.remaining(),
        });
    }
    let value = buf.copy_to_bytes(len as usize).to_vec();
    if field == TAG_MESSAGE {
        envelope.message = value;
        return Ok(());
    }

    let text = String::from_utf8(value).map_err(|_| Malformed::InvalidUtf8(field))?;
    match field {
        TAG_TO => envelope.to = text,
        TAG_SENDER => envelope.sender = text,
        TAG_PROTOCOL_ID => envelope.protocol_id = text,
        _ => envelope.uri = text,
    }
    Ok(())
}

fn keep_unknown(
    envelope: &mut Envelope,
    field: u32,
    wire_type: WireType,
    buf: &mut impl Buf,
    ctx: DecodeContext,
) -> Result<(), Malformed> {
    let width = match wire_type {
        WireType::EndGroup => return Err(Malformed::UnexpectedEndGroup(field)),
        WireType::SixtyFourBit => 8,
        WireType::ThirtyTwoBit => 4,
        _ => 0,
    };
    if buf.remaining() < width {
        return Err(Malformed::TruncatedValue {
            need: width as u64,
            have: buf.remaining(),
        });
    }

    let start = envelope.unknown_fields.len();
    encoding::encode_key(field, wire_type, &mut envelope.unknown_fields);
    let mut recorder = Recorder {
        inner: buf,
        record: &mut envelope.unknown_fields,
    };
    encoding::skip_field(wire_type, field, &mut recorder, ctx).map_err(|err| {
        Malformed::UnreadableField {
            field,
            reason: err.to_string(),
        }
    })?;
    trace!(
        field,
        bytes = envelope.unknown_fields.len() - start,
        "keeping unknown envelope field"
    );
    Ok(())
}

/// A [`Buf`] that copies every byte it is advanced past into `record`.
struct Recorder<'a, B: Buf> {
    inner: &'a mut B,
    record: &'a mut Vec<u8>,
}

impl<B: Buf> Buf for Recorder<'_, B> {
    fn remaining(&self) -> usize {
        self.inner.remaining()
    }

    fn chunk(&self) -> &[u8] {
        self.inner.chunk()
    }

    fn advance(&mut self, mut cnt: usize) {
        while cnt > 0 {
            let chunk = self.inner.chunk();
            let step = chunk.len().min(cnt);
            if step == 0 {
                // past the end; let the inner buffer report it
                self.inner.advance(cnt);
                return;
            }
            self.record.extend_from_slice(&chunk[..step]);
            self.inner.advance(step);
            cnt -= step;
        }
    }
}

impl Message for Envelope {
    fn encode_raw(&self, buf: &mut impl BufMut) {
        encode(self, buf);
    }

    fn merge_field(
        &mut self,
        tag: u32,
        wire_type: WireType,
        buf: &mut impl Buf,
        ctx: DecodeContext,
    ) -> Result<(), DecodeError> {
        merge_field(self, tag, wire_type, buf, ctx).map_err(|reason| DecodeError::new(reason.to_string()))
    }

    fn encoded_len(&self) -> usize {
        encoded_len(self)
    }

    fn clear(&mut self) {
        *self = Envelope::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_envelope_encodes_to_nothing() {
        let mut buf = Vec::new();
        encode(&Envelope::default(), &mut buf);
        assert!(buf.is_empty());
        assert_eq!(decode(&[]).unwrap(), Envelope::default());
    }

    #[test]
    fn single_field_layout() {
        let envelope = Envelope::default().with_uri("tcp://a");
        let mut buf = Vec::new();
        encode(&envelope, &mut buf);
        assert_eq!(buf[0], 0x2a);
        assert_eq!(buf[1], 7);
        assert_eq!(&buf[2..], b"tcp://a");
        assert_eq!(encoded_len(&envelope), buf.len());
    }

    #[test]
    fn short_and_overlong_varints_are_told_apart() {
        let mut slice: &[u8] = &[0x80, 0x80];
        assert_eq!(read_varint(&mut slice), Err(Malformed::TruncatedVarint));

        let mut slice: &[u8] = &[0xff; 11];
        assert_eq!(read_varint(&mut slice), Err(Malformed::VarintOverflow));

        let mut slice: &[u8] = &[0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x02];
        assert_eq!(read_varint(&mut slice), Err(Malformed::VarintOverflow));

        let mut slice: &[u8] = &[0xac, 0x02];
        assert_eq!(read_varint(&mut slice), Ok(300));
    }

    #[test]
    fn field_numbers_above_the_protobuf_range_are_rejected() {
        let mut buf = Vec::new();
        encoding::encode_varint(u64::from(encoding::MAX_TAG + 1) << 3, &mut buf);
        assert!(matches!(
            decode(&buf),
            Err(Malformed::InvalidFieldNumber(field)) if field == u64::from(encoding::MAX_TAG + 1)
        ));
    }

    #[test]
    fn known_field_with_wrong_wire_type_is_rejected() {
        // field 2 as varint
        let err = decode(&[0x10, 0x01]).unwrap_err();
        assert_eq!(
            err,
            Malformed::WireTypeMismatch {
                field: 2,
                wire_type: 0
            }
        );
    }

    #[test]
    fn invalid_utf8_in_text_field_is_rejected() {
        assert_eq!(
            decode(&[0x1a, 0x01, 0xff]).unwrap_err(),
            Malformed::InvalidUtf8(TAG_PROTOCOL_ID)
        );
        // the payload field carries arbitrary bytes
        let envelope = decode(&[0x22, 0x01, 0xff]).unwrap();
        assert_eq!(envelope.message, vec![0xff]);
    }

    #[test]
    fn last_occurrence_of_a_field_wins() {
        let data = [0x0a, 0x01, b'a', 0x0a, 0x01, b'b'];
        assert_eq!(decode(&data).unwrap().to, "b");
    }

    #[test]
    fn broken_groups_are_unreadable() {
        // group 7 holding a varint but never closed
        assert!(matches!(
            decode(&[0x3b, 0x08, 0x01]),
            Err(Malformed::UnreadableField { field: 7, .. })
        ));
        // group 7 closed by end group 8
        assert!(matches!(
            decode(&[0x3b, 0x44]),
            Err(Malformed::UnreadableField { field: 7, .. })
        ));
    }

    #[test]
    fn recorder_copies_across_chunks() {
        let mut chained = (&[1u8, 2][..]).chain(&[3u8, 4, 5][..]);
        let mut record = Vec::new();
        let mut recorder = Recorder {
            inner: &mut chained,
            record: &mut record,
        };
        recorder.advance(4);
        assert_eq!(record, vec![1, 2, 3, 4]);
        assert_eq!(chained.remaining(), 1);
    }
}
