#![allow(dead_code)]

use aea_envelope::Envelope;
use prost::encoding::{encode_key, encode_varint, WireType};

pub fn sample_envelope() -> Envelope {
    Envelope::new("agent_b", "agent_a", "fipa", vec![0x01, 0x02])
}

pub fn full_envelope() -> Envelope {
    Envelope::new(
        "fetchai1recipient",
        "fetchai1sender",
        "valory/abci:0.1.0",
        (0u8..=255).collect::<Vec<_>>(),
    )
    .with_uri("tcp://127.0.0.1:9000/inbox")
}

/// Appends a length-delimited record for `field`.
pub fn put_bytes_record(buf: &mut Vec<u8>, field: u32, value: &[u8]) {
    encode_key(field, WireType::LengthDelimited, buf);
    encode_varint(value.len() as u64, buf);
    buf.extend_from_slice(value);
}

pub fn put_varint_record(buf: &mut Vec<u8>, field: u32, value: u64) {
    encode_key(field, WireType::Varint, buf);
    encode_varint(value, buf);
}
