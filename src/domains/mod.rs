pub mod envelope;
pub mod protocol_id;
