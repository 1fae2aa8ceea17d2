//! Decoding of raw store documents into the typed [`System`](crate::schema::System) model

pub mod body;
pub mod extended;
pub mod record;
pub mod station;
pub mod system;

pub use record::{document_id, DecodeResult, Record};
pub use system::decode_system;
