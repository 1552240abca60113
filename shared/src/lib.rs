//! Shared types and wire codec for Parley
//!
//! This crate contains the two handshake messages, their binary encoding,
//! and small utilities used by the server, the client and the CLI.

pub mod protocol;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use protocol::wire::{
    decode_field_list, decode_identity, encode_field_list, encode_identity, WireError,
};
pub use types::{fields::FieldList, identity::*};
