//! Message types exchanged between client and server

pub mod fields;
pub mod identity;
