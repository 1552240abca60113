//! Wire protocol definitions
//!
//! `wire` is the message codec and has no I/O. `frame` carries encoded
//! messages over an async byte stream and is only built with the
//! `transport` feature. The crate's dev-dependencies turn that feature on,
//! so `cargo test -p parley-shared` covers `frame` too.

pub mod wire;

#[cfg(feature = "transport")]
pub mod frame;
