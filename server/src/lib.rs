//! Parley server library
//!
//! Accepts client connections, answers the identity handshake with the
//! configured field list, and stores the uploaded sample.

pub mod config;
pub mod server;
pub mod store;

pub use config::ServerConfig;
pub use server::{run_server, Server};
pub use store::SampleStore;
