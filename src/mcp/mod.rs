//! JSON-RPC protocol core
//!
//! Provides the envelope codec, the error taxonomy, and the method dispatcher
//! shared by both transports.

pub mod rpc;
pub mod server;
