//! Concrete tool implementations
//!
//! Provides the deployment tools registered at startup and the registry
//! builder wiring them to the backend client.

pub mod tools;
