//! HTTP transport layer
//!
//! Provides the external routing surface: the buffered `/mcp` endpoint, the
//! one-shot `/sse` event endpoint, and the metadata/liveness routes.

pub mod handlers;
