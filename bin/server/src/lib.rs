//! parley HTTP server.
//!
//! Exposes chat sessions over a small JSON API. Each session owns its own
//! history and tool state; replies come from the configured model endpoint.

pub mod config;
pub mod error;
pub mod routes;
