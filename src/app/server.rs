//! HTTP server implementation.

pub mod api;
pub mod dto;
pub mod router;
