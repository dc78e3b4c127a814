//! Module containing concrete implementations from the [core](crate::core) module.

/// Application state configuration.
pub mod state;

/// Vector store implementations.
pub mod vector;

/// HTTP server implementation.
pub mod server;

#[cfg(test)]
pub mod test;
