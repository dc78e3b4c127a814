//! Vector store implementations.

pub mod qdrant;
