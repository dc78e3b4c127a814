//! The core module defines the business logic of vecgate.
//! It provides the traits and models upstream adapters need to implement.

pub mod model;
pub mod service;
pub mod vector;
