//! Business logic services.
//!
//! Services hold the logic behind the HTTP handlers and middleware, written
//! against the store traits rather than a concrete database.

pub mod key_service;
pub mod usage_recorder;
