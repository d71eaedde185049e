//! HTTP request handlers (route handlers).
//!
//! Handlers only bind requests and shape responses; the logic lives in
//! `services` and `auth`.

/// Protected admin endpoints
pub mod admin;
/// Health check
pub mod health;
/// API key issuance and management
pub mod keys;
