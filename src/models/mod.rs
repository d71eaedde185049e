//! Data models representing persisted entities and API payloads.

/// API key (credential) model
pub mod api_key;
/// Identity directory user model
pub mod user;
