//! API Key Service
//!
//! Issues API key/secret pairs bound to a user and project, and authorizes
//! every protected request through a validation pipeline: credential check,
//! permission check, then tenant (subdomain) scoping.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum
//! - **Database**: PostgreSQL with sqlx, behind the [`store`] traits
//! - **Authentication**: `X-API-Key` + `X-API-Secret`, secrets hashed with Argon2id
//! - **Format**: JSON requests/responses

pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod store;
