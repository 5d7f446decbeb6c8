//! HTTP Handlers
//!
//! Request handlers for all HTTP endpoints.

pub mod health;
pub mod auth;
pub mod user;
pub mod guild;
pub mod channel;
pub mod message;
